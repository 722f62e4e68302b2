//! The seam between session requests and whatever performs them.

use std::fmt::Display;

use chatmark_core::{Request, Response};

/// Performs one [`Request`] against the external store.
///
/// Each call is independent: no ordering, retry or timeout is implied.
pub trait Transport {
    type Error: Display;

    fn execute(&self, request: Request) -> impl Future<Output = Result<Response, Self::Error>>;
}

#[cfg(feature = "http")]
impl Transport for crate::http::ApiClient {
    type Error = crate::http::ApiError;

    async fn execute(&self, request: Request) -> Result<Response, Self::Error> {
        Ok(match request {
            Request::ListMessages => Response::Messages(self.list_messages().await?),
            Request::CreateMessage(body) => Response::Message(self.create_message(&body).await?),
            Request::UpdateMessage { id, patch } => {
                Response::Message(self.update_message(&id, &patch).await?)
            }
            Request::DeleteMessage { id } => {
                self.delete_message(&id).await?;
                Response::Done
            }
            Request::QueryAssistant { query } => Response::Answer(self.query_assistant(&query).await?),
            Request::ListFiles => Response::Files(self.list_files().await?),
            Request::UploadFile {
                file_name,
                source_name,
                contents,
            } => {
                self.upload_file(&file_name, &source_name, contents).await?;
                Response::Done
            }
            Request::DownloadFile { name } => Response::Bytes(self.download_file(&name).await?),
            Request::DeleteFile { name } => {
                self.delete_file(&name).await?;
                Response::Done
            }
        })
    }
}
