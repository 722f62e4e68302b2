//! HTTP client for the external message/file store and the assistant service.

use chatmark_core::{Message, MessageId, MessagePatch, NewMessage};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Default origin of the hosted store.
pub const DEFAULT_BASE_URL: &str = "https://crudapp-ldw7.onrender.com";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("assistant error: {0}")]
    Assistant(String),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid URL {0}")]
    InvalidUrl(String),
}

/// Client for the store's `/api/messages`, `/api/files` and `/api/gemini` endpoints.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct AssistantReply {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Cache-buster sent as `currentTime` on listing and file endpoints.
fn current_time() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl ApiClient {
    /// Create a client for the given store origin.
    ///
    /// `base_url` should be like `http://localhost:5000` (no trailing slash).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `{base_url}/api/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    /// Turn a non-2xx response into [`ApiError::Server`].
    async fn check(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::Server {
            status: status.as_u16(),
            body,
        })
    }

    /// Fetch the whole message sequence.
    pub async fn list_messages(&self) -> Result<Vec<Message>, ApiError> {
        let url = self.endpoint(&["messages"])?;
        debug!(url = %url, "listing messages");
        let resp = self
            .client
            .get(url)
            .query(&[("currentTime", current_time())])
            .send()
            .await?;
        let messages: Vec<Message> = Self::check(resp).await?.json().await?;
        info!(count = messages.len(), "fetched messages");
        Ok(messages)
    }

    /// Persist a new message, returning the store's canonical record.
    pub async fn create_message(&self, body: &NewMessage) -> Result<Message, ApiError> {
        let url = self.endpoint(&["messages"])?;
        debug!(url = %url, side = %body.side, "creating message");
        let resp = self.client.post(url).json(body).send().await?;
        let message: Message = Self::check(resp).await?.json().await?;
        Ok(message)
    }

    /// Apply a partial update, returning the updated record.
    pub async fn update_message(
        &self,
        id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<Message, ApiError> {
        let url = self.endpoint(&["messages", id.as_str()])?;
        debug!(url = %url, "patching message");
        let resp = self.client.patch(url).json(patch).send().await?;
        let message: Message = Self::check(resp).await?.json().await?;
        Ok(message)
    }

    pub async fn delete_message(&self, id: &MessageId) -> Result<(), ApiError> {
        let url = self.endpoint(&["messages", id.as_str()])?;
        debug!(url = %url, "deleting message");
        let resp = self.client.delete(url).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Ask the assistant service about `query`.
    ///
    /// Returns `None` when the service answered without a result. An `error`
    /// field in the reply, on any status, becomes [`ApiError::Assistant`].
    pub async fn query_assistant(&self, query: &str) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&["gemini"])?;
        debug!(url = %url, "querying assistant");
        let resp = self.client.get(url).query(&[("query", query)]).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        match serde_json::from_str::<AssistantReply>(&body) {
            Ok(AssistantReply {
                error: Some(error), ..
            }) => Err(ApiError::Assistant(error)),
            Ok(reply) if status.is_success() => Ok(reply.result),
            Ok(_) => Err(ApiError::Server {
                status: status.as_u16(),
                body,
            }),
            Err(_) if !status.is_success() => Err(ApiError::Server {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(ApiError::Json(e)),
        }
    }

    /// List stored file names, in store order.
    pub async fn list_files(&self) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint(&["files"])?;
        debug!(url = %url, "listing files");
        let resp = self
            .client
            .get(url)
            .query(&[("currentTime", current_time())])
            .send()
            .await?;
        let files: Vec<String> = Self::check(resp).await?.json().await?;
        info!(count = files.len(), "fetched files");
        Ok(files)
    }

    /// Upload `contents` as a multipart form with `file` and `fileName` fields.
    pub async fn upload_file(
        &self,
        file_name: &str,
        source_name: &str,
        contents: Vec<u8>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["upload"])?;
        info!(url = %url, file_name, bytes = contents.len(), "uploading file");
        let form = Form::new()
            .part("file", Part::bytes(contents).file_name(source_name.to_string()))
            .text("fileName", file_name.to_string());
        let resp = self
            .client
            .post(url)
            .query(&[("currentTime", current_time())])
            .multipart(form)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn download_file(&self, name: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(&["download", name])?;
        debug!(url = %url, "downloading file");
        let resp = self
            .client
            .get(url)
            .query(&[("currentTime", current_time())])
            .send()
            .await?;
        let bytes = Self::check(resp).await?.bytes().await?;
        info!(name, bytes = bytes.len(), "downloaded file");
        Ok(bytes.to_vec())
    }

    pub async fn delete_file(&self, name: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["files", name])?;
        debug!(url = %url, "deleting file");
        let resp = self
            .client
            .delete(url)
            .query(&[("currentTime", current_time())])
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}
