//! Drives a [`Session`] against a [`Transport`].
//!
//! Commands are applied synchronously; each resulting request runs as its own
//! future on the current task. Completions are fed back into the session in
//! the order they finish, and any follow-up requests are started right away.

use chatmark_core::{Command, Completion, Effect, Failure, Notice, Request, Session, Ticket};
use futures::StreamExt;
use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use tracing::debug;

use crate::transport::Transport;

pub struct Runner<'a, T: Transport> {
    session: Session,
    transport: &'a T,
    in_flight: FuturesUnordered<LocalBoxFuture<'a, Completion>>,
}

impl<'a, T: Transport> Runner<'a, T> {
    pub fn new(session: Session, transport: &'a T) -> Self {
        Self {
            session,
            transport,
            in_flight: FuturesUnordered::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// No request is outstanding.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Apply `command`, start any requests it needs, and return its notices.
    pub fn dispatch(&mut self, command: Command) -> Vec<Notice> {
        let effects = self.session.dispatch(command);
        self.route(effects)
    }

    /// Wait for the next request to finish and apply it.
    ///
    /// Returns `None` when nothing is outstanding.
    pub async fn next(&mut self) -> Option<Vec<Notice>> {
        let completion = self.in_flight.next().await?;
        let effects = self.session.complete(completion);
        Some(self.route(effects))
    }

    /// Run until every outstanding request, including follow-ups, has finished.
    pub async fn settle(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Some(mut more) = self.next().await {
            notices.append(&mut more);
        }
        notices
    }

    fn route(&mut self, effects: Vec<Effect>) -> Vec<Notice> {
        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                Effect::Request { ticket, request } => self.spawn(ticket, request),
                Effect::Notice(notice) => notices.push(notice),
            }
        }
        notices
    }

    fn spawn(&mut self, ticket: Ticket, request: Request) {
        let transport = self.transport;
        debug!(%ticket, kind = request.kind(), "starting request");
        self.in_flight.push(Box::pin(async move {
            let result = transport
                .execute(request)
                .await
                .map_err(|e| Failure(e.to_string()));
            Completion { ticket, result }
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use chatmark_core::{
        AnswerState, Correctness, FileSelection, Message, MessageId, Response, Side, View,
    };

    use super::*;

    /// In-memory stand-in for the external store.
    #[derive(Default)]
    struct FakeStore {
        messages: RefCell<Vec<Message>>,
        files: RefCell<Vec<String>>,
        calls: RefCell<Vec<&'static str>>,
        failing: RefCell<Vec<&'static str>>,
        answer: Option<String>,
    }

    impl FakeStore {
        fn with_messages(messages: Vec<Message>) -> Self {
            Self {
                messages: RefCell::new(messages),
                ..Self::default()
            }
        }

        fn fail(&self, kind: &'static str) {
            self.failing.borrow_mut().push(kind);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.borrow().clone()
        }
    }

    impl Transport for FakeStore {
        type Error = String;

        async fn execute(&self, request: Request) -> Result<Response, String> {
            let kind = request.kind();
            self.calls.borrow_mut().push(kind);
            if self.failing.borrow().contains(&kind) {
                return Err(format!("{kind} unavailable"));
            }

            Ok(match request {
                Request::ListMessages => Response::Messages(self.messages.borrow().clone()),
                Request::CreateMessage(body) => {
                    let mut messages = self.messages.borrow_mut();
                    let saved = Message {
                        id: Some(MessageId::new(format!("m{}", messages.len() + 1))),
                        text: body.text,
                        side: body.side,
                        correctness: body.correctness,
                        title: None,
                    };
                    messages.push(saved.clone());
                    Response::Message(saved)
                }
                Request::UpdateMessage { id, patch } => {
                    let mut messages = self.messages.borrow_mut();
                    let msg = messages
                        .iter_mut()
                        .find(|m| m.id.as_ref() == Some(&id))
                        .ok_or_else(|| format!("no message {id}"))?;
                    if let Some(c) = patch.correctness {
                        msg.correctness = c;
                    }
                    if let Some(t) = patch.title {
                        msg.title = Some(t);
                    }
                    Response::Message(msg.clone())
                }
                Request::DeleteMessage { id } => {
                    self.messages.borrow_mut().retain(|m| m.id.as_ref() != Some(&id));
                    Response::Done
                }
                Request::QueryAssistant { .. } => Response::Answer(self.answer.clone()),
                Request::ListFiles => Response::Files(self.files.borrow().clone()),
                Request::UploadFile { file_name, .. } => {
                    self.files.borrow_mut().push(file_name);
                    Response::Done
                }
                Request::DownloadFile { name } => Response::Bytes(name.into_bytes()),
                Request::DeleteFile { name } => {
                    self.files.borrow_mut().retain(|f| *f != name);
                    Response::Done
                }
            })
        }
    }

    fn stored(id: &str, side: Side, correctness: Correctness) -> Message {
        Message {
            id: Some(MessageId::from(id)),
            text: format!("text {id}"),
            side,
            correctness,
            title: None,
        }
    }

    async fn mounted(store: &FakeStore) -> Runner<'_, FakeStore> {
        let mut runner = Runner::new(Session::default(), store);
        runner.dispatch(Command::Mount);
        runner.settle().await;
        runner
    }

    #[tokio::test]
    async fn mount_loads_messages_and_files() {
        let store = FakeStore::with_messages(vec![
            stored("1", Side::Left, Correctness::Score(100)),
            stored("2", Side::Right, Correctness::Absent),
        ]);
        store
            .files
            .borrow_mut()
            .extend((0..12).map(|i| format!("f{i}")));

        let runner = mounted(&store).await;
        assert!(runner.is_idle());
        assert_eq!(runner.session().messages().len(), 2);
        assert_eq!(runner.session().pin_count(), 1);
        assert_eq!(runner.session().files().files().len(), 10);
    }

    #[tokio::test]
    async fn failures_do_not_affect_sibling_requests() {
        let store = FakeStore::with_messages(vec![stored("1", Side::Left, Correctness::Unset)]);
        store.fail("list-files");

        let runner = mounted(&store).await;
        assert_eq!(runner.session().messages().len(), 1);
        assert!(runner.session().files().files().is_empty());
    }

    #[tokio::test]
    async fn whitespace_send_makes_no_call() {
        let store = FakeStore::default();
        let mut runner = mounted(&store).await;
        let before = store.calls().len();

        runner.dispatch(Command::SetDraft("   ".into()));
        runner.dispatch(Command::Send);
        runner.settle().await;
        assert_eq!(store.calls().len(), before);
    }

    #[tokio::test]
    async fn abort_navigates_without_create() {
        let store = FakeStore::default();
        let mut runner = mounted(&store).await;

        runner.dispatch(Command::SetDraft("/abort".into()));
        let notices = runner.dispatch(Command::Send);
        runner.settle().await;
        assert_eq!(notices, vec![Notice::Navigate(View::Landing)]);
        assert!(!store.calls().contains(&"create-message"));
    }

    #[tokio::test]
    async fn send_then_score_pins_message() {
        let store = FakeStore::default();
        let mut runner = mounted(&store).await;

        runner.dispatch(Command::SetDraft("is water wet?".into()));
        runner.dispatch(Command::Send);
        runner.settle().await;
        assert!(runner.session().draft().text.is_empty());

        let id = MessageId::from("m1");
        runner.dispatch(Command::SetCorrectness {
            id: id.clone(),
            raw: "100".into(),
        });
        assert_eq!(runner.session().pin_count(), 1);
        runner.settle().await;

        assert_eq!(
            store.messages.borrow()[0].correctness,
            Correctness::Score(100)
        );
    }

    #[tokio::test]
    async fn approve_clears_pending_when_save_fails() {
        let store = FakeStore {
            answer: Some("It is.".into()),
            ..FakeStore::with_messages(vec![stored("r", Side::Right, Correctness::Absent)])
        };
        let mut runner = mounted(&store).await;
        let id = MessageId::from("r");

        runner.dispatch(Command::AskAssistant { id: id.clone() });
        runner.settle().await;
        assert_eq!(runner.session().answer_state(&id), AnswerState::Pending("It is."));

        store.fail("create-message");
        runner.dispatch(Command::Approve { id: id.clone() });
        runner.settle().await;

        assert_eq!(runner.session().answer_state(&id), AnswerState::None);
        assert_eq!(runner.session().messages().len(), 2);
        assert_eq!(runner.session().messages().unconfirmed_count(), 1);
    }

    #[tokio::test]
    async fn upload_at_cap_alerts_and_skips_call() {
        let store = FakeStore::default();
        store
            .files
            .borrow_mut()
            .extend((0..10).map(|i| format!("f{i}")));
        let mut runner = mounted(&store).await;

        runner.dispatch(Command::SelectFile(Some(FileSelection::new("x.txt", vec![1]))));
        let notices = runner.dispatch(Command::Upload);
        runner.settle().await;

        assert_eq!(
            notices,
            vec![Notice::Alert("You can only upload up to 10 files.".into())]
        );
        assert!(!store.calls().contains(&"upload-file"));
    }

    #[tokio::test]
    async fn upload_refreshes_listing() {
        let store = FakeStore::default();
        let mut runner = mounted(&store).await;

        runner.dispatch(Command::SelectFile(Some(FileSelection::new("x.txt", vec![1]))));
        runner.dispatch(Command::Upload);
        runner.settle().await;

        assert_eq!(runner.session().files().files().to_vec(), vec!["x.txt".to_string()]);
        assert_eq!(store.calls().last(), Some(&"list-files"));
    }

    #[tokio::test]
    async fn download_surfaces_bytes() {
        let store = FakeStore::default();
        let mut runner = mounted(&store).await;

        runner.dispatch(Command::Download {
            name: "a.txt".into(),
        });
        let notices = runner.settle().await;
        assert_eq!(
            notices,
            vec![Notice::Downloaded {
                name: "a.txt".into(),
                contents: b"a.txt".to_vec(),
            }]
        );
    }
}
