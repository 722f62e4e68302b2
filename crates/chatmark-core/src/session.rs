//! Annotation session: the client-side state machine behind the chat view.
//!
//! UI events arrive as [`Command`]s and are applied synchronously by
//! [`Session::dispatch`]. Anything that needs the external store comes back
//! as an [`Effect::Request`] tagged with a [`Ticket`]; whoever performs the
//! request reports the result through [`Session::complete`]. The session
//! never performs I/O itself.
//!
//! Requests are independent. Completions may arrive in any order and each is
//! applied on arrival, so concurrent edits to the same message resolve
//! last-write-wins locally.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{CorrectnessPolicy, SessionConfig};
use crate::files::{FilePanel, FileSelection};
use crate::message::{
    Correctness, Message, MessageId, MessagePatch, NewMessage, Side, parse_correctness,
};
use crate::pending::{AnswerState, PendingAnswers};
use crate::pins::PinIndex;
use crate::store::MessageStore;

/// Local command that leaves the chat instead of sending a message.
pub const ABORT_COMMAND: &str = "/abort";

/// Correlates a request with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn new(n: u64) -> Self {
        Self(n)
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Views the front end can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// The error/landing page shown outside the chat.
    Landing,
}

/// The message being composed and the side it will be sent on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeDraft {
    pub text: String,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Initial fetch of messages and files.
    Mount,
    Load,
    SetDraft(String),
    /// Enter submits; Shift+Enter inserts a newline.
    Enter { shift: bool },
    Send,
    ToggleSide,
    SetCorrectness { id: MessageId, raw: String },
    SetTitleInput(String),
    SubmitTitle { id: MessageId },
    Delete { id: MessageId },
    AskAssistant { id: MessageId },
    Approve { id: MessageId },
    Decline { id: MessageId },
    RefreshFiles,
    SelectFile(Option<FileSelection>),
    Upload,
    Download { name: String },
    DeleteFile { name: String },
}

/// A call the external store or assistant service must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ListMessages,
    CreateMessage(NewMessage),
    UpdateMessage { id: MessageId, patch: MessagePatch },
    DeleteMessage { id: MessageId },
    QueryAssistant { query: String },
    ListFiles,
    UploadFile {
        file_name: String,
        source_name: String,
        contents: Vec<u8>,
    },
    DownloadFile { name: String },
    DeleteFile { name: String },
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ListMessages => "list-messages",
            Self::CreateMessage(_) => "create-message",
            Self::UpdateMessage { .. } => "update-message",
            Self::DeleteMessage { .. } => "delete-message",
            Self::QueryAssistant { .. } => "query-assistant",
            Self::ListFiles => "list-files",
            Self::UploadFile { .. } => "upload-file",
            Self::DownloadFile { .. } => "download-file",
            Self::DeleteFile { .. } => "delete-file",
        }
    }
}

/// Successful result of a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Messages(Vec<Message>),
    Message(Message),
    /// Assistant reply; `None` when the service returned no result.
    Answer(Option<String>),
    Files(Vec<String>),
    Bytes(Vec<u8>),
    Done,
}

impl Response {
    fn kind(&self) -> &'static str {
        match self {
            Self::Messages(_) => "messages",
            Self::Message(_) => "message",
            Self::Answer(_) => "answer",
            Self::Files(_) => "files",
            Self::Bytes(_) => "bytes",
            Self::Done => "done",
        }
    }
}

/// A failed request, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Failure(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub ticket: Ticket,
    pub result: Result<Response, Failure>,
}

impl Completion {
    pub fn ok(ticket: Ticket, response: Response) -> Self {
        Self {
            ticket,
            result: Ok(response),
        }
    }

    pub fn err(ticket: Ticket, failure: impl Into<String>) -> Self {
        Self {
            ticket,
            result: Err(Failure(failure.into())),
        }
    }
}

/// Something for the front end to show or do; never a network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Navigate(View),
    /// Blocking warning for the user.
    Alert(String),
    Downloaded { name: String, contents: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Request { ticket: Ticket, request: Request },
    Notice(Notice),
}

/// Context captured at dispatch time for an outstanding request.
#[derive(Debug)]
enum Awaiting {
    Load,
    Create,
    ApprovedAnswer { source: MessageId },
    Correctness {
        id: MessageId,
        previous: Option<Correctness>,
        applied: Correctness,
    },
    Title { id: MessageId },
    Delete { id: MessageId },
    Query { id: MessageId },
    ListFiles,
    Upload,
    Download { name: String },
    DeleteFile { name: String },
}

impl Awaiting {
    fn describe(&self) -> &'static str {
        match self {
            Self::Load => "load messages",
            Self::Create => "save message",
            Self::ApprovedAnswer { .. } => "save approved answer",
            Self::Correctness { .. } => "update correctness",
            Self::Title { .. } => "update title",
            Self::Delete { .. } => "delete message",
            Self::Query { .. } => "query assistant",
            Self::ListFiles => "fetch files",
            Self::Upload => "upload file",
            Self::Download { .. } => "download file",
            Self::DeleteFile { .. } => "delete file",
        }
    }
}

pub struct Session {
    config: SessionConfig,
    messages: MessageStore,
    pins: PinIndex,
    pending: PendingAnswers,
    draft: ComposeDraft,
    title_input: String,
    files: FilePanel,
    awaiting: HashMap<Ticket, Awaiting>,
    /// Most recent correctness edit per message.
    latest_correctness: HashMap<MessageId, Ticket>,
    next_ticket: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let files = FilePanel::new(config.file_cap);
        Self {
            config,
            messages: MessageStore::new(),
            pins: PinIndex::default(),
            pending: PendingAnswers::new(),
            draft: ComposeDraft::default(),
            title_input: String::new(),
            files,
            awaiting: HashMap::new(),
            latest_correctness: HashMap::new(),
            next_ticket: 1,
        }
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.get(id)
    }

    /// Pinned messages in conversation order.
    pub fn pins(&self) -> impl Iterator<Item = &Message> {
        self.pins.resolve(&self.messages)
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    pub fn pending(&self) -> &PendingAnswers {
        &self.pending
    }

    pub fn answer_state(&self, id: &MessageId) -> AnswerState<'_> {
        self.pending.state(id)
    }

    pub fn draft(&self) -> &ComposeDraft {
        &self.draft
    }

    pub fn side(&self) -> Side {
        self.draft.side
    }

    pub fn title_input(&self) -> &str {
        &self.title_input
    }

    pub fn files(&self) -> &FilePanel {
        &self.files
    }

    /// Number of requests issued and not yet completed.
    pub fn in_flight(&self) -> usize {
        self.awaiting.len()
    }

    /// Apply a command and return what must happen next.
    pub fn dispatch(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::Mount => vec![
                self.issue(Awaiting::Load, Request::ListMessages),
                self.issue(Awaiting::ListFiles, Request::ListFiles),
            ],
            Command::Load => vec![self.issue(Awaiting::Load, Request::ListMessages)],
            Command::SetDraft(text) => {
                self.draft.text = text;
                Vec::new()
            }
            Command::Enter { shift: true } => {
                self.draft.text.push('\n');
                Vec::new()
            }
            Command::Enter { shift: false } | Command::Send => self.send(),
            Command::ToggleSide => {
                self.draft.side = self.draft.side.toggled();
                debug!(side = %self.draft.side, "compose side toggled");
                Vec::new()
            }
            Command::SetCorrectness { id, raw } => self.update_correctness(id, &raw),
            Command::SetTitleInput(title) => {
                self.title_input = title;
                Vec::new()
            }
            Command::SubmitTitle { id } => {
                let patch = MessagePatch::title(self.title_input.clone());
                vec![self.issue(
                    Awaiting::Title { id: id.clone() },
                    Request::UpdateMessage { id, patch },
                )]
            }
            Command::Delete { id } => vec![self.issue(
                Awaiting::Delete { id: id.clone() },
                Request::DeleteMessage { id },
            )],
            Command::AskAssistant { id } => self.ask_assistant(id),
            Command::Approve { id } => self.approve(id),
            Command::Decline { id } => {
                if self.pending.take(&id).is_none() {
                    debug!(%id, "decline ignored: no pending answer");
                }
                Vec::new()
            }
            Command::RefreshFiles => vec![self.issue(Awaiting::ListFiles, Request::ListFiles)],
            Command::SelectFile(selection) => {
                self.files.select(selection);
                Vec::new()
            }
            Command::Upload => self.upload(),
            Command::Download { name } => vec![self.issue(
                Awaiting::Download { name: name.clone() },
                Request::DownloadFile { name },
            )],
            Command::DeleteFile { name } => vec![self.issue(
                Awaiting::DeleteFile { name: name.clone() },
                Request::DeleteFile { name },
            )],
        }
    }

    /// Apply the result of a request issued earlier.
    ///
    /// Failures are logged and otherwise swallowed. The returned effects are
    /// follow-ups (e.g. refreshing the file list after an upload).
    pub fn complete(&mut self, completion: Completion) -> Vec<Effect> {
        let Completion { ticket, result } = completion;
        let Some(awaiting) = self.awaiting.remove(&ticket) else {
            warn!(%ticket, "completion for unknown ticket ignored");
            return Vec::new();
        };

        match result {
            Ok(response) => self.on_success(ticket, awaiting, response),
            Err(failure) => {
                self.on_failure(ticket, awaiting, failure);
                Vec::new()
            }
        }
    }

    fn allocate(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn issue(&mut self, awaiting: Awaiting, request: Request) -> Effect {
        let ticket = self.allocate();
        self.issue_as(ticket, awaiting, request)
    }

    fn issue_as(&mut self, ticket: Ticket, awaiting: Awaiting, request: Request) -> Effect {
        debug!(%ticket, kind = request.kind(), "request issued");
        self.awaiting.insert(ticket, awaiting);
        Effect::Request { ticket, request }
    }

    fn send(&mut self) -> Vec<Effect> {
        let trimmed = self.draft.text.trim();
        if trimmed.is_empty() {
            debug!("send ignored: draft is empty");
            return Vec::new();
        }
        if trimmed == ABORT_COMMAND {
            info!("abort command entered, leaving chat");
            return vec![Effect::Notice(Notice::Navigate(View::Landing))];
        }

        let body = NewMessage::draft(self.draft.text.clone(), self.draft.side);
        vec![self.issue(Awaiting::Create, Request::CreateMessage(body))]
    }

    fn update_correctness(&mut self, id: MessageId, raw: &str) -> Vec<Effect> {
        let applied = parse_correctness(raw);
        let previous = self
            .messages
            .get_mut(&id)
            .map(|msg| std::mem::replace(&mut msg.correctness, applied));
        if previous.is_none() {
            debug!(%id, "correctness edit for a message not held locally");
        }
        self.pins.recompute(&self.messages);

        let ticket = self.allocate();
        self.latest_correctness.insert(id.clone(), ticket);
        let request = Request::UpdateMessage {
            id: id.clone(),
            patch: MessagePatch::correctness(applied),
        };
        vec![self.issue_as(
            ticket,
            Awaiting::Correctness {
                id,
                previous,
                applied,
            },
            request,
        )]
    }

    fn ask_assistant(&mut self, id: MessageId) -> Vec<Effect> {
        let query = match self.messages.get(&id) {
            Some(msg) if msg.side == Side::Right => msg.text.clone(),
            Some(_) => {
                debug!(%id, "assistant is only offered on right-side messages");
                return Vec::new();
            }
            None => {
                debug!(%id, "assistant query for unknown message ignored");
                return Vec::new();
            }
        };
        vec![self.issue(Awaiting::Query { id }, Request::QueryAssistant { query })]
    }

    fn approve(&mut self, id: MessageId) -> Vec<Effect> {
        let Some(answer) = self.pending.take(&id) else {
            debug!(%id, "approve ignored: no pending answer");
            return Vec::new();
        };

        let ticket = self.allocate();
        self.messages
            .push_unconfirmed(Message::answer(answer.clone()), ticket);
        self.pins.recompute(&self.messages);
        info!(%id, "assistant answer approved");

        let body = NewMessage::draft(answer, Side::Right);
        vec![self.issue_as(
            ticket,
            Awaiting::ApprovedAnswer { source: id },
            Request::CreateMessage(body),
        )]
    }

    fn upload(&mut self) -> Vec<Effect> {
        let Some(selection) = self.files.selection() else {
            debug!("upload ignored: no file selected");
            return Vec::new();
        };
        if self.files.is_full() {
            return vec![Effect::Notice(Notice::Alert(self.files.cap_alert()))];
        }

        let request = Request::UploadFile {
            file_name: selection.upload_name().to_string(),
            source_name: selection.source_name.clone(),
            contents: selection.contents.clone(),
        };
        vec![self.issue(Awaiting::Upload, request)]
    }

    fn on_success(&mut self, ticket: Ticket, awaiting: Awaiting, response: Response) -> Vec<Effect> {
        match (awaiting, response) {
            (Awaiting::Load, Response::Messages(messages)) => {
                info!(count = messages.len(), "messages loaded");
                self.messages.replace_all(messages);
                self.pins.recompute(&self.messages);
            }
            (Awaiting::Create, Response::Message(message)) => {
                self.messages.push(message);
                self.pins.recompute(&self.messages);
                self.draft.text.clear();
            }
            (Awaiting::ApprovedAnswer { source }, Response::Message(message)) => {
                if !self.messages.confirm(ticket, message) {
                    debug!(%source, "approved answer no longer held locally");
                }
                self.pins.recompute(&self.messages);
            }
            (Awaiting::Correctness { id, applied, .. }, _) => {
                self.settle_correctness(&id, ticket);
                debug!(%id, correctness = %applied, "correctness saved");
            }
            (Awaiting::Title { id }, Response::Message(saved)) => {
                if let Some(msg) = self.messages.get_mut(&id) {
                    msg.title = saved.title;
                }
                self.pins.recompute(&self.messages);
                self.title_input.clear();
            }
            (Awaiting::Delete { id }, _) => {
                self.messages.remove(&id);
                self.pending.take(&id);
                self.pins.recompute(&self.messages);
            }
            (Awaiting::Query { id }, Response::Answer(answer)) => {
                let answer = answer
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| self.config.no_result_answer.clone());
                if self.pending.insert(id.clone(), answer).is_some() {
                    debug!(%id, "pending answer replaced");
                }
            }
            (Awaiting::ListFiles, Response::Files(files)) => {
                self.files.set_files(files);
            }
            (Awaiting::Upload, _) => {
                self.files.clear_selection();
                return vec![self.issue(Awaiting::ListFiles, Request::ListFiles)];
            }
            (Awaiting::Download { name }, Response::Bytes(contents)) => {
                return vec![Effect::Notice(Notice::Downloaded { name, contents })];
            }
            (Awaiting::DeleteFile { name }, _) => {
                debug!(name = %name, "file deleted");
                return vec![self.issue(Awaiting::ListFiles, Request::ListFiles)];
            }
            (awaiting, response) => {
                warn!(
                    %ticket,
                    op = awaiting.describe(),
                    response = response.kind(),
                    "unexpected response shape ignored"
                );
            }
        }
        Vec::new()
    }

    /// Forget `ticket` as the latest edit of `id`; returns whether it was.
    fn settle_correctness(&mut self, id: &MessageId, ticket: Ticket) -> bool {
        if self.latest_correctness.get(id) == Some(&ticket) {
            self.latest_correctness.remove(id);
            true
        } else {
            false
        }
    }

    fn on_failure(&mut self, ticket: Ticket, awaiting: Awaiting, failure: Failure) {
        error!(%ticket, op = awaiting.describe(), error = %failure, "request failed");

        if let Awaiting::Correctness {
            id,
            previous,
            applied,
        } = awaiting
        {
            let latest = self.settle_correctness(&id, ticket);
            let Some(previous) = previous else {
                return;
            };
            if self.config.correctness_policy != CorrectnessPolicy::Rollback {
                return;
            }
            match self.messages.get_mut(&id) {
                Some(msg) if latest && msg.correctness == applied => {
                    msg.correctness = previous;
                    info!(%id, restored = %previous, "correctness edit rolled back");
                }
                _ => debug!(%id, "rollback skipped: superseded by a newer edit"),
            }
            self.pins.recompute(&self.messages);
        }
    }
}
