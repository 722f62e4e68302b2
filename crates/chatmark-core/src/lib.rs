//! Core types and the annotation session state machine for chatmark.

pub mod config;
pub mod error;
pub mod files;
pub mod message;
pub mod pending;
pub mod pins;
pub mod session;
pub mod store;

pub use config::{CorrectnessPolicy, SessionConfig};
pub use error::ParseError;
pub use files::{FILE_LIST_CAP, FilePanel, FileSelection};
pub use message::{Correctness, Message, MessageId, MessagePatch, NewMessage, Side, parse_correctness};
pub use pending::{AnswerState, PendingAnswers};
pub use pins::{PIN_THRESHOLD, PinIndex};
pub use session::{
    ABORT_COMMAND, Command, ComposeDraft, Completion, Effect, Failure, Notice, Request, Response,
    Session, Ticket, View,
};
pub use store::MessageStore;
