//! Which annotations the front end offers on a message.

use anyhow::bail;
use chatmark_core::{MessageId, Session};

/// Correctness is only offered on left-side messages held locally.
pub fn check_scorable(session: &Session, id: &MessageId) -> anyhow::Result<()> {
    match session.message(id) {
        None => bail!("no message {id}"),
        Some(msg) if !msg.is_scorable() => bail!("{id} is a right-side message and cannot be scored"),
        Some(_) => Ok(()),
    }
}

/// A title is only offered once, on a pinned message.
pub fn check_titleable(session: &Session, id: &MessageId) -> anyhow::Result<()> {
    match session.message(id) {
        None => bail!("no message {id}"),
        Some(msg) if !msg.is_pinned() => bail!("{id} is not pinned; score it 100 first"),
        Some(msg) if !msg.is_titleable() => bail!("{id} already has a title"),
        Some(_) => Ok(()),
    }
}
