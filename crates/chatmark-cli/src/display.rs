//! Terminal rendering for the conversation, pins and file list.

use chatmark_core::{AnswerState, Message, Session, Side};

const SIDE_WIDTH: usize = 6;
const ID_WIDTH: usize = 26;

/// Print pins, then every message with its annotation and any pending answer.
pub fn print_conversation(session: &Session) {
    print_pins(session);
    println!();

    println!("Messages (compose side: {})", session.side());
    if session.messages().is_empty() {
        println!("  (no messages)");
    }
    for msg in session.messages().iter() {
        print_message(msg);
        if let Some(id) = &msg.id {
            if let AnswerState::Pending(answer) = session.answer_state(id) {
                println!("  {:>width$} assistant suggests: {}", "", answer, width = SIDE_WIDTH);
                println!(
                    "  {:>width$} approve with :yes {id}, decline with :no {id}",
                    "",
                    width = SIDE_WIDTH
                );
            }
        }
    }
}

/// Print the pinned messages by label.
pub fn print_pins(session: &Session) {
    println!("Pinned Messages");
    if session.pin_count() == 0 {
        println!("  No pinned messages");
        return;
    }
    for msg in session.pins() {
        println!("  {:<width$} {}", id_of(msg), msg.label(), width = ID_WIDTH);
    }
}

/// Print one message as a short block: header line, then the text.
pub fn print_message(msg: &Message) {
    let mut header = format!(
        "  {:<side$} {:<id$}",
        msg.side.as_str(),
        id_of(msg),
        side = SIDE_WIDTH,
        id = ID_WIDTH
    );
    if msg.side == Side::Left {
        header.push_str(&format!(" correctness {}", msg.correctness));
    }
    if let Some(title) = msg.title.as_deref().filter(|t| !t.is_empty()) {
        header.push_str(&format!(" [{title}]"));
    }
    println!("{header}");
    for line in msg.text.lines() {
        println!("  {:>width$} | {line}", "", width = SIDE_WIDTH);
    }
}

pub fn print_files(files: &[String]) {
    println!("Files");
    if files.is_empty() {
        println!("  No files available.");
    }
    for (i, name) in files.iter().enumerate() {
        println!("  {:>2}. {name}", i + 1);
    }
}

/// The page shown after `/abort`.
pub fn print_landing() {
    println!("This site can't be reached");
    println!();
    println!("localhost refused to connect.");
    println!("Try:");
    println!("  • Checking the connection");
    println!("  • Checking the proxy and the firewall");
    println!();
    println!("ERR_CONNECTION_REFUSED");
}

fn id_of(msg: &Message) -> String {
    match &msg.id {
        Some(id) => id.to_string(),
        None => "(local only)".to_string(),
    }
}
