//! Interactive chat loop.
//!
//! Plain lines are sent as messages. A line ending in `\` continues the draft
//! on a new line. Lines starting with `:` are annotation commands.

use std::path::Path;

use anyhow::Context;
use chatmark_core::{Command, MessageId, Notice, View};
use chatmark_sync::{Runner, Transport};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{display, guard};

const HELP: &str = "\
commands:
  :side                    toggle the compose side (left/right)
  :send                    resend the current draft (after a failed send)
  :score <id> <value>      set correctness on a left message; 100 pins it
  :title <id> <title...>   title a pinned, untitled message
  :delete <id>             delete a message
  :ask <id>                ask the assistant about a right-side message
  :yes <id> / :no <id>     approve or decline a pending answer
  :list  :pins  :files     show the conversation, pins, or files
  :quit
end a line with \\ to continue the message on the next line";

enum Flow {
    Continue,
    Quit,
}

pub async fn run<T: Transport>(runner: &mut Runner<'_, T>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    runner.dispatch(Command::Mount);
    runner.settle().await;
    display::print_conversation(runner.session());
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if let Flow::Quit = handle_line(runner, &line) {
                    break;
                }
            }
            Some(notices) = runner.next(), if !runner.is_idle() => {
                if let Flow::Quit = show_notices(notices).await? {
                    break;
                }
                if runner.is_idle() {
                    display::print_conversation(runner.session());
                }
            }
        }
    }
    Ok(())
}

fn handle_line<T: Transport>(runner: &mut Runner<'_, T>, line: &str) -> Flow {
    let Some(rest) = line.strip_prefix(':') else {
        return compose(runner, line);
    };

    let mut parts = rest.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let id = parts.next().map(MessageId::from);

    let notices = match (verb, id) {
        ("side", _) => {
            runner.dispatch(Command::ToggleSide);
            println!("composing on the {} side", runner.session().side());
            Vec::new()
        }
        ("send", _) => runner.dispatch(Command::Send),
        ("score", Some(id)) => match guard::check_scorable(runner.session(), &id) {
            Ok(()) => {
                let raw = parts.next().unwrap_or_default().to_string();
                runner.dispatch(Command::SetCorrectness { id, raw })
            }
            Err(e) => refuse(e),
        },
        ("title", Some(id)) => match guard::check_titleable(runner.session(), &id) {
            Ok(()) => {
                let title = parts.collect::<Vec<_>>().join(" ");
                runner.dispatch(Command::SetTitleInput(title));
                runner.dispatch(Command::SubmitTitle { id })
            }
            Err(e) => refuse(e),
        },
        ("delete", Some(id)) => runner.dispatch(Command::Delete { id }),
        ("ask", Some(id)) => runner.dispatch(Command::AskAssistant { id }),
        ("yes", Some(id)) => runner.dispatch(Command::Approve { id }),
        ("no", Some(id)) => runner.dispatch(Command::Decline { id }),
        ("list", _) => {
            display::print_conversation(runner.session());
            Vec::new()
        }
        ("pins", _) => {
            display::print_pins(runner.session());
            Vec::new()
        }
        ("files", _) => {
            display::print_files(runner.session().files().files());
            Vec::new()
        }
        ("quit" | "q", _) => return Flow::Quit,
        _ => {
            println!("{HELP}");
            Vec::new()
        }
    };
    print_alerts(&notices)
}

fn refuse(e: anyhow::Error) -> Vec<Notice> {
    println!("! {e}");
    Vec::new()
}

fn compose<T: Transport>(runner: &mut Runner<'_, T>, line: &str) -> Flow {
    // Only a continued draft (ending in a newline) is extended.
    let mut draft = runner.session().draft().text.clone();
    if !draft.ends_with('\n') {
        draft.clear();
    }
    if let Some(partial) = line.strip_suffix('\\') {
        draft.push_str(partial);
        runner.dispatch(Command::SetDraft(draft));
        runner.dispatch(Command::Enter { shift: true });
        return Flow::Continue;
    }

    draft.push_str(line);
    runner.dispatch(Command::SetDraft(draft));
    let notices = runner.dispatch(Command::Enter { shift: false });
    print_alerts(&notices)
}

/// Handle notices raised synchronously by a command.
fn print_alerts(notices: &[Notice]) -> Flow {
    for notice in notices {
        match notice {
            Notice::Navigate(View::Landing) => {
                display::print_landing();
                return Flow::Quit;
            }
            Notice::Alert(text) => println!("! {text}"),
            Notice::Downloaded { name, .. } => println!("downloaded {name}"),
        }
    }
    Flow::Continue
}

/// Handle notices raised by completions; downloads land in the working directory.
async fn show_notices(notices: Vec<Notice>) -> anyhow::Result<Flow> {
    for notice in &notices {
        if let Notice::Downloaded { name, contents } = notice {
            let path = Path::new(name)
                .file_name()
                .map(Path::new)
                .unwrap_or(Path::new("download"));
            tokio::fs::write(path, contents)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
        }
    }
    Ok(print_alerts(&notices))
}
