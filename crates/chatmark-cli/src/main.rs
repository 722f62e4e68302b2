mod chat;
mod display;
mod guard;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chatmark_core::{
    AnswerState, Command, CorrectnessPolicy, FileSelection, MessageId, Notice, Session,
    SessionConfig, Side, View,
};
use chatmark_sync::{ApiClient, DEFAULT_BASE_URL, Runner};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "chatmark", version, about = "Annotate a shared chat log and manage its files")]
struct Cli {
    /// Origin of the message/file store.
    #[arg(long, env = "CHATMARK_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Undo a correctness edit locally when the store rejects it.
    #[arg(long, env = "CHATMARK_ROLLBACK", global = true)]
    rollback_on_failure: bool,

    #[arg(long, env = "CHATMARK_LOG", default_value = "warn", global = true)]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Show the conversation
    Messages,
    /// Show messages scored 100
    Pins,
    /// Send a message
    Send {
        /// Side to send on: left (user) or right (bot)
        #[arg(long, default_value = "left")]
        side: Side,
        text: String,
    },
    /// Set the correctness score of a left-side message
    Score { id: String, value: String },
    /// Title a pinned, untitled message
    Title { id: String, title: String },
    /// Delete a message
    Delete { id: String },
    /// Ask the assistant about a right-side message, then approve or decline
    Ask {
        id: String,
        /// Approve without prompting
        #[arg(long)]
        yes: bool,
    },
    /// Manage shared files
    Files {
        #[command(subcommand)]
        action: FilesCmd,
    },
    /// Interactive chat session
    Chat,
}

#[derive(Subcommand)]
enum FilesCmd {
    List,
    Upload {
        path: PathBuf,
        /// Store the file under this name
        #[arg(long)]
        name: Option<String>,
    },
    Download {
        name: String,
        /// Output path (defaults to the file name)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    Delete { name: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("chatmark v{}", env!("CARGO_PKG_VERSION"));

    let config = SessionConfig {
        correctness_policy: if cli.rollback_on_failure {
            CorrectnessPolicy::Rollback
        } else {
            CorrectnessPolicy::Optimistic
        },
        ..SessionConfig::default()
    };
    let client = ApiClient::new(cli.base_url);
    let mut runner = Runner::new(Session::new(config), &client);

    match cli.command {
        Cmd::Chat => chat::run(&mut runner).await,
        command => run_once(&mut runner, command).await,
    }
}

/// Load the conversation and file list, then run a single subcommand.
async fn run_once(runner: &mut Runner<'_, ApiClient>, command: Cmd) -> anyhow::Result<()> {
    runner.dispatch(Command::Mount);
    runner.settle().await;

    match command {
        Cmd::Messages => display::print_conversation(runner.session()),
        Cmd::Pins => display::print_pins(runner.session()),
        Cmd::Send { side, text } => send(runner, side, text).await?,
        Cmd::Score { id, value } => {
            let id = MessageId::new(id);
            guard::check_scorable(runner.session(), &id)?;
            runner.dispatch(Command::SetCorrectness {
                id: id.clone(),
                raw: value,
            });
            runner.settle().await;
            let msg = runner
                .session()
                .message(&id)
                .with_context(|| format!("no message {id}"))?;
            println!("{id}: correctness {}", msg.correctness);
            println!();
            display::print_pins(runner.session());
        }
        Cmd::Title { id, title } => {
            let id = MessageId::new(id);
            guard::check_titleable(runner.session(), &id)?;
            runner.dispatch(Command::SetTitleInput(title));
            runner.dispatch(Command::SubmitTitle { id: id.clone() });
            runner.settle().await;
            if !runner.session().title_input().is_empty() {
                bail!("title for {id} was not saved");
            }
            display::print_pins(runner.session());
        }
        Cmd::Delete { id } => {
            let id = MessageId::new(id);
            runner.dispatch(Command::Delete { id: id.clone() });
            runner.settle().await;
            if runner.session().message(&id).is_some() {
                bail!("message {id} was not deleted");
            }
            println!("deleted {id}");
        }
        Cmd::Ask { id, yes } => ask(runner, MessageId::new(id), yes).await?,
        Cmd::Files { action } => files(runner, action).await?,
        Cmd::Chat => chat::run(runner).await?,
    }
    Ok(())
}

async fn send(runner: &mut Runner<'_, ApiClient>, side: Side, text: String) -> anyhow::Result<()> {
    if runner.session().side() != side {
        runner.dispatch(Command::ToggleSide);
    }
    runner.dispatch(Command::SetDraft(text));
    let notices = runner.dispatch(Command::Send);
    if notices.contains(&Notice::Navigate(View::Landing)) {
        display::print_landing();
        return Ok(());
    }
    if runner.is_idle() {
        bail!("nothing to send");
    }
    runner.settle().await;
    if !runner.session().draft().text.is_empty() {
        bail!("message was not saved");
    }
    if let Some(saved) = runner.session().messages().iter().last() {
        display::print_message(saved);
    }
    Ok(())
}

async fn ask(runner: &mut Runner<'_, ApiClient>, id: MessageId, yes: bool) -> anyhow::Result<()> {
    runner.dispatch(Command::AskAssistant { id: id.clone() });
    if runner.is_idle() {
        bail!("{id} is not a saved right-side message");
    }
    runner.settle().await;

    let answer = match runner.session().answer_state(&id) {
        AnswerState::Pending(answer) => answer.to_string(),
        AnswerState::None => bail!("assistant did not answer"),
    };
    println!("{answer}");

    let approve = yes || confirm("Approve this answer? [y/N] ").await?;
    if approve {
        runner.dispatch(Command::Approve { id });
        runner.settle().await;
        if runner.session().messages().unconfirmed_count() > 0 {
            bail!("answer approved but not saved");
        }
        println!("answer added to the conversation");
    } else {
        runner.dispatch(Command::Decline { id });
        println!("answer declined");
    }
    Ok(())
}

async fn confirm(prompt: &str) -> anyhow::Result<bool> {
    eprint!("{prompt}");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("reading answer")?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

async fn files(runner: &mut Runner<'_, ApiClient>, action: FilesCmd) -> anyhow::Result<()> {
    match action {
        FilesCmd::List => display::print_files(runner.session().files().files()),
        FilesCmd::Upload { path, name } => {
            let contents = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let source_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .with_context(|| format!("{} has no file name", path.display()))?;
            let mut selection = FileSelection::new(source_name, contents);
            if let Some(name) = name {
                selection = selection.with_name(name);
            }

            runner.dispatch(Command::SelectFile(Some(selection)));
            for notice in runner.dispatch(Command::Upload) {
                if let Notice::Alert(text) = notice {
                    bail!(text);
                }
            }
            runner.settle().await;
            if runner.session().files().selection().is_some() {
                bail!("upload failed");
            }
            display::print_files(runner.session().files().files());
        }
        FilesCmd::Download { name, out } => {
            runner.dispatch(Command::Download { name: name.clone() });
            let mut saved = false;
            for notice in runner.settle().await {
                if let Notice::Downloaded { contents, .. } = notice {
                    let path = out.clone().unwrap_or_else(|| default_download_path(&name));
                    tokio::fs::write(&path, &contents)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("saved {} ({} bytes)", path.display(), contents.len());
                    saved = true;
                }
            }
            if !saved {
                bail!("download of {name} failed");
            }
        }
        FilesCmd::Delete { name } => {
            runner.dispatch(Command::DeleteFile { name: name.clone() });
            runner.settle().await;
            if runner.session().files().files().contains(&name) {
                bail!("{name} was not deleted");
            }
            display::print_files(runner.session().files().files());
        }
    }
    Ok(())
}

fn default_download_path(name: &str) -> PathBuf {
    Path::new(name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("download"))
}
