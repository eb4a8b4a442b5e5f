//! Interactive shell over a [`RemovalSession`]
//!
//! A thin adapter: each command maps onto one session transition, and session
//! events are printed after every command.

use super::main_impl::{create_spinner, present_events};
use crate::{
    session::{RemovalSession, SessionEvent, SessionState, SessionStatus},
    FilePicker, RemovalConfig, RemoveBgClient,
};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Open(PathBuf),
    Submit,
    Save(Option<PathBuf>),
    Status,
    Help,
    Quit,
    Empty,
}

fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "" => Ok(Command::Empty),
        "open" | "select" => {
            if rest.is_empty() {
                Err("Usage: open <path>".to_string())
            } else {
                Ok(Command::Open(PathBuf::from(rest)))
            }
        },
        "submit" | "remove" => Ok(Command::Submit),
        "save" | "download" => Ok(Command::Save(
            (!rest.is_empty()).then(|| PathBuf::from(rest)),
        )),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command '{}'. Type 'help' for commands.", other)),
    }
}

/// User-facing text for a session event
pub(crate) fn describe_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::FileSelected {
            file_name,
            mime,
            preview,
        } => format!("📁 Selected {} ({}) preview: {}", file_name, mime, preview),
        SessionEvent::SubmitStarted { file_name } => {
            format!("🚀 Uploading {}", file_name)
        },
        SessionEvent::ResultReady {
            file_name,
            result,
            download_file_name,
        } => format!(
            "✅ Background removed from {} result: {} (download as {})",
            file_name, result, download_file_name
        ),
        SessionEvent::RemovalFailed { message } => format!("❌ {}", message),
    }
}

/// Why submitting is currently disabled, if it is
fn submit_blocker(session: &RemovalSession) -> Option<&'static str> {
    if session.selected().is_none() {
        Some("select a file first with 'open <path>'")
    } else if session.status() == SessionStatus::AwaitingResponse {
        Some("a request is already outstanding")
    } else {
        None
    }
}

fn print_help() {
    println!("Commands:");
    println!("  open <path>   Select an image file");
    println!("  submit        Remove the background of the selected image");
    println!("  save [path]   Download the result (default: ./<download file name>)");
    println!("  status        Show the session state");
    println!("  help          Show this help");
    println!("  quit          Leave the shell");
}

fn print_status(session: &RemovalSession) {
    let state = session.state();
    println!("State: {}", state.description());
    if let Some(selected) = session.selected() {
        println!(
            "  └─ File: {} ({}, {} bytes)",
            selected.file_name(),
            selected.mime(),
            selected.blob().len()
        );
    }
    if let Some(result) = session.result() {
        let meta = result.metadata();
        println!(
            "  └─ Result: {} bytes in {}ms, download as {}",
            meta.result_bytes,
            meta.request_duration_ms,
            result.download_file_name()
        );
    }
    let submit = match submit_blocker(session) {
        None => "enabled".to_string(),
        Some(reason) => format!("disabled ({})", reason),
    };
    println!("  └─ Submit: {}", submit);
    if state == SessionState::ReadyWithResult {
        println!("💡 Use 'save' to download the result");
    }
}

/// Run the shell until `quit` or end of input
pub(crate) async fn run(config: &RemovalConfig, client: &RemoveBgClient) -> Result<()> {
    let (mut session, mut events) = RemovalSession::new(config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("🖼️  Background removal shell. Type 'help' for commands.");

    loop {
        print!("bgremove> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read command")?
        else {
            break;
        };

        match parse_command(&line) {
            Ok(Command::Open(path)) => match FilePicker::pick_path(&path) {
                Ok(picked) => {
                    session.select_file(picked);
                },
                Err(e) => println!("❌ {}", e.user_message()),
            },
            Ok(Command::Submit) => {
                if let Some(reason) = submit_blocker(&session) {
                    println!("⚠️  Submit is disabled: {}", reason);
                } else {
                    let spinner = create_spinner("Removing background...".to_string());
                    let outcome = session.remove_background(client).await;
                    spinner.finish_and_clear();
                    if let Err(e) = outcome {
                        println!("⚠️  {}", e.user_message());
                    }
                }
            },
            Ok(Command::Save(path)) => {
                let saved = match (&path, session.result()) {
                    (_, None) => Err("nothing to save yet, run 'submit' first".to_string()),
                    (Some(path), Some(result)) => result
                        .save_as(path)
                        .map(|()| path.clone())
                        .map_err(|e| e.user_message()),
                    (None, Some(_)) => session.download_result(".").map_err(|e| e.user_message()),
                };
                match saved {
                    Ok(path) => println!("💾 Saved {}", path.display()),
                    Err(message) => println!("❌ {}", message),
                }
            },
            Ok(Command::Status) => print_status(&session),
            Ok(Command::Help) => print_help(),
            Ok(Command::Quit) => break,
            Ok(Command::Empty) => {},
            Err(message) => println!("{}", message),
        }

        present_events(&mut events);
    }

    Ok(())
}
