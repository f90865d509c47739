//! iichat - streaming chat client for an SSE chat backend
//!
//! A conversation engine (request shaping, cancellable SSE consumption,
//! pure history reduction) behind a small terminal front end.

mod config;
mod error;
mod models;
mod reducer;
mod request;
mod session;
mod store;
mod stream;
#[cfg(test)]
mod testing;
mod transport;
mod types;

use config::Config;
use models::ModelCatalog;
use request::TurnInput;
use session::ChatSession;
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::HttpTransport;
use types::{AttachmentBytes, Message, Role};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stderr so log lines don't interleave with replies
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("IICHAT_LOG")
                .unwrap_or_else(|_| "iichat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Configuration
    let config = Config::from_env();
    let transport = Arc::new(HttpTransport::new(config.api_url.clone()));

    let catalog = match ModelCatalog::fetch(transport.as_ref(), config.default_model.clone()).await
    {
        Ok(catalog) => catalog,
        Err(error) => {
            tracing::warn!(error = %error, "model catalog unavailable, continuing without it");
            ModelCatalog::new(Vec::new(), config.default_model.clone())
        }
    };

    let conversation_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(api_url = %config.api_url, conv_id = %conversation_id, "starting session");
    let session = ChatSession::new(transport, conversation_id, catalog.clone());

    run_repl(&session, &catalog).await;
    Ok(())
}

async fn run_repl(session: &ChatSession, catalog: &ModelCatalog) {
    println!("iichat. /search toggles web search, /attach <path> attaches a file,");
    println!("/model <id> picks a model, /stop cancels a reply, /quit exits.");

    let (line_tx, mut line_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if line_tx.send(line.trim_end().to_string()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut history = session.history();
    let mut notices = session.notices();
    let mut loading = session.loading();

    let mut turn = TurnState::default();
    let mut renderer = Renderer::default();

    prompt();
    loop {
        tokio::select! {
            line = line_rx.recv() => {
                let Some(line) = line else { break };
                if handle_line(session, catalog, &mut turn, &line).is_break() {
                    break;
                }
            }
            changed = history.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = history.borrow_and_update().clone();
                renderer.render(&snapshot);
            }
            changed = loading.changed() => {
                if changed.is_err() {
                    break;
                }
                if !*loading.borrow_and_update() {
                    if let Some(notice) = notices.borrow_and_update().clone() {
                        println!("\n[error] {notice}");
                    } else {
                        println!();
                    }
                    prompt();
                }
            }
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Per-turn input settings accumulated from commands
#[derive(Default)]
struct TurnState {
    search_internet: bool,
    model: Option<String>,
    attachment: Option<AttachmentBytes>,
}

fn handle_line(
    session: &ChatSession,
    catalog: &ModelCatalog,
    turn: &mut TurnState,
    line: &str,
) -> std::ops::ControlFlow<()> {
    match parse_command(line) {
        Command::Quit => return std::ops::ControlFlow::Break(()),
        Command::Stop => {
            session.stop();
            prompt();
        }
        Command::ToggleSearch => {
            turn.search_internet = !turn.search_internet;
            println!(
                "web search {}",
                if turn.search_internet { "on" } else { "off" }
            );
            prompt();
        }
        Command::Model(id) => {
            turn.model = Some(id);
            prompt();
        }
        Command::Models => {
            for id in catalog.available() {
                println!("{id}");
            }
            prompt();
        }
        Command::Attach(path) => {
            match AttachmentBytes::from_path(std::path::Path::new(&path)) {
                Ok(bytes) => {
                    println!(
                        "attached {} ({} bytes)",
                        bytes.metadata.file_name, bytes.metadata.file_size
                    );
                    turn.attachment = Some(bytes);
                }
                Err(error) => println!("could not read {path}: {error}"),
            }
            prompt();
        }
        Command::Empty => prompt(),
        Command::Say(text) => {
            let input = TurnInput {
                text,
                attachment: turn.attachment.take(),
                search_internet: turn.search_internet,
                model: turn.model.clone(),
            };
            if let Err(error) = session.send(input) {
                println!("{error}");
                prompt();
            }
        }
    }
    std::ops::ControlFlow::Continue(())
}

enum Command {
    Say(String),
    ToggleSearch,
    Attach(String),
    Model(String),
    Models,
    Stop,
    Quit,
    Empty,
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }
    match trimmed.split_once(char::is_whitespace) {
        Some(("/attach", path)) => Command::Attach(path.trim().to_string()),
        Some(("/model", id)) => Command::Model(id.trim().to_string()),
        None if trimmed == "/search" => Command::ToggleSearch,
        None if trimmed == "/models" => Command::Models,
        None if trimmed == "/stop" => Command::Stop,
        None if trimmed == "/quit" => Command::Quit,
        _ => Command::Say(line.to_string()),
    }
}

/// Prints assistant text incrementally as history snapshots evolve.
#[derive(Default)]
struct Renderer {
    rendered_entries: usize,
    rendered_tail_bytes: usize,
}

impl Renderer {
    fn render(&mut self, snapshot: &[Message]) {
        // a new entry resets the tail cursor
        if snapshot.len() != self.rendered_entries {
            self.rendered_entries = snapshot.len();
            self.rendered_tail_bytes = 0;
            if let Some(last) = snapshot.last() {
                if last.role == Role::Assistant {
                    if let Some(sources) = &last.search_sources {
                        for source in sources {
                            println!("[source] {} <{}>", source.title, source.link);
                        }
                    }
                }
            }
        }
        let Some(last) = snapshot.last() else { return };
        if last.role != Role::Assistant {
            return;
        }
        if let Some(suffix) = last.content.get(self.rendered_tail_bytes..) {
            if !suffix.is_empty() {
                print!("{suffix}");
                let _ = std::io::stdout().flush();
                self.rendered_tail_bytes = last.content.len();
            }
        }
    }
}
