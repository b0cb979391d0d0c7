//! Terminal chat client for the mock API.
//!
//! Run with: `cargo run --bin socratic [-- --new | --stateless]`
//!
//! Commands inside the prompt:
//! - `/attach <file>...` queue files and mention them in the next message
//! - `/upload` send queued files
//! - `/files` list uploaded items
//! - `/sessions` list sessions on the server
//! - `/quit` leave

use std::io::Write;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};

use socratic_mentor::api::{ApiClient, FileDescriptor};
use socratic_mentor::chat::{
    ChatEndpoint, ChatLog, ChatMessage, ChatTransport, Conversation, SendOutcome, SendRejected,
    SessionEndpoint,
};
use socratic_mentor::config::AppConfig;
use socratic_mentor::security::{Preferences, SafeStorage};
use socratic_mentor::start_socratic_mentor::init_tracing;
use socratic_mentor::uploads::{MaterialsBoard, UploadOutcome};

/// How the conversation is bound to the server.
enum Mode {
    /// Reuse the remembered session when it still exists.
    Resume,
    /// Always start a new session.
    New,
    /// Use the sessionless chat endpoint.
    Stateless,
}

enum Target {
    Stateless(ChatEndpoint),
    Session(SessionEndpoint),
}

impl Target {
    fn transport(&self) -> &dyn ChatTransport {
        match self {
            Self::Stateless(endpoint) => endpoint,
            Self::Session(endpoint) => endpoint,
        }
    }

    fn set_attachments(&mut self, names: Vec<String>) {
        if let Self::Session(endpoint) = self {
            endpoint.set_attachments(names);
        }
    }

    /// Whether attachment names travel with the next message.
    const fn carries_attachments(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}

/// Note attached files in the log, but only when the target sends them.
fn note_attachments(conversation: &mut Conversation, target: &mut Target, names: Vec<String>) -> bool {
    if !target.carries_attachments() {
        return false;
    }
    conversation.note_attachments(&names);
    target.set_attachments(names);
    true
}

fn parse_mode() -> Result<Mode> {
    let mut mode = Mode::Resume;
    for arg in std::env::args().skip(1) {
        mode = match arg.as_str() {
            "--new" => Mode::New,
            "--stateless" => Mode::Stateless,
            other => bail!("unknown argument: {other} (expected --new or --stateless)"),
        };
    }
    Ok(mode)
}

async fn open_session(api: &ApiClient, prefs: &Preferences, mode: &Mode) -> Result<(Conversation, Target)> {
    if matches!(mode, Mode::Stateless) {
        return Ok((
            Conversation::with_greeting(),
            Target::Stateless(ChatEndpoint::new(api.clone())),
        ));
    }

    if matches!(mode, Mode::Resume) {
        if let Some(id) = prefs.last_session() {
            match api.session_messages(&id).await {
                Ok(messages) => {
                    tracing::info!(session = %id, count = messages.len(), "resuming session");
                    let conversation = if messages.is_empty() {
                        Conversation::with_greeting()
                    } else {
                        Conversation::from_log(ChatLog::from_messages(messages))
                    };
                    return Ok((conversation, Target::Session(SessionEndpoint::new(api.clone(), id))));
                }
                Err(err) => {
                    tracing::info!(session = %id, error = %err, "remembered session unavailable");
                    prefs.clear_last_session();
                }
            }
        }
    }

    let session = api
        .create_session()
        .await
        .context("creating a chat session")?;
    prefs.set_last_session(&session.id);
    tracing::info!(session = %session.id, "session created");

    Ok((
        Conversation::with_greeting(),
        Target::Session(SessionEndpoint::new(api.clone(), session.id)),
    ))
}

fn parse_attachment(arg: &str) -> FileDescriptor {
    if let Some((name, size)) = arg.rsplit_once(':') {
        if let Ok(size) = size.parse() {
            return FileDescriptor::new(name, size);
        }
    }
    let size = std::fs::metadata(arg).map(|m| m.len()).unwrap_or(0);
    let name = std::path::Path::new(arg)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(arg);
    FileDescriptor::new(name, size)
}

fn print_messages(messages: &[ChatMessage]) {
    for message in messages {
        println!("[{}] {}", message.role, message.content);
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush().context("flushing stdout")
}

async fn attach(board: &MaterialsBoard, conversation: &mut Conversation, target: &mut Target, args: &str) {
    let files: Vec<FileDescriptor> = args.split_whitespace().map(parse_attachment).collect();
    let mut names = Vec::with_capacity(files.len());
    for file in &files {
        if board.accepts(&file.name).await {
            names.push(file.name.clone());
        }
    }

    match board.select(files).await {
        Ok(count) => {
            println!("{count} file(s) queued; /upload to send them");
            if !note_attachments(conversation, target, names) {
                println!("Stateless mode: file names are not sent with messages.");
            }
        }
        Err(err) => println!("{err}"),
    }
}

async fn upload(board: &MaterialsBoard, api: &ApiClient) {
    match board.upload(api).await {
        Ok(UploadOutcome::Accepted { received, .. }) => {
            println!("Server received {received} file(s).");
        }
        Ok(UploadOutcome::Failed(_)) => {}
        Err(err) => println!("{err}"),
    }
    if let Some(status) = board.status_message().await {
        println!("{status}");
    }
}

async fn list_files(board: &MaterialsBoard) {
    let items = board.items().await;
    if items.is_empty() {
        println!("No uploaded items.");
    }
    for item in items {
        println!("{} ({} KB) {:?}", item.name, item.size_kb(), item.status);
    }
}

async fn list_sessions(api: &ApiClient) {
    match api.list_sessions().await {
        Ok(sessions) if sessions.is_empty() => println!("No sessions yet."),
        Ok(sessions) => {
            for session in sessions {
                let title = if session.title.is_empty() { "Untitled" } else { session.title.as_str() };
                println!("{}  {}  (updated {})", session.id, title, session.updated_at.to_rfc2822());
            }
        }
        Err(err) => println!("{}", err.user_message()),
    }
    if let Ok(streak) = api.streak().await {
        println!("Streak: {} (best {})", streak.current, streak.best);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("loading configuration")?;
    let mode = parse_mode()?;
    let api = ApiClient::new(&config.client).context("building API client")?;
    let prefs = Preferences::new(SafeStorage::file(&config.storage.path));
    let board = MaterialsBoard::new(&config.uploads);

    if let Err(err) = api.health().await {
        eprintln!("warning: {} ({err})", err.user_message());
    }

    let (mut conversation, mut target) = open_session(&api, &prefs, &mode).await?;
    print_messages(conversation.log().as_slice());
    let mut shown = conversation.log().len();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        match line {
            "/quit" | "/exit" => break,
            "/upload" => upload(&board, &api).await,
            "/files" => list_files(&board).await,
            "/sessions" => list_sessions(&api).await,
            _ if line.starts_with("/attach") => {
                let args = line.trim_start_matches("/attach");
                attach(&board, &mut conversation, &mut target, args).await;
            }
            _ => match conversation.send(target.transport(), line).await {
                Ok(SendOutcome::Delivered) => target.set_attachments(Vec::new()),
                Ok(SendOutcome::Failed(err)) => tracing::debug!(error = %err, "send failed"),
                Err(SendRejected::Empty) => {}
                Err(SendRejected::Busy) => println!("Still sending, please wait."),
            },
        }

        print_messages(conversation.log().since(shown));
        shown = conversation.log().len();
        if conversation.reflection_unlocked() {
            tracing::debug!("reflection prompts available");
        }
        prompt()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use socratic_mentor::config::ClientConfig;

    use super::*;

    fn offline_api() -> ApiClient {
        ApiClient::new(&ClientConfig::default()).unwrap()
    }

    #[test]
    fn test_stateless_target_gets_no_attachment_note() {
        let mut conversation = Conversation::new();
        let mut target = Target::Stateless(ChatEndpoint::new(offline_api()));

        assert!(!note_attachments(&mut conversation, &mut target, vec!["a.pdf".to_string()]));
        assert!(conversation.log().is_empty());
    }

    #[test]
    fn test_session_target_notes_and_carries_attachments() {
        let mut conversation = Conversation::new();
        let mut target = Target::Session(SessionEndpoint::new(offline_api(), "s1"));

        assert!(note_attachments(&mut conversation, &mut target, vec!["a.pdf".to_string()]));
        assert_eq!(conversation.log().len(), 1);
        assert_eq!(
            conversation.log().as_slice()[0].content,
            "Attached 1 file(s): a.pdf"
        );
    }
}
