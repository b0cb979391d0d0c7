//! Application state shared across all request handlers.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, Utc};
use dashmap::{DashMap, DashSet};

use crate::api::{Analytics, Session, Streak};
use crate::chat::{ChatMessage, MessageId, Role};

/// Longest title derived from a first message.
const TITLE_CHARS: usize = 60;

/// One session and its transcript.
#[derive(Clone, Debug)]
pub struct SessionRecord {
    /// Public metadata.
    pub session: Session,
    /// Messages in insertion order.
    pub messages: Vec<ChatMessage>,
}

/// Ids assigned to one stored exchange.
#[derive(Clone, Debug)]
pub struct StoredExchange {
    /// Id of the user message.
    pub user_id: MessageId,
    /// The assistant message as stored.
    pub reply: ChatMessage,
}

/// Shared application state. Lives only as long as the process.
#[derive(Debug, Default)]
pub struct AppState {
    sessions: DashMap<String, SessionRecord>,
    questions: AtomicU64,
    insights: AtomicU64,
    active_days: DashSet<NaiveDate>,
}

impl AppState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, empty session.
    pub fn create_session(&self) -> Session {
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            title: String::new(),
            updated_at: Utc::now(),
        };
        self.sessions.insert(
            session.id.clone(),
            SessionRecord {
                session: session.clone(),
                messages: Vec::new(),
            },
        );
        session
    }

    /// Sessions ordered by most recent activity.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .map(|entry| entry.session.clone())
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    /// Transcript of a session, if it exists.
    #[must_use]
    pub fn session_messages(&self, id: &str) -> Option<Vec<ChatMessage>> {
        self.sessions.get(id).map(|record| record.messages.clone())
    }

    /// Store a user message, its attachment note and the reply.
    ///
    /// Returns `None` if the session does not exist.
    pub fn record_exchange(
        &self,
        id: &str,
        content: &str,
        files: &[String],
        reply: String,
    ) -> Option<StoredExchange> {
        let mut record = self.sessions.get_mut(id)?;

        if !files.is_empty() {
            record.messages.push(ChatMessage::new(
                MessageId::from_server(uuid::Uuid::new_v4().to_string()),
                Role::System,
                format!("Attached {} file(s): {}", files.len(), files.join(", ")),
            ));
        }

        let user_id = MessageId::from_server(uuid::Uuid::new_v4().to_string());
        record
            .messages
            .push(ChatMessage::new(user_id.clone(), Role::User, content));

        let reply = ChatMessage::new(
            MessageId::from_server(uuid::Uuid::new_v4().to_string()),
            Role::Assistant,
            reply,
        );
        record.messages.push(reply.clone());

        if record.session.title.is_empty() {
            record.session.title = content.chars().take(TITLE_CHARS).collect();
        }
        record.session.updated_at = reply.created_at;
        self.active_days.insert(reply.created_at.date_naive());

        self.questions.fetch_add(1, Ordering::Relaxed);
        self.insights.fetch_add(1, Ordering::Relaxed);

        Some(StoredExchange { user_id, reply })
    }

    /// Count a question asked through the stateless chat endpoint.
    pub fn record_question(&self) {
        self.questions.fetch_add(1, Ordering::Relaxed);
    }

    /// Study streak as of today (UTC).
    #[must_use]
    pub fn streak(&self) -> Streak {
        let days: BTreeSet<NaiveDate> = self.active_days.iter().map(|day| *day).collect();
        streak_on(&days, Utc::now().date_naive())
    }

    /// Current counters.
    #[must_use]
    pub fn analytics(&self) -> Analytics {
        Analytics {
            sessions: self.sessions.len() as u64,
            questions: self.questions.load(Ordering::Relaxed),
            insights: self.insights.load(Ordering::Relaxed),
        }
    }
}

/// Streak over the days with session activity, seen from `today`.
///
/// The current run stays alive through `today` if the last active day was
/// yesterday.
#[must_use]
pub fn streak_on(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> Streak {
    let mut best = 0_u32;
    let mut run = 0_u32;
    let mut last: Option<NaiveDate> = None;

    for &day in days {
        run = match last {
            Some(prev) if prev.succ_opt() == Some(day) => run.saturating_add(1),
            _ => 1,
        };
        best = best.max(run);
        last = Some(day);
    }

    let current = match last {
        Some(day) if day == today || day.succ_opt() == Some(today) => run,
        _ => 0,
    };
    Streak { current, best }
}
