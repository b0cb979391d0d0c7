//! Optimistic send/reconcile over a [`ChatLog`].

use thiserror::Error;
use tracing::debug;

use crate::api::{GENERIC_FAILURE_MESSAGE, RequestFailed};
use crate::security::sanitize_input;

use super::message::{ChatLog, ChatMessage, MessageId, Role};
use super::transport::{ChatTransport, TransportReply};

/// First assistant line of a fresh conversation.
pub const GREETING: &str = "Hello! Ask a question about your uploaded materials.";

/// Assistant replies needed before the reflection panel is offered.
pub const REFLECTION_THRESHOLD: usize = 5;

/// Why a send was refused before touching state.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SendRejected {
    /// Nothing left after sanitizing and trimming.
    #[error("message is empty")]
    Empty,
    /// Another send has not completed yet.
    #[error("a message is already being sent")]
    Busy,
}

/// How a completed send ended.
#[derive(Debug)]
pub enum SendOutcome {
    /// The reply was appended.
    Delivered,
    /// A synthetic error entry was appended instead.
    Failed(RequestFailed),
}

impl SendOutcome {
    /// Whether the server answered.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// A send that has been applied optimistically and awaits its reply.
#[derive(Debug)]
#[must_use = "pass the pending send to Conversation::complete_send"]
pub struct PendingSend {
    provisional: MessageId,
    text: String,
}

impl PendingSend {
    /// The cleaned text to transmit.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Id of the optimistic user entry.
    #[must_use]
    pub const fn provisional_id(&self) -> &MessageId {
        &self.provisional
    }
}

/// One conversation panel: the log plus the composer's busy flag.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    log: ChatLog,
    busy: bool,
}

impl Conversation {
    /// Empty conversation.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            log: ChatLog::new(),
            busy: false,
        }
    }

    /// Conversation opened with the tutor greeting.
    #[must_use]
    pub fn with_greeting() -> Self {
        let mut conversation = Self::new();
        conversation.log.push(ChatMessage::new(
            MessageId::assistant(),
            Role::Assistant,
            GREETING,
        ));
        conversation
    }

    /// Conversation resumed from a fetched transcript.
    #[must_use]
    pub const fn from_log(log: ChatLog) -> Self {
        Self { log, busy: false }
    }

    /// Messages so far.
    #[must_use]
    pub const fn log(&self) -> &ChatLog {
        &self.log
    }

    /// Whether a send is outstanding.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.busy
    }

    /// Whether enough replies have accumulated to offer reflection prompts.
    #[must_use]
    pub fn reflection_unlocked(&self) -> bool {
        self.log.assistant_replies() >= REFLECTION_THRESHOLD
    }

    /// Add a system note listing attached files. No-op for an empty list.
    pub fn note_attachments(&mut self, names: &[String]) -> Option<&ChatMessage> {
        if names.is_empty() {
            return None;
        }
        let content = format!("Attached {} file(s): {}", names.len(), names.join(", "));
        self.log
            .push(ChatMessage::new(MessageId::system(), Role::System, content));
        self.log.last()
    }

    /// Apply the optimistic half of a send.
    ///
    /// # Errors
    /// Returns [`SendRejected`] without changing state when the cleaned text
    /// is empty or a send is already outstanding.
    pub fn begin_send(&mut self, raw: &str) -> Result<PendingSend, SendRejected> {
        let text = sanitize_input(raw).trim().to_string();
        if text.is_empty() {
            return Err(SendRejected::Empty);
        }
        if self.busy {
            return Err(SendRejected::Busy);
        }

        let provisional = MessageId::provisional();
        self.log.push(ChatMessage::new(
            provisional.clone(),
            Role::User,
            text.clone(),
        ));
        self.busy = true;
        debug!(id = %provisional, "optimistic user entry appended");

        Ok(PendingSend { provisional, text })
    }

    /// Reconcile a send with its result and release the busy flag.
    pub fn complete_send(
        &mut self,
        pending: PendingSend,
        result: Result<TransportReply, RequestFailed>,
    ) -> SendOutcome {
        self.busy = false;

        match result {
            Ok(reply) => {
                if let Some(confirmed) = reply.user_message_id {
                    self.log
                        .replace_id(&pending.provisional, MessageId::from_server(confirmed));
                }
                let id = reply
                    .message_id
                    .map_or_else(MessageId::assistant, MessageId::from_server);
                let mut message = ChatMessage::new(id, Role::Assistant, reply.content);
                if let Some(created_at) = reply.created_at {
                    message.created_at = created_at;
                }
                self.log.push(message);
                SendOutcome::Delivered
            }
            Err(err) => {
                debug!(id = %pending.provisional, error = %err, "send failed, appending error entry");
                self.log.push(ChatMessage::new(
                    MessageId::error(),
                    Role::Assistant,
                    GENERIC_FAILURE_MESSAGE,
                ));
                SendOutcome::Failed(err)
            }
        }
    }

    /// Run a full send: optimistic entry, one request, reconciliation.
    ///
    /// # Errors
    /// Returns [`SendRejected`] when nothing was sent.
    pub async fn send<T>(&mut self, transport: &T, raw: &str) -> Result<SendOutcome, SendRejected>
    where
        T: ChatTransport + ?Sized,
    {
        let pending = self.begin_send(raw)?;
        let result = transport.exchange(pending.text()).await;
        Ok(self.complete_send(pending, result))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::api::FailureKind;

    struct ScriptedTransport {
        reply: Option<TransportReply>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn answering(reply: TransportReply) -> Self {
            Self {
                reply: Some(reply),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn exchange(&self, _text: &str) -> Result<TransportReply, RequestFailed> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .ok_or_else(|| RequestFailed::http("/api/chat", 500, "boom".to_string()))
        }
    }

    #[tokio::test]
    async fn test_successful_send_appends_user_then_assistant() {
        let transport = ScriptedTransport::answering(TransportReply::text("Think about disorder."));
        let mut conversation = Conversation::with_greeting();
        let before = conversation.log().len();

        let outcome = conversation.send(&transport, "What is entropy?").await.unwrap();

        assert!(outcome.is_delivered());
        let added = conversation.log().since(before);
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].role, Role::User);
        assert_eq!(added[0].content, "What is entropy?");
        assert_eq!(added[1].role, Role::Assistant);
        assert_eq!(added[1].content, "Think about disorder.");
        assert!(!conversation.is_busy());
    }

    #[tokio::test]
    async fn test_failed_send_appends_error_entry() {
        let transport = ScriptedTransport::failing();
        let mut conversation = Conversation::new();

        let outcome = conversation.send(&transport, "hello").await.unwrap();

        match outcome {
            SendOutcome::Failed(err) => assert_eq!(err.kind, FailureKind::Http),
            SendOutcome::Delivered => panic!("expected failure"),
        }
        let log = conversation.log().as_slice();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, Role::User);
        assert_eq!(log[1].content, GENERIC_FAILURE_MESSAGE);
        assert!(log[1].id.is_error());
        assert!(!conversation.is_busy());
    }

    #[tokio::test]
    async fn test_blank_message_changes_nothing_and_sends_nothing() {
        let transport = ScriptedTransport::answering(TransportReply::text("unused"));
        let mut conversation = Conversation::with_greeting();
        let before = conversation.log().clone();

        for raw in ["", "   ", "\n\t", "<b></b>"] {
            let err = conversation.send(&transport, raw).await.unwrap_err();
            assert_eq!(err, SendRejected::Empty);
        }

        assert_eq!(conversation.log(), &before);
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_busy_composer_rejects_second_send() {
        let mut conversation = Conversation::new();
        let pending = conversation.begin_send("first").unwrap();
        assert!(conversation.is_busy());

        assert_eq!(conversation.begin_send("second").unwrap_err(), SendRejected::Busy);
        assert_eq!(conversation.log().len(), 1);

        let outcome = conversation.complete_send(pending, Ok(TransportReply::text("reply")));
        assert!(outcome.is_delivered());
        assert_eq!(conversation.log().len(), 2);
        assert!(conversation.begin_send("third").is_ok());
    }

    #[test]
    fn test_server_ids_replace_provisional_id() {
        let mut conversation = Conversation::new();
        let pending = conversation.begin_send("  why?  ").unwrap();
        assert_eq!(pending.text(), "why?");
        assert!(pending.provisional_id().is_provisional());

        let stamp = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let reply = TransportReply {
            content: "Because.".to_string(),
            message_id: Some("srv-assistant".to_string()),
            user_message_id: Some("srv-user".to_string()),
            created_at: Some(stamp),
        };
        let _ = conversation.complete_send(pending, Ok(reply));

        let log = conversation.log().as_slice();
        assert_eq!(log[0].id.as_str(), "srv-user");
        assert_eq!(log[0].content, "why?");
        assert_eq!(log[1].id.as_str(), "srv-assistant");
        assert_eq!(log[1].created_at, stamp);
    }

    #[test]
    fn test_attachment_note_and_reflection_threshold() {
        let mut conversation = Conversation::with_greeting();
        assert!(conversation.note_attachments(&[]).is_none());

        let note = conversation
            .note_attachments(&["a.pdf".to_string(), "b.pptx".to_string()])
            .unwrap();
        assert_eq!(note.role, Role::System);
        assert_eq!(note.content, "Attached 2 file(s): a.pdf, b.pptx");

        assert!(!conversation.reflection_unlocked());
        for i in 0..REFLECTION_THRESHOLD {
            let pending = conversation.begin_send(&format!("q{i}")).unwrap();
            let _ = conversation.complete_send(pending, Ok(TransportReply::text("a")));
        }
        assert!(conversation.reflection_unlocked());
    }
}
