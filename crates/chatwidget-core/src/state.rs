//! UI-agnostic conversation state
//!
//! The store keeps two sequences side by side: the transcript that is sent to
//! the completion endpoint, and the chat bubbles shown to the user. They are
//! related but not equal. The welcome text and local error bubbles only ever
//! appear on the display side.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// One turn of the transcript sent to the completion endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Who a chat bubble belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A chat bubble as the presentation layer sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Local>,
}

impl DisplayMessage {
    /// Two-digit hour and minute, the label shown under each bubble
    pub fn format_time(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// Owns the transcript, the display messages and the id counter.
///
/// Both sequences are append-only. Reads hand out borrowed slices so callers
/// cannot edit history in place.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    transcript: Vec<ChatTurn>,
    messages: Vec<DisplayMessage>,
    next_id: u64,
}

impl ConversationStore {
    /// Seed a fresh conversation: the system turn in the transcript and the
    /// welcome bubble on screen.
    pub fn initialize(system_prompt: &str, welcome_text: &str) -> Self {
        let mut store = Self {
            transcript: vec![ChatTurn::system(system_prompt)],
            messages: Vec::new(),
            next_id: 0,
        };
        store.push_message(welcome_text, Sender::Bot);
        store
    }

    pub fn append_user_turn(&mut self, text: &str) -> Result<DisplayMessage> {
        if text.trim().is_empty() {
            return Err(ChatError::Validation);
        }
        self.transcript.push(ChatTurn::user(text));
        Ok(self.push_message(text, Sender::User))
    }

    pub fn append_assistant_turn(&mut self, text: &str) -> DisplayMessage {
        self.transcript.push(ChatTurn::assistant(text));
        self.push_message(text, Sender::Bot)
    }

    /// Show a bot bubble without recording it in the transcript. Used for
    /// locally generated error text the model never produced.
    pub fn append_transient_bot_message(&mut self, text: &str) -> DisplayMessage {
        self.push_message(text, Sender::Bot)
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    /// Owned copy of the transcript, for handing to a request task
    pub fn snapshot_transcript(&self) -> Vec<ChatTurn> {
        self.transcript.clone()
    }

    pub fn snapshot_messages(&self) -> Vec<DisplayMessage> {
        self.messages.clone()
    }

    fn push_message(&mut self, text: &str, sender: Sender) -> DisplayMessage {
        let message = DisplayMessage {
            id: self.next_id,
            text: text.to_string(),
            sender,
            timestamp: Local::now(),
        };
        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConversationStore {
        ConversationStore::initialize("be brief", "Hi!")
    }

    #[test]
    fn test_initialize_keeps_welcome_out_of_transcript() {
        let store = store();
        assert_eq!(store.transcript(), &[ChatTurn::system("be brief")]);
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].text, "Hi!");
        assert_eq!(store.messages()[0].sender, Sender::Bot);
        assert_eq!(store.messages()[0].id, 0);
    }

    #[test]
    fn test_append_user_turn_updates_both_sequences() {
        let mut store = store();
        let msg = store.append_user_turn("hello").unwrap();
        assert_eq!(msg.id, 1);
        assert_eq!(msg.sender, Sender::User);
        assert_eq!(store.transcript().last(), Some(&ChatTurn::user("hello")));
        assert_eq!(store.messages().last(), Some(&msg));
    }

    #[test]
    fn test_append_user_turn_rejects_blank() {
        let mut store = store();
        assert!(matches!(
            store.append_user_turn(" \t\n"),
            Err(ChatError::Validation)
        ));
        assert_eq!(store.transcript().len(), 1);
        assert_eq!(store.messages().len(), 1);

        // A rejected call must not burn an id
        let msg = store.append_user_turn("ok").unwrap();
        assert_eq!(msg.id, 1);
    }

    #[test]
    fn test_append_assistant_turn() {
        let mut store = store();
        store.append_user_turn("q").unwrap();
        let msg = store.append_assistant_turn("a");
        assert_eq!(msg.sender, Sender::Bot);
        assert_eq!(
            store.transcript(),
            &[
                ChatTurn::system("be brief"),
                ChatTurn::user("q"),
                ChatTurn::assistant("a"),
            ]
        );
    }

    #[test]
    fn test_transient_message_skips_transcript() {
        let mut store = store();
        store.append_user_turn("q").unwrap();
        let msg = store.append_transient_bot_message("oops");
        assert_eq!(msg.id, 2);
        assert_eq!(store.transcript().len(), 2);
        assert_eq!(store.messages().len(), 3);
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut store = store();
        store.append_user_turn("a").unwrap();
        store.append_assistant_turn("b");
        store.append_transient_bot_message("c");
        store.append_user_turn("d").unwrap();
        let ids: Vec<u64> = store.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = store();
        let snapshot = store.snapshot_transcript();
        store.append_user_turn("later").unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.snapshot_messages().len(), 2);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatTurn::assistant("x")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"x"}"#);
    }

    #[test]
    fn test_format_time_is_hour_minute() {
        let store = store();
        let label = store.messages()[0].format_time();
        assert_eq!(label.len(), 5);
        assert_eq!(&label[2..3], ":");
    }
}
