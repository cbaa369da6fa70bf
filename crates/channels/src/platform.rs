use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    tokio::sync::mpsc,
};

use crate::Result;

// ── Directory listings ──────────────────────────────────────────────────────

/// A workspace member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// A public channel or a private group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub name: String,
}

/// A direct conversation with a single peer user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectConversation {
    pub id: String,
    /// Peer user id. Never another conversation id.
    pub user: String,
}

/// Which history query applies to a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Channel,
    Group,
    Direct,
}

impl ConversationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Group => "group",
            Self::Direct => "direct",
        }
    }
}

impl std::fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Messages ────────────────────────────────────────────────────────────────

/// A message-created event delivered by the live event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Conversation the message was posted in. Required downstream.
    pub channel: Option<String>,
    pub user: Option<String>,
    /// Platform-native timestamp as delivered.
    pub ts: String,
    #[serde(default)]
    pub text: String,
}

/// A message returned by a history query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub ts: DateTime<Utc>,
    pub user: Option<String>,
    pub text: String,
}

/// Identity confirmed by a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub team: Option<String>,
}

/// Receiver end of the inbound message queue.
pub type EventReceiver = mpsc::Receiver<MessageEvent>;

/// Sender end of the inbound message queue.
pub type EventSender = mpsc::Sender<MessageEvent>;

// ── Platform boundary ───────────────────────────────────────────────────────

/// Connection to a real-time chat platform.
///
/// Every request/response operation maps a platform `ok: false` reply to
/// [`crate::Error::NotOk`].
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Platform identifier (e.g. "slack").
    fn id(&self) -> &str;

    /// Perform the handshake and open the event stream.
    async fn connect(&self) -> Result<Session>;

    async fn list_users(&self) -> Result<Vec<User>>;
    async fn list_channels(&self) -> Result<Vec<Conversation>>;
    async fn list_groups(&self) -> Result<Vec<Conversation>>;
    async fn list_direct_conversations(&self) -> Result<Vec<DirectConversation>>;

    /// Recent history of one conversation, in platform order.
    async fn history(&self, kind: ConversationKind, channel_id: &str)
    -> Result<Vec<HistoryMessage>>;

    /// Route message events to `sink` until [`ChatPlatform::unsubscribe`].
    ///
    /// Events arriving while nobody is subscribed are acknowledged and dropped.
    fn subscribe(&self, sink: EventSender);

    fn unsubscribe(&self);

    /// Whether the event stream is currently open.
    fn is_connected(&self) -> bool;

    /// Close the event stream. Safe to call more than once.
    async fn close(&self);
}
