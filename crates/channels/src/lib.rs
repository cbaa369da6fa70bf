//! Chat platform boundary.
//!
//! A platform adapter (Slack, ...) implements [`ChatPlatform`]: a handshake,
//! bulk directory listings, per-conversation history, and an event stream
//! exposed as an `mpsc` queue of [`MessageEvent`].

pub mod error;
pub mod platform;

pub use {
    error::{Error, Result},
    platform::{
        ChatPlatform, Conversation, ConversationKind, DirectConversation, EventReceiver,
        EventSender, HistoryMessage, MessageEvent, Session, User,
    },
};
