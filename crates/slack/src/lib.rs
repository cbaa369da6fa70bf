//! Slack adapter for slackntell.
//!
//! Implements `ChatPlatform` on `slack-morphism`: Web API sessions for the
//! handshake, directory listings and history, and its Socket Mode listener
//! for the live message stream.

pub mod api;
pub mod error;
pub mod platform;
pub mod socket;

pub use {
    error::{Error, Result},
    platform::SlackPlatform,
};
