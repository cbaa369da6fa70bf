use std::{sync::Arc, time::Duration};

use {
    chrono::{DateTime, TimeDelta, Utc},
    slackntell_channels::{ChatPlatform, HistoryMessage},
    tracing::{debug, warn},
};

use crate::{directory::Directory, notifier::Telling};

/// Pulls recent history for a conversation and trims it to the lookback
/// window.
pub struct HistoryFetcher {
    platform: Arc<dyn ChatPlatform>,
    lookback: Duration,
}

impl HistoryFetcher {
    pub fn new(platform: Arc<dyn ChatPlatform>, lookback: Duration) -> Self {
        Self { platform, lookback }
    }

    /// Tellings for `channel`, oldest first. Never fails: an unknown
    /// conversation or a failed query yields an empty digest.
    pub async fn fetch(&self, directory: &Directory, channel: &str) -> Vec<Telling> {
        let Some(kind) = directory.kind_of(channel) else {
            debug!(channel, "conversation not in directory, no history");
            return Vec::new();
        };

        let messages = match self.platform.history(kind, channel).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(channel, %kind, error = %e, "history query failed");
                return Vec::new();
            },
        };

        within_lookback(messages, Utc::now(), self.lookback)
            .into_iter()
            .map(|m| Telling {
                user: directory.display_name(m.user.as_deref()).to_string(),
                ts: m.ts,
                text: m.text,
            })
            .collect()
    }
}

/// Messages strictly newer than `now - lookback`, oldest first.
pub fn within_lookback(
    mut messages: Vec<HistoryMessage>,
    now: DateTime<Utc>,
    lookback: Duration,
) -> Vec<HistoryMessage> {
    let cutoff = TimeDelta::from_std(lookback)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta));
    messages.retain(|m| cutoff.is_none_or(|cutoff| m.ts > cutoff));
    messages.sort_by_key(|m| m.ts);
    messages
}
