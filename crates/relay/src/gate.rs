//! Per-conversation digest gate.
//!
//! The first message after a quiet period fires at once. Messages inside an
//! open window schedule a wait that ends when the window closes; when it ends,
//! every waiter races to claim the send and exactly one wins.

use std::time::Duration;

use {
    dashmap::{DashMap, mapref::entry::Entry},
    tokio::time::Instant,
};

/// Outcome of [`DigestGate::on_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The window was closed; the record now holds `now`.
    SendNow,
    /// A window is open. Sleep for `delay`, then [`DigestGate::claim`] with
    /// `expected`.
    WaitThenSend { expected: Instant, delay: Duration },
}

/// Last-send record per conversation.
#[derive(Debug)]
pub struct DigestGate {
    window: Duration,
    last_sends: DashMap<String, Instant>,
}

impl DigestGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sends: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Read-or-insert the record for `channel` under the entry lock.
    pub fn on_message(&self, channel: &str, now: Instant) -> GateDecision {
        match self.last_sends.entry(channel.to_string()) {
            Entry::Occupied(mut occupied) => {
                let last = *occupied.get();
                let elapsed = now.saturating_duration_since(last);
                if elapsed >= self.window {
                    occupied.insert(now);
                    GateDecision::SendNow
                } else {
                    GateDecision::WaitThenSend {
                        expected: last,
                        delay: self.window - elapsed,
                    }
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                GateDecision::SendNow
            },
        }
    }

    /// Swap the record from `expected` to `now`. `false` means another
    /// trigger already advanced it and this one is suppressed.
    pub fn claim(&self, channel: &str, expected: Instant, now: Instant) -> bool {
        match self.last_sends.get_mut(channel) {
            Some(mut record) if *record == expected => {
                *record = now;
                true
            },
            _ => false,
        }
    }

    /// Current record for `channel`.
    pub fn last_send(&self, channel: &str) -> Option<Instant> {
        self.last_sends.get(channel).map(|r| *r)
    }
}
