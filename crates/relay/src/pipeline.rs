//! Message triage: self filter, digest gate, history, notification.

use std::sync::Arc;

use {
    slackntell_channels::{ChatPlatform, EventReceiver, MessageEvent},
    slackntell_mail::Mailer,
    tokio::{task::JoinHandle, time::Instant},
    tokio_util::{sync::CancellationToken, task::TaskTracker},
    tracing::{debug, error, info},
};

use crate::{
    FatalSender, RelaySettings,
    directory::DirectoryHandle,
    error::{Error, Result},
    gate::{DigestGate, GateDecision},
    history::HistoryFetcher,
    notifier::{Digest, Notifier},
};

/// What became of one message event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Sent by the configured self user; ignored.
    SelfMessage,
    /// Another trigger claimed the window first.
    Suppressed,
    Sent,
    /// The mail transport refused the digest.
    SendFailed,
}

pub struct Pipeline {
    gate: DigestGate,
    directory: DirectoryHandle,
    fetcher: HistoryFetcher,
    notifier: Notifier,
    self_user_id: Option<String>,
}

impl Pipeline {
    pub fn new(
        settings: &RelaySettings,
        platform: Arc<dyn ChatPlatform>,
        mailer: Arc<dyn Mailer>,
        directory: DirectoryHandle,
    ) -> Self {
        Self {
            gate: DigestGate::new(settings.rate_window),
            directory,
            fetcher: HistoryFetcher::new(platform, settings.lookback),
            notifier: Notifier::new(
                mailer,
                settings.from.clone(),
                settings.to.clone(),
                settings.timezone,
            ),
            self_user_id: settings.self_user_id.clone(),
        }
    }

    fn is_self(&self, user: Option<&str>) -> bool {
        match (self.self_user_id.as_deref(), user) {
            (Some(me), Some(user)) => me.eq_ignore_ascii_case(user),
            _ => false,
        }
    }

    /// Run one event to completion. Only a malformed event is an error.
    pub async fn handle_event(&self, event: MessageEvent) -> Result<Outcome> {
        if self.is_self(event.user.as_deref()) {
            debug!(ts = %event.ts, "ignoring own message");
            return Ok(Outcome::SelfMessage);
        }

        let Some(channel) = event.channel.as_deref() else {
            return Err(Error::malformed("channel id is missing", &event));
        };

        match self.gate.on_message(channel, Instant::now()) {
            GateDecision::SendNow => debug!(channel, "window closed, sending now"),
            GateDecision::WaitThenSend { expected, delay } => {
                debug!(channel, delay_secs = delay.as_secs(), "window open, deferring");
                tokio::time::sleep(delay).await;
                if !self.gate.claim(channel, expected, Instant::now()) {
                    debug!(channel, "trigger suppressed");
                    return Ok(Outcome::Suppressed);
                }
            },
        }

        let directory = self.directory.snapshot();
        let digest = Digest {
            context: directory.resolve(channel).map(str::to_string),
            user: event
                .user
                .as_deref()
                .and_then(|user| directory.resolve(user))
                .map(str::to_string),
            tellings: self.fetcher.fetch(&directory, channel).await,
        };

        Ok(if self.notifier.notify(digest).await {
            Outcome::Sent
        } else {
            Outcome::SendFailed
        })
    }

    /// Drain `events`, handling each on its own task. Failures go to `fatal`.
    ///
    /// Stops reading when `cancel` fires or the queue closes; tasks already
    /// spawned on `tracker` keep running.
    pub fn spawn(
        self: Arc<Self>,
        mut events: EventReceiver,
        fatal: FatalSender,
        tracker: TaskTracker,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                let pipeline = Arc::clone(&self);
                let fatal = fatal.clone();
                tracker.spawn(async move {
                    if let Err(e) = pipeline.handle_event(event).await {
                        error!(error = %e, "fatal error handling message event");
                        let _ = fatal.send(e);
                    }
                });
            }
            info!("message dispatch stopped");
        })
    }
}
