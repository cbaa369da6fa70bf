//! Message relay: turns a chat platform's message stream into rate-limited
//! email digests.
//!
//! [`run`] wires the pieces together:
//! - [`supervisor::Supervisor`] connects, loads the [`directory::Directory`]
//!   and keeps the event stream alive;
//! - [`pipeline::Pipeline`] handles every message event on its own task,
//!   passing it through the [`gate::DigestGate`], the
//!   [`history::HistoryFetcher`] and the [`notifier::Notifier`].
//!
//! Fatal conditions from any task travel back to [`run`] as [`Error`] values
//! and trigger an orderly shutdown.

pub mod directory;
pub mod error;
pub mod gate;
pub mod history;
pub mod notifier;
pub mod pipeline;
pub mod supervisor;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod test_support;

use std::{future::Future, sync::Arc, time::Duration};

use {
    chrono_tz::Tz,
    slackntell_channels::ChatPlatform,
    slackntell_config::SlackntellConfig,
    slackntell_mail::Mailer,
    tokio::{sync::mpsc, task::JoinError},
    tokio_util::{sync::CancellationToken, task::TaskTracker},
    tracing::{error, info, warn},
};

pub use {
    directory::{Directory, DirectoryHandle, UNKNOWN},
    error::{Error, Result},
    gate::{DigestGate, GateDecision},
    history::HistoryFetcher,
    notifier::{Digest, Notifier, Telling},
    pipeline::{Outcome, Pipeline},
    supervisor::{ConnectionState, Supervisor},
};

/// Where spawned tasks report conditions that must stop the relay.
pub type FatalSender = mpsc::UnboundedSender<Error>;

const EVENT_QUEUE_CAPACITY: usize = 256;

/// How long shutdown waits for in-flight digests.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Runtime settings derived from [`SlackntellConfig`].
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub rate_window: Duration,
    pub lookback: Duration,
    pub health_interval: Duration,
    pub self_user_id: Option<String>,
    pub from: String,
    pub to: String,
    pub timezone: Tz,
}

impl RelaySettings {
    pub fn from_config(config: &SlackntellConfig) -> Result<Self> {
        let timezone = config
            .digest
            .timezone
            .parse::<Tz>()
            .map_err(|_| Error::settings(format!("unknown timezone `{}`", config.digest.timezone)))?;
        if config.supervisor.health_interval_secs == 0 {
            return Err(Error::settings("health interval must be positive"));
        }
        Ok(Self {
            rate_window: Duration::from_secs(config.digest.rate_window_secs),
            lookback: Duration::from_secs(config.digest.lookback_secs),
            health_interval: Duration::from_secs(config.supervisor.health_interval_secs),
            self_user_id: config
                .slack
                .self_user_id
                .clone()
                .filter(|id| !id.is_empty()),
            from: config.smtp.from.clone(),
            to: config.smtp.to.clone(),
            timezone,
        })
    }
}

/// Run the relay until `shutdown` resolves or a fatal error occurs.
///
/// Either way the subscription is dropped, the transport closed, and
/// in-flight digests get a short grace period before returning.
pub async fn run(
    platform: Arc<dyn ChatPlatform>,
    mailer: Arc<dyn Mailer>,
    settings: RelaySettings,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let directory = DirectoryHandle::default();
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();

    let supervisor = Arc::new(Supervisor::new(
        Arc::clone(&platform),
        directory.clone(),
        events_tx,
        settings.health_interval,
    ));
    let pipeline = Arc::new(Pipeline::new(&settings, platform, mailer, directory));

    if let Err(e) = supervisor.connect().await {
        error!(error = %e, "initial connection failed");
        supervisor.shutdown().await;
        return Err(e);
    }

    let tracker = TaskTracker::new();
    let dispatch_cancel = CancellationToken::new();
    let dispatcher = pipeline.spawn(
        events_rx,
        fatal_tx.clone(),
        tracker.clone(),
        dispatch_cancel.clone(),
    );
    let health = supervisor.spawn_health_check(fatal_tx);

    let outcome = tokio::select! {
        () = shutdown => {
            info!("shutdown requested");
            Ok(())
        },
        Some(e) = fatal_rx.recv() => {
            error!(error = %e, "fatal error, shutting down");
            Err(e)
        },
    };

    dispatch_cancel.cancel();
    supervisor.shutdown().await;
    let (dispatched, health) = tokio::join!(dispatcher, health);
    joined_cleanly("dispatcher", dispatched);
    joined_cleanly("health check", health);

    tracker.close();
    if tokio::time::timeout(DRAIN_GRACE, tracker.wait()).await.is_err() {
        warn!(pending = tracker.len(), "abandoning in-flight digests");
    }
    outcome
}

/// Log a relay task that panicked or was aborted.
fn joined_cleanly(task: &str, joined: std::result::Result<(), JoinError>) -> bool {
    match joined {
        Ok(()) => true,
        Err(e) => {
            error!(task, error = %e, "relay task ended abnormally");
            false
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::test_support::{FakePlatform, RecordingMailer, event},
        slackntell_config::{DigestConfig, SlackConfig, SmtpConfig},
        tokio::sync::oneshot,
    };

    fn config() -> SlackntellConfig {
        SlackntellConfig {
            slack: SlackConfig {
                self_user_id: Some("U99".into()),
                ..Default::default()
            },
            smtp: SmtpConfig {
                from: "relay@example.com".into(),
                to: "me@example.com".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn settings_follow_config() {
        let settings = RelaySettings::from_config(&config()).unwrap();
        assert_eq!(settings.rate_window, Duration::from_secs(600));
        assert_eq!(settings.lookback, Duration::from_secs(86_400));
        assert_eq!(settings.health_interval, Duration::from_secs(30));
        assert_eq!(settings.self_user_id.as_deref(), Some("U99"));
        assert_eq!(settings.timezone, Tz::UTC);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let mut cfg = config();
        cfg.digest = DigestConfig {
            timezone: "Mars/Olympus_Mons".into(),
            ..Default::default()
        };
        let err = RelaySettings::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }

    #[test]
    fn empty_self_id_disables_filter() {
        let mut cfg = config();
        cfg.slack.self_user_id = Some(String::new());
        let settings = RelaySettings::from_config(&cfg).unwrap();
        assert!(settings.self_user_id.is_none());
    }

    #[tokio::test]
    async fn relays_until_shutdown() {
        let platform = Arc::new(FakePlatform::default());
        let mailer = Arc::new(RecordingMailer::default());
        let settings = RelaySettings::from_config(&config()).unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let relay = tokio::spawn(run(platform.clone(), mailer.clone(), settings, async {
            let _ = stop_rx.await;
        }));

        platform.subscribed.notified().await;
        assert!(platform.emit(event(Some("C1"), "U1")).await);
        assert!(platform.emit(event(Some("C1"), "U99")).await);
        while mailer.mails().is_empty() {
            tokio::task::yield_now().await;
        }

        stop_tx.send(()).unwrap();
        relay.await.unwrap().unwrap();

        assert_eq!(mailer.mails().len(), 1);
        assert_eq!(platform.closes(), 1);
        assert!(!platform.is_subscribed());
    }

    #[tokio::test]
    async fn malformed_event_stops_relay() {
        let platform = Arc::new(FakePlatform::default());
        let mailer = Arc::new(RecordingMailer::default());
        let settings = RelaySettings::from_config(&config()).unwrap();

        let relay = tokio::spawn(run(
            platform.clone(),
            mailer,
            settings,
            std::future::pending::<()>(),
        ));

        platform.subscribed.notified().await;
        assert!(platform.emit(event(None, "U1")).await);

        let err = relay.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::MalformedEvent { .. }));
        assert_eq!(platform.closes(), 1);
        assert!(!platform.is_connected());
    }

    #[tokio::test]
    async fn failed_handshake_is_returned() {
        let platform = Arc::new(FakePlatform::default());
        platform.fail_connect(true);
        let settings = RelaySettings::from_config(&config()).unwrap();

        let err = run(
            platform.clone(),
            Arc::new(RecordingMailer::default()),
            settings,
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Handshake { .. }));
        assert_eq!(platform.closes(), 1);
    }

    #[tokio::test]
    async fn panicked_task_is_reported() {
        let finished = tokio::spawn(async {});
        let panicked = tokio::spawn(async { panic!("dispatcher blew up") });

        assert!(joined_cleanly("dispatcher", finished.await));
        assert!(!joined_cleanly("dispatcher", panicked.await));
    }
}
