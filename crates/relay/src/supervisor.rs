//! Connection supervisor.
//!
//! Owns the platform connection lifecycle: handshake, directory load,
//! event subscription, liveness polling with automatic reconnect, and
//! shutdown.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    slackntell_channels::{ChatPlatform, EventSender, Session},
    tokio::{sync::watch, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    FatalSender,
    directory::{Directory, DirectoryHandle},
    error::{Error, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    LoadingDirectory,
    Live,
}

pub struct Supervisor {
    platform: Arc<dyn ChatPlatform>,
    directory: DirectoryHandle,
    events: EventSender,
    health_interval: Duration,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    shut_down: AtomicBool,
}

impl Supervisor {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        directory: DirectoryHandle,
        events: EventSender,
        health_interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            platform,
            directory,
            events,
            health_interval,
            state,
            cancel: CancellationToken::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn transition(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "connection state changed");
        }
    }

    /// Handshake, load the directory, then subscribe.
    ///
    /// On failure the previous directory stays published and nothing is
    /// subscribed. After [`Supervisor::shutdown`] this fails with
    /// [`Error::ShutDown`] and leaves the transport closed.
    pub async fn connect(&self) -> Result<Session> {
        if self.cancel.is_cancelled() {
            return Err(Error::ShutDown);
        }
        self.platform.unsubscribe();
        self.transition(ConnectionState::Connecting);

        let session = match self.platform.connect().await {
            Ok(session) => session,
            Err(source) => {
                self.transition(ConnectionState::Disconnected);
                return Err(Error::Handshake {
                    platform: self.platform.id().to_string(),
                    source,
                });
            },
        };

        if self.cancel.is_cancelled() {
            return Err(self.abandon().await);
        }

        self.transition(ConnectionState::LoadingDirectory);
        let directory = match Directory::load(self.platform.as_ref()).await {
            Ok(directory) => directory,
            Err(e) => {
                self.transition(ConnectionState::Disconnected);
                return Err(e);
            },
        };
        self.directory.publish(directory);

        self.platform.subscribe(self.events.clone());
        // `shutdown` cancels before it unsubscribes, so one of the two sides
        // always sees the other.
        if self.cancel.is_cancelled() {
            return Err(self.abandon().await);
        }
        self.transition(ConnectionState::Live);
        info!(
            platform = self.platform.id(),
            user_id = %session.user_id,
            team = ?session.team,
            "relay live"
        );
        Ok(session)
    }

    /// Undo a connection that completed after shutdown began.
    async fn abandon(&self) -> Error {
        self.platform.unsubscribe();
        self.platform.close().await;
        self.transition(ConnectionState::Disconnected);
        debug!("connection attempt abandoned after shutdown");
        Error::ShutDown
    }

    /// Poll liveness every `health_interval` and reconnect when the event
    /// stream is down. A failed reconnect is reported on `fatal` and ends
    /// the loop.
    pub fn spawn_health_check(self: &Arc<Self>, fatal: FatalSender) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = this.cancel.cancelled() => break,
                    _ = tokio::time::sleep(this.health_interval) => {},
                }
                if this.platform.is_connected() {
                    continue;
                }

                warn!(platform = this.platform.id(), "event stream down, reconnecting");
                this.transition(ConnectionState::Disconnected);
                match this.connect().await {
                    Ok(_) => {},
                    Err(_) if this.cancel.is_cancelled() => break,
                    Err(e) => {
                        error!(error = %e, "reconnect failed");
                        let _ = fatal.send(e);
                        break;
                    },
                }
            }
            debug!("health check stopped");
        })
    }

    /// Stop the health check, drop the subscription and close the transport.
    /// Later calls are no-ops.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        self.platform.unsubscribe();
        self.platform.close().await;
        self.transition(ConnectionState::Disconnected);
        info!("supervisor shut down");
    }
}
