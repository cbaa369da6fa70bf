use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, Ordering},
};

use {
    async_trait::async_trait,
    secrecy::ExposeSecret,
    slack_morphism::prelude::*,
    tokio::sync::Mutex,
    tracing::{debug, info},
};

use {
    slackntell_channels::{
        ChatPlatform, Conversation, ConversationKind, DirectConversation, EventSender,
        HistoryMessage, Result, Session, User,
    },
    slackntell_config::SlackConfig,
};

use crate::{
    api::SlackApi,
    socket::{SocketListener, SubscriberSlot, start_socket_mode},
};

/// Slack workspace connection: Web API for queries, Socket Mode for events.
pub struct SlackPlatform {
    api: SlackApi,
    app_token: SlackApiToken,
    history_limit: u32,
    subscriber: SubscriberSlot,
    listener: Mutex<Option<SocketListener>>,
    connected: AtomicBool,
}

impl SlackPlatform {
    pub fn new(config: &SlackConfig, history_limit: u32) -> crate::Result<Self> {
        if config.token.expose_secret().is_empty() {
            return Err(crate::Error::message("slack access token is required"));
        }
        if config.app_token.expose_secret().is_empty() {
            return Err(crate::Error::message("slack app token is required"));
        }
        ensure_crypto_provider();
        Ok(Self {
            api: SlackApi::new(&config.api_base, &config.token)?,
            app_token: SlackApiToken::new(config.app_token.expose_secret().clone().into()),
            history_limit,
            subscriber: Arc::new(RwLock::new(None)),
            listener: Mutex::new(None),
            connected: AtomicBool::new(false),
        })
    }

    /// Shut down the running listener, if any.
    async fn stop_listener(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let previous = self.listener.lock().await.take();
        if let Some(listener) = previous {
            listener.shutdown().await;
            debug!("slack socket mode listener stopped");
        }
    }
}

/// The https connector needs a process-level rustls provider.
fn ensure_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

#[async_trait]
impl ChatPlatform for SlackPlatform {
    fn id(&self) -> &str {
        "slack"
    }

    async fn connect(&self) -> Result<Session> {
        let session = self.api.auth_test().await?;
        info!(user_id = %session.user_id, team = ?session.team, "slack token authenticated");

        // Drop any previous socket before opening the next one.
        self.stop_listener().await;

        let listener = start_socket_mode(
            self.api.client(),
            &self.app_token,
            Arc::clone(&self.subscriber),
        )
        .await?;
        *self.listener.lock().await = Some(listener);
        self.connected.store(true, Ordering::SeqCst);
        Ok(session)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.api.list_users().await?)
    }

    async fn list_channels(&self) -> Result<Vec<Conversation>> {
        Ok(self
            .api
            .list_conversations(SlackConversationType::Public)
            .await?)
    }

    async fn list_groups(&self) -> Result<Vec<Conversation>> {
        Ok(self
            .api
            .list_conversations(SlackConversationType::Private)
            .await?)
    }

    async fn list_direct_conversations(&self) -> Result<Vec<DirectConversation>> {
        Ok(self.api.list_direct_conversations().await?)
    }

    async fn history(
        &self,
        kind: ConversationKind,
        channel_id: &str,
    ) -> Result<Vec<HistoryMessage>> {
        // `conversations.history` serves channels, groups and IMs alike.
        debug!(%kind, channel_id, "fetching slack history");
        Ok(self.api.history(channel_id, self.history_limit).await?)
    }

    fn subscribe(&self, sink: EventSender) {
        *self.subscriber.write().unwrap_or_else(|e| e.into_inner()) = Some(sink);
    }

    fn unsubscribe(&self) {
        self.subscriber
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    /// Whether a listener is running. Dropped sockets are reopened by the
    /// listener itself; this turns `false` only once it is shut down.
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.stop_listener().await;
    }
}
