//! Socket Mode connection handler for Slack.
//!
//! Uses slack-morphism's socket mode listener, which opens the websocket,
//! acknowledges envelopes and reconnects dropped sockets on its own. Message
//! events are forwarded to whoever is subscribed.

use std::sync::{Arc, RwLock};

use {
    slack_morphism::prelude::*,
    tracing::{debug, info},
};

use slackntell_channels::{EventSender, MessageEvent};

use crate::{
    api::SlackHttpConnector,
    error::{Error, Result},
};

/// Current subscriber, if any.
pub type SubscriberSlot = Arc<RwLock<Option<EventSender>>>;

pub type SocketListener = SlackClientSocketModeListener<SlackHttpConnector>;

/// Shared state for socket mode callbacks.
#[derive(Clone)]
struct SocketModeState {
    subscriber: SubscriberSlot,
}

/// Register `app_token` with a fresh listener and start it.
pub async fn start_socket_mode(
    client: Arc<SlackClient<SlackHttpConnector>>,
    app_token: &SlackApiToken,
    subscriber: SubscriberSlot,
) -> Result<SocketListener> {
    let callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_events);
    let listener_env = Arc::new(
        SlackClientEventsListenerEnvironment::new(client)
            .with_user_state(SocketModeState { subscriber }),
    );
    let listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        listener_env,
        callbacks,
    );

    listener
        .listen_for(app_token)
        .await
        .map_err(|e| Error::api("apps.connections.open", e))?;
    listener.start().await;
    info!("slack socket mode connected");
    Ok(listener)
}

async fn handle_push_events(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subscriber = {
        let guard = states.read().await;
        let state = guard
            .get_user_state::<SocketModeState>()
            .ok_or("missing socket mode state")?;
        Arc::clone(&state.subscriber)
    };

    match &event.event {
        SlackEventCallbackBody::Message(msg) => forward(&subscriber, message_event(msg)).await,
        _ => debug!("ignoring event callback type"),
    }
    Ok(())
}

pub(crate) fn message_event(event: &SlackMessageEvent) -> MessageEvent {
    MessageEvent {
        channel: event.origin.channel.as_ref().map(|c| c.to_string()),
        user: event.sender.user.as_ref().map(|u| u.to_string()),
        ts: event.origin.ts.to_string(),
        text: event
            .content
            .as_ref()
            .and_then(|c| c.text.clone())
            .unwrap_or_default(),
    }
}

pub(crate) async fn forward(subscriber: &SubscriberSlot, event: MessageEvent) {
    let sink = subscriber
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    match sink {
        Some(tx) => {
            if tx.send(event).await.is_err() {
                debug!("subscriber dropped, message event discarded");
            }
        },
        None => debug!("no subscriber, message event discarded"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, serde_json::json, tokio::sync::mpsc};

    fn slack_event(value: serde_json::Value) -> SlackMessageEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn converts_message_event() {
        let event = message_event(&slack_event(json!({
            "type": "message",
            "channel": "C1",
            "user": "U1",
            "text": "hi",
            "ts": "1700000000.000100"
        })));
        assert_eq!(event, MessageEvent {
            channel: Some("C1".into()),
            user: Some("U1".into()),
            ts: "1700000000.000100".into(),
            text: "hi".into(),
        });
    }

    #[test]
    fn message_without_channel_still_converts() {
        let event = message_event(&slack_event(json!({
            "type": "message",
            "user": "U1",
            "ts": "1700000000.000100"
        })));
        assert!(event.channel.is_none());
        assert!(event.text.is_empty());
    }

    #[tokio::test]
    async fn forward_reaches_subscriber_only_when_registered() {
        let slot: SubscriberSlot = Arc::new(RwLock::new(None));
        let event = MessageEvent {
            channel: Some("C1".into()),
            user: Some("U1".into()),
            ts: "1.0".into(),
            text: "x".into(),
        };

        forward(&slot, event.clone()).await;

        let (tx, mut rx) = mpsc::channel(4);
        *slot.write().unwrap() = Some(tx);
        forward(&slot, event.clone()).await;

        assert_eq!(rx.recv().await, Some(event));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn forward_survives_dropped_subscriber() {
        let (tx, rx) = mpsc::channel(1);
        let slot: SubscriberSlot = Arc::new(RwLock::new(Some(tx)));
        drop(rx);
        forward(&slot, MessageEvent {
            channel: Some("C1".into()),
            user: None,
            ts: "1.0".into(),
            text: String::new(),
        })
        .await;
        assert!(slot.read().unwrap().is_some());
    }
}
