//! In-memory platform and mailer used by the relay tests.

use std::{
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    slackntell_channels::{
        ChatPlatform, Conversation, ConversationKind, DirectConversation, Error, EventSender,
        HistoryMessage, MessageEvent, Result, Session, User,
    },
    slackntell_mail::{Mailer, OutgoingMail, mailer::build_message},
    tokio::{sync::Notify, time::Instant},
};

use crate::directory::Directory;

fn users() -> Vec<User> {
    vec![
        User {
            id: "U1".into(),
            name: "alice".into(),
        },
        User {
            id: "U2".into(),
            name: "bob".into(),
        },
        User {
            id: "U99".into(),
            name: "relay-bot".into(),
        },
    ]
}

fn channels() -> Vec<Conversation> {
    vec![Conversation {
        id: "C1".into(),
        name: "general".into(),
    }]
}

fn groups() -> Vec<Conversation> {
    vec![Conversation {
        id: "G1".into(),
        name: "ops".into(),
    }]
}

fn direct() -> Vec<DirectConversation> {
    vec![DirectConversation {
        id: "D1".into(),
        user: "U2".into(),
    }]
}

/// The directory [`FakePlatform`] serves.
pub(crate) fn directory() -> Directory {
    Directory::new(users(), channels(), groups(), direct())
}

pub(crate) fn event(channel: Option<&str>, user: &str) -> MessageEvent {
    MessageEvent {
        channel: channel.map(str::to_string),
        user: Some(user.into()),
        ts: "1700000000.000100".into(),
        text: "ping".into(),
    }
}

#[derive(Default)]
pub(crate) struct FakePlatform {
    history: Mutex<Vec<HistoryMessage>>,
    fail_history: AtomicBool,
    fail_connect: AtomicBool,
    connect_delay: Mutex<Duration>,
    fail_list: AtomicBool,
    connected: AtomicBool,
    subscriber: Mutex<Option<EventSender>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
    history_calls: AtomicUsize,
    pub subscribed: Notify,
}

impl FakePlatform {
    pub fn set_history(&self, messages: Vec<HistoryMessage>) {
        *self.history.lock().unwrap() = messages;
    }

    pub fn fail_history(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Make every later handshake take `delay`.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = delay;
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Simulate the transport dropping.
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriber.lock().unwrap().is_some()
    }

    /// Deliver `event` to the current subscriber, if any.
    pub async fn emit(&self, event: MessageEvent) -> bool {
        let sink = self.subscriber.lock().unwrap().clone();
        match sink {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    fn listing<T>(&self, method: &str, items: Vec<T>) -> Result<Vec<T>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::not_ok(method, Some("ratelimited".into())));
        }
        Ok(items)
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    fn id(&self) -> &str {
        "fake"
    }

    async fn connect(&self) -> Result<Session> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let delay = *self.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(Error::not_ok("auth.test", Some("invalid_auth".into())));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(Session {
            user_id: "U99".into(),
            team: Some("acme".into()),
        })
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.listing("users.list", users())
    }

    async fn list_channels(&self) -> Result<Vec<Conversation>> {
        self.listing("conversations.list", channels())
    }

    async fn list_groups(&self) -> Result<Vec<Conversation>> {
        self.listing("conversations.list", groups())
    }

    async fn list_direct_conversations(&self) -> Result<Vec<DirectConversation>> {
        self.listing("conversations.list", direct())
    }

    async fn history(
        &self,
        _kind: ConversationKind,
        _channel_id: &str,
    ) -> Result<Vec<HistoryMessage>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(Error::not_ok(
                "conversations.history",
                Some("channel_not_found".into()),
            ));
        }
        Ok(self.history.lock().unwrap().clone())
    }

    fn subscribe(&self, sink: EventSender) {
        *self.subscriber.lock().unwrap() = Some(sink);
        self.subscribed.notify_one();
    }

    fn unsubscribe(&self) {
        self.subscriber.lock().unwrap().take();
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Records every mail together with the (tokio) instant it was sent.
#[derive(Default)]
pub(crate) struct RecordingMailer {
    sent: Mutex<Vec<(Instant, OutgoingMail)>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn mails(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> slackntell_mail::Result<()> {
        if self.fail {
            // Surface a genuine address error.
            return build_message(&OutgoingMail {
                to: "not an address".into(),
                ..mail
            })
            .map(|_| ());
        }
        self.sent.lock().unwrap().push((Instant::now(), mail));
        Ok(())
    }
}
