//! Slack Web API queries.
//!
//! Typed `slack-morphism` sessions for the handshake, listings and history.
//! An `ok: false` reply surfaces as [`slackntell_channels::Error::NotOk`]
//! carrying Slack's `error` string.

use std::sync::Arc;

use {
    chrono::{DateTime, TimeZone, Utc},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    slack_morphism::prelude::*,
    tracing::debug,
};

use slackntell_channels::{Conversation, DirectConversation, HistoryMessage, Session, User};

use crate::error::{Error, Result};

/// Page size requested from paginated list methods.
const PAGE_SIZE: u16 = 200;

pub type SlackHttpConnector = SlackClientHyperConnector<SlackHyperHttpsConnector>;

/// A direct conversation as `conversations.list?types=im` returns it.
#[derive(Debug, Deserialize)]
struct ImConversation {
    id: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImListReply {
    #[serde(default)]
    channels: Vec<ImConversation>,
    #[serde(default)]
    response_metadata: Option<ImListMetadata>,
}

#[derive(Debug, Deserialize)]
struct ImListMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

/// Slack client bound to the relay's access token.
#[derive(Clone)]
pub struct SlackApi {
    client: Arc<SlackClient<SlackHttpConnector>>,
    token: SlackApiToken,
}

impl SlackApi {
    pub fn new(api_base: &str, token: &Secret<String>) -> Result<Self> {
        let connector = SlackClientHyperConnector::new()
            .map_err(|e| Error::message(format!("failed to build slack http connector: {e}")))?
            .with_slack_api_url(&method_base(api_base));
        Ok(Self {
            client: Arc::new(SlackClient::new(connector)),
            token: SlackApiToken::new(token.expose_secret().clone().into()),
        })
    }

    pub fn client(&self) -> Arc<SlackClient<SlackHttpConnector>> {
        Arc::clone(&self.client)
    }

    /// `auth.test`: verify the access token.
    pub async fn auth_test(&self) -> Result<Session> {
        let session = self.client.open_session(&self.token);
        let reply = session
            .auth_test()
            .await
            .map_err(|e| Error::api("auth.test", e))?;
        debug!(user = ?reply.user, "auth.test accepted");
        Ok(Session {
            user_id: reply.user_id.to_string(),
            team: Some(reply.team_id.to_string()),
        })
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let session = self.client.open_session(&self.token);
        let mut users = Vec::new();
        let mut cursor: Option<SlackCursorId> = None;
        loop {
            let request = SlackApiUsersListRequest::new()
                .with_limit(PAGE_SIZE)
                .opt_cursor(cursor);
            let reply = session
                .users_list(&request)
                .await
                .map_err(|e| Error::api("users.list", e))?;
            users.extend(reply.members.into_iter().map(user));
            cursor = next_cursor(reply.response_metadata);
            if cursor.is_none() {
                break;
            }
        }
        debug!(count = users.len(), "listed users");
        Ok(users)
    }

    /// Public channels ([`SlackConversationType::Public`]) or private groups
    /// ([`SlackConversationType::Private`]).
    pub async fn list_conversations(&self, kind: SlackConversationType) -> Result<Vec<Conversation>> {
        let session = self.client.open_session(&self.token);
        let mut conversations = Vec::new();
        let mut cursor: Option<SlackCursorId> = None;
        loop {
            let request = SlackApiConversationsListRequest::new()
                .with_types(vec![kind.clone()])
                .with_limit(PAGE_SIZE)
                .opt_cursor(cursor);
            let reply = session
                .conversations_list(&request)
                .await
                .map_err(|e| Error::api("conversations.list", e))?;
            conversations.extend(reply.channels.into_iter().map(conversation));
            cursor = next_cursor(reply.response_metadata);
            if cursor.is_none() {
                break;
            }
        }
        debug!(?kind, count = conversations.len(), "listed conversations");
        Ok(conversations)
    }

    /// Direct conversations with their peer user. Pages go through the raw
    /// session GET and are decoded into [`ImConversation`] for the `user`
    /// field.
    pub async fn list_direct_conversations(&self) -> Result<Vec<DirectConversation>> {
        let session = self.client.open_session(&self.token);
        let types = "im".to_string();
        let limit = PAGE_SIZE.to_string();
        let mut direct = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = vec![
                ("types", Some(&types)),
                ("limit", Some(&limit)),
                ("cursor", cursor.as_ref()),
            ];
            let reply: ImListReply = session
                .http_session_api
                .http_get("conversations.list", &params, None)
                .await
                .map_err(|e| Error::api("conversations.list", e))?;
            direct.extend(reply.channels.into_iter().filter_map(direct_conversation));
            cursor = reply
                .response_metadata
                .and_then(|m| m.next_cursor)
                .filter(|c| !c.is_empty());
            if cursor.is_none() {
                break;
            }
        }
        debug!(count = direct.len(), "listed direct conversations");
        Ok(direct)
    }

    /// `conversations.history`, newest first as Slack returns it.
    pub async fn history(&self, channel_id: &str, limit: u32) -> Result<Vec<HistoryMessage>> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiConversationsHistoryRequest::new()
            .with_channel(channel_id.to_string().into())
            .with_limit(u16::try_from(limit).unwrap_or(u16::MAX));
        let reply = session
            .conversations_history(&request)
            .await
            .map_err(|e| Error::api("conversations.history", e))?;
        Ok(reply
            .messages
            .into_iter()
            .filter_map(history_message)
            .collect())
    }
}

/// `slack-morphism` appends the method name to this prefix.
fn method_base(api_base: &str) -> String {
    format!("{}/", api_base.trim_end_matches('/'))
}

fn next_cursor(metadata: Option<SlackResponseMetadata>) -> Option<SlackCursorId> {
    metadata
        .and_then(|m| m.next_cursor)
        .filter(|c| !c.0.is_empty())
}

fn user(raw: SlackUser) -> User {
    let id = raw.id.to_string();
    User {
        name: raw.name.unwrap_or_else(|| id.clone()),
        id,
    }
}

fn conversation(raw: SlackChannelInfo) -> Conversation {
    let id = raw.id.to_string();
    Conversation {
        name: raw.name.unwrap_or_else(|| id.clone()),
        id,
    }
}

fn direct_conversation(raw: ImConversation) -> Option<DirectConversation> {
    match raw.user {
        Some(user) => Some(DirectConversation { id: raw.id, user }),
        None => {
            debug!(id = %raw.id, "direct conversation without peer user");
            None
        },
    }
}

fn history_message(raw: SlackHistoryMessage) -> Option<HistoryMessage> {
    let ts = raw.origin.ts.to_string();
    let Some(parsed) = parse_ts(&ts) else {
        debug!(%ts, "skipping message with unparsable ts");
        return None;
    };
    Some(HistoryMessage {
        ts: parsed,
        user: raw.sender.user.map(|u| u.to_string()),
        text: raw.content.text.unwrap_or_default(),
    })
}

/// Parse a Slack timestamp (`"1700000000.000100"`) into UTC.
pub fn parse_ts(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, ""));
    let secs: i64 = secs.parse().ok()?;
    let micros: u32 = if frac.is_empty() {
        0
    } else {
        let digits: String = frac.chars().take(6).collect();
        format!("{digits:0<6}").parse().ok()?
    };
    Utc.timestamp_opt(secs, micros * 1_000).single()
}
