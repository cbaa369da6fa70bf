//! In-memory id → display-name directory, rebuilt on every connection.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {
    slackntell_channels::{
        ChatPlatform, Conversation, ConversationKind, DirectConversation, User,
    },
    tracing::info,
};

use crate::error::{Error, Result};

/// Display name used when an id cannot be resolved.
pub const UNKNOWN: &str = "unknown";

/// Snapshot of users, channels, groups and direct conversations.
///
/// Immutable once built; a reconnect builds and publishes a new one.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    users: HashMap<String, String>,
    channels: HashMap<String, String>,
    groups: HashMap<String, String>,
    /// Direct conversation id → peer user id.
    direct: HashMap<String, String>,
}

impl Directory {
    pub fn new(
        users: Vec<User>,
        channels: Vec<Conversation>,
        groups: Vec<Conversation>,
        direct: Vec<DirectConversation>,
    ) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.id, u.name)).collect(),
            channels: channels.into_iter().map(|c| (c.id, c.name)).collect(),
            groups: groups.into_iter().map(|g| (g.id, g.name)).collect(),
            direct: direct.into_iter().map(|d| (d.id, d.user)).collect(),
        }
    }

    /// Issue the four bulk listings concurrently. Any failure fails the
    /// whole load.
    pub async fn load(platform: &dyn ChatPlatform) -> Result<Self> {
        let (users, channels, groups, direct) = tokio::try_join!(
            platform.list_users(),
            platform.list_channels(),
            platform.list_groups(),
            platform.list_direct_conversations(),
        )
        .map_err(|source| Error::Directory { source })?;

        let directory = Self::new(users, channels, groups, direct);
        info!(
            users = directory.users.len(),
            channels = directory.channels.len(),
            groups = directory.groups.len(),
            direct = directory.direct.len(),
            "directory loaded"
        );
        Ok(directory)
    }

    /// Display name for any id, or `None` when nothing matches.
    ///
    /// A direct conversation resolves to its peer user's name.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.resolve_named(id).or_else(|| {
            let peer = self.direct.get(id)?;
            self.resolve_named(peer)
        })
    }

    /// Like [`Directory::resolve`], falling back to [`UNKNOWN`].
    pub fn display_name(&self, id: Option<&str>) -> &str {
        id.and_then(|id| self.resolve(id)).unwrap_or(UNKNOWN)
    }

    fn resolve_named(&self, id: &str) -> Option<&str> {
        self.users
            .get(id)
            .or_else(|| self.channels.get(id))
            .or_else(|| self.groups.get(id))
            .map(String::as_str)
    }

    /// Which history query applies to `id`.
    pub fn kind_of(&self, id: &str) -> Option<ConversationKind> {
        if self.channels.contains_key(id) {
            Some(ConversationKind::Channel)
        } else if self.groups.contains_key(id) {
            Some(ConversationKind::Group)
        } else if self.direct.contains_key(id) {
            Some(ConversationKind::Direct)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.channels.is_empty()
            && self.groups.is_empty()
            && self.direct.is_empty()
    }
}

/// Shared slot holding the currently published [`Directory`].
#[derive(Debug, Clone, Default)]
pub struct DirectoryHandle {
    current: Arc<RwLock<Arc<Directory>>>,
}

impl DirectoryHandle {
    pub fn publish(&self, directory: Directory) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(directory);
    }

    /// The latest published directory. Cheap; readers never block writers
    /// for longer than an `Arc` clone.
    pub fn snapshot(&self) -> Arc<Directory> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }
}
