use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Message body shared by `sendMessage` and `editMessage`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageOptions {
    pub content: String,
    pub attachments: Vec<String>,
    pub embeds: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditOptions {
    #[serde(rename = "messageID")]
    pub message_id: String,
    #[serde(rename = "editOptions")]
    pub edit_options: MessageOptions,
}

/// Channel history window used by `readChannel` and `deleteMessages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryQuery {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub around: Option<String>,
}

pub const DEFAULT_READ_LIMIT: u32 = 50;

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_READ_LIMIT,
            before: None,
            after: None,
            around: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventIds {
    #[serde(rename = "guildID", skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(rename = "channelID", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

/// A platform event delivered to a listener.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub name: String,
    pub params: Value,
    pub ids: EventIds,
}

pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

pub fn noop_handler() -> EventHandler {
    Arc::new(|_event| {})
}

#[derive(Clone, Serialize)]
pub struct ListenOptions {
    #[serde(skip)]
    pub handler: EventHandler,
    #[serde(rename = "includeEvents")]
    pub include_events: Vec<String>,
}

impl ListenOptions {
    pub fn accepts(&self, event: &str) -> bool {
        self.include_events.iter().any(|name| name == event)
    }
}

impl fmt::Debug for ListenOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ListenOptions")
            .field("include_events", &self.include_events)
            .finish_non_exhaustive()
    }
}

/// Events a listener receives unless narrowed by INCLUDE or EXCLUDE.
pub const DEFAULT_EVENTS: [&str; 50] = [
    "channelCreate",
    "channelDelete",
    "channelPinsUpdate",
    "channelUpdate",
    "debug",
    "warn",
    "disconnect",
    "emojiCreate",
    "emojiDelete",
    "emojiUpdate",
    "error",
    "guildBanAdd",
    "guildBanRemove",
    "guildCreate",
    "guildDelete",
    "guildUnavailable",
    "guildIntegrationsUpdate",
    "guildMemberAdd",
    "guildMemberAvailable",
    "guildMemberRemove",
    "guildMembersChunk",
    "guildMemberSpeaking",
    "guildMemberUpdate",
    "guildUpdate",
    "inviteCreate",
    "inviteDelete",
    "message",
    "messageDelete",
    "messageReactionRemoveAll",
    "messageReactionRemoveEmoji",
    "messageDeleteBulk",
    "messageReactionAdd",
    "messageReactionRemove",
    "messageUpdate",
    "presenceUpdate",
    "rateLimit",
    "ready",
    "invalidated",
    "roleCreate",
    "roleDelete",
    "roleUpdate",
    "typingStart",
    "userUpdate",
    "voiceStateUpdate",
    "webhookUpdate",
    "shardDisconnect",
    "shardError",
    "shardReady",
    "shardReconnecting",
    "shardResume",
];
