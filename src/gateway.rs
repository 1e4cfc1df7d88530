//! The boundary to the chat platform. The interpreter only talks to a
//! [`Gateway`]; [`EchoGateway`] is an offline implementation used for dry
//! runs and tests.

use crate::call::{Command, EngineCall};
use crate::compiler::{is_snowflake, is_token};
use crate::history::{self, MessageHistory, PageRequest};
use crate::types::{EditOptions, Event, HistoryQuery, ListenOptions, MessageOptions};
use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("client is not connected")]
    NotConnected,
    #[error("no guild selected")]
    NoGuildSelected,
    #[error("no channel selected")]
    NoChannelSelected,
    #[error("invalid {kind} ID: {id}")]
    InvalidId { kind: &'static str, id: String },
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("{0}")]
    Other(String),
}

/// One async method per remote operation. Every method resolves to the JSON
/// payload the platform answered with.
#[async_trait]
pub trait Gateway: Send {
    /// Token of the current session, if any.
    fn token(&self) -> Option<String>;

    async fn login(&mut self, token: &str) -> Result<Value, GatewayError>;
    /// Tears down the connection. Safe to call when not connected.
    async fn destroy(&mut self) -> Result<(), GatewayError>;

    async fn select_guild(&mut self, guild_id: &str) -> Result<Value, GatewayError>;
    async fn select_channel(&mut self, channel_id: &str) -> Result<Value, GatewayError>;

    async fn fetch_guild(&mut self, guild_id: &str) -> Result<Value, GatewayError>;
    async fn fetch_channel(&mut self, channel_id: &str) -> Result<Value, GatewayError>;
    async fn fetch_user(&mut self, user_id: &str) -> Result<Value, GatewayError>;
    async fn fetch_member(&mut self, user_id: &str) -> Result<Value, GatewayError>;

    async fn show_guilds(&mut self, search: Option<&str>) -> Result<Value, GatewayError>;
    async fn show_channels(&mut self, search: Option<&str>) -> Result<Value, GatewayError>;
    async fn show_members(&mut self, search: Option<&str>) -> Result<Value, GatewayError>;

    async fn send_message(&mut self, options: &MessageOptions) -> Result<Value, GatewayError>;
    async fn edit_message(&mut self, options: &EditOptions) -> Result<Value, GatewayError>;
    async fn delete_message(&mut self, message_id: &str) -> Result<Value, GatewayError>;
    async fn delete_messages(&mut self, query: &HistoryQuery) -> Result<Value, GatewayError>;
    async fn read_channel(&mut self, query: &HistoryQuery) -> Result<Value, GatewayError>;

    async fn update_presence(&mut self, presence: &Value) -> Result<Value, GatewayError>;

    async fn listen_client(&mut self, options: ListenOptions) -> Result<Value, GatewayError>;
    async fn listen_guild(&mut self, options: ListenOptions) -> Result<Value, GatewayError>;
    async fn listen_channel(&mut self, options: ListenOptions) -> Result<Value, GatewayError>;
}

/// Routes a call record to the matching gateway method.
pub async fn dispatch<G: Gateway + ?Sized>(
    gateway: &mut G,
    call: EngineCall,
) -> Result<Value, GatewayError> {
    match call {
        EngineCall::Login(token) => gateway.login(&token).await,
        EngineCall::SelectGuild(id) => gateway.select_guild(&id).await,
        EngineCall::SelectChannel(id) => gateway.select_channel(&id).await,
        EngineCall::FetchGuild(id) => gateway.fetch_guild(&id).await,
        EngineCall::FetchChannel(id) => gateway.fetch_channel(&id).await,
        EngineCall::FetchUser(id) => gateway.fetch_user(&id).await,
        EngineCall::FetchMember(id) => gateway.fetch_member(&id).await,
        EngineCall::ShowGuilds(search) => gateway.show_guilds(search.as_deref()).await,
        EngineCall::ShowChannels(search) => gateway.show_channels(search.as_deref()).await,
        EngineCall::ShowMembers(search) => gateway.show_members(search.as_deref()).await,
        EngineCall::SendMessage(options) => gateway.send_message(&options).await,
        EngineCall::EditMessage(options) => gateway.edit_message(&options).await,
        EngineCall::DeleteMessage(id) => gateway.delete_message(&id).await,
        EngineCall::DeleteMessages(query) => gateway.delete_messages(&query).await,
        EngineCall::ReadChannel(query) => gateway.read_channel(&query).await,
        EngineCall::UpdatePresence(presence) => gateway.update_presence(&presence).await,
        EngineCall::ListenClient(options) => gateway.listen_client(options).await,
        EngineCall::ListenGuild(options) => gateway.listen_guild(options).await,
        EngineCall::ListenChannel(options) => gateway.listen_channel(options).await,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: String,
    pub channel_id: String,
    pub options: MessageOptions,
}

/// Offline gateway. Enforces the same connection and selection
/// preconditions as a live client and keeps sent messages in memory so
/// history reads and deletes behave like the real thing.
#[derive(Debug, Default)]
pub struct EchoGateway {
    token: Option<String>,
    guild: Option<String>,
    channel: Option<String>,
    /// Newest first, like platform history pages.
    messages: Vec<StoredMessage>,
    next_id: u64,
    listeners: Vec<(Command, Option<String>, ListenOptions)>,
    presence: Option<Value>,
}

const FIRST_MESSAGE_ID: u64 = 900_000_000_000_000_000;

impl EchoGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_guild(&self) -> Option<&str> {
        self.guild.as_deref()
    }

    pub fn selected_channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn messages(&self) -> &[StoredMessage] {
        &self.messages
    }

    pub fn presence(&self) -> Option<&Value> {
        self.presence.as_ref()
    }

    /// Delivers `event` to every listener whose scope and event list match.
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: Event) -> usize {
        let mut delivered = 0;
        for (command, scope, options) in &self.listeners {
            let in_scope = match command {
                Command::ListenGuild => event.ids.guild_id == *scope,
                Command::ListenChannel => event.ids.channel_id == *scope,
                _ => true,
            };
            if in_scope && options.accepts(&event.name) {
                (options.handler)(event.clone());
                delivered += 1;
            }
        }
        delivered
    }

    fn connected(&self) -> Result<(), GatewayError> {
        match self.token {
            Some(_) => Ok(()),
            None => Err(GatewayError::NotConnected),
        }
    }

    fn guild(&self) -> Result<String, GatewayError> {
        self.connected()?;
        self.guild.clone().ok_or(GatewayError::NoGuildSelected)
    }

    fn channel(&self) -> Result<String, GatewayError> {
        self.connected()?;
        self.channel.clone().ok_or(GatewayError::NoChannelSelected)
    }

    fn listen(
        &mut self,
        command: Command,
        scope: Option<String>,
        options: ListenOptions,
    ) -> Result<Value, GatewayError> {
        self.connected()?;
        let events = options.include_events.clone();
        debug!(%command, events = events.len(), "registered listener");
        self.listeners.push((command, scope.clone(), options));
        Ok(json!({ "scope": scope, "includeEvents": events }))
    }

    fn channel_messages(&self, channel_id: &str) -> Vec<&StoredMessage> {
        self.messages
            .iter()
            .filter(|message| message.channel_id == channel_id)
            .collect()
    }
}

fn snowflake(kind: &'static str, id: &str) -> Result<(), GatewayError> {
    if is_snowflake(id) {
        Ok(())
    } else {
        Err(GatewayError::InvalidId {
            kind,
            id: id.to_string(),
        })
    }
}

fn message_json(message: &StoredMessage) -> Value {
    json!({
        "id": message.id,
        "channelID": message.channel_id,
        "content": message.options.content,
        "attachments": message.options.attachments,
        "embeds": message.options.embeds,
    })
}

fn search_filter(search: Option<&str>, name: &str) -> bool {
    search.map_or(true, |s| name.to_lowercase().contains(&s.to_lowercase()))
}

#[async_trait]
impl Gateway for EchoGateway {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    async fn login(&mut self, token: &str) -> Result<Value, GatewayError> {
        if !is_token(token) {
            return Err(GatewayError::Api {
                status: 401,
                message: String::from("An invalid token was provided."),
            });
        }
        self.token = Some(token.to_string());
        info!("logged in");
        Ok(json!({ "ready": true }))
    }

    async fn destroy(&mut self) -> Result<(), GatewayError> {
        if self.token.take().is_some() {
            info!("connection closed");
        }
        self.guild = None;
        self.channel = None;
        self.listeners.clear();
        Ok(())
    }

    async fn select_guild(&mut self, guild_id: &str) -> Result<Value, GatewayError> {
        self.connected()?;
        snowflake("guild", guild_id)?;
        self.guild = Some(guild_id.to_string());
        Ok(json!({ "id": guild_id }))
    }

    async fn select_channel(&mut self, channel_id: &str) -> Result<Value, GatewayError> {
        self.connected()?;
        snowflake("channel", channel_id)?;
        self.channel = Some(channel_id.to_string());
        Ok(json!({ "id": channel_id, "guildID": self.guild }))
    }

    async fn fetch_guild(&mut self, guild_id: &str) -> Result<Value, GatewayError> {
        self.connected()?;
        snowflake("guild", guild_id)?;
        Ok(json!({ "id": guild_id }))
    }

    async fn fetch_channel(&mut self, channel_id: &str) -> Result<Value, GatewayError> {
        self.connected()?;
        snowflake("channel", channel_id)?;
        Ok(json!({ "id": channel_id }))
    }

    async fn fetch_user(&mut self, user_id: &str) -> Result<Value, GatewayError> {
        self.connected()?;
        snowflake("user", user_id)?;
        Ok(json!({ "id": user_id }))
    }

    async fn fetch_member(&mut self, user_id: &str) -> Result<Value, GatewayError> {
        let guild = self.guild()?;
        snowflake("user", user_id)?;
        Ok(json!({ "id": user_id, "guildID": guild }))
    }

    async fn show_guilds(&mut self, search: Option<&str>) -> Result<Value, GatewayError> {
        self.connected()?;
        let guilds: Vec<&String> = self
            .guild
            .iter()
            .filter(|id| search_filter(search, id))
            .collect();
        Ok(json!(guilds))
    }

    async fn show_channels(&mut self, search: Option<&str>) -> Result<Value, GatewayError> {
        self.guild()?;
        let channels: Vec<&String> = self
            .channel
            .iter()
            .filter(|id| search_filter(search, id))
            .collect();
        Ok(json!(channels))
    }

    async fn show_members(&mut self, _search: Option<&str>) -> Result<Value, GatewayError> {
        self.guild()?;
        Ok(json!([]))
    }

    async fn send_message(&mut self, options: &MessageOptions) -> Result<Value, GatewayError> {
        let channel_id = self.channel()?;
        let message = StoredMessage {
            id: (FIRST_MESSAGE_ID + self.next_id).to_string(),
            channel_id,
            options: options.clone(),
        };
        self.next_id += 1;
        let value = message_json(&message);
        self.messages.insert(0, message);
        Ok(value)
    }

    async fn edit_message(&mut self, options: &EditOptions) -> Result<Value, GatewayError> {
        let channel_id = self.channel()?;
        snowflake("message", &options.message_id)?;
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == options.message_id && m.channel_id == channel_id)
            .ok_or_else(|| GatewayError::NotFound {
                what: "message",
                id: options.message_id.clone(),
            })?;
        message.options = options.edit_options.clone();
        Ok(message_json(message))
    }

    async fn delete_message(&mut self, message_id: &str) -> Result<Value, GatewayError> {
        let channel_id = self.channel()?;
        snowflake("message", message_id)?;
        let position = self
            .messages
            .iter()
            .position(|m| m.id == message_id && m.channel_id == channel_id)
            .ok_or_else(|| GatewayError::NotFound {
                what: "message",
                id: message_id.to_string(),
            })?;
        Ok(message_json(&self.messages.remove(position)))
    }

    async fn delete_messages(&mut self, query: &HistoryQuery) -> Result<Value, GatewayError> {
        self.channel()?;
        let deleted = history::delete_history(self, query).await?;
        Ok(json!(deleted))
    }

    async fn read_channel(&mut self, query: &HistoryQuery) -> Result<Value, GatewayError> {
        self.channel()?;
        let messages = history::collect_history(self, query).await?;
        Ok(Value::Array(messages.iter().map(message_json).collect()))
    }

    async fn update_presence(&mut self, presence: &Value) -> Result<Value, GatewayError> {
        self.connected()?;
        self.presence = Some(presence.clone());
        Ok(presence.clone())
    }

    async fn listen_client(&mut self, options: ListenOptions) -> Result<Value, GatewayError> {
        self.listen(Command::ListenClient, None, options)
    }

    async fn listen_guild(&mut self, options: ListenOptions) -> Result<Value, GatewayError> {
        let guild = self.guild()?;
        self.listen(Command::ListenGuild, Some(guild), options)
    }

    async fn listen_channel(&mut self, options: ListenOptions) -> Result<Value, GatewayError> {
        let channel = self.channel()?;
        self.listen(Command::ListenChannel, Some(channel), options)
    }
}

#[async_trait]
impl MessageHistory for EchoGateway {
    type Item = StoredMessage;

    fn item_id(item: &StoredMessage) -> String {
        item.id.clone()
    }

    async fn fetch_page(&mut self, request: PageRequest) -> Result<Vec<StoredMessage>, GatewayError> {
        let channel_id = self.channel()?;
        let history = self.channel_messages(&channel_id);
        // IDs are equal-length decimal strings, so string order is numeric order.
        let page = match &request.around {
            Some(around) => {
                let center = history.iter().position(|m| m.id == *around).unwrap_or(0);
                let half = request.limit as usize / 2;
                history
                    .iter()
                    .skip(center.saturating_sub(half))
                    .take(request.limit as usize)
                    .map(|m| (*m).clone())
                    .collect()
            }
            None => history
                .iter()
                .filter(|m| request.before.as_ref().map_or(true, |b| m.id < *b))
                .filter(|m| request.after.as_ref().map_or(true, |a| m.id > *a))
                .take(request.limit as usize)
                .map(|m| (*m).clone())
                .collect(),
        };
        Ok(page)
    }

    async fn delete_batch(&mut self, ids: Vec<String>) -> Result<(), GatewayError> {
        self.channel()?;
        self.messages.retain(|m| !ids.contains(&m.id));
        Ok(())
    }
}
