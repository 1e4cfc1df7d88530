use crate::types::{EditOptions, HistoryQuery, ListenOptions, MessageOptions};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Name of a remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Login,
    SelectGuild,
    SelectChannel,
    FetchGuild,
    FetchChannel,
    FetchUser,
    FetchMember,
    ShowGuilds,
    ShowChannels,
    ShowMembers,
    SendMessage,
    EditMessage,
    DeleteMessage,
    DeleteMessages,
    ReadChannel,
    UpdatePresence,
    ListenClient,
    ListenGuild,
    ListenChannel,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Login => "login",
            Command::SelectGuild => "selectGuild",
            Command::SelectChannel => "selectChannel",
            Command::FetchGuild => "fetchGuild",
            Command::FetchChannel => "fetchChannel",
            Command::FetchUser => "fetchUser",
            Command::FetchMember => "fetchMember",
            Command::ShowGuilds => "showGuilds",
            Command::ShowChannels => "showChannels",
            Command::ShowMembers => "showMembers",
            Command::SendMessage => "sendMessage",
            Command::EditMessage => "editMessage",
            Command::DeleteMessage => "deleteMessage",
            Command::DeleteMessages => "deleteMessages",
            Command::ReadChannel => "readChannel",
            Command::UpdatePresence => "updatePresence",
            Command::ListenClient => "listenClient",
            Command::ListenGuild => "listenGuild",
            Command::ListenChannel => "listenChannel",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the call stack: an operation and its arguments.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", content = "args", rename_all = "camelCase")]
pub enum EngineCall {
    Login(String),
    SelectGuild(String),
    SelectChannel(String),
    FetchGuild(String),
    FetchChannel(String),
    FetchUser(String),
    FetchMember(String),
    ShowGuilds(Option<String>),
    ShowChannels(Option<String>),
    ShowMembers(Option<String>),
    SendMessage(MessageOptions),
    EditMessage(EditOptions),
    DeleteMessage(String),
    DeleteMessages(HistoryQuery),
    ReadChannel(HistoryQuery),
    UpdatePresence(Value),
    ListenClient(ListenOptions),
    ListenGuild(ListenOptions),
    ListenChannel(ListenOptions),
}

impl EngineCall {
    pub fn command(&self) -> Command {
        match self {
            EngineCall::Login(_) => Command::Login,
            EngineCall::SelectGuild(_) => Command::SelectGuild,
            EngineCall::SelectChannel(_) => Command::SelectChannel,
            EngineCall::FetchGuild(_) => Command::FetchGuild,
            EngineCall::FetchChannel(_) => Command::FetchChannel,
            EngineCall::FetchUser(_) => Command::FetchUser,
            EngineCall::FetchMember(_) => Command::FetchMember,
            EngineCall::ShowGuilds(_) => Command::ShowGuilds,
            EngineCall::ShowChannels(_) => Command::ShowChannels,
            EngineCall::ShowMembers(_) => Command::ShowMembers,
            EngineCall::SendMessage(_) => Command::SendMessage,
            EngineCall::EditMessage(_) => Command::EditMessage,
            EngineCall::DeleteMessage(_) => Command::DeleteMessage,
            EngineCall::DeleteMessages(_) => Command::DeleteMessages,
            EngineCall::ReadChannel(_) => Command::ReadChannel,
            EngineCall::UpdatePresence(_) => Command::UpdatePresence,
            EngineCall::ListenClient(_) => Command::ListenClient,
            EngineCall::ListenGuild(_) => Command::ListenGuild,
            EngineCall::ListenChannel(_) => Command::ListenChannel,
        }
    }
}
