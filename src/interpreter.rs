use crate::call::{Command, EngineCall};
use crate::compiler::{is_snowflake, is_token, Compiler};
use crate::error::{DqlError, ParseError, RuntimeError};
use crate::gateway::{dispatch, Gateway, GatewayError};
use crate::token::Kind;
use crate::types::{Event, EventHandler};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub type CallbackHandler = Box<dyn FnMut(Command, &Value) + Send>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpreterState {
    pub connection_established: bool,
    pub selected_guild: Option<String>,
    pub selected_channel: Option<String>,
    /// Print raw payloads instead of formatted ones. Flipped by RAW.
    pub raw: bool,
}

/// Compiles DQL into a queue of calls and drains it against a gateway.
pub struct Interpreter<G: Gateway> {
    gateway: G,
    call_stack: VecDeque<EngineCall>,
    state: InterpreterState,
    listener: EventHandler,
    callback: CallbackHandler,
}

impl<G: Gateway> Interpreter<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            call_stack: VecDeque::new(),
            state: InterpreterState::default(),
            listener: crate::types::noop_handler(),
            callback: Box::new(|_command, _value| {}),
        }
    }

    /// Handler that LISTEN statements parsed from now on will deliver events to.
    pub fn with_listener(mut self, listener: impl Fn(Event) + Send + Sync + 'static) -> Self {
        self.listener = Arc::new(listener);
        self
    }

    /// Invoked with the result of every call drained from the stack.
    pub fn with_callback(mut self, callback: impl FnMut(Command, &Value) + Send + 'static) -> Self {
        self.callback = Box::new(callback);
        self
    }

    pub fn state(&self) -> &InterpreterState {
        &self.state
    }

    pub fn call_stack(&self) -> &VecDeque<EngineCall> {
        &self.call_stack
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Compiles `source` and appends its calls to the stack. On error the
    /// stack and the raw flag are left untouched.
    pub fn parse(&mut self, source: &str) -> Result<(), ParseError> {
        let script = Compiler::new(self.listener.clone()).compile_script(source)?;

        if script.raw_toggles % 2 == 1 {
            self.state.raw = !self.state.raw;
        }
        debug!(calls = script.calls.len(), raw = self.state.raw, "queued calls");
        self.call_stack.extend(script.calls);
        Ok(())
    }

    /// Connects and selects as requested, then drains the call stack in
    /// order. Any failure, including the startup login or selection, empties
    /// the stack. Runtime errors carry the state at the time of failure.
    pub async fn execute(
        &mut self,
        close_on_finish: bool,
        token: Option<&str>,
        guild_id: Option<&str>,
        channel_id: Option<&str>,
    ) -> Result<(), DqlError> {
        let result = self.run(token, guild_id, channel_id).await;
        if let Err(err) = &result {
            let discarded = self.call_stack.len();
            self.call_stack.clear();
            error!(%err, discarded, "execution failed, call stack cleared");
        }
        if close_on_finish {
            self.close().await;
        }
        result
    }

    async fn run(
        &mut self,
        token: Option<&str>,
        guild_id: Option<&str>,
        channel_id: Option<&str>,
    ) -> Result<(), DqlError> {
        if let Some(token) = token {
            if !self.state.connection_established {
                if !is_token(token) {
                    return Err(ParseError::new(0, Kind::t).into());
                }
                self.call(EngineCall::Login(token.to_string())).await?;
            }
        }

        if let Some(guild_id) = guild_id {
            if is_snowflake(guild_id) {
                self.call(EngineCall::SelectGuild(guild_id.to_string())).await?;
            } else {
                warn!(guild_id, "ignoring invalid guild ID");
            }
        }

        if let Some(channel_id) = channel_id {
            if is_snowflake(channel_id) {
                self.call(EngineCall::SelectChannel(channel_id.to_string())).await?;
            } else {
                warn!(channel_id, "ignoring invalid channel ID");
            }
        }

        while let Some(call) = self.call_stack.pop_front() {
            let command = call.command();
            let value = self.call(call).await?;
            (self.callback)(command, &value);
        }

        Ok(())
    }

    async fn call(&mut self, call: EngineCall) -> Result<Value, RuntimeError> {
        let command = call.command();
        let selection = match &call {
            EngineCall::SelectGuild(id) | EngineCall::SelectChannel(id) => Some(id.clone()),
            _ => None,
        };

        debug!(%command, "calling gateway");
        match dispatch(&mut self.gateway, call).await {
            Ok(value) => {
                match command {
                    Command::Login => self.state.connection_established = true,
                    Command::SelectGuild => self.state.selected_guild = selection,
                    Command::SelectChannel => self.state.selected_channel = selection,
                    _ => {}
                }
                Ok(value)
            }
            Err(err) => Err(self.runtime_error(command, err)),
        }
    }

    fn runtime_error(&self, command: Command, source: GatewayError) -> RuntimeError {
        RuntimeError {
            command,
            connection_established: self.state.connection_established,
            guild_selected: self.state.selected_guild.is_some(),
            channel_selected: self.state.selected_channel.is_some(),
            source: Some(source),
        }
    }

    /// Drops the current connection and logs in again with the same token.
    /// Returns whether a reconnect was attempted.
    pub async fn reload(&mut self) -> Result<bool, RuntimeError> {
        if !self.state.connection_established {
            return Ok(false);
        }
        let token = match self.gateway.token() {
            Some(token) => token,
            None => return Ok(false),
        };

        info!("reloading connection");
        self.close().await;
        self.call(EngineCall::Login(token)).await?;

        if let Some(guild_id) = self.state.selected_guild.clone() {
            self.call(EngineCall::SelectGuild(guild_id)).await?;
        }
        if let Some(channel_id) = self.state.selected_channel.clone() {
            self.call(EngineCall::SelectChannel(channel_id)).await?;
        }
        Ok(true)
    }

    /// Tears down the connection. The selections stay in the state and are
    /// selected again by `reload`.
    pub async fn close(&mut self) {
        if let Err(err) = self.gateway.destroy().await {
            warn!(%err, "failed to close connection");
        }
        self.state.connection_established = false;
    }
}
