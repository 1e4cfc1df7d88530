use async_trait::async_trait;
use dql::call::Command;
use dql::error::DqlError;
use dql::gateway::{EchoGateway, Gateway, GatewayError};
use dql::interpreter::Interpreter;
use dql::types::{EditOptions, HistoryQuery, ListenOptions, MessageOptions};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const TOKEN: &str = "AAAAAAAAAAAAAAAAAAAAAAAA.BBBBBB.CCCCCCCCCCCCCCCCCCCCCCCCCCC";
const GUILD: &str = "364140226775784869";
const CHANNEL: &str = "228666916018118541";
const MESSAGE: &str = "343341358242773387";

/// Records every call it receives and fails the first call to `fail_on`.
#[derive(Default)]
struct ScriptedGateway {
    calls: Arc<Mutex<Vec<Command>>>,
    fail_on: Option<Command>,
    token: Option<String>,
    destroyed: usize,
}

impl ScriptedGateway {
    fn failing_on(command: Command) -> Self {
        Self {
            fail_on: Some(command),
            ..Self::default()
        }
    }

    fn record(&mut self, command: Command) -> Result<Value, GatewayError> {
        self.calls.lock().unwrap().push(command);
        if self.fail_on == Some(command) {
            self.fail_on = None;
            return Err(GatewayError::Api {
                status: 500,
                message: format!("{command} exploded"),
            });
        }
        Ok(json!({ "command": command.as_str() }))
    }

    fn seen(&self) -> Vec<Command> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    async fn login(&mut self, token: &str) -> Result<Value, GatewayError> {
        let value = self.record(Command::Login)?;
        self.token = Some(token.to_string());
        Ok(value)
    }

    async fn destroy(&mut self) -> Result<(), GatewayError> {
        self.destroyed += 1;
        self.token = None;
        Ok(())
    }

    async fn select_guild(&mut self, _guild_id: &str) -> Result<Value, GatewayError> {
        self.record(Command::SelectGuild)
    }

    async fn select_channel(&mut self, _channel_id: &str) -> Result<Value, GatewayError> {
        self.record(Command::SelectChannel)
    }

    async fn fetch_guild(&mut self, _guild_id: &str) -> Result<Value, GatewayError> {
        self.record(Command::FetchGuild)
    }

    async fn fetch_channel(&mut self, _channel_id: &str) -> Result<Value, GatewayError> {
        self.record(Command::FetchChannel)
    }

    async fn fetch_user(&mut self, _user_id: &str) -> Result<Value, GatewayError> {
        self.record(Command::FetchUser)
    }

    async fn fetch_member(&mut self, _user_id: &str) -> Result<Value, GatewayError> {
        self.record(Command::FetchMember)
    }

    async fn show_guilds(&mut self, _search: Option<&str>) -> Result<Value, GatewayError> {
        self.record(Command::ShowGuilds)
    }

    async fn show_channels(&mut self, _search: Option<&str>) -> Result<Value, GatewayError> {
        self.record(Command::ShowChannels)
    }

    async fn show_members(&mut self, _search: Option<&str>) -> Result<Value, GatewayError> {
        self.record(Command::ShowMembers)
    }

    async fn send_message(&mut self, _options: &MessageOptions) -> Result<Value, GatewayError> {
        self.record(Command::SendMessage)
    }

    async fn edit_message(&mut self, _options: &EditOptions) -> Result<Value, GatewayError> {
        self.record(Command::EditMessage)
    }

    async fn delete_message(&mut self, _message_id: &str) -> Result<Value, GatewayError> {
        self.record(Command::DeleteMessage)
    }

    async fn delete_messages(&mut self, _query: &HistoryQuery) -> Result<Value, GatewayError> {
        self.record(Command::DeleteMessages)
    }

    async fn read_channel(&mut self, _query: &HistoryQuery) -> Result<Value, GatewayError> {
        self.record(Command::ReadChannel)
    }

    async fn update_presence(&mut self, _presence: &Value) -> Result<Value, GatewayError> {
        self.record(Command::UpdatePresence)
    }

    async fn listen_client(&mut self, _options: ListenOptions) -> Result<Value, GatewayError> {
        self.record(Command::ListenClient)
    }

    async fn listen_guild(&mut self, _options: ListenOptions) -> Result<Value, GatewayError> {
        self.record(Command::ListenGuild)
    }

    async fn listen_channel(&mut self, _options: ListenOptions) -> Result<Value, GatewayError> {
        self.record(Command::ListenChannel)
    }
}

#[tokio::test]
async fn drains_in_order_and_reports_each_result() {
    let results = Arc::new(Mutex::new(Vec::new()));
    let sink = results.clone();
    let mut interpreter = Interpreter::new(ScriptedGateway::default())
        .with_callback(move |command, value| sink.lock().unwrap().push((command, value.clone())));

    interpreter
        .parse(&format!("USE \"{GUILD}\"g; SHOW; READ \"{CHANNEL}\"c LIMIT 3;"))
        .unwrap();
    interpreter.execute(false, Some(TOKEN), None, None).await.unwrap();

    assert!(interpreter.call_stack().is_empty());
    assert_eq!(
        interpreter.gateway().seen(),
        vec![
            Command::Login,
            Command::SelectGuild,
            Command::ShowGuilds,
            Command::SelectChannel,
            Command::ReadChannel,
        ]
    );

    // The startup login is not part of the stack, so the callback skips it.
    let results = results.lock().unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[1].0, Command::ShowGuilds);
    assert_eq!(results[1].1["command"], "showGuilds");
}

#[tokio::test]
async fn failure_clears_the_rest_of_the_stack() {
    let mut interpreter = Interpreter::new(ScriptedGateway::failing_on(Command::SelectChannel));
    interpreter
        .parse(&format!(
            "SHOW; SEND \"a\" IN \"{CHANNEL}\"c; DELETE \"{MESSAGE}\"m;"
        ))
        .unwrap();
    assert_eq!(interpreter.call_stack().len(), 4);

    let err = interpreter
        .execute(false, Some(TOKEN), None, None)
        .await
        .unwrap_err();

    let err = match err {
        DqlError::Runtime(err) => err,
        other => panic!("expected a runtime error, got {other:?}"),
    };
    assert_eq!(err.command, Command::SelectChannel);
    assert!(err.connection_established);
    assert!(!err.channel_selected);
    assert!(err.to_string().contains("selectChannel exploded"));

    assert!(interpreter.call_stack().is_empty());
    assert_eq!(
        interpreter.gateway().seen(),
        vec![Command::Login, Command::ShowGuilds, Command::SelectChannel]
    );
}

#[tokio::test]
async fn state_survives_a_failure() {
    let mut interpreter = Interpreter::new(ScriptedGateway::failing_on(Command::SendMessage));
    interpreter
        .parse(&format!("USE \"{GUILD}\"g \"{CHANNEL}\"c; SEND \"hi\";"))
        .unwrap();
    assert!(interpreter.execute(false, Some(TOKEN), None, None).await.is_err());

    let state = interpreter.state();
    assert!(state.connection_established);
    assert_eq!(state.selected_guild.as_deref(), Some(GUILD));
    assert_eq!(state.selected_channel.as_deref(), Some(CHANNEL));

    // A corrective statement runs against the kept state.
    interpreter.parse("SEND \"again\";").unwrap();
    interpreter.execute(false, None, None, None).await.unwrap();
    assert_eq!(interpreter.gateway().seen().last(), Some(&Command::SendMessage));
}

#[tokio::test]
async fn default_ids_are_selected_and_invalid_ones_skipped() {
    let mut interpreter = Interpreter::new(ScriptedGateway::default());
    interpreter
        .execute(false, Some(TOKEN), Some(GUILD), Some("not-a-channel"))
        .await
        .unwrap();

    assert_eq!(
        interpreter.gateway().seen(),
        vec![Command::Login, Command::SelectGuild]
    );
    assert_eq!(interpreter.state().selected_guild.as_deref(), Some(GUILD));
    assert_eq!(interpreter.state().selected_channel, None);
}

#[tokio::test]
async fn close_on_finish_tears_down_even_on_failure() {
    let mut interpreter = Interpreter::new(ScriptedGateway::failing_on(Command::ShowGuilds));
    interpreter.parse(&format!("USE \"{GUILD}\"g; SHOW;")).unwrap();
    assert!(interpreter.execute(true, Some(TOKEN), None, None).await.is_err());

    assert_eq!(interpreter.gateway().destroyed, 1);
    assert!(!interpreter.state().connection_established);
    assert_eq!(interpreter.state().selected_guild.as_deref(), Some(GUILD));
}

#[tokio::test]
async fn reload_logs_in_again_with_the_same_token() {
    let mut interpreter = Interpreter::new(ScriptedGateway::default());
    assert!(!interpreter.reload().await.unwrap());

    interpreter.execute(false, Some(TOKEN), None, None).await.unwrap();
    assert!(interpreter.reload().await.unwrap());

    assert_eq!(interpreter.gateway().destroyed, 1);
    assert_eq!(interpreter.gateway().token().as_deref(), Some(TOKEN));
    assert!(interpreter.state().connection_established);
    assert_eq!(
        interpreter.gateway().seen(),
        vec![Command::Login, Command::Login]
    );
}

#[tokio::test]
async fn echo_gateway_reports_unmet_preconditions() {
    let mut interpreter = Interpreter::new(EchoGateway::new());
    interpreter.parse("SEND \"hello\";").unwrap();

    let err = interpreter
        .execute(false, Some(TOKEN), None, None)
        .await
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("error running sendMessage: no channel selected"));
    assert!(text.contains("Client: connected"));
    assert!(text.contains("Channel: not selected"));
}

#[tokio::test]
async fn echo_gateway_round_trip() {
    let mut interpreter = Interpreter::new(EchoGateway::new());
    interpreter
        .parse(&format!(
            "SEND \"one\" IN \"{CHANNEL}\"c; SEND \"two\"; READ \"{CHANNEL}\"c LIMIT 1;"
        ))
        .unwrap();
    interpreter
        .execute(false, Some(TOKEN), Some(GUILD), None)
        .await
        .unwrap();

    let messages = interpreter.gateway().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].options.content, "two\n");
    assert_eq!(interpreter.gateway().selected_channel(), Some(CHANNEL));
}

#[tokio::test]
async fn listen_events_reach_the_listener() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let mut interpreter = Interpreter::new(EchoGateway::new())
        .with_listener(move |event| sink.lock().unwrap().push(event.name));

    interpreter.parse("LISTEN INCLUDE \"ready\";").unwrap();
    interpreter.execute(false, Some(TOKEN), None, None).await.unwrap();

    let ready = dql::types::Event {
        name: "ready".into(),
        params: json!({}),
        ids: Default::default(),
    };
    let typing = dql::types::Event {
        name: "typingStart".into(),
        ..ready.clone()
    };
    assert_eq!(interpreter.gateway().emit(ready), 1);
    assert_eq!(interpreter.gateway().emit(typing), 0);
    assert_eq!(*events.lock().unwrap(), vec!["ready".to_string()]);
}
