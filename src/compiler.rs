use crate::call::EngineCall;
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::semantic::{normalize, AnnotatedValue, SemanticCommand};
use crate::token::{Kind, Separator};
use crate::types::{
    EditOptions, EventHandler, HistoryQuery, ListenOptions, MessageOptions, DEFAULT_EVENTS,
};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

static SNOWFLAKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{18}$").unwrap());

static BOT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]{24,}\.[\w-]{6}\.[\w-]{27,}$").unwrap());

static UNSIGNED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// Platform IDs are 18 decimal digits.
pub fn is_snowflake(value: &str) -> bool {
    SNOWFLAKE.is_match(value)
}

pub fn is_token(value: &str) -> bool {
    BOT_TOKEN.is_match(value)
}

/// Output of compiling a whole source text.
#[derive(Debug, Default)]
pub struct Script {
    pub calls: Vec<EngineCall>,
    /// Number of RAW statements seen. Each one flips the raw flag.
    pub raw_toggles: usize,
}

pub struct Compiler {
    listener: EventHandler,
}

impl Compiler {
    pub fn new(listener: EventHandler) -> Self {
        Self { listener }
    }

    /// Lexes, parses and compiles `source`. Nothing is returned unless every
    /// statement compiles.
    pub fn compile_script(&self, source: &str) -> Result<Script, ParseError> {
        let tokens = Lexer::new(source).tokenize();
        let statements = Parser::new(tokens).parse()?;

        let mut script = Script::default();
        for statement in &statements {
            let command = normalize(statement);
            if command.command.key == Kind::Raw {
                script.raw_toggles += 1;
                continue;
            }
            script.calls.extend(self.compile(&command)?);
        }

        debug!(
            statements = statements.len(),
            calls = script.calls.len(),
            "compiled script"
        );
        Ok(script)
    }

    pub fn compile(&self, command: &SemanticCommand) -> Result<Vec<EngineCall>, ParseError> {
        let separator = match Separator::from_kind(command.command.key) {
            Some(separator) => separator,
            None => return Err(ParseError::new(command.command.index, Kind::Error)),
        };

        validate_annotated(command)?;

        match separator {
            Separator::Use => compile_use(command),
            Separator::Listen => self.compile_listen(command),
            Separator::Fetch => compile_fetch(command),
            Separator::Read => compile_read(command),
            Separator::Delete => compile_delete(command),
            Separator::Send => compile_send(command),
            Separator::Edit => compile_edit(command),
            Separator::Show => compile_show(command),
            Separator::Presence => compile_presence(command),
            Separator::Raw => Ok(Vec::new()),
        }
    }

    fn compile_listen(&self, command: &SemanticCommand) -> Result<Vec<EngineCall>, ParseError> {
        let mut calls = Vec::new();
        let scope = match &command.target {
            None => Kind::Listen,
            Some(target) => match target.annotation {
                Some(Kind::g) => {
                    calls.push(EngineCall::SelectGuild(id(target, Kind::g)?));
                    Kind::g
                }
                Some(Kind::c) => {
                    calls.push(EngineCall::SelectChannel(id(target, Kind::c)?));
                    Kind::c
                }
                _ => return Err(ParseError::new(target.index, Kind::Listen)),
            },
        };

        let names: Vec<&str> = command.values.iter().map(|v| v.value.as_str()).collect();
        let mut include_events: Vec<String> = DEFAULT_EVENTS.iter().map(|e| e.to_string()).collect();
        match command.values.first().map(|v| v.key) {
            Some(Kind::Include) => include_events.retain(|e| names.contains(&e.as_str())),
            Some(Kind::Exclude) => include_events.retain(|e| !names.contains(&e.as_str())),
            _ => {}
        }

        let options = ListenOptions {
            handler: self.listener.clone(),
            include_events,
        };
        calls.push(match scope {
            Kind::g => EngineCall::ListenGuild(options),
            Kind::c => EngineCall::ListenChannel(options),
            _ => EngineCall::ListenClient(options),
        });
        Ok(calls)
    }
}

/// Checks every annotated target and value in source order, whether or not
/// the generator ends up using it.
fn validate_annotated(command: &SemanticCommand) -> Result<(), ParseError> {
    let mut annotated: Vec<&AnnotatedValue> = command.target.iter().chain(&command.values).collect();
    annotated.sort_by_key(|value| value.index);

    for value in annotated {
        match value.annotation {
            Some(Kind::t) if !is_token(&value.value) => {
                return Err(ParseError::new(value.index, Kind::t));
            }
            Some(kind @ (Kind::g | Kind::c | Kind::m | Kind::u)) => {
                id(value, kind)?;
            }
            Some(Kind::M) => {
                id(value, Kind::u)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Validates a snowflake value, reporting `kind` on failure.
fn id(value: &AnnotatedValue, kind: Kind) -> Result<String, ParseError> {
    if is_snowflake(&value.value) {
        Ok(value.value.clone())
    } else {
        Err(ParseError::new(value.index, kind))
    }
}

fn json(value: &AnnotatedValue) -> Result<Value, ParseError> {
    serde_json::from_str(&value.value).map_err(|_| ParseError::new(value.index, Kind::Object))
}

fn limit(value: &AnnotatedValue) -> Result<u32, ParseError> {
    if !UNSIGNED.is_match(&value.value) {
        return Err(ParseError::new(value.index, Kind::Number));
    }
    value
        .value
        .parse()
        .map_err(|_| ParseError::new(value.index, Kind::Number))
}

/// Fills the LIMIT and anchor fields of `query` from a clause-keyed value.
/// Returns false when the value belongs to no history clause.
fn history_field(query: &mut HistoryQuery, value: &AnnotatedValue) -> Result<bool, ParseError> {
    match value.key {
        Kind::Limit => query.limit = limit(value)?,
        Kind::Before => query.before = Some(id(value, Kind::m)?),
        Kind::After => query.after = Some(id(value, Kind::m)?),
        Kind::Around => query.around = Some(id(value, Kind::m)?),
        _ => return Ok(false),
    }
    Ok(true)
}

/// SELECT for a channel target. Any other annotation on the target is rejected.
fn channel_target(command: &SemanticCommand, calls: &mut Vec<EngineCall>) -> Result<(), ParseError> {
    if let Some(target) = &command.target {
        if target.annotation != Some(Kind::c) {
            return Err(ParseError::new(target.index, Kind::c));
        }
        calls.push(EngineCall::SelectChannel(id(target, Kind::c)?));
    }
    Ok(())
}

fn message_options<'a>(
    values: impl IntoIterator<Item = &'a AnnotatedValue>,
) -> Result<MessageOptions, ParseError> {
    let mut options = MessageOptions::default();

    for value in values {
        match (value.key, value.annotation) {
            (_, Some(Kind::A)) => options.attachments.push(value.value.clone()),
            (Kind::Object, _) | (Kind::String, Some(Kind::E)) => options.embeds.push(json(value)?),
            (Kind::String, Some(Kind::M)) => {
                options.content.push_str(&format!("<@{}>\n", id(value, Kind::u)?));
            }
            (Kind::String | Kind::Number, None) => {
                options.content.push_str(&value.value);
                options.content.push('\n');
            }
            _ => {}
        }
    }

    Ok(options)
}

fn compile_use(command: &SemanticCommand) -> Result<Vec<EngineCall>, ParseError> {
    if command.values.is_empty() {
        return Err(ParseError::new(command.command.index, Kind::Use));
    }

    command
        .values
        .iter()
        .map(|value| match value.annotation {
            Some(Kind::t) if is_token(&value.value) => Ok(EngineCall::Login(value.value.clone())),
            Some(Kind::t) => Err(ParseError::new(value.index, Kind::t)),
            Some(Kind::g) => Ok(EngineCall::SelectGuild(id(value, Kind::g)?)),
            Some(Kind::c) => Ok(EngineCall::SelectChannel(id(value, Kind::c)?)),
            _ => Err(ParseError::new(value.index, Kind::Use)),
        })
        .collect()
}

fn compile_fetch(command: &SemanticCommand) -> Result<Vec<EngineCall>, ParseError> {
    let mut calls = Vec::new();

    if let Some(target) = &command.target {
        match target.annotation {
            Some(Kind::g) => calls.push(EngineCall::SelectGuild(id(target, Kind::g)?)),
            Some(Kind::c) => calls.push(EngineCall::SelectChannel(id(target, Kind::c)?)),
            _ => return Err(ParseError::new(target.index, Kind::Fetch)),
        }
    }

    if command.values.is_empty() {
        return Err(ParseError::new(command.command.index, Kind::Fetch));
    }

    for value in &command.values {
        let call = match value.annotation {
            Some(Kind::g) => EngineCall::FetchGuild(id(value, Kind::g)?),
            Some(Kind::c) => EngineCall::FetchChannel(id(value, Kind::c)?),
            Some(Kind::m) => EngineCall::ReadChannel(HistoryQuery {
                limit: 1,
                around: Some(id(value, Kind::m)?),
                ..HistoryQuery::default()
            }),
            Some(Kind::u) if command.target.is_some() => EngineCall::FetchMember(id(value, Kind::u)?),
            Some(Kind::u) => EngineCall::FetchUser(id(value, Kind::u)?),
            _ => return Err(ParseError::new(value.index, Kind::Fetch)),
        };
        calls.push(call);
    }

    Ok(calls)
}

fn compile_read(command: &SemanticCommand) -> Result<Vec<EngineCall>, ParseError> {
    let target = match &command.target {
        Some(target) => target,
        None => return Err(ParseError::new(command.command.index, Kind::Read)),
    };

    let mut calls = Vec::new();
    if target.annotation == Some(Kind::c) {
        calls.push(EngineCall::SelectChannel(id(target, Kind::c)?));
    }

    if command.values.is_empty() {
        return Err(ParseError::new(target.index, Kind::Read));
    }

    let mut query = HistoryQuery::default();
    for value in &command.values {
        history_field(&mut query, value)?;
    }

    calls.push(EngineCall::ReadChannel(query));
    Ok(calls)
}

fn compile_delete(command: &SemanticCommand) -> Result<Vec<EngineCall>, ParseError> {
    let mut calls = Vec::new();
    channel_target(command, &mut calls)?;

    let mut query = HistoryQuery::default();
    let mut bulk = false;
    for value in &command.values {
        if history_field(&mut query, value)? {
            bulk |= value.key == Kind::Limit;
        } else if value.annotation == Some(Kind::m) {
            calls.push(EngineCall::DeleteMessage(id(value, Kind::m)?));
        }
    }

    if bulk {
        calls.push(EngineCall::DeleteMessages(query));
    }
    Ok(calls)
}

fn compile_send(command: &SemanticCommand) -> Result<Vec<EngineCall>, ParseError> {
    let mut calls = Vec::new();
    channel_target(command, &mut calls)?;

    if command.values.is_empty() {
        return Err(ParseError::new(command.command.index, Kind::Send));
    }

    calls.push(EngineCall::SendMessage(message_options(&command.values)?));
    Ok(calls)
}

fn compile_edit(command: &SemanticCommand) -> Result<Vec<EngineCall>, ParseError> {
    let mut calls = Vec::new();
    let mut message_id = None;

    if let Some(target) = &command.target {
        match target.annotation {
            Some(Kind::c) => calls.push(EngineCall::SelectChannel(id(target, Kind::c)?)),
            Some(Kind::m) => message_id = Some(id(target, Kind::m)?),
            _ => return Err(ParseError::new(target.index, Kind::m)),
        }
    }

    if message_id.is_none() {
        if let Some(value) = command
            .values
            .iter()
            .filter(|v| v.annotation == Some(Kind::m))
            .last()
        {
            message_id = Some(id(value, Kind::m)?);
        }
    }

    let message_id = match message_id {
        Some(message_id) => message_id,
        None => return Err(ParseError::new(command.command.index, Kind::Edit)),
    };

    calls.push(EngineCall::EditMessage(EditOptions {
        message_id,
        edit_options: message_options(&command.values)?,
    }));
    Ok(calls)
}

fn compile_show(command: &SemanticCommand) -> Result<Vec<EngineCall>, ParseError> {
    match &command.target {
        Some(target) if target.annotation == Some(Kind::g) => Ok(vec![
            EngineCall::SelectGuild(id(target, Kind::g)?),
            EngineCall::ShowChannels(None),
            EngineCall::ShowMembers(None),
        ]),
        _ => Ok(vec![EngineCall::ShowGuilds(None)]),
    }
}

fn compile_presence(command: &SemanticCommand) -> Result<Vec<EngineCall>, ParseError> {
    match command.values.as_slice() {
        [value] if value.key == Kind::Object => Ok(vec![EngineCall::UpdatePresence(json(value)?)]),
        _ => {
            warn!(
                index = command.command.index,
                values = command.values.len(),
                "PRESENCE expects a single JSON object; statement ignored"
            );
            Ok(Vec::new())
        }
    }
}
