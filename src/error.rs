use crate::call::Command;
use crate::gateway::GatewayError;
use crate::token::Kind;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DqlError {
    #[error("IOError: {0}")]
    IO(#[from] std::io::Error),
    #[error("JsonError: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ParseError: {0}")]
    Parse(#[from] ParseError),
    #[error("RuntimeError: {0}")]
    Runtime(#[from] RuntimeError),
}

/// A fatal error from the lexer, parser, normalizer or a call generator.
/// The message is chosen by the kind of token that was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub index: usize,
    pub kind: Kind,
}

impl ParseError {
    pub fn new(index: usize, kind: Kind) -> Self {
        Self { index, kind }
    }

    pub fn message(&self) -> &'static str {
        if self.kind.is_keyword() {
            return "Invalid keyword value / vague keyword annotation";
        }
        match self.kind {
            Kind::t => "Invalid bot token",
            Kind::g => "Invalid guild ID",
            Kind::c => "Invalid channel ID",
            Kind::m => "Invalid message ID",
            Kind::u => "Invalid user ID",
            Kind::Object => "Invalid JSON object",
            Kind::Number => "Invalid number",
            _ => "Invalid keyword",
        }
    }

    /// Renders the offending source line with a caret under the error.
    pub fn render(&self, source: &str) -> String {
        let index = self.index.min(source.len());
        let line_start = source[..index].rfind('\n').map_or(0, |i| i + 1);
        let line_end = source[index..]
            .find('\n')
            .map_or(source.len(), |i| index + i);
        let line_number = source[..line_start].matches('\n').count() + 1;
        let column = source[line_start..index].chars().count();

        format!(
            "{}\n{}^ {}\n  --> {}:{} ({})",
            &source[line_start..line_end],
            " ".repeat(column),
            self.message(),
            line_number,
            column + 1,
            self.index,
        )
    }
}

impl StdError for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at offset {}", self.message(), self.index)
    }
}

/// A gateway call failed while the call stack was being drained. Carries
/// the connection and selection state at the moment of failure.
#[derive(Debug)]
pub struct RuntimeError {
    pub command: Command,
    pub connection_established: bool,
    pub guild_selected: bool,
    pub channel_selected: bool,
    pub source: Option<GatewayError>,
}

impl StdError for RuntimeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|err| err as &(dyn StdError + 'static))
    }
}

impl RuntimeError {
    pub fn message(&self) -> String {
        match &self.source {
            Some(err) => err.to_string(),
            None => format!("{} failed", self.command),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let flag = |set: bool, yes: &'static str, no: &'static str| if set { yes } else { no };
        write!(
            f,
            "error running {}: {}\n  [STATE]\n  Client: {}\n  Guild: {}\n  Channel: {}",
            self.command,
            self.message(),
            flag(self.connection_established, "connected", "not connected"),
            flag(self.guild_selected, "selected", "not selected"),
            flag(self.channel_selected, "selected", "not selected"),
        )
    }
}
