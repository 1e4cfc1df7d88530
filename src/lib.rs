//! DQL: a small statement language for driving a chat-platform bot.
//!
//! Source text is lexed into [`token::Token`]s, split into statement trees by
//! [`parser::Parser`], flattened by [`semantic::normalize`] and turned into
//! typed [`call::EngineCall`]s by [`compiler::Compiler`]. An
//! [`interpreter::Interpreter`] queues those calls and runs them in order
//! against a [`gateway::Gateway`].

pub mod call;
pub mod compiler;
pub mod config;
pub mod error;
pub mod gateway;
pub mod history;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod token;
pub mod types;

pub use call::{Command, EngineCall};
pub use error::{DqlError, ParseError, RuntimeError};
pub use gateway::{EchoGateway, Gateway, GatewayError};
pub use interpreter::{Interpreter, InterpreterState};
