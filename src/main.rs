use clap::{Parser as ClapParser, Subcommand};
use dql::call::Command;
use dql::compiler::Compiler;
use dql::config::Config;
use dql::error::DqlError;
use dql::gateway::EchoGateway;
use dql::interpreter::Interpreter;
use dql::types::noop_handler;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(author, version, about = "DQL compiler and runner")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a DQL file and print its call stack as JSON
    Check {
        file: PathBuf,
    },
    /// Compile a DQL file and execute it
    Run {
        file: PathBuf,
        /// Execute against the in-memory gateway
        #[arg(long)]
        dry_run: bool,
        /// Bot token, overrides the config file
        #[arg(long)]
        token: Option<String>,
        /// Guild to select before running
        #[arg(long)]
        guild: Option<String>,
        /// Channel to select before running
        #[arg(long)]
        channel: Option<String>,
        /// Leave the connection open when finished
        #[arg(long)]
        keep_open: bool,
    },
    /// Manage DQL configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a config file with defaults
    Init,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &Path) -> Result<String, DqlError> {
    Ok(fs::read_to_string(path)?)
}

fn check(path: &Path) -> Result<bool, DqlError> {
    let source = read_source(path)?;
    match Compiler::new(noop_handler()).compile_script(&source) {
        Ok(script) => {
            println!("{}", serde_json::to_string_pretty(&script.calls)?);
            Ok(true)
        }
        Err(err) => {
            eprintln!("{}: {}", path.display(), err.render(&source));
            Ok(false)
        }
    }
}

fn print_result(command: Command, value: &Value, raw: bool) {
    let line = json!({ "command": command.as_str(), "result": value });
    if raw {
        println!("{}", line);
    } else {
        println!("{:#}", line);
    }
}

struct RunArgs {
    file: PathBuf,
    token: Option<String>,
    guild: Option<String>,
    channel: Option<String>,
    keep_open: bool,
}

async fn run(args: RunArgs, mut config: Config) -> Result<bool, DqlError> {
    let source = read_source(&args.file)?;
    config.apply_overrides(args.token, args.guild, args.channel);

    let mut interpreter = Interpreter::new(EchoGateway::new())
        .with_listener(|event| info!(event = %event.name, "event received"));
    if let Err(err) = interpreter.parse(&source) {
        eprintln!("{}: {}", args.file.display(), err.render(&source));
        return Ok(false);
    }

    let raw = interpreter.state().raw;
    let mut interpreter =
        interpreter.with_callback(move |command, value| print_result(command, value, raw));

    let close_on_finish = config.close_on_finish && !args.keep_open;
    let result = interpreter
        .execute(
            close_on_finish,
            config.token.as_deref(),
            config.guild_id.as_deref(),
            config.channel_id.as_deref(),
        )
        .await;

    match result {
        Ok(()) => Ok(true),
        Err(DqlError::Parse(err)) => {
            eprintln!("{}", err);
            Ok(false)
        }
        Err(DqlError::Runtime(err)) => {
            eprintln!("{}", err);
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

fn config_command(command: ConfigCommands) -> Result<(), DqlError> {
    match command {
        ConfigCommands::Show => {
            let config = Config::load();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => {
            println!("{}", Config::get_config_path().display());
        }
        ConfigCommands::Init => {
            let config_path = Config::get_config_path();
            if config_path.exists() {
                println!("Config file already exists at: {}", config_path.display());
            } else {
                Config::default().save()?;
                println!("Initialized new config file at: {}", config_path.display());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ok = match cli.command {
        Commands::Check { file } => check(&file)?,
        Commands::Run {
            file,
            dry_run,
            token,
            guild,
            channel,
            keep_open,
        } => {
            if !dry_run {
                eprintln!("No live gateway is built into this binary. Pass --dry-run to use the in-memory gateway.");
                return Ok(ExitCode::FAILURE);
            }
            let args = RunArgs {
                file,
                token,
                guild,
                channel,
                keep_open,
            };
            run(args, Config::load()).await?
        }
        Commands::Config { command } => {
            config_command(command)?;
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
