use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Connection defaults for `dql run`, one file per environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default = "default_close_on_finish")]
    pub close_on_finish: bool,
    #[serde(default = "env_name")]
    pub env_name: String,
}

fn default_close_on_finish() -> bool {
    true
}

fn env_name() -> String {
    env::var("DQL_ENV").unwrap_or_else(|_| String::from("default"))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            token: None,
            guild_id: None,
            channel_id: None,
            close_on_finish: default_close_on_finish(),
            env_name: env_name(),
        }
    }
}

impl Config {
    /// Reads the config file for the current environment, then applies the
    /// `DQL_TOKEN`, `DQL_GUILD` and `DQL_CHANNEL` overrides. A missing or
    /// unreadable file yields the defaults.
    pub fn load() -> Self {
        let config_path = Self::get_config_path();
        let mut config = match fs::read_to_string(&config_path) {
            Ok(contents) => Self::from_json(&contents),
            Err(err) => {
                debug!(path = %config_path.display(), %err, "no config file, using defaults");
                Config::default()
            }
        };
        config.apply_env();
        config
    }

    pub fn from_json(contents: &str) -> Self {
        serde_json::from_str(contents).unwrap_or_else(|err| {
            warn!(%err, "malformed config file, using defaults");
            Config::default()
        })
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(
            env::var("DQL_TOKEN").ok(),
            env::var("DQL_GUILD").ok(),
            env::var("DQL_CHANNEL").ok(),
        );
    }

    pub fn apply_overrides(
        &mut self,
        token: Option<String>,
        guild_id: Option<String>,
        channel_id: Option<String>,
    ) {
        if token.is_some() {
            self.token = token;
        }
        if guild_id.is_some() {
            self.guild_id = guild_id;
        }
        if channel_id.is_some() {
            self.channel_id = channel_id;
        }
    }

    pub fn save(&self) -> io::Result<()> {
        let config_path = Self::get_config_path();
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, contents)
    }

    pub fn get_config_path() -> PathBuf {
        let home = if cfg!(windows) {
            env::var("USERPROFILE")
        } else {
            env::var("HOME")
        };
        PathBuf::from(home.unwrap_or_else(|_| String::from(".")))
            .join(".dql")
            .join(env_name())
            .join("config.json")
    }
}
