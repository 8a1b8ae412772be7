//! Configuration loading
//!
//! Layers, lowest first: built-in defaults, `config.json`, the short
//! platform env vars (`PLATFORM_TYPE`, `TELEGRAM_BOT_TOKEN`, ...), then
//! `COURIER__SECTION__KEY` path vars.

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const ENV_PREFIX: &str = "COURIER__";

/// Env vars that map onto a fixed config path
const ENV_ALIASES: [(&str, &str); 4] = [
    ("PLATFORM_TYPE", "dispatch.platform"),
    ("TELEGRAM_BOT_TOKEN", "channels.telegram.token"),
    ("DISCORD_BOT_TOKEN", "channels.discord.token"),
    ("ONEBOT_ACCESS_TOKEN", "channels.onebot.access_token"),
];

/// Loads and saves `config.json` in a config directory
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Use `~/.courier`
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".courier"))
            .unwrap_or_else(|| PathBuf::from(".courier"));

        Self { config_dir }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load and validate configuration using the process environment
    pub fn load(&self) -> crate::Result<Config> {
        self.load_with_env(std::env::vars())
    }

    /// Load and validate configuration against an explicit set of env vars
    pub fn load_with_env<I>(&self, vars: I) -> crate::Result<Config>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = serde_json::to_value(Config::default())?;

        let config_path = self.config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            overlay(&mut merged, serde_json::from_str(&content)?);
        }

        for (path, value) in env_overrides(vars) {
            overlay(&mut merged, nest(&path, value));
        }

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_dir.join(CONFIG_FILE), content)?;
        Ok(())
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-merge `patch` into `base`; objects merge per key, anything else replaces
fn overlay(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                overlay(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Wrap `value` in one object per path segment
fn nest(path: &[String], value: Value) -> Value {
    path.iter().rev().fold(value, |inner, key| {
        let mut map = Map::new();
        map.insert(key.clone(), inner);
        Value::Object(map)
    })
}

/// Alias overrides come first so a path var for the same key wins
fn env_overrides<I>(vars: I) -> Vec<(Vec<String>, Value)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut aliases = Vec::new();
    let mut paths = Vec::new();

    for (key, raw) in vars {
        if let Some((_, target)) = ENV_ALIASES.iter().find(|(alias, _)| *alias == key) {
            let raw = if key == "PLATFORM_TYPE" {
                raw.to_ascii_lowercase()
            } else {
                raw
            };
            let path: Vec<String> = target.split('.').map(str::to_string).collect();
            aliases.push((path, Value::String(raw)));
        } else if let Some(suffix) = key.strip_prefix(ENV_PREFIX) {
            let path: Vec<String> = suffix
                .split("__")
                .filter(|s| !s.is_empty())
                .map(str::to_ascii_lowercase)
                .collect();
            if !path.is_empty() {
                paths.push((path, env_value(&raw)));
            }
        }
    }

    aliases.extend(paths);
    aliases
}

/// Env values are JSON when they parse as JSON, plain strings otherwise
fn env_value(raw: &str) -> Value {
    match raw {
        r if r.eq_ignore_ascii_case("true") => Value::Bool(true),
        r if r.eq_ignore_ascii_case("false") => Value::Bool(false),
        r => serde_json::from_str(r).unwrap_or_else(|_| Value::String(r.to_string())),
    }
}
