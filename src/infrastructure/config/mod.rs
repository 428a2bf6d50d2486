//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::domain::entities::ModuleDescriptor;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    pub servers: Vec<ServerConfig>,
    pub modules: Vec<ModuleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    /// Command prefix stripped before key lookup.
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DispatchConfig {
    /// Bound on one handler invocation before it counts as failed.
    pub handler_timeout_seconds: u64,
    /// Depth of each server's event queue.
    pub queue_depth: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout_seconds: 30,
            queue_depth: 64,
        }
    }
}

impl DispatchConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    pub id: u32,
    pub name: String,
    /// Values published through the variable broker for this server.
    #[serde(default)]
    pub vars: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleConfig {
    pub name: String,
    pub entry_type: String,
    #[serde(default)]
    pub files: Vec<String>,
    /// Elevate this module's context to full trust.
    #[serde(default)]
    pub trusted: bool,
    /// Load on startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,
}

fn default_true() -> bool {
    true
}

impl ModuleConfig {
    pub fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(&self.name, &self.entry_type).with_files(self.files.clone())
    }
}

impl Config {
    /// Load and validate a yaml config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config =
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.is_empty() {
            return Err(ConfigError::InvalidValue(
                "bot.prefix must not be empty".to_string(),
            ));
        }
        for (i, module) in self.modules.iter().enumerate() {
            if self.modules[..i].iter().any(|m| m.name == module.name) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate module name '{}'",
                    module.name
                )));
            }
        }
        for (i, server) in self.servers.iter().enumerate() {
            if self.servers[..i].iter().any(|s| s.id == server.id) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate server id {}",
                    server.id
                )));
            }
        }
        Ok(())
    }

    /// Yaml rendering of the default config, for `init-config`.
    pub fn default_yaml() -> String {
        serde_yaml::to_string(&Config::default()).unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "rook-bot".to_string(),
                prefix: "?".to_string(),
            },
            dispatch: DispatchConfig::default(),
            servers: vec![ServerConfig {
                id: 1,
                name: "local".to_string(),
                vars: HashMap::from([
                    ("server-name".to_string(), "local".to_string()),
                    ("home-channel".to_string(), "#rook".to_string()),
                ]),
            }],
            modules: vec![
                ModuleConfig {
                    name: "echo".to_string(),
                    entry_type: "builtin.echo".to_string(),
                    files: Vec::new(),
                    trusted: false,
                    auto_load: true,
                },
                ModuleConfig {
                    name: "greeter".to_string(),
                    entry_type: "builtin.greeter".to_string(),
                    files: Vec::new(),
                    trusted: false,
                    auto_load: true,
                },
            ],
        }
    }
}
