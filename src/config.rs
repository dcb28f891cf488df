//! TOML configuration.
//!
//! ```toml
//! [discord]
//! token = "env:DISCORD_TOKEN"
//! guild_id = 123456789012345678
//!
//! [tickets]
//! support_role_id = 987654321098765432
//! ```
//!
//! Everything except the Discord token has a default.

use crate::RoleId;
use crate::error::ConfigError;

use serde::{Deserialize, Serialize};

use std::path::Path;
use std::time::Duration;

/// Prefix marking a value that should be read from the environment.
const ENV_PREFIX: &str = "env:";

/// Upper bound for `disconnect.max_delay_secs`: one year.
pub const MAX_DELAY_CAP_SECS: u64 = 365 * 24 * 60 * 60;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub tickets: TicketConfig,
    pub disconnect: DisconnectConfig,
}

/// Discord connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token, or `env:VAR` to read it from the environment.
    pub token: String,
    /// Guild whose slash commands are registered on startup. When unset,
    /// commands are registered in every guild the bot sees at ready time.
    pub guild_id: Option<u64>,
}

/// Ticket numbering and placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketConfig {
    /// Category holding open tickets.
    pub open_group: String,
    /// Category holding archived tickets.
    pub archived_group: String,
    /// Channel name prefix in front of the number, e.g. `ticket-0042`.
    pub name_prefix: String,
    /// Zero-padded width of the rendered number.
    pub number_width: usize,
    /// Role pinged on new tickets and granted access to them. `0` means unset.
    pub support_role_id: Option<u64>,
    /// Display name of the support service in ticket titles.
    pub service_name: String,
    /// Title of the panel carrying the "open a ticket" button.
    pub panel_title: String,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            open_group: "Life Support Tickets".into(),
            archived_group: "Closed Tickets".into(),
            name_prefix: "ticket-".into(),
            number_width: 4,
            support_role_id: None,
            service_name: "Life Support".into(),
            panel_title: "Life Lounge Support".into(),
        }
    }
}

impl TicketConfig {
    pub fn support_role(&self) -> Option<RoleId> {
        self.support_role_id.filter(|id| *id != 0).map(RoleId)
    }
}

/// Limits for deferred voice disconnects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisconnectConfig {
    /// Longest delay a disconnect can be scheduled for.
    pub max_delay_secs: u64,
}

impl Default for DisconnectConfig {
    fn default() -> Self {
        Self {
            max_delay_secs: 24 * 60 * 60,
        }
    }
}

impl DisconnectConfig {
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

impl Config {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate config text. `env:` references are resolved here.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.discord.token = resolve_env(&config.discord.token)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.guild_id == Some(0) {
            return Err(ConfigError::Invalid("discord.guild_id must not be 0".into()));
        }
        let tickets = &self.tickets;
        if tickets.open_group.trim().is_empty() || tickets.archived_group.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "tickets.open_group and tickets.archived_group must not be empty".into(),
            ));
        }
        if tickets.open_group == tickets.archived_group {
            return Err(ConfigError::Invalid(
                "tickets.open_group and tickets.archived_group must differ".into(),
            ));
        }
        if tickets.name_prefix.is_empty() {
            return Err(ConfigError::Invalid("tickets.name_prefix must not be empty".into()));
        }
        if tickets.name_prefix.ends_with(|c: char| c.is_ascii_digit()) {
            return Err(ConfigError::Invalid(
                "tickets.name_prefix must not end with a digit".into(),
            ));
        }
        if !(1..=9).contains(&tickets.number_width) {
            return Err(ConfigError::Invalid(
                "tickets.number_width must be between 1 and 9".into(),
            ));
        }
        if self.disconnect.max_delay_secs == 0 {
            return Err(ConfigError::Invalid(
                "disconnect.max_delay_secs must be positive".into(),
            ));
        }
        if self.disconnect.max_delay_secs > MAX_DELAY_CAP_SECS {
            return Err(ConfigError::Invalid(format!(
                "disconnect.max_delay_secs must be at most {MAX_DELAY_CAP_SECS}"
            )));
        }
        Ok(())
    }
}

fn resolve_env(value: &str) -> Result<String, ConfigError> {
    match value.strip_prefix(ENV_PREFIX) {
        Some(variable) => {
            std::env::var(variable).map_err(|_| ConfigError::MissingEnv(variable.to_string()))
        }
        None => Ok(value.to_string()),
    }
}
