//! TOML configuration: kernel channel constants, boot signal identity,
//! logging, escalation sink and host loop cadence.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{Result, VlError};
use crate::logger::LogLevel;

/// Environment variable naming the config file when no flag is given.
pub const CONFIG_ENV: &str = "VLISTEN_CONFIG";

/// Netlink protocol number of the Validator source. Placeholder value,
/// to be confirmed against the target kernel headers.
pub const DEFAULT_PROTOCOL: i32 = 25;
/// Group mask selecting the integrity-report multicast group. Placeholder.
pub const DEFAULT_GROUP_MASK: u32 = 1;
/// Maximum payload of one Validator datagram.
pub const DEFAULT_MAX_PAYLOAD: usize = 4096;

/// Kernel netlink allows protocol numbers below MAX_LINKS.
const MAX_LINKS: i32 = 32;
const MAX_PAYLOAD_CEILING: usize = 64 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub channel: ChannelConfig,
    pub boot_signal: BootSignalConfig,
    pub logging: LoggingConfig,
    pub escalation: EscalationConfig,
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    pub protocol: i32,
    pub group_mask: u32,
    pub max_payload: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_PROTOCOL,
            group_mask: DEFAULT_GROUP_MASK,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootSignalConfig {
    pub interface: String,
    pub member: String,
}

impl Default for BootSignalConfig {
    fn default() -> Self {
        Self {
            interface: "com.nokia.startup.signal".to_string(),
            member: "base_boot_done".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EscalationConfig {
    /// JSONL sink for malfunction broadcasts; stdout when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub poll_interval_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
        }
    }
}

impl DaemonConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path (argument, then `VLISTEN_CONFIG`) must exist. With no
    /// path at all the defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VlError::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|source| VlError::io(path, source))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |details: String| Err(VlError::InvalidConfig { details });

        if !(0..MAX_LINKS).contains(&self.channel.protocol) {
            return invalid(format!(
                "channel.protocol must be in 0..{MAX_LINKS}, got {}",
                self.channel.protocol
            ));
        }
        if self.channel.group_mask == 0 {
            return invalid("channel.group_mask must select at least one group".to_string());
        }
        if self.channel.max_payload == 0 || self.channel.max_payload > MAX_PAYLOAD_CEILING {
            return invalid(format!(
                "channel.max_payload must be in 1..={MAX_PAYLOAD_CEILING}, got {}",
                self.channel.max_payload
            ));
        }
        if self.boot_signal.interface.trim().is_empty() || self.boot_signal.member.trim().is_empty()
        {
            return invalid("boot_signal.interface and boot_signal.member must be set".to_string());
        }
        if self.daemon.poll_interval_ms == 0 {
            return invalid("daemon.poll_interval_ms must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_validator_constants() {
        let config = Config::default();
        assert_eq!(config.channel.protocol, 25);
        assert_eq!(config.channel.group_mask, 1);
        assert_eq!(config.channel.max_payload, 4096);
        assert_eq!(config.boot_signal.interface, "com.nokia.startup.signal");
        assert_eq!(config.boot_signal.member, "base_boot_done");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [channel]
            group_mask = 4

            [logging]
            level = "warning"
            "#,
        )
        .expect("partial config parses");
        assert_eq!(config.channel.group_mask, 4);
        assert_eq!(config.channel.protocol, DEFAULT_PROTOCOL);
        assert_eq!(config.logging.level, LogLevel::Warning);
        assert_eq!(config.daemon.poll_interval_ms, 250);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for raw in [
            "[channel]\nprotocol = 32",
            "[channel]\ngroup_mask = 0",
            "[channel]\nmax_payload = 0",
            "[boot_signal]\nmember = \"  \"",
            "[daemon]\npoll_interval_ms = 0",
        ] {
            let err = Config::from_toml_str(raw).expect_err(raw);
            assert_eq!(err.code(), "VL-1001", "{raw}");
        }
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let err = Config::from_toml_str("[channel]\nprotcol = 3").expect_err("typo rejected");
        assert_eq!(err.code(), "VL-1003");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Config::from_file(&dir.path().join("absent.toml")).expect_err("missing");
        assert_eq!(err.code(), "VL-1002");
    }

    #[test]
    fn file_round_trips_through_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vlisten.toml");
        let mut config = Config::default();
        config.escalation.path = Some(dir.path().join("malf.jsonl"));
        std::fs::write(&path, config.to_toml_string().expect("serialize")).expect("write");
        assert_eq!(Config::from_file(&path).expect("load"), config);
    }
}
