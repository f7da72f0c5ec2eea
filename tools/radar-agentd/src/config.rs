use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "configs/radar-agentd.toml";

/// Where decoded events go besides the control socket subscribers.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventOutput {
    #[default]
    Stdout,
    None,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "Config::default_baud")]
    pub baud: u32,
    #[serde(default = "Config::default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "Config::default_stats_interval_secs")]
    pub stats_interval_secs: u64,
    #[serde(default = "Config::default_command_queue")]
    pub command_queue: usize,
    #[serde(default = "Config::default_follow_up_delay_ms")]
    pub follow_up_delay_ms: u64,
    #[serde(default = "Config::default_startup_settle_ms")]
    pub startup_settle_ms: u64,
    #[serde(default = "Config::default_startup_step_delay_ms")]
    pub startup_step_delay_ms: u64,
    #[serde(default = "Config::default_socket")]
    pub socket: PathBuf,
    #[serde(default)]
    pub event_output: EventOutput,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: None,
            baud: Self::default_baud(),
            read_timeout_ms: Self::default_read_timeout_ms(),
            stats_interval_secs: Self::default_stats_interval_secs(),
            command_queue: Self::default_command_queue(),
            follow_up_delay_ms: Self::default_follow_up_delay_ms(),
            startup_settle_ms: Self::default_startup_settle_ms(),
            startup_step_delay_ms: Self::default_startup_step_delay_ms(),
            socket: Self::default_socket(),
            event_output: EventOutput::default(),
        }
    }
}

impl Config {
    fn default_baud() -> u32 {
        115_200
    }
    fn default_read_timeout_ms() -> u64 {
        100
    }
    fn default_stats_interval_secs() -> u64 {
        60
    }
    fn default_command_queue() -> usize {
        8
    }
    fn default_follow_up_delay_ms() -> u64 {
        u64::from(ld6002_protocol::FOLLOW_UP_DELAY_MS)
    }
    fn default_startup_settle_ms() -> u64 {
        u64::from(ld6002_protocol::STARTUP_SETTLE_MS)
    }
    fn default_startup_step_delay_ms() -> u64 {
        u64::from(ld6002_protocol::STARTUP_STEP_DELAY_MS)
    }
    fn default_socket() -> PathBuf {
        std::env::temp_dir().join("radar-agentd.sock")
    }

    /// Load `path`, or the default location when `path` is `None`. A missing
    /// default file yields the built-in defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        if !path.exists() {
            if explicit {
                anyhow::bail!("config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }
        let txt =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        Self::from_toml_str(&txt).with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_toml_str(txt: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(txt)?;
        if cfg.baud == 0 {
            cfg.baud = Self::default_baud();
        }
        if cfg.read_timeout_ms == 0 {
            cfg.read_timeout_ms = Self::default_read_timeout_ms();
        }
        if cfg.stats_interval_secs == 0 {
            cfg.stats_interval_secs = Self::default_stats_interval_secs();
        }
        if cfg.command_queue == 0 {
            cfg.command_queue = Self::default_command_queue();
        }
        if cfg.port.as_deref().is_some_and(|p| p.trim().is_empty()) {
            cfg.port = None;
        }
        Ok(cfg)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}
