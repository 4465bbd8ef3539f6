use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use std::{fs, io};
use thiserror::Error;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

// --- Enums for Choices ---
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializerType {
    #[default]
    Json,
    Binary,
}

// --- Configuration Sections ---

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SessionSettings {
    pub username: String,
    pub color: String,
    pub spawn: (f32, f32),
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            username: "pingu".to_string(),
            color: "blue".to_string(),
            spawn: (100.0, 100.0),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct MotionSettings {
    #[serde(default = "default_step")]
    pub step: f32,
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
}

fn default_step() -> f32 { 5.0 }
fn default_tick_rate() -> u32 { 60 }

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            step: default_step(),
            tick_rate: default_tick_rate(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ThrottleSettings {
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,
    /// Start the throttle window at registration rather than "never sent".
    #[serde(default)]
    pub prime_on_start: bool,
}

fn default_send_interval_ms() -> u64 { 200 }

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            send_interval_ms: default_send_interval_ms(),
            prime_on_start: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ViewportSettings {
    pub width: f32,
    pub height: f32,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TransportSettings {
    pub channel: String,
    pub move_event: String,
    pub table: String,
    pub serializer: SerializerType,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            channel: "movement".to_string(),
            move_event: "move".to_string(),
            table: "penguin".to_string(),
            serializer: SerializerType::Json,
        }
    }
}

/// Settings for the demo runner's simulated participants.
#[derive(Deserialize, Debug, Clone)]
pub struct DemoSettings {
    #[serde(default = "default_bots")]
    pub bots: u32,
    /// Ticks between a bot's direction changes.
    #[serde(default = "default_wander_ticks")]
    pub wander_ticks: u32,
    /// Ticks between status lines; 0 disables them.
    #[serde(default = "default_report_every")]
    pub report_every: u32,
}

fn default_bots() -> u32 { 3 }
fn default_wander_ticks() -> u32 { 45 }
fn default_report_every() -> u32 { 60 }

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            bots: default_bots(),
            wander_ticks: default_wander_ticks(),
            report_every: default_report_every(),
        }
    }
}

// --- Top-Level Config Struct ---

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub motion: MotionSettings,
    #[serde(default)]
    pub throttle: ThrottleSettings,
    #[serde(default)]
    pub viewport: ViewportSettings,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub demo: DemoSettings,
}

// --- Helper Methods ---

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.motion.tick_rate.max(1) as f64)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.throttle.send_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.motion.tick_rate == 0 {
            return Err(ConfigError::Validation("Tick rate cannot be zero.".to_string()));
        }
        if !(self.motion.step > 0.0) {
            return Err(ConfigError::Validation("Motion step must be positive.".to_string()));
        }
        if !(self.viewport.width > 0.0 && self.viewport.height > 0.0) {
            return Err(ConfigError::Validation("Viewport dimensions must be positive.".to_string()));
        }
        let (x, y) = self.session.spawn;
        if !(0.0..=self.viewport.width).contains(&x) || !(0.0..=self.viewport.height).contains(&y) {
            return Err(ConfigError::Validation(format!(
                "Spawn ({}, {}) is outside the {}x{} viewport.",
                x, y, self.viewport.width, self.viewport.height
            )));
        }
        if self.session.username.trim().is_empty() {
            return Err(ConfigError::Validation("Username cannot be empty.".to_string()));
        }
        // The gate, not the tick rate, must govern network volume.
        if self.send_interval() < self.tick_interval() * 10 {
            return Err(ConfigError::Validation(format!(
                "Send interval {:?} must be at least 10 ticks ({:?}).",
                self.send_interval(),
                self.tick_interval() * 10
            )));
        }
        if self.transport.channel.is_empty() || self.transport.move_event.is_empty() || self.transport.table.is_empty() {
            return Err(ConfigError::Validation("Transport names cannot be empty.".to_string()));
        }
        Ok(())
    }
}

// --- Loading Function ---

/// Load and validate a config file. `.toml` files are parsed as TOML,
/// everything else as JSON.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    config.validate()?;
    Ok(config)
}
