// SPDX-License-Identifier: MIT

//! Playback timing configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::error::EngineError;

pub const STEP_DELAY_ENV: &str = "FLOWPLAY_STEP_DELAY_MS";
pub const DEBUG_STEP_DELAY_ENV: &str = "FLOWPLAY_DEBUG_STEP_DELAY_MS";
pub const PULSE_DURATION_ENV: &str = "FLOWPLAY_PULSE_DURATION_MS";

/// Timer settings for the player and projector
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Delay between steps in normal playback
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Delay between steps in debug playback
    #[serde(default = "default_debug_step_delay_ms")]
    pub debug_step_delay_ms: u64,
    /// How long an edge stays pulsing
    #[serde(default = "default_pulse_duration_ms")]
    pub pulse_duration_ms: u64,
}

fn default_step_delay_ms() -> u64 {
    1500
}

fn default_debug_step_delay_ms() -> u64 {
    3000
}

fn default_pulse_duration_ms() -> u64 {
    2000
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: default_step_delay_ms(),
            debug_step_delay_ms: default_debug_step_delay_ms(),
            pulse_duration_ms: default_pulse_duration_ms(),
        }
    }
}

impl PlaybackConfig {
    /// Load from a YAML file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FLOWPLAY_*` environment overrides on top of this config
    pub fn with_env_overrides(mut self) -> Result<Self, EngineError> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut u64); 3] = [
            (STEP_DELAY_ENV, &mut self.step_delay_ms),
            (DEBUG_STEP_DELAY_ENV, &mut self.debug_step_delay_ms),
            (PULSE_DURATION_ENV, &mut self.pulse_duration_ms),
        ];

        for (key, field) in fields {
            if let Some(raw) = lookup(key) {
                *field = raw.trim().parse().map_err(|_| {
                    EngineError::config(format!("{} must be an integer, got '{}'", key, raw))
                })?;
            }
        }

        self.validate()
    }

    /// Reject zero delays
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.step_delay_ms == 0 || self.debug_step_delay_ms == 0 || self.pulse_duration_ms == 0
        {
            return Err(EngineError::config("playback delays must be positive"));
        }
        Ok(())
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn debug_step_delay(&self) -> Duration {
        Duration::from_millis(self.debug_step_delay_ms)
    }

    pub fn pulse_duration(&self) -> Duration {
        Duration::from_millis(self.pulse_duration_ms)
    }
}
