// SPDX-License-Identifier: MIT

//! Typed error handling for flowplay
//!
//! Playback commands themselves never fail: anomalies during playback
//! degrade to lifecycle events or silent no-ops. These types cover the
//! edges of the engine instead: construction, configuration and graph
//! loading. `EventError` is only seen by sinks and is logged, never raised.

use thiserror::Error;

/// Top-level error type for flowplay
#[derive(Debug, Error)]
pub enum EngineError {
    /// The player needs a tokio runtime to schedule its timers
    #[error("No tokio runtime available; construct the player inside a runtime")]
    NoRuntime,

    /// Configuration errors (invalid env vars, zero delays)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Graph loading errors
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML parsing errors (config files)
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised while reading a graph snapshot from disk
#[derive(Debug, Error)]
pub enum LoadError {
    /// File not found when loading a graph
    #[error("Graph file not found: {0}")]
    FileNotFound(String),

    /// Extension is neither JSON nor YAML
    #[error("Unsupported graph format: {0}")]
    UnsupportedFormat(String),

    /// Node ids must be unique within a graph
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Error when an event sink cannot deliver an event
#[derive(Debug, Clone, Error)]
#[error("Event error: {message}")]
pub struct EventError {
    pub message: String,
}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

impl EngineError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = EngineError::config("step delay must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration error: step delay must be positive"
        );
    }

    #[test]
    fn test_load_error_converts() {
        let err: EngineError = LoadError::DuplicateNode("a".to_string()).into();
        assert!(matches!(err, EngineError::Load(LoadError::DuplicateNode(_))));
        assert_eq!(err.to_string(), "Load error: Duplicate node id: a");
    }

    #[test]
    fn test_event_error_channel_closed() {
        let err = EventError::channel_closed();
        assert_eq!(err.to_string(), "Event error: Channel closed");
    }
}
