// SPDX-License-Identifier: MIT

//! flowplay - deterministic sequencing and timed playback for workflow
//! diagrams.
//!
//! ```no_run
//! use flowplay::engine::{Graph, LogSink, PlaybackConfig, Player};
//! use std::sync::Arc;
//!
//! # async fn demo(graph: Graph) -> Result<(), flowplay::engine::EngineError> {
//! let player = Player::new(Arc::new(graph), Arc::new(LogSink), PlaybackConfig::default())?;
//! player.play();
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod studio;
