// SPDX-License-Identifier: MIT

//! Workflow execution engine
//!
//! - `graph` - node/edge model and start/end selection
//! - `sequence` - graph to ordered, leveled execution sequence
//! - `scheduler` - the timed playback state machine (`Player`)
//! - `projector` - node highlight and edge pulse projection
//! - `events` - what the engine reports and where it goes

pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod projector;
pub mod scheduler;
pub mod sequence;

pub use config::PlaybackConfig;
pub use error::{EngineError, EventError, LoadError};
pub use events::{
    BroadcastSink, ChannelSink, EventSink, LifecycleEvent, LogSink, MemorySink, PlaybackEvent,
};
pub use graph::{Edge, Graph, GraphSource, Node, NodeKind, SharedGraph};
pub use projector::Projector;
pub use scheduler::{Cadence, PlaybackSnapshot, PlaybackState, Player};
pub use sequence::{build_sequence, ExecutionSequence, SequenceStep};
