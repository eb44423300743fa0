// SPDX-License-Identifier: MIT

//! Event types for playback visualization
//!
//! Events are sent from the engine to whatever renders the diagram. The
//! `EventSink` trait abstracts over the transport so the engine can drive a
//! channel, a log, a broadcast fan-out or an in-memory recorder.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::{broadcast, mpsc};

use super::error::EventError;

/// Lifecycle notifications, surfaced to the user as toasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleEvent {
    Started,
    Paused,
    Resumed,
    Restarted,
    DebugStarted,
    DebugStopped,
    NoWorkflow,
    CompletedFull,
    CompletedPartial,
    EndNodeReached,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::Started => "started",
            LifecycleEvent::Paused => "paused",
            LifecycleEvent::Resumed => "resumed",
            LifecycleEvent::Restarted => "restarted",
            LifecycleEvent::DebugStarted => "debug-started",
            LifecycleEvent::DebugStopped => "debug-stopped",
            LifecycleEvent::NoWorkflow => "no-workflow",
            LifecycleEvent::CompletedFull => "completed-full",
            LifecycleEvent::CompletedPartial => "completed-partial",
            LifecycleEvent::EndNodeReached => "end-node-reached",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted during playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// The active node changed; `None` clears the highlight
    #[serde(rename_all = "camelCase")]
    Highlight { node_id: Option<String> },

    /// An edge started or stopped pulsing
    #[serde(rename_all = "camelCase")]
    EdgePulse { edge_id: String, pulsing: bool },

    /// A lifecycle notification
    Lifecycle { kind: LifecycleEvent },
}

impl PlaybackEvent {
    pub fn highlight(node_id: Option<&str>) -> Self {
        Self::Highlight {
            node_id: node_id.map(str::to_string),
        }
    }

    pub fn edge_pulse(edge_id: &str, pulsing: bool) -> Self {
        Self::EdgePulse {
            edge_id: edge_id.to_string(),
            pulsing,
        }
    }

    pub fn lifecycle(kind: LifecycleEvent) -> Self {
        Self::Lifecycle { kind }
    }
}

/// Trait for receiving playback events
///
/// Called while the player holds its state lock, so implementations must
/// not call back into the player.
pub trait EventSink: Send + Sync {
    /// Deliver an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: PlaybackEvent) -> Result<(), EventError>;
}

/// Send an event, logging instead of propagating delivery failures
pub(crate) fn deliver(sink: &dyn EventSink, event: PlaybackEvent) {
    if let Err(e) = sink.send(event) {
        log::warn!("Dropping playback event: {}", e);
    }
}

/// Forwards events to an unbounded mpsc channel
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PlaybackEvent>,
}

impl ChannelSink {
    /// Create a sink together with the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn send(&self, event: PlaybackEvent) -> Result<(), EventError> {
        self.tx
            .send(event)
            .map_err(|_| EventError::channel_closed())
    }
}

/// Fans events out to any number of subscribers.
///
/// Having no subscriber is not an error; the event is simply dropped.
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<PlaybackEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn send(&self, event: PlaybackEvent) -> Result<(), EventError> {
        let _ = self.tx.send(event);
        Ok(())
    }
}

/// Writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn send(&self, event: PlaybackEvent) -> Result<(), EventError> {
        match event {
            PlaybackEvent::Highlight { node_id: Some(id) } => log::info!("Active node: {}", id),
            PlaybackEvent::Highlight { node_id: None } => log::info!("Highlight cleared"),
            PlaybackEvent::EdgePulse { edge_id, pulsing } => {
                log::debug!("Edge {} pulsing={}", edge_id, pulsing)
            }
            PlaybackEvent::Lifecycle { kind } => log::info!("Playback {}", kind),
        }
        Ok(())
    }
}

/// Records every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PlaybackEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.events.lock().clone()
    }

    /// Only the lifecycle notifications, in order
    pub fn lifecycle(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::Lifecycle { kind } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    /// Only the highlight changes, in order
    pub fn highlights(&self) -> Vec<Option<String>> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::Highlight { node_id } => Some(node_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Only the edge pulse changes, in order
    pub fn pulses(&self) -> Vec<(String, bool)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::EdgePulse { edge_id, pulsing } => Some((edge_id.clone(), *pulsing)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn send(&self, event: PlaybackEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}
