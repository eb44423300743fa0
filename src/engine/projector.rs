// SPDX-License-Identifier: MIT

//! Highlight and pulse projection
//!
//! Tracks which node is active and which edges are pulsing, and reports
//! every change to the event sink. Each pulse clears itself after a fixed
//! duration; pending clears are kept in a registry keyed by edge id so the
//! player can cancel them all at once when playback stops.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::events::{deliver, EventSink, LifecycleEvent, PlaybackEvent};
use super::graph::Graph;
use super::sequence::ExecutionSequence;

struct PendingPulse {
    token: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Projection {
    active: Option<String>,
    pulses: HashMap<String, PendingPulse>,
    next_token: u64,
}

struct ProjectorInner {
    projection: Mutex<Projection>,
    sink: Arc<dyn EventSink>,
    pulse_duration: Duration,
    runtime: Handle,
}

impl Drop for ProjectorInner {
    fn drop(&mut self) {
        for (_, pending) in self.projection.get_mut().pulses.drain() {
            pending.handle.abort();
        }
    }
}

/// Projects playback steps onto node highlights and edge pulses
#[derive(Clone)]
pub struct Projector {
    inner: Arc<ProjectorInner>,
}

impl Projector {
    pub fn new(sink: Arc<dyn EventSink>, pulse_duration: Duration, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(ProjectorInner {
                projection: Mutex::new(Projection::default()),
                sink,
                pulse_duration,
                runtime,
            }),
        }
    }

    /// Project step `index` of the sequence.
    ///
    /// Highlights the step's node, pulses the edge towards the next step
    /// when one can be found, and reports reaching an end node.
    pub fn apply_step(&self, graph: &Graph, sequence: &ExecutionSequence, index: usize) {
        let Some(step) = sequence.get(index) else {
            return;
        };

        self.highlight(Some(&step.node_id));

        if let Some(next) = sequence.get(index + 1) {
            match graph.find_edge(&step.node_id, &next.node_id) {
                Some(edge) => self.pulse(&edge.id),
                None => log::debug!(
                    "No edge from {} to {}, skipping pulse",
                    step.node_id,
                    next.node_id
                ),
            }
        }

        if sequence.is_end_node(&step.node_id) {
            deliver(
                &*self.inner.sink,
                PlaybackEvent::lifecycle(LifecycleEvent::EndNodeReached),
            );
        }
    }

    /// Make `node_id` the single active node, or clear with `None`
    pub fn highlight(&self, node_id: Option<&str>) {
        let mut projection = self.inner.projection.lock();
        if projection.active.as_deref() == node_id {
            return;
        }
        projection.active = node_id.map(str::to_string);
        deliver(&*self.inner.sink, PlaybackEvent::highlight(node_id));
    }

    pub fn clear_highlight(&self) {
        self.highlight(None);
    }

    /// Start pulsing an edge; a pending clear for the same edge is replaced
    pub fn pulse(&self, edge_id: &str) {
        let mut projection = self.inner.projection.lock();

        projection.next_token += 1;
        let token = projection.next_token;

        let weak: Weak<ProjectorInner> = Arc::downgrade(&self.inner);
        let delay = self.inner.pulse_duration;
        let edge = edge_id.to_string();
        let handle = self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                Projector { inner }.finish_pulse(&edge, token);
            }
        });

        let replaced = projection
            .pulses
            .insert(edge_id.to_string(), PendingPulse { token, handle });
        if let Some(previous) = replaced {
            previous.handle.abort();
        }

        deliver(&*self.inner.sink, PlaybackEvent::edge_pulse(edge_id, true));
    }

    fn finish_pulse(&self, edge_id: &str, token: u64) {
        let mut projection = self.inner.projection.lock();
        // A newer pulse of the same edge owns the entry now.
        if projection.pulses.get(edge_id).map(|p| p.token) != Some(token) {
            return;
        }
        projection.pulses.remove(edge_id);
        deliver(&*self.inner.sink, PlaybackEvent::edge_pulse(edge_id, false));
    }

    /// Cancel every pending pulse clear and clear those edges right away
    pub fn cancel_pulses(&self) {
        let mut projection = self.inner.projection.lock();
        let mut edges: Vec<(String, PendingPulse)> = projection.pulses.drain().collect();
        edges.sort_by(|a, b| a.0.cmp(&b.0));

        for (edge_id, pending) in edges {
            pending.handle.abort();
            deliver(&*self.inner.sink, PlaybackEvent::edge_pulse(&edge_id, false));
        }
    }

    pub fn active_node(&self) -> Option<String> {
        self.inner.projection.lock().active.clone()
    }

    /// Currently pulsing edge ids, sorted
    pub fn pulsing_edges(&self) -> Vec<String> {
        let mut edges: Vec<String> = self.inner.projection.lock().pulses.keys().cloned().collect();
        edges.sort();
        edges
    }
}
