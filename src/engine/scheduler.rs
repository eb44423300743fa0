// SPDX-License-Identifier: MIT

//! Playback scheduler
//!
//! `Player` owns the playback state machine, the step cursor and the single
//! step timer. Commands (`play`, `pause`, `restart`, `debug`) and timer
//! callbacks all go through one lock, so state changes are serialised the
//! same way a single-threaded event loop would serialise them.
//!
//! At most one step timer is alive at a time. Arming a timer cancels the
//! previous one, and every timer carries the epoch it was armed in. When it
//! fires it re-checks both the epoch and the state, so a timer that lost a
//! race against `pause` or `restart` does nothing.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::config::PlaybackConfig;
use super::error::EngineError;
use super::events::{deliver, EventSink, LifecycleEvent, PlaybackEvent};
use super::graph::{Graph, GraphSource};
use super::projector::Projector;
use super::sequence::{build_sequence, ExecutionSequence};

/// Playback state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Debugging,
}

impl PlaybackState {
    fn is_running(self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Debugging)
    }
}

/// Which step delay a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Normal,
    Debug,
}

/// One pass over a freshly built sequence
struct Run {
    id: Uuid,
    graph: Graph,
    sequence: ExecutionSequence,
    cadence: Cadence,
}

struct Machine {
    state: PlaybackState,
    cursor: usize,
    run: Option<Run>,
    step_timer: Option<JoinHandle<()>>,
    epoch: u64,
}

impl Machine {
    fn cancel_step_timer(&mut self) {
        if let Some(handle) = self.step_timer.take() {
            handle.abort();
        }
        // Invalidates a timer that already woke up and is waiting on the lock.
        self.epoch = self.epoch.wrapping_add(1);
    }
}

struct PlayerInner {
    machine: Mutex<Machine>,
    source: Arc<dyn GraphSource>,
    sink: Arc<dyn EventSink>,
    projector: Projector,
    config: PlaybackConfig,
    runtime: Handle,
}

impl Drop for PlayerInner {
    fn drop(&mut self) {
        if let Some(handle) = self.machine.get_mut().step_timer.take() {
            handle.abort();
        }
    }
}

/// Serialisable view of the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub run_id: Option<Uuid>,
    pub state: PlaybackState,
    pub cadence: Option<Cadence>,
    pub cursor: usize,
    pub total_steps: usize,
    pub active_node: Option<String>,
    pub pulsing_edges: Vec<String>,
}

/// Timed playback over a workflow graph
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

impl Player {
    /// Create a player bound to the current tokio runtime
    pub fn new(
        source: Arc<dyn GraphSource>,
        sink: Arc<dyn EventSink>,
        config: PlaybackConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let projector = Projector::new(sink.clone(), config.pulse_duration(), runtime.clone());

        Ok(Self {
            inner: Arc::new(PlayerInner {
                machine: Mutex::new(Machine {
                    state: PlaybackState::Idle,
                    cursor: 0,
                    run: None,
                    step_timer: None,
                    epoch: 0,
                }),
                source,
                sink,
                projector,
                config,
                runtime,
            }),
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.machine.lock().state
    }

    pub fn cursor(&self) -> usize {
        self.inner.machine.lock().cursor
    }

    /// The sequence of the current run, if any
    pub fn sequence(&self) -> Option<ExecutionSequence> {
        self.inner
            .machine
            .lock()
            .run
            .as_ref()
            .map(|r| r.sequence.clone())
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let machine = self.inner.machine.lock();
        PlaybackSnapshot {
            run_id: machine.run.as_ref().map(|r| r.id),
            state: machine.state,
            cadence: machine.run.as_ref().map(|r| r.cadence),
            cursor: machine.cursor,
            total_steps: machine.run.as_ref().map_or(0, |r| r.sequence.len()),
            active_node: self.inner.projector.active_node(),
            pulsing_edges: self.inner.projector.pulsing_edges(),
        }
    }

    /// Start playback from idle, or resume after a pause
    pub fn play(&self) {
        let mut machine = self.inner.machine.lock();
        match machine.state {
            PlaybackState::Idle => {
                let Some(run) = self.prepare_run(Cadence::Normal) else {
                    return;
                };
                log::info!(
                    "Playback {} started with {} steps",
                    run.id,
                    run.sequence.len()
                );
                machine.run = Some(run);
                machine.cursor = 0;
                machine.state = PlaybackState::Playing;
                self.arm_step_timer(&mut machine);
                self.emit(LifecycleEvent::Started);
            }
            PlaybackState::Paused => {
                log::info!("Playback resumed at step {}", machine.cursor);
                machine.state = PlaybackState::Playing;
                self.arm_step_timer(&mut machine);
                self.emit(LifecycleEvent::Resumed);
            }
            state => log::debug!("Ignoring play while {:?}", state),
        }
    }

    /// Pause normal playback, keeping the cursor
    pub fn pause(&self) {
        let mut machine = self.inner.machine.lock();
        if machine.state != PlaybackState::Playing {
            log::debug!("Ignoring pause while {:?}", machine.state);
            return;
        }

        machine.cancel_step_timer();
        self.inner.projector.cancel_pulses();
        machine.state = PlaybackState::Paused;
        log::info!("Playback paused at step {}", machine.cursor);
        self.emit(LifecycleEvent::Paused);
    }

    /// Stop whatever is running and return to idle
    pub fn restart(&self) {
        let mut machine = self.inner.machine.lock();
        self.reset(&mut machine);
        log::info!("Playback restarted");
        self.emit(LifecycleEvent::Restarted);
    }

    /// Toggle debug playback.
    ///
    /// From idle, playing or paused this starts a fresh debug run with the
    /// slower step delay; while debugging it stops back to idle.
    pub fn debug(&self) {
        let mut machine = self.inner.machine.lock();
        if machine.state == PlaybackState::Debugging {
            self.reset(&mut machine);
            log::info!("Debug playback stopped");
            self.emit(LifecycleEvent::DebugStopped);
            return;
        }

        let Some(run) = self.prepare_run(Cadence::Debug) else {
            return;
        };
        self.reset(&mut machine);
        log::info!(
            "Debug playback {} started with {} steps",
            run.id,
            run.sequence.len()
        );
        machine.run = Some(run);
        machine.state = PlaybackState::Debugging;
        self.arm_step_timer(&mut machine);
        self.emit(LifecycleEvent::DebugStarted);
    }

    /// Tear down: cancel every timer and return to idle without notifying
    pub fn shutdown(&self) {
        let mut machine = self.inner.machine.lock();
        self.reset(&mut machine);
        log::debug!("Player shut down");
    }

    /// Build a run from a fresh graph snapshot, reporting an empty workflow
    fn prepare_run(&self, cadence: Cadence) -> Option<Run> {
        let graph = self.inner.source.snapshot();
        let sequence = build_sequence(&graph);
        if sequence.is_empty() {
            log::warn!(
                "No workflow to play: no start node among {} nodes",
                graph.nodes.len()
            );
            self.emit(LifecycleEvent::NoWorkflow);
            return None;
        }

        Some(Run {
            id: Uuid::new_v4(),
            graph,
            sequence,
            cadence,
        })
    }

    fn reset(&self, machine: &mut Machine) {
        machine.cancel_step_timer();
        self.inner.projector.cancel_pulses();
        self.inner.projector.clear_highlight();
        machine.cursor = 0;
        machine.run = None;
        machine.state = PlaybackState::Idle;
    }

    fn delay_for(&self, cadence: Cadence) -> Duration {
        match cadence {
            Cadence::Normal => self.inner.config.step_delay(),
            Cadence::Debug => self.inner.config.debug_step_delay(),
        }
    }

    fn arm_step_timer(&self, machine: &mut Machine) {
        machine.cancel_step_timer();

        let cadence = machine
            .run
            .as_ref()
            .map_or(Cadence::Normal, |r| r.cadence);
        let delay = self.delay_for(cadence);
        let epoch = machine.epoch;
        let weak: Weak<PlayerInner> = Arc::downgrade(&self.inner);

        machine.step_timer = Some(self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                Player { inner }.on_step_timer(epoch);
            }
        }));
    }

    fn on_step_timer(&self, epoch: u64) {
        let mut machine = self.inner.machine.lock();
        if machine.epoch != epoch || !machine.state.is_running() {
            log::debug!("Stale step timer ignored ({:?})", machine.state);
            return;
        }
        // This task is the live timer and is about to finish.
        machine.step_timer = None;

        let cursor = machine.cursor;
        let Some(run) = machine.run.as_ref() else {
            return;
        };

        if cursor < run.sequence.len() {
            log::debug!(
                "Step {}/{}: {}",
                cursor + 1,
                run.sequence.len(),
                run.sequence.steps()[cursor].node_id
            );
            self.inner
                .projector
                .apply_step(&run.graph, &run.sequence, cursor);
            machine.cursor += 1;
            self.arm_step_timer(&mut machine);
        } else {
            let full = run
                .sequence
                .last()
                .is_some_and(|step| run.sequence.is_end_node(&step.node_id));
            self.reset(&mut machine);

            let kind = if full {
                LifecycleEvent::CompletedFull
            } else {
                LifecycleEvent::CompletedPartial
            };
            log::info!("Playback finished: {}", kind);
            self.emit(kind);
        }
    }

    fn emit(&self, kind: LifecycleEvent) {
        deliver(&*self.inner.sink, PlaybackEvent::lifecycle(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::MemorySink;
    use crate::engine::graph::{Edge, Node, NodeKind, SharedGraph};

    fn linear() -> Graph {
        Graph::new(
            vec![
                Node::new("start", Some(NodeKind::Start), "Start"),
                Node::new("A", Some(NodeKind::Process), "A"),
                Node::new("B", Some(NodeKind::Process), "B"),
                Node::new("end", Some(NodeKind::End), "End"),
            ],
            vec![
                Edge::new("start->A", "start", "A"),
                Edge::new("A->B", "A", "B"),
                Edge::new("B->end", "B", "end"),
            ],
        )
    }

    fn player(graph: Graph) -> (Player, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let player = Player::new(Arc::new(graph), sink.clone(), PlaybackConfig::default())
            .expect("runtime available");
        (player, sink)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[test]
    fn test_requires_runtime() {
        let result = Player::new(
            Arc::new(Graph::default()),
            Arc::new(MemorySink::new()),
            PlaybackConfig::default(),
        );
        assert!(matches!(result, Err(EngineError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_invalid_config() {
        let config = PlaybackConfig {
            pulse_duration_ms: 0,
            ..Default::default()
        };
        let result = Player::new(Arc::new(linear()), Arc::new(MemorySink::new()), config);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_empty_graph_stays_idle() {
        let (player, sink) = player(Graph::default());
        player.play();

        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(sink.lifecycle(), vec![LifecycleEvent::NoWorkflow]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_step_fires_after_delay() {
        let (player, sink) = player(linear());
        player.play();
        assert_eq!(player.state(), PlaybackState::Playing);
        assert_eq!(sink.lifecycle(), vec![LifecycleEvent::Started]);

        advance(1400).await;
        assert!(sink.highlights().is_empty());

        advance(200).await;
        assert_eq!(sink.highlights(), vec![Some("start".to_string())]);
        assert_eq!(player.cursor(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_completes() {
        let (player, sink) = player(linear());
        player.play();

        // Four steps plus the completing tick
        advance(1500 * 5 + 100).await;

        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(player.cursor(), 0);
        assert_eq!(
            sink.lifecycle(),
            vec![
                LifecycleEvent::Started,
                LifecycleEvent::EndNodeReached,
                LifecycleEvent::CompletedFull
            ]
        );
        assert_eq!(
            sink.highlights(),
            vec![
                Some("start".to_string()),
                Some("A".to_string()),
                Some("B".to_string()),
                Some("end".to_string()),
                None
            ]
        );
        assert!(player.snapshot().pulsing_edges.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_keeps_cursor() {
        let (player, sink) = player(linear());
        player.play();
        advance(3100).await;
        assert_eq!(player.cursor(), 2);

        player.pause();
        assert_eq!(player.state(), PlaybackState::Paused);

        // Nothing advances while paused
        advance(10_000).await;
        assert_eq!(player.cursor(), 2);

        player.play();
        assert_eq!(player.state(), PlaybackState::Playing);
        advance(1600).await;

        assert_eq!(player.cursor(), 3);
        assert_eq!(
            sink.highlights(),
            vec![
                Some("start".to_string()),
                Some("A".to_string()),
                Some("B".to_string())
            ]
        );
        assert_eq!(
            sink.lifecycle(),
            vec![
                LifecycleEvent::Started,
                LifecycleEvent::Paused,
                LifecycleEvent::Resumed
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_is_ignored() {
        let (player, _sink) = player(linear());
        player.play();
        let armed = player.inner.machine.lock().epoch;

        player.pause();
        player.on_step_timer(armed);
        assert_eq!(player.cursor(), 0);
        assert_eq!(player.state(), PlaybackState::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_rechecks_state() {
        let (player, sink) = player(linear());
        player.play();

        // Same epoch, but the state moved on without cancelling
        let epoch = {
            let mut machine = player.inner.machine.lock();
            machine.state = PlaybackState::Paused;
            machine.epoch
        };
        player.on_step_timer(epoch);

        assert_eq!(player.cursor(), 0);
        assert!(sink.highlights().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_from_anywhere() {
        let (player, sink) = player(linear());
        player.restart();
        assert_eq!(player.state(), PlaybackState::Idle);

        player.play();
        advance(1600).await;
        player.restart();

        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(player.cursor(), 0);
        assert_eq!(player.snapshot().active_node, None);
        assert!(player.snapshot().pulsing_edges.is_empty());

        advance(10_000).await;
        assert_eq!(player.cursor(), 0);
        assert_eq!(
            sink.lifecycle(),
            vec![
                LifecycleEvent::Restarted,
                LifecycleEvent::Started,
                LifecycleEvent::Restarted
            ]
        );
        assert_eq!(
            sink.pulses(),
            vec![
                ("start->A".to_string(), true),
                ("start->A".to_string(), false)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_uses_slow_cadence() {
        let (player, sink) = player(linear());
        player.debug();
        assert_eq!(player.state(), PlaybackState::Debugging);
        assert_eq!(player.snapshot().cadence, Some(Cadence::Debug));

        advance(2000).await;
        assert!(sink.highlights().is_empty());

        advance(1100).await;
        assert_eq!(sink.highlights(), vec![Some("start".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_toggle_stops() {
        let (player, sink) = player(linear());
        player.debug();
        advance(3100).await;
        player.debug();

        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(player.snapshot().active_node, None);
        assert_eq!(
            sink.lifecycle(),
            vec![LifecycleEvent::DebugStarted, LifecycleEvent::DebugStopped]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_from_playing_restarts_cursor() {
        let (player, _sink) = player(linear());
        player.play();
        advance(3100).await;
        assert_eq!(player.cursor(), 2);

        player.debug();
        assert_eq!(player.state(), PlaybackState::Debugging);
        assert_eq!(player.cursor(), 0);

        // The old 1500ms timer must not fire into the debug run
        advance(1600).await;
        assert_eq!(player.cursor(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_on_empty_graph_keeps_state() {
        let shared = SharedGraph::new(linear());
        let sink = Arc::new(MemorySink::new());
        let player = Player::new(
            Arc::new(shared.clone()),
            sink.clone(),
            PlaybackConfig::default(),
        )
        .unwrap();

        player.play();
        shared.replace(Graph::default());
        player.debug();

        assert_eq!(player.state(), PlaybackState::Playing);
        assert_eq!(
            sink.lifecycle(),
            vec![LifecycleEvent::Started, LifecycleEvent::NoWorkflow]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_commands() {
        let (player, sink) = player(linear());
        player.pause();
        assert_eq!(player.state(), PlaybackState::Idle);

        player.play();
        player.play();
        player.debug();
        player.pause();
        assert_eq!(player.state(), PlaybackState::Debugging);

        assert_eq!(
            sink.lifecycle(),
            vec![LifecycleEvent::Started, LifecycleEvent::DebugStarted]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_completion() {
        let graph = Graph::new(
            vec![
                Node::new("start", Some(NodeKind::Start), ""),
                Node::new("A", Some(NodeKind::Process), ""),
                Node::new("fin", Some(NodeKind::End), ""),
            ],
            vec![Edge::new("start->A", "start", "A")],
        );
        let (player, sink) = player(graph);
        player.play();
        advance(1500 * 3 + 100).await;

        assert_eq!(
            sink.lifecycle(),
            vec![LifecycleEvent::Started, LifecycleEvent::CompletedPartial]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_rebuilt_per_run() {
        let shared = SharedGraph::new(linear());
        let sink = Arc::new(MemorySink::new());
        let player = Player::new(
            Arc::new(shared.clone()),
            sink.clone(),
            PlaybackConfig::default(),
        )
        .unwrap();

        player.play();
        let first = player.snapshot().run_id;
        assert_eq!(player.sequence().unwrap().len(), 4);

        // Edits mid-run do not affect the current run
        let mut edited = linear();
        edited.edges.pop();
        shared.replace(edited);
        assert_eq!(player.sequence().unwrap().len(), 4);

        player.restart();
        player.play();
        assert_eq!(player.sequence().unwrap().len(), 3);
        assert_ne!(player.snapshot().run_id, first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_silent() {
        let (player, sink) = player(linear());
        player.play();
        advance(1600).await;
        player.shutdown();

        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(sink.lifecycle(), vec![LifecycleEvent::Started]);
        advance(10_000).await;
        assert_eq!(sink.highlights().last(), Some(&None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_player_stops_timers() {
        let (player, sink) = player(linear());
        player.play();
        drop(player);

        advance(10_000).await;
        assert_eq!(sink.lifecycle(), vec![LifecycleEvent::Started]);
        assert!(sink.highlights().is_empty());
    }
}
