//! Run-to-completion worker.
//!
//! The caller hands over an owned [`SimulationSnapshot`] inside a
//! [`SimulateRequest`]; the worker rebuilds its own state from it, steps until
//! every walker has stuck and streams [`WorkerMessage`]s back over a one-way
//! channel. Nothing mutable is shared with the caller except the cancel flag.

use crate::cluster::ClusterEntry;
use crate::error::{DlaError, Result};
use crate::geometry::{Neighborhood, Point};
use crate::simulation::{SimulationSnapshot, SimulationState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

/// Progress reports queued before newer ones are dropped
const PROGRESS_QUEUE_DEPTH: usize = 16;

/// A bulk simulation job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulateRequest {
    pub width: usize,
    pub height: usize,
    pub neighborhood: Neighborhood,
    pub snapshot: SimulationSnapshot,
    /// Ticks between progress reports
    pub progress_interval: u64,
    /// Attach every walker position to progress reports
    pub include_positions: bool,
    /// Fixed rng seed for reproducible runs
    pub seed: Option<u64>,
    /// Give up with an error after this many ticks
    pub step_limit: Option<u64>,
}

impl SimulateRequest {
    /// Request for finishing `state`, built from a deep copy of it
    pub fn new(state: &SimulationState) -> Self {
        Self {
            width: state.width(),
            height: state.height(),
            neighborhood: state.neighborhood(),
            snapshot: state.snapshot(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            include_positions: false,
            seed: None,
            step_limit: None,
        }
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_positions(mut self, include: bool) -> Self {
        self.include_positions = include;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_step_limit(mut self, limit: Option<u64>) -> Self {
        self.step_limit = limit;
        self
    }
}

/// Messages streamed back by the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkerMessage {
    Progress {
        steps: u64,
        walker_count: usize,
        walker_positions: Option<Vec<Point>>,
    },
    Done {
        steps: u64,
        cluster: Vec<ClusterEntry>,
    },
    Error {
        message: String,
    },
}

impl WorkerMessage {
    /// `Done` and `Error` end a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerMessage::Done { .. } | WorkerMessage::Error { .. })
    }
}

/// How a run ended, from the worker's side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Done,
    Failed,
    Cancelled,
}

/// Drive `request` to completion on the current thread.
///
/// `emit` receives each message and returns false once nobody is listening,
/// which ends the run like a cancellation. Any error or panic inside the loop
/// becomes a single `Error` message and nothing is emitted after it.
pub fn run_to_completion<F>(
    request: SimulateRequest,
    cancelled: &AtomicBool,
    mut emit: F,
) -> RunOutcome
where
    F: FnMut(WorkerMessage) -> bool,
{
    let result = panic::catch_unwind(AssertUnwindSafe(|| drive(request, cancelled, &mut emit)));
    let message = match result {
        Ok(Ok(outcome)) => return outcome,
        Ok(Err(err)) => err.to_string(),
        Err(payload) => format!("simulation panicked: {}", panic_message(payload.as_ref())),
    };

    warn!(error = %message, "simulation worker failed");
    emit(WorkerMessage::Error { message });
    RunOutcome::Failed
}

fn drive<F>(request: SimulateRequest, cancelled: &AtomicBool, emit: &mut F) -> Result<RunOutcome>
where
    F: FnMut(WorkerMessage) -> bool,
{
    if request.progress_interval == 0 {
        return Err(DlaError::InvalidConfiguration(
            "progress interval must be positive".to_string(),
        ));
    }

    let mut state = SimulationState::from_snapshot(
        request.width,
        request.height,
        request.neighborhood,
        request.snapshot,
    )?;
    let mut rng = match request.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!(
        width = request.width,
        height = request.height,
        walkers = state.walkers().len(),
        cluster = state.cluster().len(),
        "simulation worker started"
    );

    let mut ticks: u64 = 0;
    while !state.is_finished() {
        if cancelled.load(Ordering::Relaxed) {
            warn!(steps = state.steps(), "simulation worker cancelled");
            return Ok(RunOutcome::Cancelled);
        }
        if let Some(limit) = request.step_limit {
            if ticks >= limit {
                return Err(DlaError::StepLimitExceeded {
                    limit,
                    remaining: state.walkers().len(),
                });
            }
        }

        state.step(&mut rng);
        ticks += 1;

        if ticks % request.progress_interval == 0 && !state.is_finished() {
            let progress = WorkerMessage::Progress {
                steps: state.steps(),
                walker_count: state.walkers().len(),
                walker_positions: request
                    .include_positions
                    .then(|| state.walkers().to_vec()),
            };
            if !emit(progress) {
                return Ok(RunOutcome::Cancelled);
            }
        }
    }

    info!(
        steps = state.steps(),
        cluster = state.cluster().len(),
        "simulation worker finished"
    );
    emit(WorkerMessage::Done {
        steps: state.steps(),
        cluster: state.cluster().to_entries(),
    });
    Ok(RunOutcome::Done)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Forward a message to the handle. Progress is dropped while the queue is
/// full; `Done` and `Error` wait for room. False once the handle is gone.
fn deliver(sender: &SyncSender<WorkerMessage>, msg: WorkerMessage) -> bool {
    if msg.is_terminal() {
        return sender.send(msg).is_ok();
    }
    match sender.try_send(msg) {
        Ok(()) | Err(TrySendError::Full(_)) => true,
        Err(TrySendError::Disconnected(_)) => false,
    }
}

/// A run executing on its own OS thread
pub struct WorkerHandle {
    receiver: Option<Receiver<WorkerMessage>>,
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<RunOutcome>>,
    finished: bool,
}

impl WorkerHandle {
    pub fn spawn(request: SimulateRequest) -> Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(PROGRESS_QUEUE_DEPTH);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let thread = thread::Builder::new()
            .name("dla-worker".to_string())
            .spawn(move || run_to_completion(request, &flag, |msg| deliver(&sender, msg)))?;

        Ok(Self {
            receiver: Some(receiver),
            cancelled,
            thread: Some(thread),
            finished: false,
        })
    }

    /// True once a `Done` or `Error` has been received
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Next message if one is waiting
    pub fn try_recv(&mut self) -> Option<WorkerMessage> {
        let msg = match self.receiver.as_ref()?.try_recv() {
            Ok(msg) => msg,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
        };
        Some(self.track(msg))
    }

    /// Block for the next message; `None` once the worker has gone away
    pub fn recv(&mut self) -> Option<WorkerMessage> {
        let msg = self.receiver.as_ref()?.recv().ok()?;
        Some(self.track(msg))
    }

    /// Everything queued right now, oldest first
    pub fn drain(&mut self) -> Vec<WorkerMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    fn track(&mut self, msg: WorkerMessage) -> WorkerMessage {
        if msg.is_terminal() {
            self.finished = true;
        }
        msg
    }

    /// Stop the run and wait for the thread. No partial state is reported;
    /// the outcome is `Done` or `Failed` only if the run ended first.
    pub fn cancel(mut self) -> RunOutcome {
        self.shutdown().unwrap_or(RunOutcome::Cancelled)
    }

    fn shutdown(&mut self) -> Option<RunOutcome> {
        self.cancelled.store(true, Ordering::Relaxed);
        // unblocks a worker waiting to deliver Done or Error
        self.receiver = None;
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                warn!("simulation worker thread panicked");
                Some(RunOutcome::Failed)
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawn::SpawnConfig;

    fn tiny_request(seed: u64) -> SimulateRequest {
        let mut rng = StdRng::seed_from_u64(seed);
        let spawn = SpawnConfig::Border { count: 5, margin: 1 };
        let state =
            SimulationState::create(20, 20, Neighborhood::Moore, &spawn, &mut rng).unwrap();
        SimulateRequest::new(&state)
            .with_seed(Some(seed))
            .with_progress_interval(10)
    }

    fn collect(request: SimulateRequest) -> (RunOutcome, Vec<WorkerMessage>) {
        let flag = AtomicBool::new(false);
        let mut messages = Vec::new();
        let outcome = run_to_completion(request, &flag, |msg| {
            messages.push(msg);
            true
        });
        (outcome, messages)
    }

    #[test]
    fn test_tiny_lattice_runs_to_done() {
        let (outcome, messages) = collect(tiny_request(11));
        assert_eq!(outcome, RunOutcome::Done);

        let (last, progress) = messages.split_last().unwrap();
        match last {
            WorkerMessage::Done { steps, cluster } => {
                assert!(*steps > 0);
                assert_eq!(cluster.len(), 6);
            }
            other => panic!("expected Done, got {:?}", other),
        }
        assert!(progress
            .iter()
            .all(|m| matches!(m, WorkerMessage::Progress { .. })));
    }

    #[test]
    fn test_progress_counts_and_positions() {
        let request = tiny_request(12)
            .with_progress_interval(1)
            .with_positions(true);
        let (_, messages) = collect(request);

        let mut last_steps = 0;
        for msg in &messages {
            if let WorkerMessage::Progress {
                steps,
                walker_count,
                walker_positions,
            } = msg
            {
                assert_eq!(*steps, last_steps + 1);
                last_steps = *steps;
                let positions = walker_positions.as_ref().unwrap();
                assert_eq!(positions.len(), *walker_count);
                assert!(positions.iter().all(|p| p.in_bounds(20, 20)));
            }
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let (_, first) = collect(tiny_request(13));
        let (_, second) = collect(tiny_request(13));
        assert_eq!(first, second);
    }

    #[test]
    fn test_done_result_rebuilds_a_valid_tree() {
        let (_, messages) = collect(tiny_request(14));
        let Some(WorkerMessage::Done { steps, cluster }) = messages.last().cloned() else {
            panic!("run did not finish");
        };
        let mut state = SimulationState::new(20, 20, Neighborhood::Moore).unwrap();
        state.apply_result(cluster, steps).unwrap();
        assert_eq!(state.cluster().len(), 6);
        assert_eq!(state.steps(), steps);
    }

    #[test]
    fn test_step_limit_reports_single_error() {
        let request = tiny_request(15)
            .with_progress_interval(1)
            .with_step_limit(Some(0));
        let (outcome, messages) = collect(request);
        assert_eq!(outcome, RunOutcome::Failed);
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], WorkerMessage::Error { .. }));
    }

    #[test]
    fn test_nothing_follows_an_error() {
        let request = tiny_request(16)
            .with_progress_interval(1)
            .with_step_limit(Some(3));
        let (outcome, messages) = collect(request);
        assert_eq!(outcome, RunOutcome::Failed);
        let error_at = messages
            .iter()
            .position(|m| matches!(m, WorkerMessage::Error { .. }))
            .unwrap();
        assert_eq!(error_at, messages.len() - 1);
        assert!(!messages
            .iter()
            .any(|m| matches!(m, WorkerMessage::Done { .. })));
    }

    #[test]
    fn test_invalid_snapshot_becomes_error() {
        let mut request = tiny_request(17);
        request.snapshot.cluster.clear();
        let (outcome, messages) = collect(request);
        assert_eq!(outcome, RunOutcome::Failed);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            WorkerMessage::Error { message } => assert!(message.contains("invariant")),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_progress_interval_is_rejected() {
        let (outcome, messages) = collect(tiny_request(18).with_progress_interval(0));
        assert_eq!(outcome, RunOutcome::Failed);
        assert!(matches!(messages[0], WorkerMessage::Error { .. }));
    }

    #[test]
    fn test_panic_inside_emit_is_reported() {
        let flag = AtomicBool::new(false);
        let mut messages = Vec::new();
        let mut calls = 0;
        let outcome = run_to_completion(tiny_request(19).with_progress_interval(1), &flag, |msg| {
            calls += 1;
            if calls == 1 {
                panic!("consumer blew up");
            }
            messages.push(msg);
            true
        });
        assert_eq!(outcome, RunOutcome::Failed);
        match &messages[..] {
            [WorkerMessage::Error { message }] => assert!(message.contains("consumer blew up")),
            other => panic!("unexpected messages {:?}", other),
        }
    }

    #[test]
    fn test_cancel_flag_stops_run_silently() {
        let flag = AtomicBool::new(true);
        let mut messages = Vec::new();
        let outcome = run_to_completion(tiny_request(20), &flag, |msg| {
            messages.push(msg);
            true
        });
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_threaded_worker_delivers_done() {
        let mut worker = WorkerHandle::spawn(tiny_request(21)).unwrap();
        let mut last = None;
        while let Some(msg) = worker.recv() {
            let terminal = msg.is_terminal();
            last = Some(msg);
            if terminal {
                break;
            }
        }
        assert!(worker.is_finished());
        assert!(matches!(last, Some(WorkerMessage::Done { .. })));
    }

    #[test]
    fn test_threaded_worker_cancel_stops_before_done() {
        let state = SimulationState::create(
            2000,
            2000,
            Neighborhood::VonNeumann,
            &SpawnConfig::Border { count: 50, margin: 1 },
            &mut StdRng::seed_from_u64(22),
        )
        .unwrap();
        let request = SimulateRequest::new(&state).with_progress_interval(1);
        let worker = WorkerHandle::spawn(request).unwrap();
        assert_eq!(worker.cancel(), RunOutcome::Cancelled);
    }

    #[test]
    fn test_full_queue_drops_progress() {
        let (sender, receiver) = mpsc::sync_channel(1);
        let progress = || WorkerMessage::Progress {
            steps: 1,
            walker_count: 0,
            walker_positions: None,
        };
        assert!(deliver(&sender, progress()));
        assert!(deliver(&sender, progress()));
        assert_eq!(receiver.try_iter().count(), 1);

        drop(receiver);
        assert!(!deliver(&sender, progress()));
        assert!(!deliver(&sender, WorkerMessage::Error { message: "gone".to_string() }));
    }

    #[test]
    fn test_threaded_worker_done_arrives_after_dense_progress() {
        let request = tiny_request(23)
            .with_progress_interval(1)
            .with_positions(true);
        let mut worker = WorkerHandle::spawn(request).unwrap();
        let mut last = None;
        while let Some(msg) = worker.recv() {
            let terminal = msg.is_terminal();
            last = Some(msg);
            if terminal {
                break;
            }
        }
        assert!(matches!(last, Some(WorkerMessage::Done { .. })));
        assert_eq!(worker.cancel(), RunOutcome::Done);
    }
}
