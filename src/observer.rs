//! Instrumentation hooks for the fixpoint engine.
//!
//! The engine never prints; it reports round progress and phase timings to an
//! [`AnalysisObserver`] supplied at construction.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use log::{debug, info};
use parking_lot::Mutex;

use crate::fixpoint::StateSets;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Phase {
    BackwardFixpoint,
    ForwardSweep,
    ForwardFixpoint,
    CandidateSearch,
    Confirmation,
    Attribution,
    Closure,
    PathSearch,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::BackwardFixpoint => "backward fixpoint",
            Phase::ForwardSweep => "forward sweep",
            Phase::ForwardFixpoint => "forward fixpoint",
            Phase::CandidateSearch => "candidate search",
            Phase::Confirmation => "confirmation",
            Phase::Attribution => "attribution",
            Phase::Closure => "closure",
            Phase::PathSearch => "path search",
        };
        write!(f, "{}", name)
    }
}

pub trait AnalysisObserver: Send + Sync {
    /// Called after each round of an iterative phase with the number of nodes
    /// whose predicate changed in that round.
    fn round(&self, _phase: Phase, _round: usize, _changed: usize) {}

    /// Called after each round of a fixpoint with the sets accumulated so far.
    fn snapshot(&self, _phase: Phase, _round: usize, _sets: &StateSets) {}

    /// Called once a phase completes.
    fn phase_finished(&self, _phase: Phase, _rounds: usize, _elapsed: Duration) {}
}

#[derive(Debug, Default, Copy, Clone)]
pub struct NoopObserver;

impl AnalysisObserver for NoopObserver {}

/// Reports phases at `info` level and rounds at `debug` level.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogObserver;

impl AnalysisObserver for LogObserver {
    fn round(&self, phase: Phase, round: usize, changed: usize) {
        debug!("{}: round {}, {} changed", phase, round, changed);
    }

    fn phase_finished(&self, phase: Phase, rounds: usize, elapsed: Duration) {
        info!("{} finished after {} rounds in {:.3} s", phase, rounds, elapsed.as_secs_f64());
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Event {
    Round { phase: Phase, round: usize, changed: usize },
    PhaseFinished { phase: Phase, rounds: usize },
}

/// Keeps every event in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Completed phases in order, with their round counts.
    pub fn phases(&self) -> Vec<(Phase, usize)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match *e {
                Event::PhaseFinished { phase, rounds } => Some((phase, rounds)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AnalysisObserver for RecordingObserver {
    fn round(&self, phase: Phase, round: usize, changed: usize) {
        self.events.lock().push(Event::Round { phase, round, changed });
    }

    fn phase_finished(&self, phase: Phase, rounds: usize, _elapsed: Duration) {
        self.events.lock().push(Event::PhaseFinished { phase, rounds });
    }
}
