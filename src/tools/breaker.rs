//! Per-tool circuit breakers
//!
//! One `CircuitState` per tool id, created lazily on first use and never
//! removed. All reads and transitions go through a single mutex; nothing
//! awaits while it is held.
//!
//! Transitions:
//! 1. Closed   → Open     (window full and failure ratio ≥ threshold)
//! 2. Open     → HalfOpen (open duration elapsed; one probe admitted)
//! 3. HalfOpen → Closed   (probe succeeded; window reset)
//! 4. HalfOpen → Open     (probe failed; re-stamped)
//!
//! Only the admitted probe can move a breaker out of `HalfOpen`. The probe
//! holds a `ProbeGuard`; if the probe call is dropped or panics before its
//! outcome is recorded, the guard frees the slot for the next caller.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Rolling window size (requests)
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Failure ratio that opens the breaker
pub const DEFAULT_FAILURE_RATIO: f64 = 0.5;

/// Time spent open before a probe is allowed (30 seconds)
pub const DEFAULT_OPEN_DURATION: Duration = Duration::from_secs(30);

/// Breaker phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitPhase {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitPhase::Closed => "closed",
            CircuitPhase::Open => "open",
            CircuitPhase::HalfOpen => "half_open",
        }
    }
}

/// Breaker thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerConfig {
    pub window_size: usize,
    pub failure_ratio: f64,
    pub open_duration: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            failure_ratio: DEFAULT_FAILURE_RATIO,
            open_duration: DEFAULT_OPEN_DURATION,
        }
    }
}

/// Decision for one incoming call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Breaker closed
    Allowed,

    /// Breaker half-open; this call is the single probe
    Probe,

    /// Breaker open (or probe already in flight)
    Rejected { retry_after: Duration },
}

/// How a finished call is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,

    /// Finished without saying anything about the target's health
    Ignored,
}

/// State for one tool id
#[derive(Debug, Clone)]
pub struct CircuitState {
    pub phase: CircuitPhase,

    /// Most recent outcomes, `true` = failure
    window: VecDeque<bool>,

    pub last_transition_at: Instant,

    probe_in_flight: bool,
}

impl CircuitState {
    fn new() -> Self {
        Self {
            phase: CircuitPhase::Closed,
            window: VecDeque::new(),
            last_transition_at: Instant::now(),
            probe_in_flight: false,
        }
    }

    /// Requests in the rolling window
    pub fn requests(&self) -> usize {
        self.window.len()
    }

    /// Failures in the rolling window
    pub fn failures(&self) -> usize {
        self.window.iter().filter(|failed| **failed).count()
    }

    fn transition(&mut self, to: CircuitPhase) {
        self.phase = to;
        self.last_transition_at = Instant::now();
        self.window.clear();
        self.probe_in_flight = false;
    }
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSnapshot {
    pub phase: CircuitPhase,
    pub requests: usize,
    pub failures: usize,
}

/// Phase change caused by recording an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitPhase,
    pub to: CircuitPhase,
}

/// Slot held by an in-flight half-open probe.
///
/// `record` consumes the guard. Dropping it unrecorded (cancelled future,
/// panicking handler) releases the slot so the next caller becomes the probe.
#[must_use = "dropping the guard abandons the probe"]
pub struct ProbeGuard<'a> {
    registry: &'a CircuitBreakerRegistry,
    tool_id: &'a str,
    armed: bool,
}

impl ProbeGuard<'_> {
    /// Record the probe's outcome
    pub fn record(mut self, outcome: CallOutcome) -> Option<Transition> {
        self.armed = false;
        self.registry.record(self.tool_id, Admission::Probe, outcome)
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.release_probe(self.tool_id);
        }
    }
}

/// Process-wide table of breakers keyed by tool id
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    config: BreakerConfig,
    circuits: Mutex<HashMap<String, CircuitState>>,
}

impl CircuitBreakerRegistry {
    /// Create registry with given thresholds
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    /// Thresholds in use
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CircuitState>> {
        // A panic elsewhere cannot leave a CircuitState half-updated
        self.circuits.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Gate one call
    pub fn admit(&self, tool_id: &str) -> Admission {
        let mut circuits = self.lock();
        let state = circuits
            .entry(tool_id.to_string())
            .or_insert_with(CircuitState::new);

        match state.phase {
            CircuitPhase::Closed => Admission::Allowed,
            CircuitPhase::Open => {
                let elapsed = state.last_transition_at.elapsed();
                if elapsed >= self.config.open_duration {
                    state.transition(CircuitPhase::HalfOpen);
                    state.probe_in_flight = true;
                    debug!(tool_id, "Circuit half-open; admitting probe");
                    Admission::Probe
                } else {
                    Admission::Rejected {
                        retry_after: self.config.open_duration - elapsed,
                    }
                }
            }
            CircuitPhase::HalfOpen => {
                if state.probe_in_flight {
                    Admission::Rejected {
                        retry_after: Duration::ZERO,
                    }
                } else {
                    state.probe_in_flight = true;
                    debug!(tool_id, "Circuit half-open; admitting probe");
                    Admission::Probe
                }
            }
        }
    }

    /// Guard for a call admitted as `Admission::Probe`
    pub fn probe_guard<'a>(&'a self, tool_id: &'a str) -> ProbeGuard<'a> {
        ProbeGuard {
            registry: self,
            tool_id,
            armed: true,
        }
    }

    /// Record a finished call under the admission it was given; returns the
    /// transition it caused, if any
    pub fn record(&self, tool_id: &str, admission: Admission, outcome: CallOutcome) -> Option<Transition> {
        let mut circuits = self.lock();
        let state = circuits
            .entry(tool_id.to_string())
            .or_insert_with(CircuitState::new);
        let from = state.phase;
        let is_probe = admission == Admission::Probe;

        match (from, outcome) {
            // Calls admitted before the breaker opened do not decide the probe
            (CircuitPhase::HalfOpen, _) if !is_probe || !state.probe_in_flight => {}
            (CircuitPhase::HalfOpen, CallOutcome::Success) => {
                state.transition(CircuitPhase::Closed);
                info!(tool_id, "Circuit closed after successful probe");
            }
            (CircuitPhase::HalfOpen, CallOutcome::Failure) => {
                state.transition(CircuitPhase::Open);
                warn!(tool_id, "Circuit re-opened after failed probe");
            }
            (CircuitPhase::HalfOpen, CallOutcome::Ignored) => {
                state.probe_in_flight = false;
            }
            (CircuitPhase::Closed, CallOutcome::Success | CallOutcome::Failure) if !is_probe => {
                state.window.push_back(outcome == CallOutcome::Failure);
                while state.window.len() > self.config.window_size {
                    state.window.pop_front();
                }
                if self.should_open(state) {
                    warn!(
                        tool_id,
                        requests = state.requests(),
                        failures = state.failures(),
                        "Circuit opened"
                    );
                    state.transition(CircuitPhase::Open);
                }
            }
            // Late results from calls admitted before the breaker opened
            (CircuitPhase::Open, _) | (CircuitPhase::Closed, _) => {}
        }

        let to = state.phase;
        (from != to).then_some(Transition { from, to })
    }

    /// Free the half-open slot of a probe that ended without an outcome
    fn release_probe(&self, tool_id: &str) {
        let mut circuits = self.lock();
        if let Some(state) = circuits.get_mut(tool_id) {
            if state.phase == CircuitPhase::HalfOpen && state.probe_in_flight {
                state.probe_in_flight = false;
                debug!(tool_id, "Probe abandoned; slot released");
            }
        }
    }

    fn should_open(&self, state: &CircuitState) -> bool {
        let requests = state.requests();
        requests >= self.config.window_size
            && requests > 0
            && state.failures() as f64 / requests as f64 >= self.config.failure_ratio
    }

    /// Current phase, if the tool has been seen
    pub fn phase(&self, tool_id: &str) -> Option<CircuitPhase> {
        self.lock().get(tool_id).map(|state| state.phase)
    }

    /// Phase and counters, if the tool has been seen
    pub fn snapshot(&self, tool_id: &str) -> Option<CircuitSnapshot> {
        self.lock().get(tool_id).map(|state| CircuitSnapshot {
            phase: state.phase,
            requests: state.requests(),
            failures: state.failures(),
        })
    }

    /// Number of tool ids with breaker state
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if no tool has been seen yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
