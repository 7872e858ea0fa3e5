//! Telemetry for tool calls and chains
//!
//! Collects in-process events and counters, and renders a terminal summary.
//! Counters are cumulative; only the most recent events are retained.

use colored::Colorize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::tools::breaker::CircuitPhase;

/// Number of events kept for `recent_events`
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    // Tool events
    ToolStarted {
        tool_id: String,
        timestamp: Instant,
    },
    AttemptFailed {
        tool_id: String,
        attempt: u32,
        error_kind: &'static str,
        timestamp: Instant,
    },
    RetryScheduled {
        tool_id: String,
        attempt: u32,
        delay_ms: u64,
        timestamp: Instant,
    },
    ToolCompleted {
        tool_id: String,
        duration_ms: u64,
        attempts: u32,
        success: bool,
        timestamp: Instant,
    },

    // Breaker events
    CircuitRejected {
        tool_id: String,
        timestamp: Instant,
    },
    CircuitTransition {
        tool_id: String,
        from: CircuitPhase,
        to: CircuitPhase,
        timestamp: Instant,
    },

    // Chain events
    ChainDispatched {
        chain_id: String,
        tool_count: usize,
        skipped: usize,
        timestamp: Instant,
    },
    ChainCompleted {
        chain_id: String,
        duration_ms: u64,
        success: bool,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub tools_executed: usize,
    pub tools_succeeded: usize,
    pub tools_failed: usize,
    pub failed_attempts: usize,
    pub retry_attempts: usize,
    pub circuit_rejections: usize,
    pub circuit_transitions: usize,
    pub chains_dispatched: usize,
    pub chains_succeeded: usize,
    pub chains_failed: usize,
}

/// Telemetry collector
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<VecDeque<TelemetryEvent>>>,
    capacity: usize,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a collector retaining at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_EVENT_CAPACITY)))),
            capacity,
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::ToolStarted { .. } => {
                    stats.tools_executed += 1;
                }
                TelemetryEvent::AttemptFailed { .. } => {
                    stats.failed_attempts += 1;
                }
                TelemetryEvent::RetryScheduled { .. } => {
                    stats.retry_attempts += 1;
                }
                TelemetryEvent::ToolCompleted { success, .. } => {
                    if *success {
                        stats.tools_succeeded += 1;
                    } else {
                        stats.tools_failed += 1;
                    }
                }
                TelemetryEvent::CircuitRejected { .. } => {
                    stats.circuit_rejections += 1;
                }
                TelemetryEvent::CircuitTransition { .. } => {
                    stats.circuit_transitions += 1;
                }
                TelemetryEvent::ChainDispatched { .. } => {
                    stats.chains_dispatched += 1;
                }
                TelemetryEvent::ChainCompleted { success, .. } => {
                    if *success {
                        stats.chains_succeeded += 1;
                    } else {
                        stats.chains_failed += 1;
                    }
                }
            }
        }

        let mut events = lock(&self.events);
        if events.len() >= self.capacity {
            events.pop_front();
        }
        if self.capacity > 0 {
            events.push_back(event);
        }
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Number of retained events
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events.iter().skip(start).cloned().collect()
    }

    /// Calculate tool success rate
    pub fn tool_success_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        let total = stats.tools_succeeded + stats.tools_failed;
        if total == 0 {
            1.0
        } else {
            stats.tools_succeeded as f64 / total as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: crate::cli::Verbosity,
}

impl TelemetryDisplay {
    /// Create a new display
    pub fn new(collector: TelemetryCollector, verbosity: crate::cli::Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Summary lines, uncolored
    pub fn summary_lines(&self) -> Vec<String> {
        let stats = self.collector.get_stats();
        let mut lines = vec![
            format!("Duration:          {:?}", self.collector.elapsed()),
            format!("Tools executed:    {}", stats.tools_executed),
            format!("Success rate:      {:.1}%", self.collector.tool_success_rate() * 100.0),
            format!("Retries:           {}", stats.retry_attempts),
            format!("Circuit rejects:   {}", stats.circuit_rejections),
        ];
        if stats.chains_dispatched > 0 {
            lines.push(format!(
                "Chains:            {} ({} ok, {} failed)",
                stats.chains_dispatched, stats.chains_succeeded, stats.chains_failed
            ));
        }
        lines
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        if !self.verbosity.show_progress() {
            return;
        }

        eprintln!();
        eprintln!("{}", "Session Summary".bold());
        eprintln!("{}", "─────────────────────────────────────".dimmed());
        for line in self.summary_lines() {
            eprintln!("{}", line);
        }

        if self.should_show_details() {
            for event in self.collector.recent_events(20) {
                eprintln!("  {}", format!("{:?}", event).dimmed());
            }
        }
        eprintln!();
    }

    /// Check if should show detailed output
    pub fn should_show_details(&self) -> bool {
        self.verbosity.show_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Verbosity;

    fn completed(tool_id: &str, success: bool) -> TelemetryEvent {
        TelemetryEvent::ToolCompleted {
            tool_id: tool_id.to_string(),
            duration_ms: 100,
            attempts: 1,
            success,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_collector_creation() {
        let collector = TelemetryCollector::new();
        assert_eq!(collector.event_count(), 0);
        assert_eq!(collector.get_stats(), TelemetryStats::default());
    }

    #[test]
    fn test_record_tool_events() {
        let collector = TelemetryCollector::new();

        collector.record(TelemetryEvent::ToolStarted {
            tool_id: "t1".to_string(),
            timestamp: Instant::now(),
        });
        collector.record(TelemetryEvent::RetryScheduled {
            tool_id: "t1".to_string(),
            attempt: 1,
            delay_ms: 1000,
            timestamp: Instant::now(),
        });
        collector.record(completed("t1", true));

        let stats = collector.get_stats();
        assert_eq!(stats.tools_executed, 1);
        assert_eq!(stats.retry_attempts, 1);
        assert_eq!(stats.tools_succeeded, 1);
        assert_eq!(stats.tools_failed, 0);
        assert_eq!(collector.event_count(), 3);
    }

    #[test]
    fn test_tool_success_rate() {
        let collector = TelemetryCollector::new();
        assert_eq!(collector.tool_success_rate(), 1.0);

        collector.record(completed("a", true));
        collector.record(completed("b", true));
        collector.record(completed("c", false));

        let rate = collector.tool_success_rate();
        assert!((rate - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_circuit_and_chain_events() {
        let collector = TelemetryCollector::new();

        collector.record(TelemetryEvent::CircuitTransition {
            tool_id: "a".to_string(),
            from: CircuitPhase::Closed,
            to: CircuitPhase::Open,
            timestamp: Instant::now(),
        });
        collector.record(TelemetryEvent::CircuitRejected {
            tool_id: "a".to_string(),
            timestamp: Instant::now(),
        });
        collector.record(TelemetryEvent::ChainCompleted {
            chain_id: "c".to_string(),
            duration_ms: 5,
            success: false,
            timestamp: Instant::now(),
        });

        let stats = collector.get_stats();
        assert_eq!(stats.circuit_transitions, 1);
        assert_eq!(stats.circuit_rejections, 1);
        assert_eq!(stats.chains_failed, 1);
    }

    #[test]
    fn test_recent_events() {
        let collector = TelemetryCollector::new();
        for i in 0..10 {
            collector.record(completed(&format!("t{}", i), true));
        }

        let recent = collector.recent_events(3);
        assert_eq!(recent.len(), 3);
        assert!(matches!(&recent[2], TelemetryEvent::ToolCompleted { tool_id, .. } if tool_id == "t9"));
    }

    #[test]
    fn test_clones_share_state() {
        let collector = TelemetryCollector::new();
        let clone = collector.clone();
        clone.record(completed("a", false));
        assert_eq!(collector.get_stats().tools_failed, 1);
    }

    #[test]
    fn test_summary_lines() {
        let collector = TelemetryCollector::new();
        collector.record(completed("a", true));
        let display = TelemetryDisplay::new(collector, Verbosity::Normal);

        let lines = display.summary_lines();
        assert!(lines.iter().any(|l| l.contains("Success rate:      100.0%")));
        assert!(!lines.iter().any(|l| l.starts_with("Chains")));
        assert!(!display.should_show_details());
    }

    #[test]
    fn test_event_log_is_bounded() {
        let collector = TelemetryCollector::with_capacity(5);
        for i in 0..12 {
            collector.record(completed(&format!("t{}", i), i % 2 == 0));
        }

        assert_eq!(collector.event_count(), 5);
        let recent = collector.recent_events(100);
        assert_eq!(recent.len(), 5);
        assert!(matches!(&recent[0], TelemetryEvent::ToolCompleted { tool_id, .. } if tool_id == "t7"));
        assert!(matches!(&recent[4], TelemetryEvent::ToolCompleted { tool_id, .. } if tool_id == "t11"));

        // Counters still cover every event
        let stats = collector.get_stats();
        assert_eq!(stats.tools_succeeded, 6);
        assert_eq!(stats.tools_failed, 6);
    }

    #[test]
    fn test_default_capacity() {
        let collector = TelemetryCollector::new();
        for i in 0..(DEFAULT_EVENT_CAPACITY + 10) {
            collector.record(completed(&format!("t{}", i), true));
        }
        assert_eq!(collector.event_count(), DEFAULT_EVENT_CAPACITY);
        assert_eq!(collector.get_stats().tools_succeeded, DEFAULT_EVENT_CAPACITY + 10);
    }
}
