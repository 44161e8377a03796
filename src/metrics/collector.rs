//! Metrics collection and registry.

use crate::capture::{Position, SessionState};
use crate::worker::SessionSnapshot;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Metric creation or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether the session is currently running.
    pub running: bool,
    /// Whether the active camera faces the user.
    pub front_facing: bool,
    /// Whether a camera is attached.
    pub input_attached: bool,
    /// Total transitions into running.
    pub starts: u64,
    /// Total transitions out of running.
    pub stops: u64,
    /// Total switches that changed the attached camera.
    pub switches: u64,
    /// Total switches that failed.
    pub switch_failures: u64,
    /// Total failed switches that restored the previous camera.
    pub rollbacks: u64,
    /// Total captures delivered.
    pub captures: u64,
    /// Total captures that failed in hardware.
    pub capture_failures: u64,
    /// Total captures refused while not running.
    pub rejected_captures: u64,
}

impl From<&SessionSnapshot> for MetricsSnapshot {
    fn from(snapshot: &SessionSnapshot) -> Self {
        let stats = &snapshot.stats;
        Self {
            running: snapshot.state == SessionState::Running,
            front_facing: snapshot.position == Position::Front,
            input_attached: snapshot.device.is_some(),
            starts: stats.starts,
            stops: stats.stops,
            switches: stats.switches,
            switch_failures: stats.switch_failures,
            rollbacks: stats.rollbacks,
            captures: stats.captures,
            capture_failures: stats.capture_failures,
            rejected_captures: stats.rejected_captures,
        }
    }
}

/// Prometheus metrics registry for session monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    // Session gauges
    running: IntGauge,
    front_facing: IntGauge,
    input_attached: IntGauge,

    // Lifecycle counters
    starts_total: IntCounter,
    stops_total: IntCounter,

    // Switch counters
    switches_total: IntCounter,
    switch_failures_total: IntCounter,
    rollbacks_total: IntCounter,

    // Capture counters
    captures_total: IntCounter,
    capture_failures_total: IntCounter,
    rejected_captures_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let running = IntGauge::new(
            "camera_session_running",
            "Whether the capture session is running (1=running, 0=stopped)",
        )?;
        let front_facing = IntGauge::new(
            "camera_session_front_facing",
            "Whether the active camera is the front camera",
        )?;
        let input_attached = IntGauge::new(
            "camera_session_input_attached",
            "Whether a camera input is attached",
        )?;

        let starts_total = IntCounter::new(
            "camera_session_starts_total",
            "Total transitions into the running state",
        )?;
        let stops_total = IntCounter::new(
            "camera_session_stops_total",
            "Total transitions out of the running state",
        )?;

        let switches_total = IntCounter::new(
            "camera_session_switches_total",
            "Total camera switches that changed the attached device",
        )?;
        let switch_failures_total = IntCounter::new(
            "camera_session_switch_failures_total",
            "Total camera switches that failed",
        )?;
        let rollbacks_total = IntCounter::new(
            "camera_session_rollbacks_total",
            "Total failed switches that restored the previous camera",
        )?;

        let captures_total = IntCounter::new(
            "camera_session_captures_total",
            "Total still captures delivered",
        )?;
        let capture_failures_total = IntCounter::new(
            "camera_session_capture_failures_total",
            "Total still captures that failed in hardware",
        )?;
        let rejected_captures_total = IntCounter::new(
            "camera_session_rejected_captures_total",
            "Total still captures refused because the session was not running",
        )?;

        registry.register(Box::new(running.clone()))?;
        registry.register(Box::new(front_facing.clone()))?;
        registry.register(Box::new(input_attached.clone()))?;
        registry.register(Box::new(starts_total.clone()))?;
        registry.register(Box::new(stops_total.clone()))?;
        registry.register(Box::new(switches_total.clone()))?;
        registry.register(Box::new(switch_failures_total.clone()))?;
        registry.register(Box::new(rollbacks_total.clone()))?;
        registry.register(Box::new(captures_total.clone()))?;
        registry.register(Box::new(capture_failures_total.clone()))?;
        registry.register(Box::new(rejected_captures_total.clone()))?;

        Ok(Self {
            registry,
            running,
            front_facing,
            input_attached,
            starts_total,
            stops_total,
            switches_total,
            switch_failures_total,
            rollbacks_total,
            captures_total,
            capture_failures_total,
            rejected_captures_total,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.running.set(snapshot.running as i64);
        self.front_facing.set(snapshot.front_facing as i64);
        self.input_attached.set(snapshot.input_attached as i64);

        // Counters only move forward; add the difference.
        advance(&self.starts_total, snapshot.starts);
        advance(&self.stops_total, snapshot.stops);
        advance(&self.switches_total, snapshot.switches);
        advance(&self.switch_failures_total, snapshot.switch_failures);
        advance(&self.rollbacks_total, snapshot.rollbacks);
        advance(&self.captures_total, snapshot.captures);
        advance(&self.capture_failures_total, snapshot.capture_failures);
        advance(&self.rejected_captures_total, snapshot.rejected_captures);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}
