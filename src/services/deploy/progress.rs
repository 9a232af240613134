//! Structured progress events
//!
//! The pipeline emits one event per step transition; how the event is
//! rendered (progress bar, plain text, JSON) is entirely up to the sink.

use crate::domain::deploy::StepStatus;

/// One step transition of the pipeline
#[derive(Clone, Debug)]
pub struct StepEvent {
    /// Zero-based step index
    pub index: usize,
    /// Total number of steps
    pub total: usize,
    /// Human-readable step name
    pub name: &'static str,
    /// New state of the step
    pub state: StepStatus,
    /// Pipeline completion in percent: 0 before the first step, 100 after
    /// the last
    pub percent: u8,
    /// Wall-clock duration of the step, set once the step finished
    pub duration_ms: Option<i64>,
    /// Failure reason, set on `Failed` events only
    pub message: Option<String>,
}

/// Receives pipeline progress events
pub trait ProgressSink: Send + Sync {
    fn on_step(&self, event: &StepEvent);
}

/// Sink that discards all events
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_step(&self, _event: &StepEvent) {}
}
