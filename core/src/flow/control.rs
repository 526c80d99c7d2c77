// checkout/src/flow/control.rs

/// Signal returned by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
  /// Keep going with the remaining handlers and steps.
  Continue,
  /// Halt the flow. Nothing after the current handler runs.
  Stop,
}

/// How a [`Flow::run`](super::Flow::run) ended when no handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  Completed,
  Stopped,
}
