// checkout/src/flow/mod.rs

//! A small step runner used to express multi-round-trip checkout flows.
//!
//! A [`Flow`] is an ordered list of named steps. Each step may carry `before`,
//! `on` and `after` handlers which receive a shared [`ContextData`] and return a
//! [`FlowControl`] signal. Steps can be skipped with a `skip_if` predicate
//! evaluated against the context right before the step starts.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod step;

pub use context_data::ContextData;
pub use control::{FlowControl, FlowOutcome};
pub use definition::{Flow, Handler};
pub use step::{SkipCondition, StepDef};
