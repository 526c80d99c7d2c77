// checkout/src/flow/execution.rs

//! `Flow::run`.

use super::context_data::ContextData;
use super::control::{FlowControl, FlowOutcome};
use super::definition::{Flow, Handler};
use super::step::StepDef;
use crate::error::CheckoutError;
use tracing::{event, span, Instrument, Level};

#[derive(Debug, Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  fn label(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<CheckoutError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// A handler error aborts the run and is returned as is. A required step
  /// with no handlers at all fails with [`CheckoutError::HandlerMissing`].
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<FlowOutcome, Err> {
    let flow_span = span!(Level::DEBUG, "flow_run", flow = self.name, num_steps = self.steps.len());
    self.run_steps(ctx_data).instrument(flow_span).await
  }

  async fn run_steps(&self, ctx_data: ContextData<TData>) -> Result<FlowOutcome, Err> {
    event!(Level::DEBUG, "Flow execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = span!(
        Level::DEBUG,
        "flow_step",
        step_name = step_def.name.as_str(),
        step_index = step_idx
      );
      let control = self.run_step(step_def, &ctx_data).instrument(step_span).await?;
      if control == FlowControl::Stop {
        event!(Level::DEBUG, step_name = step_def.name.as_str(), "Flow stopped.");
        return Ok(FlowOutcome::Stopped);
      }
    }

    event!(Level::DEBUG, "Flow execution completed.");
    Ok(FlowOutcome::Completed)
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx_data: &ContextData<TData>) -> Result<FlowControl, Err> {
    if let Some(skip_if) = &step_def.skip_if {
      if skip_if(ctx_data) {
        event!(Level::DEBUG, "Step skipped due to 'skip_if' condition.");
        return Ok(FlowControl::Continue);
      }
    }

    let name = step_def.name.as_str();
    let has_handlers = [&self.before, &self.on, &self.after]
      .iter()
      .any(|phase| phase.get(name).map_or(false, |hs| !hs.is_empty()));

    if !has_handlers {
      if step_def.optional {
        event!(Level::DEBUG, "Optional step has no handlers, passing over it.");
        return Ok(FlowControl::Continue);
      }
      event!(Level::ERROR, "Required step has no handlers.");
      return Err(Err::from(CheckoutError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }

    for (phase, handlers) in [
      (Phase::Before, self.before.get(name)),
      (Phase::On, self.on.get(name)),
      (Phase::After, self.after.get(name)),
    ] {
      if let Some(handlers) = handlers {
        if run_phase(phase, handlers, ctx_data).await? == FlowControl::Stop {
          return Ok(FlowControl::Stop);
        }
      }
    }
    Ok(FlowControl::Continue)
  }
}

async fn run_phase<TData, Err>(
  phase: Phase,
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
) -> Result<FlowControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for handler_fn in handlers {
    match handler_fn(ctx_data.clone()).await {
      Ok(FlowControl::Continue) => {}
      Ok(FlowControl::Stop) => {
        event!(Level::DEBUG, phase = phase.label(), "Handler requested stop.");
        return Ok(FlowControl::Stop);
      }
      Err(e) => {
        event!(Level::WARN, phase = phase.label(), error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(FlowControl::Continue)
}
