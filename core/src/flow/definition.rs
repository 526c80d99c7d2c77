// checkout/src/flow/definition.rs

//! `Flow<TData, Err>` construction and handler registration.

use super::context_data::ContextData;
use super::control::FlowControl;
use super::step::{SkipCondition, StepDef};
use crate::error::CheckoutError;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// A boxed asynchronous step handler.
///
/// Handlers receive a clone of the flow's [`ContextData`] and must release any
/// lock guard before awaiting.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<FlowControl, Err>> + Send>> + Send + Sync,
>;

/// Ordered, named steps over a shared `TData`.
///
/// `Err` is what handlers fail with. It must absorb [`CheckoutError`] so the
/// runner can report configuration mistakes such as a required step with no
/// handler.
pub struct Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<CheckoutError> + Send + Sync + 'static,
{
  pub(crate) name: &'static str,
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<CheckoutError> + Send + Sync + 'static,
{
  /// `step_defs` are `(name, optional, skip_if)` triples in execution order.
  pub fn new(name: &'static str, step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step_name, optional, skip_if)| StepDef {
        name: (*step_name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      name,
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn step_names(&self) -> impl Iterator<Item = &str> {
    self.steps.iter().map(|s| s.name.as_str())
  }

  fn step_index(&self, step_name: &str) -> Result<usize, CheckoutError> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| CheckoutError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  pub fn before<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Result<(), CheckoutError>
  where
    F: Future<Output = Result<FlowControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.step_index(step_name)?;
    let handler = wrap_handler(handler_fn);
    self.before.entry(step_name.to_string()).or_default().push(handler);
    Ok(())
  }

  pub fn on<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Result<(), CheckoutError>
  where
    F: Future<Output = Result<FlowControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.step_index(step_name)?;
    let handler = wrap_handler(handler_fn);
    self.on.entry(step_name.to_string()).or_default().push(handler);
    Ok(())
  }

  pub fn after<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Result<(), CheckoutError>
  where
    F: Future<Output = Result<FlowControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.step_index(step_name)?;
    let handler = wrap_handler(handler_fn);
    self.after.entry(step_name.to_string()).or_default().push(handler);
    Ok(())
  }
}

fn wrap_handler<TData, Err, F, UserErr>(
  handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
) -> Handler<TData, Err>
where
  TData: 'static + Send + Sync,
  F: Future<Output = Result<FlowControl, UserErr>> + Send + 'static,
  UserErr: Into<Err> + Send + Sync + 'static,
{
  Box::new(move |ctx_data| {
    let user_fut = handler_fn(ctx_data);
    Box::pin(async move { user_fut.await.map_err(Into::into) })
  })
}
