// checkout/src/order.rs

//! Cart checkout: create the order, authenticate the card if the processor
//! asks for it, confirm, and settle every requested line item.
//!
//! The run is a [`Flow`] over [`OrderRun`]:
//!
//! ```text
//! create_order ──(after: detect_sca)──┬─ settle_line_items ─────────────── Done
//!                                     └─ challenge_card ─ confirm_order ── Done
//! ```
//!
//! Only the first line item that needs authentication is challenged. An order
//! carries one client secret and one connected account for all of its items.

use crate::client::Checkout;
use crate::error::{CheckoutError, CheckoutResult};
use crate::flow::{ContextData, Flow, FlowControl, FlowOutcome, SkipCondition};
use crate::http::{request_json, HttpRequest, Routes};
use crate::payment::params::ProcessorError;
use crate::purchase::confirm::confirm_body;
use crate::purchase::line_item::{CartPurchaseResult, LineItemResult, OfferCode, ScaChallenge, ScaKind, ServerLineItem};
use crate::purchase::request::{create_purchases_request_data, PurchaseContext, PurchasePayload, PurchasesRequestData};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
  /// Nothing sent yet.
  Pending,
  /// The server accepted the order and answered per line item.
  Created,
  RequiresSca,
  Challenged,
  Confirmed,
  Done,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
  success: bool,
  #[serde(default)]
  line_items: BTreeMap<String, Value>,
  #[serde(default)]
  can_buyer_sign_up: bool,
  #[serde(default)]
  offer_codes: Vec<OfferCode>,
  #[serde(default)]
  error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfirmOrderResponse {
  success: bool,
  /// Iterated in key order, not in the order the server wrote them.
  #[serde(default)]
  line_items: BTreeMap<String, Value>,
  #[serde(default)]
  error_message: Option<String>,
}

/// State shared by the steps of one order run.
#[derive(Debug)]
pub struct OrderRun {
  checkout: Checkout,
  request: PurchasesRequestData,
  /// `(uid, permalink)` in request order.
  requested: Vec<(String, String)>,
  state: OrderState,
  server_items: Vec<(String, ServerLineItem)>,
  pending_sca: Option<(ScaKind, ScaChallenge)>,
  processor_error: Option<ProcessorError>,
  result: CartPurchaseResult,
}

impl OrderRun {
  fn new(checkout: Checkout, request: PurchasesRequestData) -> Self {
    let requested = request.requested_line_items();
    Self {
      checkout,
      request,
      requested,
      state: OrderState::Pending,
      server_items: Vec::new(),
      pending_sca: None,
      processor_error: None,
      result: CartPurchaseResult::default(),
    }
  }

  pub fn state(&self) -> OrderState {
    self.state
  }

  fn transition(&mut self, next: OrderState) {
    debug!(from = ?self.state, to = ?next, "Order state changed.");
    self.state = next;
  }

  fn fail_all(&mut self, message: Option<String>) {
    let uids = self.requested.iter().map(|(uid, _)| uid.as_str());
    self.result = CartPurchaseResult::all_failed(uids, message);
  }

  /// The request uid a confirmed result belongs to: the first one ordering
  /// the same product.
  ///
  /// Confirmed results are applied in ascending key order, so when two of
  /// them share a permalink the one whose key sorts last wins.
  fn uid_for_permalink(&self, permalink: &str) -> Option<&str> {
    self
      .requested
      .iter()
      .find(|(_, requested)| requested == permalink)
      .map(|(uid, _)| uid.as_str())
  }
}

/// Backfills `{success: false}` for requested uids the result lacks and drops
/// entries nobody asked for.
pub fn ensure_valid_cart_result<I, S>(mut result: CartPurchaseResult, uids: I) -> CartPurchaseResult
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut line_items = BTreeMap::new();
  for uid in uids {
    let uid = uid.as_ref();
    let item = result.line_items.remove(uid).unwrap_or_else(|| {
      debug!(uid, "No result for requested line item, marking it failed.");
      LineItemResult::failed()
    });
    line_items.insert(uid.to_string(), item);
  }
  if !result.line_items.is_empty() {
    warn!(
      unexpected = ?result.line_items.keys().collect::<Vec<_>>(),
      "Discarding results for line items that were not requested."
    );
  }
  result.line_items = line_items;
  result
}

fn has_pending_sca() -> SkipCondition<OrderRun> {
  Arc::new(|ctx: &ContextData<OrderRun>| ctx.read().pending_sca.is_some())
}

fn lacks_pending_sca() -> SkipCondition<OrderRun> {
  Arc::new(|ctx: &ContextData<OrderRun>| ctx.read().pending_sca.is_none())
}

fn order_flow() -> CheckoutResult<Flow<OrderRun, CheckoutError>> {
  let mut flow = Flow::new(
    "order_creation",
    &[
      ("create_order", false, None),
      ("settle_line_items", false, Some(has_pending_sca())),
      ("challenge_card", false, Some(lacks_pending_sca())),
      ("confirm_order", false, Some(lacks_pending_sca())),
    ],
  );
  flow.on("create_order", create_order)?;
  flow.after("create_order", detect_sca)?;
  flow.on("settle_line_items", settle_line_items)?;
  flow.on("challenge_card", challenge_card)?;
  flow.on("confirm_order", confirm_order)?;
  Ok(flow)
}

async fn create_order(ctx: ContextData<OrderRun>) -> CheckoutResult<FlowControl> {
  let (checkout, body) = {
    let run = ctx.read();
    (run.checkout.clone(), serde_json::to_value(&run.request))
  };
  let body = body.map_err(|e| CheckoutError::Internal(format!("Failed to encode order request: {}", e)))?;

  let response: OrderResponse = request_json(checkout.http(), HttpRequest::post_json(Routes::orders(), body)).await?;

  let mut run = ctx.write();
  if !response.success {
    warn!(error_message = ?response.error_message, "Order was rejected as a whole.");
    run.fail_all(response.error_message);
    run.transition(OrderState::Done);
    return Ok(FlowControl::Stop);
  }

  let mut server_items = Vec::with_capacity(response.line_items.len());
  for (uid, raw) in response.line_items {
    let item = ServerLineItem::from_value(raw).unwrap_or_else(|e| {
      warn!(uid = %uid, error = %e, "Unreadable line item, marking it failed.");
      ServerLineItem::Settled(LineItemResult::failed())
    });
    server_items.push((uid, item));
  }
  run.server_items = server_items;
  run.result.can_buyer_sign_up = response.can_buyer_sign_up;
  run.result.offer_codes = response.offer_codes;
  run.transition(OrderState::Created);
  Ok(FlowControl::Continue)
}

/// Picks the first line item, in request order, that needs authentication.
async fn detect_sca(ctx: ContextData<OrderRun>) -> CheckoutResult<FlowControl> {
  let mut run = ctx.write();
  let pending = run.requested.iter().find_map(|(uid, _)| {
    run
      .server_items
      .iter()
      .find(|(item_uid, _)| item_uid == uid)
      .and_then(|(_, item)| item.clone().into_challenge().ok())
  });
  let challenged = run.server_items.iter().filter(|(_, item)| item.challenge().is_some()).count();
  if challenged > 1 {
    debug!(challenged, "Several line items asked for authentication; only the first is challenged.");
  }
  if let Some(pending) = pending {
    run.pending_sca = Some(pending);
    run.transition(OrderState::RequiresSca);
  }
  Ok(FlowControl::Continue)
}

async fn settle_line_items(ctx: ContextData<OrderRun>) -> CheckoutResult<FlowControl> {
  let mut run = ctx.write();
  let server_items = std::mem::take(&mut run.server_items);
  for (uid, item) in server_items {
    if item.challenge().is_some() {
      warn!(uid = %uid, "Line item still awaits authentication, marking it failed.");
    }
    run.result.line_items.insert(uid, item.into_result());
  }
  run.transition(OrderState::Done);
  Ok(FlowControl::Continue)
}

async fn challenge_card(ctx: ContextData<OrderRun>) -> CheckoutResult<FlowControl> {
  let (checkout, pending) = {
    let run = ctx.read();
    (run.checkout.clone(), run.pending_sca.clone())
  };
  let (kind, challenge) = pending.ok_or_else(|| CheckoutError::Internal("No pending card challenge".to_string()))?;

  let processor_error = checkout.run_card_challenge(kind, &challenge).await?;

  let mut run = ctx.write();
  run.processor_error = processor_error;
  run.transition(OrderState::Challenged);
  Ok(FlowControl::Continue)
}

async fn confirm_order(ctx: ContextData<OrderRun>) -> CheckoutResult<FlowControl> {
  let (checkout, challenge, body) = {
    let run = ctx.read();
    let (_, challenge) = run
      .pending_sca
      .clone()
      .ok_or_else(|| CheckoutError::Internal("No pending card challenge".to_string()))?;
    let body = confirm_body(&challenge, run.processor_error.as_ref());
    (run.checkout.clone(), challenge, body)
  };

  let response: ConfirmOrderResponse = request_json(
    checkout.http(),
    HttpRequest::post_json(Routes::confirm_order(&challenge.confirm_id), body),
  )
  .await?;

  let mut run = ctx.write();
  run.transition(OrderState::Confirmed);
  if !response.success {
    warn!(error_message = ?response.error_message, "Order confirmation was rejected.");
    let message = response.error_message;
    let uids: Vec<String> = run.requested.iter().map(|(uid, _)| uid.clone()).collect();
    for uid in uids {
      run.result.line_items.insert(uid, LineItemResult::failed_with(message.clone()));
    }
  } else {
    for (key, raw) in response.line_items {
      let result: LineItemResult = match serde_json::from_value(raw) {
        Ok(result) => result,
        Err(e) => {
          warn!(key = %key, error = %e, "Unreadable confirmed line item, skipping it.");
          continue;
        }
      };
      let uid = result.permalink().and_then(|permalink| run.uid_for_permalink(permalink)).map(str::to_string);
      match uid {
        Some(uid) => {
          run.result.line_items.insert(uid, result);
        }
        None => warn!(key = %key, "Confirmed line item matches no requested product."),
      }
    }
  }
  run.transition(OrderState::Done);
  Ok(FlowControl::Continue)
}

impl Checkout {
  /// Places a cart order and returns one result per requested line item.
  ///
  /// Never fails. Transport errors, malformed responses and processor
  /// resolution problems are logged and turn every line item into a failure.
  #[instrument(skip_all, fields(num_line_items = payload.line_items.len()))]
  pub async fn start_order_creation(&self, payload: &PurchasePayload, purchase: &PurchaseContext) -> CartPurchaseResult {
    let request = create_purchases_request_data(payload, purchase);
    let uids: Vec<String> = request.line_items.iter().map(|item| item.uid.clone()).collect();

    match self.run_order(request).await {
      Ok(result) => ensure_valid_cart_result(result, &uids),
      Err(e) => {
        error!(error = %e, "Order creation failed.");
        CartPurchaseResult::all_failed(uids.iter().map(String::as_str), None)
      }
    }
  }

  async fn run_order(&self, request: PurchasesRequestData) -> CheckoutResult<CartPurchaseResult> {
    let flow = order_flow()?;
    let ctx = ContextData::new(OrderRun::new(self.clone(), request));
    let outcome = flow.run(ctx.clone()).await?;

    let run = ctx
      .try_unwrap()
      .map_err(|_| CheckoutError::Internal("Order state is still shared after the flow finished".to_string()))?;
    info!(?outcome, state = ?run.state(), "Order flow finished.");
    if outcome == FlowOutcome::Completed && run.state() != OrderState::Done {
      return Err(CheckoutError::Internal(format!("Order flow ended in state {:?}", run.state())));
    }
    Ok(run.result)
  }
}
