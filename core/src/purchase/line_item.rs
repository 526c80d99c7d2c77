// checkout/src/purchase/line_item.rs

//! Per-line-item outcomes as the server reports them.

use crate::error::{CheckoutError, CheckoutResult};
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

pub const GENERIC_ERROR_MESSAGE: &str = "Sorry, something went wrong.";

/// A confirmed purchase. Fields the checkout core does not read are kept in
/// `details` and handed to the caller untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
  /// The server sends numeric and string ids alike.
  #[serde(default, deserialize_with = "id_as_text", skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub permalink: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content_url: Option<String>,
  #[serde(flatten)]
  pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseFailure {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_message: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_code: Option<String>,
  #[serde(default)]
  pub is_tax_mismatch: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub card_country: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ip_country: Option<String>,
  /// Fresh product snapshot when the price changed mid-checkout.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_product: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub permalink: Option<String>,
}

fn id_text(value: &Value) -> Option<String> {
  match value {
    Value::String(id) => Some(id.clone()),
    Value::Number(id) => Some(id.to_string()),
    _ => None,
  }
}

fn id_as_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
  match Option::<Value>::deserialize(deserializer)? {
    None | Some(Value::Null) => Ok(None),
    Some(value) => id_text(&value)
      .map(Some)
      .ok_or_else(|| D::Error::custom(format!("id must be a string or a number, got {}", value))),
  }
}

impl PurchaseFailure {
  pub fn with_message(message: impl Into<String>) -> Self {
    Self {
      error_message: Some(message.into()),
      ..Default::default()
    }
  }
}

/// Terminal outcome of one line item, keyed on the wire by `success`.
#[derive(Debug, Clone, PartialEq)]
pub enum LineItemResult {
  Success(PurchaseReceipt),
  Failure(PurchaseFailure),
}

impl LineItemResult {
  /// `{success: false}` with nothing else to say.
  pub fn failed() -> Self {
    LineItemResult::Failure(PurchaseFailure::default())
  }

  pub fn failed_with(message: Option<String>) -> Self {
    LineItemResult::Failure(PurchaseFailure {
      error_message: message,
      ..Default::default()
    })
  }

  pub fn is_success(&self) -> bool {
    matches!(self, LineItemResult::Success(_))
  }

  pub fn permalink(&self) -> Option<&str> {
    match self {
      LineItemResult::Success(receipt) => receipt.permalink.as_deref(),
      LineItemResult::Failure(failure) => failure.permalink.as_deref(),
    }
  }

  /// What to show the buyer for a failed item. `None` on success.
  pub fn user_message(&self) -> Option<&str> {
    match self {
      LineItemResult::Success(_) => None,
      LineItemResult::Failure(failure) => Some(failure.error_message.as_deref().unwrap_or(GENERIC_ERROR_MESSAGE)),
    }
  }

  fn from_object(mut body: Map<String, Value>) -> Result<Self, serde_json::Error> {
    let success = body.remove("success").and_then(|v| v.as_bool()).unwrap_or(false);
    let value = Value::Object(body);
    if success {
      serde_json::from_value(value).map(LineItemResult::Success)
    } else {
      serde_json::from_value(value).map(LineItemResult::Failure)
    }
  }
}

impl<'de> Deserialize<'de> for LineItemResult {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    match Value::deserialize(deserializer)? {
      Value::Object(body) => LineItemResult::from_object(body).map_err(D::Error::custom),
      other => Err(D::Error::custom(format!("line item result must be an object, got {}", other))),
    }
  }
}

impl Serialize for LineItemResult {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let (success, body) = match self {
      LineItemResult::Success(receipt) => (true, serde_json::to_value(receipt)),
      LineItemResult::Failure(failure) => (false, serde_json::to_value(failure)),
    };
    let mut body = body.map_err(S::Error::custom)?;
    if let Value::Object(map) = &mut body {
      map.insert("success".to_string(), Value::Bool(success));
    }
    body.serialize(serializer)
  }
}

/// Everything needed to run a 3-D Secure challenge and confirm afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaChallenge {
  pub client_secret: String,
  /// Order id on the cart path, purchase id on the single purchase path.
  pub confirm_id: String,
  pub stripe_connect_account_id: Option<String>,
}

impl ScaChallenge {
  /// Reads `client_secret` and the id from the nested `order` or `purchase`
  /// object.
  fn from_object(body: &Map<String, Value>) -> Option<Self> {
    let client_secret = body.get("client_secret")?.as_str()?.to_string();
    let owner = body.get("order").or_else(|| body.get("purchase"))?;
    let confirm_id = id_text(owner.get("id")?)?;
    let stripe_connect_account_id = owner
      .get("stripe_connect_account_id")
      .and_then(Value::as_str)
      .map(str::to_string);
    Some(Self {
      client_secret,
      confirm_id,
      stripe_connect_account_id,
    })
  }
}

/// Which processor confirmation a challenge needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaKind {
  /// A payment intent, confirmed with `confirm_card_payment`.
  CardAction,
  /// A setup intent, confirmed with `confirm_card_setup`.
  CardSetup,
}

/// A line item as first returned by `POST /orders` or a purchase endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerLineItem {
  RequiresCardAction(ScaChallenge),
  RequiresCardSetup(ScaChallenge),
  Settled(LineItemResult),
}

impl ServerLineItem {
  /// Interprets one raw line item. A challenge flag without a usable client
  /// secret or owner id is demoted to a failure.
  pub fn from_value(value: Value) -> CheckoutResult<Self> {
    let body = match value {
      Value::Object(body) => body,
      other => {
        return Err(CheckoutError::UnexpectedResponse {
          endpoint: "line item".to_string(),
          source: <serde_json::Error as serde::de::Error>::custom(format!("expected an object, got {}", other)),
        })
      }
    };

    let flag = |name: &str| body.get(name).and_then(Value::as_bool).unwrap_or(false);
    let (action, setup) = (flag("requires_card_action"), flag("requires_card_setup"));
    if action || setup {
      return Ok(match ScaChallenge::from_object(&body) {
        Some(challenge) if action => ServerLineItem::RequiresCardAction(challenge),
        Some(challenge) => ServerLineItem::RequiresCardSetup(challenge),
        None => {
          warn!("Line item asked for card authentication without a usable challenge.");
          ServerLineItem::Settled(LineItemResult::failed())
        }
      });
    }

    LineItemResult::from_object(body)
      .map(ServerLineItem::Settled)
      .map_err(|source| CheckoutError::UnexpectedResponse {
        endpoint: "line item".to_string(),
        source,
      })
  }

  pub fn challenge(&self) -> Option<&ScaChallenge> {
    match self {
      ServerLineItem::RequiresCardAction(challenge) | ServerLineItem::RequiresCardSetup(challenge) => Some(challenge),
      ServerLineItem::Settled(_) => None,
    }
  }

  /// Splits off the challenge, or hands back the settled result.
  pub fn into_challenge(self) -> Result<(ScaKind, ScaChallenge), LineItemResult> {
    match self {
      ServerLineItem::RequiresCardAction(challenge) => Ok((ScaKind::CardAction, challenge)),
      ServerLineItem::RequiresCardSetup(challenge) => Ok((ScaKind::CardSetup, challenge)),
      ServerLineItem::Settled(result) => Err(result),
    }
  }

  /// The terminal result, treating a pending challenge as a failure.
  pub fn into_result(self) -> LineItemResult {
    match self {
      ServerLineItem::Settled(result) => result,
      ServerLineItem::RequiresCardAction(_) | ServerLineItem::RequiresCardSetup(_) => LineItemResult::failed(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCode {
  pub code: String,
  #[serde(default)]
  pub products: Vec<String>,
}

/// The orchestrator's answer for a whole cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartPurchaseResult {
  /// Keyed by request uid. Holds exactly the requested uids once the result
  /// has gone through
  /// [`ensure_valid_cart_result`](crate::order::ensure_valid_cart_result).
  pub line_items: BTreeMap<String, LineItemResult>,
  pub can_buyer_sign_up: bool,
  pub offer_codes: Vec<OfferCode>,
}

impl CartPurchaseResult {
  pub fn all_failed<'a>(uids: impl IntoIterator<Item = &'a str>, message: Option<String>) -> Self {
    Self {
      line_items: uids
        .into_iter()
        .map(|uid| (uid.to_string(), LineItemResult::failed_with(message.clone())))
        .collect(),
      can_buyer_sign_up: false,
      offer_codes: Vec::new(),
    }
  }
}
