// checkout/src/payment/params.rs

//! Tokenized payment methods and how they flatten into request fields.
//!
//! Reusability is carried by the types themselves: a card-family method is
//! reusable exactly when it holds [`FutureChargeIds`], a native PayPal method
//! when it is a billing agreement, and a gateway PayPal method always.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured failure reported by a payment processor (card declined,
/// authentication failed, ...). Preserved verbatim up to the line item result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorError {
  #[serde(rename = "type")]
  pub kind: String,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
}

impl ProcessorError {
  pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      message: message.into(),
      code: None,
    }
  }

  pub fn with_code(mut self, code: impl Into<String>) -> Self {
    self.code = Some(code.into());
    self
  }

  /// The catch-all used when a response is neither a token nor a structured error.
  pub fn generic() -> Self {
    Self::new("api_error", "Sorry, something went wrong.")
  }
}

impl std::fmt::Display for ProcessorError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.code {
      Some(code) => write!(f, "{} ({}): {}", self.kind, code, self.message),
      None => write!(f, "{}: {}", self.kind, self.message),
    }
  }
}

/// Customer and setup intent created for charging a card again later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutureChargeIds {
  #[serde(rename = "stripe_customer_id")]
  pub customer_id: String,
  #[serde(rename = "stripe_setup_intent_id")]
  pub setup_intent_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardParams {
  #[serde(rename = "stripe_payment_method_id")]
  pub payment_method_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub card_country: Option<String>,
  #[serde(flatten)]
  pub future_charges: Option<FutureChargeIds>,
}

impl CardParams {
  pub fn one_off(payment_method_id: impl Into<String>, card_country: Option<String>) -> Self {
    Self {
      payment_method_id: payment_method_id.into(),
      card_country,
      future_charges: None,
    }
  }

  pub fn is_reusable(&self) -> bool {
    self.future_charges.is_some()
  }

  /// Upgrades into a reusable card. `payment_method_id` replaces the one-off
  /// token when the server attached a new one to the customer.
  pub fn into_reusable(self, ids: FutureChargeIds, payment_method_id: Option<String>) -> Self {
    Self {
      payment_method_id: payment_method_id.unwrap_or(self.payment_method_id),
      card_country: self.card_country,
      future_charges: Some(ids),
    }
  }
}

/// A card produced by a browser payment sheet (Apple Pay, Google Pay, ...).
///
/// `email` and `zip_code` describe the wallet owner. They never go out as
/// payment fields, where they would clash with the buyer's own `email`; the
/// zip reaches the request through the payment method result instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRequestParams {
  #[serde(flatten)]
  pub card: CardParams,
  #[serde(skip_serializing)]
  pub email: Option<String>,
  #[serde(skip_serializing)]
  pub zip_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PayPalNativeParams {
  OneTime {
    paypal_order_id: String,
  },
  BillingAgreement {
    billing_agreement_id: String,
    #[serde(rename = "paypal_token")]
    token: String,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayPalBraintreeParams {
  #[serde(rename = "braintree_transient_customer_store_key")]
  pub transient_customer_store_key: String,
  #[serde(rename = "braintree_device_data", skip_serializing_if = "Option::is_none")]
  pub device_data: Option<String>,
}

/// Either card flavour; both can be upgraded for future charges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardFamilyParams {
  Card(CardParams),
  PaymentRequest(PaymentRequestParams),
}

impl CardFamilyParams {
  pub fn card(&self) -> &CardParams {
    match self {
      CardFamilyParams::Card(card) => card,
      CardFamilyParams::PaymentRequest(pr) => &pr.card,
    }
  }

  pub fn map_card(self, f: impl FnOnce(CardParams) -> CardParams) -> Self {
    match self {
      CardFamilyParams::Card(card) => CardFamilyParams::Card(f(card)),
      CardFamilyParams::PaymentRequest(pr) => CardFamilyParams::PaymentRequest(PaymentRequestParams {
        card: f(pr.card),
        ..pr
      }),
    }
  }

  pub fn is_reusable(&self) -> bool {
    self.card().is_reusable()
  }

  pub fn query_params(&self) -> Map<String, Value> {
    match self {
      CardFamilyParams::Card(card) => to_object(card),
      CardFamilyParams::PaymentRequest(pr) => to_object(pr),
    }
  }
}

impl From<CardFamilyParams> for TokenizedPaymentMethod {
  fn from(params: CardFamilyParams) -> Self {
    match params {
      CardFamilyParams::Card(card) => TokenizedPaymentMethod::Card(card),
      CardFamilyParams::PaymentRequest(pr) => TokenizedPaymentMethod::PaymentRequest(pr),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayPalParams {
  Native(PayPalNativeParams),
  Braintree(PayPalBraintreeParams),
}

impl PayPalParams {
  pub fn query_params(&self) -> Map<String, Value> {
    match self {
      PayPalParams::Native(native) => to_object(native),
      PayPalParams::Braintree(braintree) => to_object(braintree),
    }
  }
}

impl From<PayPalParams> for TokenizedPaymentMethod {
  fn from(params: PayPalParams) -> Self {
    match params {
      PayPalParams::Native(native) => TokenizedPaymentMethod::PayPalNative(native),
      PayPalParams::Braintree(braintree) => TokenizedPaymentMethod::PayPalBraintree(braintree),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizedPaymentMethod {
  Card(CardParams),
  PaymentRequest(PaymentRequestParams),
  PayPalNative(PayPalNativeParams),
  PayPalBraintree(PayPalBraintreeParams),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethodKind {
  Card,
  PaymentRequest,
  PayPalNative,
  PayPalBraintree,
}

impl PaymentMethodKind {
  /// The wire discriminator.
  pub fn as_str(self) -> &'static str {
    match self {
      PaymentMethodKind::Card => "card",
      PaymentMethodKind::PaymentRequest => "payment-request",
      PaymentMethodKind::PayPalNative => "paypal-native",
      PaymentMethodKind::PayPalBraintree => "paypal-braintree",
    }
  }
}

impl TokenizedPaymentMethod {
  pub fn kind(&self) -> PaymentMethodKind {
    match self {
      TokenizedPaymentMethod::Card(_) => PaymentMethodKind::Card,
      TokenizedPaymentMethod::PaymentRequest(_) => PaymentMethodKind::PaymentRequest,
      TokenizedPaymentMethod::PayPalNative(_) => PaymentMethodKind::PayPalNative,
      TokenizedPaymentMethod::PayPalBraintree(_) => PaymentMethodKind::PayPalBraintree,
    }
  }

  pub fn is_reusable(&self) -> bool {
    match self {
      TokenizedPaymentMethod::Card(card) => card.is_reusable(),
      TokenizedPaymentMethod::PaymentRequest(pr) => pr.card.is_reusable(),
      TokenizedPaymentMethod::PayPalNative(PayPalNativeParams::OneTime { .. }) => false,
      TokenizedPaymentMethod::PayPalNative(PayPalNativeParams::BillingAgreement { .. }) => true,
      TokenizedPaymentMethod::PayPalBraintree(_) => true,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsStatus {
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethodParams {
  Success(TokenizedPaymentMethod),
  Error(ProcessorError),
}

impl PaymentMethodParams {
  pub fn status(&self) -> ParamsStatus {
    match self {
      PaymentMethodParams::Success(_) => ParamsStatus::Success,
      PaymentMethodParams::Error(_) => ParamsStatus::Error,
    }
  }

  pub fn kind(&self) -> Option<PaymentMethodKind> {
    match self {
      PaymentMethodParams::Success(method) => Some(method.kind()),
      PaymentMethodParams::Error(_) => None,
    }
  }

  pub fn is_reusable(&self) -> bool {
    match self {
      PaymentMethodParams::Success(method) => method.is_reusable(),
      PaymentMethodParams::Error(_) => false,
    }
  }
}

#[derive(Serialize)]
struct ProcessorErrorFields<'a> {
  stripe_error: &'a ProcessorError,
}

/// Provider-specific request fields with the `status`, `type` and
/// `reusable` discriminators left out.
pub fn serialize_card_params_into_query_params_object(params: &PaymentMethodParams) -> Map<String, Value> {
  match params {
    PaymentMethodParams::Success(TokenizedPaymentMethod::Card(card)) => to_object(card),
    PaymentMethodParams::Success(TokenizedPaymentMethod::PaymentRequest(pr)) => to_object(pr),
    PaymentMethodParams::Success(TokenizedPaymentMethod::PayPalNative(native)) => to_object(native),
    PaymentMethodParams::Success(TokenizedPaymentMethod::PayPalBraintree(braintree)) => to_object(braintree),
    PaymentMethodParams::Error(error) => to_object(&ProcessorErrorFields { stripe_error: error }),
  }
}

pub fn is_paypal_native_params(params: &PaymentMethodParams) -> bool {
  matches!(params, PaymentMethodParams::Success(TokenizedPaymentMethod::PayPalNative(_)))
}

pub fn is_paypal_braintree_params(params: &PaymentMethodParams) -> bool {
  matches!(params, PaymentMethodParams::Success(TokenizedPaymentMethod::PayPalBraintree(_)))
}

pub fn is_paypal_params(params: &PaymentMethodParams) -> bool {
  match params.kind() {
    Some(PaymentMethodKind::PayPalNative | PaymentMethodKind::PayPalBraintree) => true,
    Some(PaymentMethodKind::Card | PaymentMethodKind::PaymentRequest) | None => false,
  }
}

pub(crate) fn to_object<T: Serialize>(value: &T) -> Map<String, Value> {
  // Every params struct serializes to a JSON object of strings; anything else
  // would be a bug in the derive attributes above.
  match serde_json::to_value(value) {
    Ok(Value::Object(map)) => map,
    Ok(other) => {
      tracing::error!(value = %other, "Payment params did not serialize to an object.");
      Map::new()
    }
    Err(e) => {
      tracing::error!(error = %e, "Payment params failed to serialize.");
      Map::new()
    }
  }
}
