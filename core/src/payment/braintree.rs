// checkout/src/payment/braintree.rs

//! PayPal through the braintree gateway: nonce to transient customer key.

use super::params::{PayPalBraintreeParams, ProcessorError};
use crate::client::Checkout;
use crate::error::CheckoutResult;
use crate::http::{request_json, HttpRequest, Routes};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone)]
pub struct BraintreePaymentMethodData {
  pub nonce: String,
  pub device_data: Option<String>,
}

/// Nonces the gateway already exchanged, mapped to the key it returned.
///
/// The gateway accepts a nonce once, so a repeated submission must reuse the
/// first key. Entries are never evicted; the cache lives as long as the
/// [`Checkout`] that owns it.
#[derive(Debug, Default)]
pub struct NonceTokenCache {
  tokens: RwLock<HashMap<String, String>>,
}

impl NonceTokenCache {
  pub fn get(&self, nonce: &str) -> Option<String> {
    self.tokens.read().get(nonce).cloned()
  }

  pub fn insert(&self, nonce: impl Into<String>, token: impl Into<String>) {
    self.tokens.write().insert(nonce.into(), token.into());
  }

  pub fn len(&self) -> usize {
    self.tokens.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// What the exchange endpoint answered, before it is turned into params.
enum Exchange {
  Token(String),
  Refused(ProcessorError),
}

fn interpret_exchange(body: &Value) -> Exchange {
  if let Some(token) = body.get("transient_customer_store_key").and_then(Value::as_str) {
    return Exchange::Token(token.to_string());
  }
  match body.get("error") {
    Some(Value::String(message)) => Exchange::Refused(ProcessorError::new("api_error", message.clone())),
    Some(error @ Value::Object(_)) => match serde_json::from_value::<ProcessorError>(error.clone()) {
      Ok(processor_error) => Exchange::Refused(processor_error),
      Err(_) => match error.get("message").and_then(Value::as_str) {
        Some(message) => Exchange::Refused(ProcessorError::new("api_error", message)),
        None => Exchange::Refused(ProcessorError::generic()),
      },
    },
    _ => Exchange::Refused(ProcessorError::generic()),
  }
}

impl Checkout {
  /// Exchanges a one-time gateway nonce for a reusable customer key.
  ///
  /// The outer `Err` is a transport failure. The inner `Err` is the gateway
  /// refusing the nonce, or a response that was neither a key nor an error.
  #[instrument(skip_all)]
  pub async fn prepare_braintree_payment_method_data(
    &self,
    data: &BraintreePaymentMethodData,
  ) -> CheckoutResult<Result<PayPalBraintreeParams, ProcessorError>> {
    let params = |key: String| PayPalBraintreeParams {
      transient_customer_store_key: key,
      device_data: data.device_data.clone(),
    };

    if let Some(cached) = self.braintree_tokens.get(&data.nonce) {
      debug!("Reusing transient customer key for an already exchanged nonce.");
      return Ok(Ok(params(cached)));
    }

    let body: Value = request_json(
      self.http.as_ref(),
      HttpRequest::post_json(
        Routes::braintree_transient_customer_tokens(),
        json!({ "braintree_nonce": data.nonce }),
      ),
    )
    .await?;

    match interpret_exchange(&body) {
      Exchange::Token(key) => {
        self.braintree_tokens.insert(data.nonce.clone(), key.clone());
        Ok(Ok(params(key)))
      }
      Exchange::Refused(error) => {
        warn!(error = %error, "Gateway refused the nonce exchange.");
        Ok(Err(error))
      }
    }
  }
}
