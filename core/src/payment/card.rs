// checkout/src/payment/card.rs

//! Card tokenization and the upgrade to a card that can be charged again.

use super::params::{CardFamilyParams, CardParams, FutureChargeIds, ProcessorError};
use super::processor::{BillingDetails, CardElement};
use crate::client::Checkout;
use crate::error::{CheckoutError, CheckoutResult};
use crate::http::{request_json, HttpRequest, Routes};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct CardPaymentMethodData {
  pub card: CardElement,
  pub billing: BillingDetails,
}

/// A product the buyer is about to pay for, as the setup intent endpoint
/// needs it to decide whether the card must be kept on file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRef {
  pub permalink: String,
  pub quantity: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub price_cents: Option<u64>,
}

/// A card setup that still needs the buyer to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSetupChallenge {
  pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FutureChargesSetup {
  Ready {
    card_params: CardFamilyParams,
    card_setup: Option<CardSetupChallenge>,
  },
  Failed(ProcessorError),
}

#[derive(Debug, Deserialize)]
struct SetupIntentResponse {
  success: bool,
  #[serde(default)]
  reusable_payment_method_id: Option<String>,
  #[serde(default)]
  stripe_customer_id: Option<String>,
  #[serde(default)]
  setup_intent_id: Option<String>,
  #[serde(default)]
  requires_card_setup: bool,
  #[serde(default)]
  client_secret: Option<String>,
  #[serde(default)]
  error_message: Option<String>,
  #[serde(default)]
  error_code: Option<String>,
}

impl Checkout {
  /// Asks the platform processor for a one-off payment method token.
  ///
  /// Processor failures come back as `Err(ProcessorError)`; this never
  /// fails any other way.
  #[instrument(skip_all)]
  pub async fn prepare_card_payment_method_data(&self, data: &CardPaymentMethodData) -> Result<CardParams, ProcessorError> {
    let processor = self.processor_or_error(None).await?;
    match processor.create_payment_method(&data.card, &data.billing).await {
      Ok(method) => Ok(CardParams::one_off(method.id, method.card_country)),
      Err(processor_error) => {
        warn!(error = %processor_error, "Card tokenization rejected by processor.");
        Err(processor_error)
      }
    }
  }

  /// Creates a setup intent so `card_params` can be charged again later.
  ///
  /// Transport failures and malformed responses are `Err`; a refusal by the
  /// server is `Ok(FutureChargesSetup::Failed)`.
  #[instrument(skip_all, fields(num_products = products.len()))]
  pub async fn prepare_future_charges(
    &self,
    products: &[ProductRef],
    card_params: CardFamilyParams,
  ) -> CheckoutResult<FutureChargesSetup> {
    let mut body = card_params.query_params();
    let products = serde_json::to_value(products)
      .map_err(|e| CheckoutError::Internal(format!("Failed to encode products: {}", e)))?;
    body.insert("products".to_string(), products);

    let url = Routes::stripe_setup_intents();
    let response: SetupIntentResponse =
      request_json(self.http.as_ref(), HttpRequest::post_json(url.clone(), Value::Object(body))).await?;

    if !response.success {
      let message = response
        .error_message
        .unwrap_or_else(|| ProcessorError::generic().message);
      let mut error = ProcessorError::new("api_error", message);
      error.code = response.error_code;
      warn!(error = %error, "Setup intent refused.");
      return Ok(FutureChargesSetup::Failed(error));
    }

    let (customer_id, setup_intent_id) = match (response.stripe_customer_id, response.setup_intent_id) {
      (Some(customer_id), Some(setup_intent_id)) => (customer_id, setup_intent_id),
      _ => {
        return Err(CheckoutError::Internal(format!(
          "{} reported success without customer and setup intent ids",
          url
        )))
      }
    };

    let card_setup = match (response.requires_card_setup, response.client_secret) {
      (false, _) => None,
      (true, Some(client_secret)) => Some(CardSetupChallenge { client_secret }),
      (true, None) => {
        return Err(CheckoutError::Internal(format!(
          "{} requires card setup but sent no client secret",
          url
        )))
      }
    };

    info!(requires_card_setup = card_setup.is_some(), "Setup intent created.");
    let ids = FutureChargeIds {
      customer_id,
      setup_intent_id,
    };
    let reusable_payment_method_id = response.reusable_payment_method_id;
    Ok(FutureChargesSetup::Ready {
      card_params: card_params.map_card(|card| card.into_reusable(ids, reusable_payment_method_id)),
      card_setup,
    })
  }

  /// Runs the card setup challenge when the setup intent asked for one.
  #[instrument(skip_all)]
  pub async fn confirm_card_if_needed(&self, setup: FutureChargesSetup) -> Result<CardFamilyParams, ProcessorError> {
    match setup {
      FutureChargesSetup::Failed(error) => Err(error),
      FutureChargesSetup::Ready {
        card_params,
        card_setup: None,
      } => Ok(card_params),
      FutureChargesSetup::Ready {
        card_params,
        card_setup: Some(challenge),
      } => {
        let processor = self.processor_or_error(None).await?;
        match processor.confirm_card_setup(&challenge.client_secret).await {
          Ok(()) => Ok(card_params),
          Err(processor_error) => {
            warn!(error = %processor_error, "Card setup confirmation failed.");
            Err(processor_error)
          }
        }
      }
    }
  }
}
