// demos/checkout_demo/src/processor.rs

//! A card processor that never leaves the process, for trying the flow
//! against a test-mode server.

use async_trait::async_trait;
use checkout::{
  BillingDetails, CardElement, CardProcessor, CheckoutResult, ProcessorError, ProcessorPaymentMethod, ProcessorResolver,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TestModeProcessor {
  pub account: String,
  pub fail_challenges: bool,
}

impl TestModeProcessor {
  async fn simulate_latency(&self) {
    tokio::time::sleep(Duration::from_millis(50)).await;
  }

  fn challenge_outcome(&self) -> Result<(), ProcessorError> {
    if self.fail_challenges {
      Err(
        ProcessorError::new("card_error", "We are unable to authenticate your payment method.")
          .with_code("payment_intent_authentication_failure"),
      )
    } else {
      Ok(())
    }
  }
}

#[async_trait]
impl CardProcessor for TestModeProcessor {
  #[instrument(skip_all, fields(account = %self.account))]
  async fn create_payment_method(
    &self,
    card: &CardElement,
    billing: &BillingDetails,
  ) -> Result<ProcessorPaymentMethod, ProcessorError> {
    self.simulate_latency().await;
    if card.0.is_empty() {
      return Err(ProcessorError::new("validation_error", "Your card number is incomplete.").with_code("incomplete_number"));
    }
    let id = format!("pm_test_{}", Uuid::new_v4().simple());
    info!(payment_method_id = %id, "Simulated payment method created.");
    Ok(ProcessorPaymentMethod {
      id,
      card_country: billing.country.clone(),
    })
  }

  #[instrument(skip_all, fields(account = %self.account))]
  async fn confirm_card_payment(&self, _client_secret: &str) -> Result<(), ProcessorError> {
    self.simulate_latency().await;
    info!(fail = self.fail_challenges, "Simulated card payment challenge.");
    self.challenge_outcome()
  }

  #[instrument(skip_all, fields(account = %self.account))]
  async fn confirm_card_setup(&self, _client_secret: &str) -> Result<(), ProcessorError> {
    self.simulate_latency().await;
    info!(fail = self.fail_challenges, "Simulated card setup challenge.");
    self.challenge_outcome()
  }
}

/// Builds a fresh test-mode processor for the platform or the given
/// connected account on every call.
#[derive(Debug, Clone)]
pub struct TestModeResolver {
  pub fail_challenges: bool,
}

#[async_trait]
impl ProcessorResolver for TestModeResolver {
  async fn processor(&self, connect_account_id: Option<&str>) -> CheckoutResult<Arc<dyn CardProcessor>> {
    Ok(Arc::new(TestModeProcessor {
      account: connect_account_id.unwrap_or("platform").to_string(),
      fail_challenges: self.fail_challenges,
    }))
  }
}
