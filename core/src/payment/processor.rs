// checkout/src/payment/processor.rs

//! The card processor SDK as seen from checkout.
//!
//! Implementations wrap whatever client-side SDK the host environment has.
//! Every call answers with either a payload or a [`ProcessorError`]; this
//! crate never talks to the processor's network endpoints itself.

use super::params::ProcessorError;
use crate::error::{CheckoutError, CheckoutResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque handle to a mounted card input owned by the host SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardElement(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingDetails {
  pub name: Option<String>,
  pub email: Option<String>,
  pub zip_code: Option<String>,
  pub country: Option<String>,
}

/// A one-off payment method token minted by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorPaymentMethod {
  pub id: String,
  pub card_country: Option<String>,
}

#[async_trait]
pub trait CardProcessor: Send + Sync {
  async fn create_payment_method(
    &self,
    card: &CardElement,
    billing: &BillingDetails,
  ) -> Result<ProcessorPaymentMethod, ProcessorError>;

  /// Runs the 3-D Secure challenge for a payment intent.
  async fn confirm_card_payment(&self, client_secret: &str) -> Result<(), ProcessorError>;

  /// Runs the 3-D Secure challenge for a setup intent.
  async fn confirm_card_setup(&self, client_secret: &str) -> Result<(), ProcessorError>;
}

/// Picks the processor instance for the platform account (`None`) or for a
/// creator's connected account.
#[async_trait]
pub trait ProcessorResolver: Send + Sync {
  async fn processor(&self, connect_account_id: Option<&str>) -> CheckoutResult<Arc<dyn CardProcessor>>;
}

/// A resolver over processors that were set up ahead of time.
#[derive(Clone)]
pub struct StaticProcessors {
  platform: Arc<dyn CardProcessor>,
  connected: HashMap<String, Arc<dyn CardProcessor>>,
}

impl StaticProcessors {
  pub fn new(platform: Arc<dyn CardProcessor>) -> Self {
    Self {
      platform,
      connected: HashMap::new(),
    }
  }

  pub fn with_connected_account(mut self, account_id: impl Into<String>, processor: Arc<dyn CardProcessor>) -> Self {
    self.connected.insert(account_id.into(), processor);
    self
  }
}

#[async_trait]
impl ProcessorResolver for StaticProcessors {
  async fn processor(&self, connect_account_id: Option<&str>) -> CheckoutResult<Arc<dyn CardProcessor>> {
    match connect_account_id {
      None => Ok(Arc::clone(&self.platform)),
      Some(account_id) => self
        .connected
        .get(account_id)
        .cloned()
        .ok_or_else(|| CheckoutError::UnknownProcessorAccount {
          account_id: account_id.to_string(),
        }),
    }
  }
}

impl std::fmt::Debug for StaticProcessors {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StaticProcessors")
      .field("platform", &"<processor>")
      .field("connected", &self.connected.keys().collect::<Vec<_>>())
      .finish()
  }
}
