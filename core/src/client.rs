// checkout/src/client.rs

use crate::config::ClientConfig;
use crate::error::CheckoutResult;
use crate::http::{HttpClient, ReqwestClient};
use crate::payment::braintree::NonceTokenCache;
use crate::payment::params::ProcessorError;
use crate::payment::processor::{CardProcessor, ProcessorResolver};
use std::sync::Arc;
use tracing::error;

/// Entry point for every networked checkout operation.
///
/// Cloning is cheap; clones share the HTTP client, the processor resolver and
/// the braintree nonce cache. Keep one per buyer session.
#[derive(Clone)]
pub struct Checkout {
  pub(crate) http: Arc<dyn HttpClient>,
  pub(crate) processors: Arc<dyn ProcessorResolver>,
  pub(crate) braintree_tokens: Arc<NonceTokenCache>,
}

impl Checkout {
  pub fn new(http: Arc<dyn HttpClient>, processors: Arc<dyn ProcessorResolver>) -> Self {
    Self {
      http,
      processors,
      braintree_tokens: Arc::new(NonceTokenCache::default()),
    }
  }

  /// Builds a [`ReqwestClient`] from `config`.
  pub fn from_config(config: ClientConfig, processors: Arc<dyn ProcessorResolver>) -> CheckoutResult<Self> {
    let http = ReqwestClient::new(config)?;
    Ok(Self::new(Arc::new(http), processors))
  }

  pub fn http(&self) -> &dyn HttpClient {
    self.http.as_ref()
  }

  /// Resolves a processor for card operations that happen before any order
  /// exists. A resolver failure is reported as a processor error so callers
  /// keep a single failure channel.
  pub(crate) async fn processor_or_error(
    &self,
    connect_account_id: Option<&str>,
  ) -> Result<Arc<dyn CardProcessor>, ProcessorError> {
    self.processors.processor(connect_account_id).await.map_err(|e| {
      error!(error = %e, connect_account_id, "Card processor unavailable.");
      ProcessorError::generic()
    })
  }
}

impl std::fmt::Debug for Checkout {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Checkout")
      .field("http", &"<http client>")
      .field("processors", &"<processor resolver>")
      .field("braintree_tokens", &self.braintree_tokens.len())
      .finish()
  }
}
