// checkout/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures that are not a payment processor's verdict.
///
/// Card declines and authentication failures travel as
/// [`ProcessorError`](crate::payment::params::ProcessorError) values instead.
#[derive(Debug, Error)]
pub enum CheckoutError {
  #[error("Request to {url} failed before a response arrived: {message}")]
  Transport { url: String, message: String },

  #[error("Request to {url} was aborted")]
  Aborted { url: String },

  #[error("Request to {url} returned HTTP {status}")]
  HttpStatus { url: String, status: u16 },

  #[error("Unexpected response shape from {endpoint}. Source: {source}")]
  UnexpectedResponse {
    endpoint: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("No card processor is configured for connected account '{account_id}'")]
  UnknownProcessorAccount { account_id: String },

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Error in a flow handler. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal checkout error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for CheckoutError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<CheckoutError>() {
      Ok(inner) => inner,
      Err(err) => CheckoutError::HandlerError { source: err },
    }
  }
}

pub type CheckoutResult<T, E = CheckoutError> = std::result::Result<T, E>;
