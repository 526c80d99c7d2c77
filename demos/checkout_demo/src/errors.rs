// demos/checkout_demo/src/errors.rs

use checkout::CheckoutError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemoError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Checkout Error: {source}")]
  Checkout {
    #[from]
    source: CheckoutError,
  },
}

pub type Result<T, E = DemoError> = std::result::Result<T, E>;
