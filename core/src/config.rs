// checkout/src/config.rs

use crate::error::{CheckoutError, CheckoutResult};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Always ends with `/` so relative endpoint paths join underneath it.
  pub base_url: Url,
  pub timeout: Duration,
  /// Sent as `X-CSRF-Token` on every request when present.
  pub csrf_token: Option<String>,
  pub user_agent: String,
}

impl ClientConfig {
  pub fn new(base_url: &str) -> CheckoutResult<Self> {
    Ok(Self {
      base_url: normalize_base_url(base_url)?,
      timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
      csrf_token: None,
      user_agent: default_user_agent(),
    })
  }

  pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
    self.csrf_token = Some(token.into());
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Reads `CHECKOUT_BASE_URL` (required), `CHECKOUT_HTTP_TIMEOUT_SECS`,
  /// `CHECKOUT_CSRF_TOKEN` and `CHECKOUT_USER_AGENT`, loading `.env` first.
  pub fn from_env() -> CheckoutResult<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| CheckoutError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let base_url = normalize_base_url(&get_env("CHECKOUT_BASE_URL")?)?;
    let timeout_secs = get_env("CHECKOUT_HTTP_TIMEOUT_SECS")
      .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
      .parse::<u64>()
      .map_err(|e| CheckoutError::Config(format!("Invalid CHECKOUT_HTTP_TIMEOUT_SECS: {}", e)))?;
    let csrf_token = get_env("CHECKOUT_CSRF_TOKEN").ok().filter(|t| !t.is_empty());
    let user_agent = get_env("CHECKOUT_USER_AGENT").unwrap_or_else(|_| default_user_agent());

    tracing::info!(base_url = %base_url, timeout_secs, "Checkout client configuration loaded.");

    Ok(Self {
      base_url,
      timeout: Duration::from_secs(timeout_secs),
      csrf_token,
      user_agent,
    })
  }
}

fn default_user_agent() -> String {
  format!("marketplace-checkout/{}", env!("CARGO_PKG_VERSION"))
}

fn normalize_base_url(raw: &str) -> CheckoutResult<Url> {
  let with_slash = if raw.ends_with('/') {
    raw.to_string()
  } else {
    format!("{}/", raw)
  };
  Url::parse(&with_slash).map_err(|e| CheckoutError::Config(format!("Invalid base URL '{}': {}", raw, e)))
}
