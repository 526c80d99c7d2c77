// demos/checkout_demo/src/config.rs

use crate::errors::{DemoError, Result};
use checkout::ClientConfig;
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct DemoConfig {
  pub client: ClientConfig,
  pub buyer_email: String,
  pub buyer_country: String,
  pub buyer_zip_code: Option<String>,
  /// Products to put in the cart, one line item each.
  pub permalinks: Vec<String>,
  /// Save the card for future charges before ordering.
  pub keep_card_on_file: bool,
  /// Make the simulated processor refuse every card challenge.
  pub fail_card_challenges: bool,
}

impl DemoConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| DemoError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let get_bool = |var_name: &str| -> Result<bool> {
      get_env(var_name)
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .map_err(|e| DemoError::Config(format!("Invalid {} value: {}", var_name, e)))
    };

    let client = ClientConfig::from_env()?;
    let buyer_email = get_env("DEMO_BUYER_EMAIL").unwrap_or_else(|_| "buyer@example.com".to_string());
    let buyer_country = get_env("DEMO_BUYER_COUNTRY").unwrap_or_else(|_| "US".to_string());
    let buyer_zip_code = get_env("DEMO_BUYER_ZIP_CODE").ok();
    let permalinks: Vec<String> = get_env("DEMO_PERMALINKS")?
      .split(',')
      .map(str::trim)
      .filter(|p| !p.is_empty())
      .map(str::to_string)
      .collect();
    if permalinks.is_empty() {
      return Err(DemoError::Config("DEMO_PERMALINKS names no products".to_string()));
    }

    let keep_card_on_file = get_bool("DEMO_KEEP_CARD_ON_FILE")?;
    let fail_card_challenges = get_bool("DEMO_FAIL_CARD_CHALLENGES")?;

    tracing::info!(num_products = permalinks.len(), "Demo configuration loaded.");

    Ok(Self {
      client,
      buyer_email,
      buyer_country,
      buyer_zip_code,
      permalinks,
      keep_card_on_file,
      fail_card_challenges,
    })
  }
}
