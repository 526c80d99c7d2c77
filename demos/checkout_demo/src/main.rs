// demos/checkout_demo/src/main.rs

//! Places one cart order against a test-mode checkout server and prints the
//! per-line-item results as JSON.

mod config;
mod errors;
mod processor;

use crate::config::DemoConfig;
use crate::errors::Result as DemoResult;
use crate::processor::TestModeResolver;

use checkout::{
  BillingDetails, CardElement, CardPaymentMethodData, CartPurchaseResult, Checkout, LineItemPayload,
  PaymentMethodResult, ProductRef, PurchaseContext, PurchasePayload, SelectedPaymentMethod,
};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn init_tracing() {
  dotenvy::dotenv().ok();
  let log_json = std::env::var("DEMO_LOG_JSON").map_or(false, |v| v == "true");
  let builder = tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(EnvFilter::from_default_env());
  if log_json {
    builder.json().init();
  } else {
    builder.init();
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  init_tracing();
  tracing::info!("Starting checkout demo...");

  let config = DemoConfig::from_env()?;
  let result = run(&config).await?;

  println!("{}", serde_json::to_string_pretty(&result)?);
  Ok(())
}

async fn run(config: &DemoConfig) -> DemoResult<CartPurchaseResult> {
  let resolver = Arc::new(TestModeResolver {
    fail_challenges: config.fail_card_challenges,
  });
  let checkout = Checkout::from_config(config.client.clone(), resolver)?;

  let selected = SelectedPaymentMethod::Card {
    data: CardPaymentMethodData {
      card: CardElement("demo-card-element".to_string()),
      billing: BillingDetails {
        name: None,
        email: Some(config.buyer_email.clone()),
        zip_code: config.buyer_zip_code.clone(),
        country: Some(config.buyer_country.clone()),
      },
    },
    keep_on_file: config.keep_card_on_file,
    zip_code: config.buyer_zip_code.clone(),
  };

  let payment_method = if config.keep_card_on_file {
    let products: Vec<ProductRef> = config
      .permalinks
      .iter()
      .map(|permalink| ProductRef {
        permalink: permalink.clone(),
        quantity: 1,
        price_cents: None,
      })
      .collect();
    checkout.get_reusable_payment_method_result(selected, &products).await?
  } else {
    checkout.get_payment_method_result(selected).await?
  };
  if let PaymentMethodResult::Error(error) = &payment_method {
    // Still submitted: the server records the processor's verdict.
    tracing::warn!(error = %error, "Card was not tokenized.");
  }

  let payload = PurchasePayload {
    email: config.buyer_email.clone(),
    full_name: None,
    country: Some(config.buyer_country.clone()),
    zip_code: config.buyer_zip_code.clone(),
    state: None,
    tax_country_election: Some(config.buyer_country.clone()),
    vat_id: None,
    shipping_info: None,
    gift: None,
    payment_method,
    line_items: config
      .permalinks
      .iter()
      .map(|permalink| LineItemPayload {
        uid: Uuid::new_v4().to_string(),
        permalink: permalink.clone(),
        quantity: 1,
        ..Default::default()
      })
      .collect(),
  };
  let purchase = PurchaseContext {
    browser_guid: Uuid::new_v4().to_string(),
    locale: Some("en".to_string()),
    ..Default::default()
  };

  let result = checkout.start_order_creation(&payload, &purchase).await;
  for (uid, item) in &result.line_items {
    match item.user_message() {
      None => tracing::info!(%uid, "Line item purchased."),
      Some(message) => tracing::warn!(%uid, %message, "Line item failed."),
    }
  }
  Ok(result)
}
