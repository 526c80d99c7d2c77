// tests/confirm_line_item_tests.rs
mod common;
use checkout::{LineItemResult, ProcessorError, ServerLineItem};
use common::*;
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;

fn pending(flag: &str) -> ServerLineItem {
  let mut body = json!({
    "success": true,
    "client_secret": "pi_single",
    "purchase": { "id": "pur_1" },
  });
  body[flag] = json!(true);
  ServerLineItem::from_value(body).unwrap()
}

#[tokio::test]
#[serial]
async fn card_action_is_confirmed_and_the_server_result_returned() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/purchases/pur_1/confirm",
    Reply::Json(200, json!({ "success": true, "permalink": "ebook", "content_url": "https://example.com/d/1" })),
  );
  let processor = Arc::new(FakeProcessor::default());
  let checkout = checkout_with(http.clone(), processor.clone());

  let result = checkout.confirm_line_item(pending("requires_card_action")).await;

  match result {
    LineItemResult::Success(receipt) => assert_eq!(receipt.content_url.as_deref(), Some("https://example.com/d/1")),
    other => panic!("expected success, got {:?}", other),
  }
  assert_eq!(processor.payments_confirmed(), 1);
  assert_eq!(http.bodies_to("/purchases/pur_1/confirm"), vec![json!({ "client_secret": "pi_single" })]);
}

#[tokio::test]
#[serial]
async fn card_setup_uses_the_setup_confirmation() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/purchases/pur_1/confirm",
    Reply::Json(200, json!({ "success": false, "error_message": "Card setup failed", "card_country": "DE" })),
  );
  let processor = Arc::new(FakeProcessor {
    confirm_setup_outcome: Err(ProcessorError::new("card_error", "Setup refused")),
    ..Default::default()
  });
  let checkout = checkout_with(http.clone(), processor.clone());

  let result = checkout.confirm_line_item(pending("requires_card_setup")).await;

  assert_eq!(processor.setups_confirmed(), 1);
  assert_eq!(processor.payments_confirmed(), 0);
  assert_eq!(result.user_message(), Some("Card setup failed"));
  assert_eq!(
    http.bodies_to("/purchases/pur_1/confirm")[0]["stripe_error"],
    json!({ "type": "card_error", "message": "Setup refused" })
  );
}

#[tokio::test]
#[serial]
async fn transport_failure_is_swallowed() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply("/purchases/pur_1/confirm", Reply::Transport);
  let checkout = checkout_with(http, Arc::new(FakeProcessor::default()));

  let result = checkout.confirm_line_item(pending("requires_card_action")).await;

  assert_eq!(result, LineItemResult::failed());
  assert_eq!(result.user_message(), Some("Sorry, something went wrong."));
}

#[tokio::test]
#[serial]
async fn settled_items_pass_through_untouched() {
  setup_tracing();
  let http = FakeHttp::new();
  let processor = Arc::new(FakeProcessor::default());
  let checkout = checkout_with(http.clone(), processor.clone());
  let settled = ServerLineItem::from_value(json!({ "success": false, "error_message": "Sold out" })).unwrap();

  let result = checkout.confirm_line_item(settled).await;

  assert_eq!(result.user_message(), Some("Sold out"));
  assert_eq!(http.total_calls(), 0);
  assert_eq!(processor.payments_confirmed(), 0);
}
