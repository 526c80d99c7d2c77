// tests/order_creation_tests.rs
mod common;
use checkout::{LineItemResult, ProcessorError, PurchaseContext, StaticProcessors};
use common::*;
use serde_json::json;
use serial_test::serial;
use std::collections::BTreeSet;
use std::sync::Arc;

fn context() -> PurchaseContext {
  PurchaseContext {
    browser_guid: "guid-1".to_string(),
    ..Default::default()
  }
}

fn uids(result: &checkout::CartPurchaseResult) -> BTreeSet<&str> {
  result.line_items.keys().map(String::as_str).collect()
}

#[tokio::test]
#[serial]
async fn direct_success_covers_every_requested_uid() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/orders",
    Reply::Json(
      200,
      json!({
        "success": true,
        "can_buyer_sign_up": true,
        "offer_codes": [{ "code": "THANKS", "products": ["course"] }],
        "line_items": {
          "u1": { "success": true, "permalink": "ebook", "name": "Ebook" },
          "u2": { "success": false, "error_message": "Sold out", "permalink": "course" },
        },
      }),
    ),
  );
  let checkout = checkout_with(http.clone(), Arc::new(FakeProcessor::default()));
  let payload = cart(vec![line_item("u1", "ebook"), line_item("u2", "course"), line_item("u3", "album")]);

  let result = checkout.start_order_creation(&payload, &context()).await;

  assert_eq!(uids(&result), BTreeSet::from(["u1", "u2", "u3"]));
  assert!(result.line_items["u1"].is_success());
  assert_eq!(result.line_items["u2"].user_message(), Some("Sold out"));
  assert_eq!(result.line_items["u3"], LineItemResult::failed());
  assert!(result.can_buyer_sign_up);
  assert_eq!(result.offer_codes[0].code, "THANKS");
  assert_eq!(http.calls_to("/orders"), 1);
  assert_eq!(http.bodies_to("/orders")[0]["browser_guid"], "guid-1");
}

#[tokio::test]
#[serial]
async fn numeric_ids_and_odd_items_do_not_fail_their_siblings() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/orders",
    Reply::Json(
      200,
      json!({
        "success": true,
        "line_items": {
          "u1": { "success": true, "id": 123, "permalink": "ebook" },
          "u2": { "success": true, "id": "abc", "permalink": "course" },
          "u3": { "success": true, "id": { "nested": true } },
        },
      }),
    ),
  );
  let checkout = checkout_with(http.clone(), Arc::new(FakeProcessor::default()));
  let payload = cart(vec![line_item("u1", "ebook"), line_item("u2", "course"), line_item("u3", "album")]);

  let result = checkout.start_order_creation(&payload, &context()).await;

  match (&result.line_items["u1"], &result.line_items["u2"]) {
    (LineItemResult::Success(first), LineItemResult::Success(second)) => {
      assert_eq!(first.id.as_deref(), Some("123"));
      assert_eq!(second.id.as_deref(), Some("abc"));
    }
    other => panic!("expected both charged items to succeed, got {:?}", other),
  }
  assert_eq!(result.line_items["u3"], LineItemResult::failed());
}

#[tokio::test]
#[serial]
async fn global_failure_reaches_every_line_item() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/orders",
    Reply::Json(422, json!({ "success": false, "error_message": "Your card was declined." })),
  );
  let checkout = checkout_with(http.clone(), Arc::new(FakeProcessor::default()));
  let payload = cart(vec![line_item("u1", "ebook"), line_item("u2", "course")]);

  let result = checkout.start_order_creation(&payload, &context()).await;

  assert_eq!(uids(&result), BTreeSet::from(["u1", "u2"]));
  for item in result.line_items.values() {
    assert_eq!(item.user_message(), Some("Your card was declined."));
  }
}

#[tokio::test]
#[serial]
async fn single_challenge_for_a_cart_needing_authentication() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/orders",
    Reply::Json(
      200,
      json!({
        "success": true,
        "can_buyer_sign_up": false,
        "line_items": {
          "u1": { "success": true, "permalink": "ebook" },
          "u2": {
            "success": true,
            "requires_card_action": true,
            "client_secret": "pi_secret_2",
            "order": { "id": "ord_9", "stripe_connect_account_id": null },
          },
          "u3": { "success": true, "permalink": "album" },
        },
      }),
    ),
  );
  http.reply(
    "/orders/ord_9/confirm",
    Reply::Json(
      200,
      json!({
        "success": true,
        "line_items": {
          "p_1": { "success": true, "permalink": "ebook" },
          "p_2": { "success": true, "permalink": "course" },
          "p_3": { "success": true, "permalink": "album" },
        },
      }),
    ),
  );
  let processor = Arc::new(FakeProcessor::default());
  let checkout = checkout_with(http.clone(), processor.clone());
  let payload = cart(vec![line_item("u1", "ebook"), line_item("u2", "course"), line_item("u3", "album")]);

  let result = checkout.start_order_creation(&payload, &context()).await;

  assert_eq!(uids(&result), BTreeSet::from(["u1", "u2", "u3"]));
  assert!(result.line_items.values().all(LineItemResult::is_success));
  assert_eq!(processor.payments_confirmed(), 1);
  assert_eq!(processor.setups_confirmed(), 0);
  assert_eq!(http.bodies_to("/orders/ord_9/confirm"), vec![json!({ "client_secret": "pi_secret_2" })]);
}

#[tokio::test]
#[serial]
async fn only_the_first_challenge_is_run() {
  setup_tracing();
  let http = FakeHttp::new();
  let challenge = |secret: &str| {
    json!({
      "success": true,
      "requires_card_setup": true,
      "client_secret": secret,
      "order": { "id": 77 },
    })
  };
  http.reply(
    "/orders",
    Reply::Json(
      200,
      json!({ "success": true, "line_items": { "a": challenge("seti_a"), "b": challenge("seti_b") } }),
    ),
  );
  http.reply(
    "/orders/77/confirm",
    Reply::Json(
      200,
      json!({
        "success": true,
        "line_items": {
          "1": { "success": true, "permalink": "membership" },
          "2": { "success": true, "permalink": "course" },
        },
      }),
    ),
  );
  let processor = Arc::new(FakeProcessor::default());
  let checkout = checkout_with(http.clone(), processor.clone());
  let payload = cart(vec![line_item("a", "membership"), line_item("b", "course")]);

  let result = checkout.start_order_creation(&payload, &context()).await;

  assert_eq!(processor.setups_confirmed(), 1);
  assert_eq!(processor.secrets.lock().clone(), vec!["seti_a".to_string()]);
  assert!(result.line_items["a"].is_success());
  assert!(result.line_items["b"].is_success());
}

#[tokio::test]
#[serial]
async fn challenge_runs_on_the_connected_account_processor() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/orders",
    Reply::Json(
      200,
      json!({
        "success": true,
        "line_items": {
          "u1": {
            "requires_card_action": true,
            "client_secret": "pi_connected",
            "order": { "id": "ord_1", "stripe_connect_account_id": "acct_creator" },
          },
        },
      }),
    ),
  );
  http.reply(
    "/orders/ord_1/confirm",
    Reply::Json(200, json!({ "success": true, "line_items": { "x": { "success": true, "permalink": "ebook" } } })),
  );
  let platform = Arc::new(FakeProcessor::default());
  let connected = Arc::new(FakeProcessor::default());
  let checkout = checkout::Checkout::new(
    http.clone(),
    Arc::new(StaticProcessors::new(platform.clone()).with_connected_account("acct_creator", connected.clone())),
  );

  let result = checkout
    .start_order_creation(&cart(vec![line_item("u1", "ebook")]), &context())
    .await;

  assert!(result.line_items["u1"].is_success());
  assert_eq!(platform.payments_confirmed(), 0);
  assert_eq!(connected.payments_confirmed(), 1);
}

#[tokio::test]
#[serial]
async fn failed_challenge_is_forwarded_to_the_confirm_endpoint() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/orders",
    Reply::Json(
      200,
      json!({
        "success": true,
        "line_items": {
          "u1": { "requires_card_action": true, "client_secret": "pi_1", "order": { "id": "ord_2" } },
        },
      }),
    ),
  );
  http.reply(
    "/orders/ord_2/confirm",
    Reply::Json(
      200,
      json!({
        "success": true,
        "line_items": {
          "x": { "success": false, "permalink": "ebook", "error_message": "We were unable to authenticate your card." },
        },
      }),
    ),
  );
  let processor = Arc::new(FakeProcessor {
    confirm_payment_outcome: Err(ProcessorError::new("card_error", "Authentication failed").with_code("authentication_required")),
    ..Default::default()
  });
  let checkout = checkout_with(http.clone(), processor);

  let result = checkout
    .start_order_creation(&cart(vec![line_item("u1", "ebook")]), &context())
    .await;

  assert_eq!(
    http.bodies_to("/orders/ord_2/confirm")[0],
    json!({
      "client_secret": "pi_1",
      "stripe_error": { "type": "card_error", "message": "Authentication failed", "code": "authentication_required" },
    })
  );
  assert_eq!(
    result.line_items["u1"].user_message(),
    Some("We were unable to authenticate your card.")
  );
}

#[tokio::test]
#[serial]
async fn confirm_rejection_message_reaches_every_line_item() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/orders",
    Reply::Json(
      200,
      json!({
        "success": true,
        "line_items": {
          "u1": { "requires_card_action": true, "client_secret": "pi_1", "order": { "id": "ord_3" } },
          "u2": { "success": true, "permalink": "course" },
        },
      }),
    ),
  );
  http.reply(
    "/orders/ord_3/confirm",
    Reply::Json(200, json!({ "success": false, "error_message": "Order expired." })),
  );
  let checkout = checkout_with(http.clone(), Arc::new(FakeProcessor::default()));

  let result = checkout
    .start_order_creation(&cart(vec![line_item("u1", "ebook"), line_item("u2", "course")]), &context())
    .await;

  assert_eq!(uids(&result), BTreeSet::from(["u1", "u2"]));
  for item in result.line_items.values() {
    assert_eq!(item.user_message(), Some("Order expired."));
  }
}

/// Confirmed results are matched back by product permalink, so a cart that
/// orders the same product twice only gets a result for the first entry.
#[tokio::test]
#[serial]
async fn duplicate_product_only_matches_the_first_uid_after_confirmation() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/orders",
    Reply::Json(
      200,
      json!({
        "success": true,
        "line_items": {
          "gift-copy": { "requires_card_action": true, "client_secret": "pi_dup", "order": { "id": "ord_4" } },
          "own-copy": { "requires_card_action": true, "client_secret": "pi_dup", "order": { "id": "ord_4" } },
        },
      }),
    ),
  );
  http.reply(
    "/orders/ord_4/confirm",
    Reply::Json(
      200,
      json!({
        "success": true,
        "line_items": {
          "p_1": { "success": true, "permalink": "ebook", "id": "p_1" },
          "p_2": { "success": true, "permalink": "ebook", "id": "p_2" },
        },
      }),
    ),
  );
  let checkout = checkout_with(http.clone(), Arc::new(FakeProcessor::default()));
  let payload = cart(vec![line_item("own-copy", "ebook"), line_item("gift-copy", "ebook")]);

  let result = checkout.start_order_creation(&payload, &context()).await;

  assert_eq!(uids(&result), BTreeSet::from(["gift-copy", "own-copy"]));
  match &result.line_items["own-copy"] {
    LineItemResult::Success(receipt) => assert_eq!(receipt.id.as_deref(), Some("p_2")),
    other => panic!("expected the later confirmation to win, got {:?}", other),
  }
  assert_eq!(result.line_items["gift-copy"], LineItemResult::failed());
}

/// Confirmed results sharing a permalink are applied in key order, whatever
/// order the server wrote them in.
#[tokio::test]
#[serial]
async fn duplicate_confirmations_resolve_by_key_order() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/orders",
    Reply::Json(
      200,
      json!({
        "success": true,
        "line_items": {
          "u1": { "requires_card_action": true, "client_secret": "pi_5", "order": { "id": "ord_5" } },
        },
      }),
    ),
  );
  http.reply(
    "/orders/ord_5/confirm",
    Reply::Raw(
      200,
      r#"{"success":true,"line_items":{"z_first":{"success":true,"permalink":"ebook","id":"z"},"a_second":{"success":true,"permalink":"ebook","id":"a"},"broken":"oops"}}"#,
    ),
  );
  let checkout = checkout_with(http.clone(), Arc::new(FakeProcessor::default()));
  let payload = cart(vec![line_item("u1", "ebook")]);

  let result = checkout.start_order_creation(&payload, &context()).await;

  assert_eq!(result.line_items.len(), 1);
  match &result.line_items["u1"] {
    LineItemResult::Success(receipt) => assert_eq!(receipt.id.as_deref(), Some("z")),
    other => panic!("expected the last key to win, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn network_failure_fails_every_line_item() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply("/orders", Reply::Transport);
  let checkout = checkout_with(http.clone(), Arc::new(FakeProcessor::default()));
  let payload = cart(vec![line_item("u1", "ebook"), line_item("u2", "course")]);

  let result = checkout.start_order_creation(&payload, &context()).await;

  assert_eq!(uids(&result), BTreeSet::from(["u1", "u2"]));
  assert!(result.line_items.values().all(|item| *item == LineItemResult::failed()));
  assert!(!result.can_buyer_sign_up);
  assert!(result.offer_codes.is_empty());
}

#[tokio::test]
#[serial]
async fn unreadable_responses_fail_every_line_item() {
  setup_tracing();
  let payload = cart(vec![line_item("u1", "ebook")]);

  for reply in [
    Reply::Raw(502, "<html>Bad gateway</html>"),
    Reply::Raw(200, "not json"),
    Reply::Json(200, json!({ "line_items": {} })),
    Reply::Json(200, json!({ "success": true, "line_items": { "u1": "oops" } })),
  ] {
    let http = FakeHttp::new();
    http.reply("/orders", reply);
    let checkout = checkout_with(http, Arc::new(FakeProcessor::default()));

    let result = checkout.start_order_creation(&payload, &context()).await;

    assert_eq!(result.line_items.len(), 1);
    assert_eq!(result.line_items["u1"], LineItemResult::failed());
  }
}

#[tokio::test]
#[serial]
async fn unknown_connected_account_fails_the_order_without_confirming() {
  setup_tracing();
  let http = FakeHttp::new();
  http.reply(
    "/orders",
    Reply::Json(
      200,
      json!({
        "success": true,
        "can_buyer_sign_up": true,
        "line_items": {
          "u1": {
            "requires_card_action": true,
            "client_secret": "pi_1",
            "order": { "id": "ord_5", "stripe_connect_account_id": "acct_missing" },
          },
        },
      }),
    ),
  );
  let checkout = checkout_with(http.clone(), Arc::new(FakeProcessor::default()));

  let result = checkout
    .start_order_creation(&cart(vec![line_item("u1", "ebook")]), &context())
    .await;

  assert_eq!(result.line_items["u1"], LineItemResult::failed());
  assert!(!result.can_buyer_sign_up);
  assert_eq!(http.calls_to("/orders/ord_5/confirm"), 0);
}
