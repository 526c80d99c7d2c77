// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper

use async_trait::async_trait;
use checkout::{
  BillingDetails, CardElement, CardProcessor, Checkout, CheckoutError, CheckoutResult, HttpClient, HttpRequest,
  HttpResponse, LineItemPayload, PaymentMethodResult, ProcessorError, ProcessorPaymentMethod, PurchasePayload,
  StaticProcessors,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;

// --- Helper for Tracing Setup ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Scripted HTTP client ---

#[derive(Debug, Clone)]
pub enum Reply {
  Json(u16, Value),
  Raw(u16, &'static str),
  /// The request never gets a response.
  Transport,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
  pub url: String,
  pub body: Option<Value>,
}

/// Answers each path from a queue of scripted replies. The last reply for a
/// path repeats; unknown paths fail at the transport level.
#[derive(Default)]
pub struct FakeHttp {
  routes: Mutex<HashMap<String, VecDeque<Reply>>>,
  calls: Mutex<Vec<RecordedCall>>,
}

impl FakeHttp {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn reply(&self, path: &str, reply: Reply) {
    self.routes.lock().entry(path.to_string()).or_default().push_back(reply);
  }

  pub fn calls_to(&self, path: &str) -> usize {
    self.calls.lock().iter().filter(|c| c.url == path).count()
  }

  pub fn bodies_to(&self, path: &str) -> Vec<Value> {
    self
      .calls
      .lock()
      .iter()
      .filter(|c| c.url == path)
      .filter_map(|c| c.body.clone())
      .collect()
  }

  pub fn total_calls(&self) -> usize {
    self.calls.lock().len()
  }
}

#[async_trait]
impl HttpClient for FakeHttp {
  async fn request(&self, request: HttpRequest) -> CheckoutResult<HttpResponse> {
    self.calls.lock().push(RecordedCall {
      url: request.url.clone(),
      body: request.body.clone(),
    });

    let reply = {
      let mut routes = self.routes.lock();
      match routes.get_mut(&request.url) {
        Some(queue) if queue.len() > 1 => queue.pop_front(),
        Some(queue) => queue.front().cloned(),
        None => None,
      }
    };

    match reply {
      Some(Reply::Json(status, body)) => Ok(HttpResponse::new(status, request.url, body.to_string())),
      Some(Reply::Raw(status, body)) => Ok(HttpResponse::new(status, request.url, body)),
      Some(Reply::Transport) | None => Err(CheckoutError::Transport {
        url: request.url,
        message: "connection reset by peer".to_string(),
      }),
    }
  }
}

// --- Scripted card processor ---

pub struct FakeProcessor {
  pub payment_method: Result<ProcessorPaymentMethod, ProcessorError>,
  pub confirm_payment_outcome: Result<(), ProcessorError>,
  pub confirm_setup_outcome: Result<(), ProcessorError>,
  pub created: AtomicUsize,
  pub payments_confirmed: AtomicUsize,
  pub setups_confirmed: AtomicUsize,
  pub secrets: Mutex<Vec<String>>,
}

impl Default for FakeProcessor {
  fn default() -> Self {
    Self {
      payment_method: Ok(ProcessorPaymentMethod {
        id: "pm_test".to_string(),
        card_country: Some("US".to_string()),
      }),
      confirm_payment_outcome: Ok(()),
      confirm_setup_outcome: Ok(()),
      created: AtomicUsize::new(0),
      payments_confirmed: AtomicUsize::new(0),
      setups_confirmed: AtomicUsize::new(0),
      secrets: Mutex::new(Vec::new()),
    }
  }
}

impl FakeProcessor {
  pub fn payments_confirmed(&self) -> usize {
    self.payments_confirmed.load(Ordering::SeqCst)
  }

  pub fn setups_confirmed(&self) -> usize {
    self.setups_confirmed.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl CardProcessor for FakeProcessor {
  async fn create_payment_method(
    &self,
    _card: &CardElement,
    _billing: &BillingDetails,
  ) -> Result<ProcessorPaymentMethod, ProcessorError> {
    self.created.fetch_add(1, Ordering::SeqCst);
    self.payment_method.clone()
  }

  async fn confirm_card_payment(&self, client_secret: &str) -> Result<(), ProcessorError> {
    self.payments_confirmed.fetch_add(1, Ordering::SeqCst);
    self.secrets.lock().push(client_secret.to_string());
    self.confirm_payment_outcome.clone()
  }

  async fn confirm_card_setup(&self, client_secret: &str) -> Result<(), ProcessorError> {
    self.setups_confirmed.fetch_add(1, Ordering::SeqCst);
    self.secrets.lock().push(client_secret.to_string());
    self.confirm_setup_outcome.clone()
  }
}

pub fn checkout_with(http: Arc<FakeHttp>, processor: Arc<FakeProcessor>) -> Checkout {
  Checkout::new(http, Arc::new(StaticProcessors::new(processor)))
}

// --- Payload builders ---

pub fn line_item(uid: &str, permalink: &str) -> LineItemPayload {
  LineItemPayload {
    uid: uid.to_string(),
    permalink: permalink.to_string(),
    perceived_price_cents: 1000,
    quantity: 1,
    ..Default::default()
  }
}

pub fn cart(line_items: Vec<LineItemPayload>) -> PurchasePayload {
  PurchasePayload {
    email: "buyer@example.com".to_string(),
    full_name: Some("Ada Buyer".to_string()),
    country: Some("US".to_string()),
    zip_code: Some("10001".to_string()),
    state: None,
    tax_country_election: Some("US".to_string()),
    vat_id: None,
    shipping_info: None,
    gift: None,
    payment_method: PaymentMethodResult::Saved,
    line_items,
  }
}
