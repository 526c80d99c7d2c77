// checkout/src/http.rs

//! The one HTTP primitive the checkout core talks through.
//!
//! Everything above this module sees a request as `{method, url, accept_json,
//! body, abort_signal}` and a response as a status plus a JSON-decodable body.
//! Timeouts and connection policy belong to the [`HttpClient`] implementation.

use crate::config::ClientConfig;
use crate::error::{CheckoutError, CheckoutResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
  Get,
  Post,
  Put,
  Delete,
}

impl HttpMethod {
  pub fn as_str(self) -> &'static str {
    match self {
      HttpMethod::Get => "GET",
      HttpMethod::Post => "POST",
      HttpMethod::Put => "PUT",
      HttpMethod::Delete => "DELETE",
    }
  }
}

impl std::fmt::Display for HttpMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: HttpMethod,
  /// Path relative to the client's base URL, e.g. `/orders`.
  pub url: String,
  pub accept_json: bool,
  pub body: Option<Value>,
  pub abort_signal: Option<AbortSignal>,
}

impl HttpRequest {
  /// A JSON POST, the shape every checkout endpoint uses.
  pub fn post_json(url: impl Into<String>, body: Value) -> Self {
    Self {
      method: HttpMethod::Post,
      url: url.into(),
      accept_json: true,
      body: Some(body),
      abort_signal: None,
    }
  }

  pub fn get(url: impl Into<String>) -> Self {
    Self {
      method: HttpMethod::Get,
      url: url.into(),
      accept_json: true,
      body: None,
      abort_signal: None,
    }
  }

  pub fn with_abort_signal(mut self, signal: AbortSignal) -> Self {
    self.abort_signal = Some(signal);
    self
  }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
  status: u16,
  url: String,
  body: Vec<u8>,
}

impl HttpResponse {
  pub fn new(status: u16, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      url: url.into(),
      body: body.into(),
    }
  }

  pub fn status(&self) -> u16 {
    self.status
  }

  /// `true` for 2xx statuses.
  pub fn ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  /// Parses the body as JSON. The server answers checkout failures with
  /// structured bodies on non-2xx statuses too, so this does not look at
  /// [`ok`](Self::ok).
  pub fn json(&self) -> CheckoutResult<Value> {
    serde_json::from_slice(&self.body).map_err(|source| CheckoutError::UnexpectedResponse {
      endpoint: self.url.clone(),
      source,
    })
  }
}

/// Casts parsed JSON into a declared shape, failing on mismatch.
pub fn cast<T: DeserializeOwned>(endpoint: &str, value: Value) -> CheckoutResult<T> {
  serde_json::from_value(value).map_err(|source| CheckoutError::UnexpectedResponse {
    endpoint: endpoint.to_string(),
    source,
  })
}

#[async_trait]
pub trait HttpClient: Send + Sync {
  /// Resolves with any HTTP status; only transport problems are errors.
  async fn request(&self, request: HttpRequest) -> CheckoutResult<HttpResponse>;
}

/// Sends `request` and casts the JSON body into `T`.
#[instrument(skip_all, fields(method = %request.method, url = %request.url))]
pub async fn request_json<T: DeserializeOwned>(http: &dyn HttpClient, request: HttpRequest) -> CheckoutResult<T> {
  let url = request.url.clone();
  let response = http.request(request).await?;
  debug!(status = response.status(), "Response received.");
  let body = match response.json() {
    Ok(body) => body,
    Err(_) if !response.ok() => {
      return Err(CheckoutError::HttpStatus {
        url,
        status: response.status(),
      })
    }
    Err(err) => return Err(err),
  };
  cast(&url, body)
}

// --- Cancellation ---

/// Owner side of a cancellation pair. Dropping the controller does not abort.
#[derive(Debug)]
pub struct AbortController {
  sender: Arc<watch::Sender<bool>>,
}

/// Cheap, cloneable handle observed by an in-flight request.
#[derive(Debug, Clone)]
pub struct AbortSignal {
  receiver: watch::Receiver<bool>,
}

impl AbortController {
  pub fn new() -> Self {
    let (sender, _) = watch::channel(false);
    Self { sender: Arc::new(sender) }
  }

  pub fn signal(&self) -> AbortSignal {
    AbortSignal {
      receiver: self.sender.subscribe(),
    }
  }

  pub fn abort(&self) {
    self.sender.send_replace(true);
  }
}

impl Default for AbortController {
  fn default() -> Self {
    Self::new()
  }
}

impl AbortSignal {
  pub fn is_aborted(&self) -> bool {
    *self.receiver.borrow()
  }

  /// Completes once the controller aborts. Pending forever if the controller
  /// is dropped without aborting.
  pub async fn aborted(&mut self) {
    loop {
      if *self.receiver.borrow_and_update() {
        return;
      }
      if self.receiver.changed().await.is_err() {
        std::future::pending::<()>().await;
      }
    }
  }
}

// --- reqwest implementation ---

/// [`HttpClient`] backed by `reqwest`.
pub struct ReqwestClient {
  http: reqwest::Client,
  config: ClientConfig,
}

impl ReqwestClient {
  pub fn new(config: ClientConfig) -> CheckoutResult<Self> {
    let http = reqwest::Client::builder()
      .timeout(config.timeout)
      .user_agent(config.user_agent.clone())
      .build()
      .map_err(|e| CheckoutError::Config(format!("Failed to build HTTP client: {}", e)))?;
    Ok(Self { http, config })
  }

  fn method(method: HttpMethod) -> reqwest::Method {
    match method {
      HttpMethod::Get => reqwest::Method::GET,
      HttpMethod::Post => reqwest::Method::POST,
      HttpMethod::Put => reqwest::Method::PUT,
      HttpMethod::Delete => reqwest::Method::DELETE,
    }
  }

  async fn send(&self, request: &HttpRequest) -> CheckoutResult<HttpResponse> {
    let url = self
      .config
      .base_url
      .join(request.url.trim_start_matches('/'))
      .map_err(|e| CheckoutError::Config(format!("Invalid request path '{}': {}", request.url, e)))?;

    let mut builder = self.http.request(Self::method(request.method), url.clone());
    if request.accept_json {
      builder = builder.header(reqwest::header::ACCEPT, "application/json");
    }
    if let Some(token) = &self.config.csrf_token {
      builder = builder.header("X-CSRF-Token", token);
    }
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let transport = |e: reqwest::Error| CheckoutError::Transport {
      url: request.url.clone(),
      message: e.to_string(),
    };
    let response = builder.send().await.map_err(transport)?;
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(transport)?;
    Ok(HttpResponse::new(status, request.url.clone(), body.to_vec()))
  }
}

#[async_trait]
impl HttpClient for ReqwestClient {
  async fn request(&self, request: HttpRequest) -> CheckoutResult<HttpResponse> {
    match request.abort_signal.clone() {
      None => self.send(&request).await,
      Some(mut signal) => {
        if signal.is_aborted() {
          return Err(CheckoutError::Aborted { url: request.url });
        }
        tokio::select! {
          response = self.send(&request) => response,
          _ = signal.aborted() => Err(CheckoutError::Aborted { url: request.url.clone() }),
        }
      }
    }
  }
}

/// Endpoint paths used by the checkout core.
pub struct Routes;

impl Routes {
  pub fn orders() -> String {
    "/orders".to_string()
  }

  pub fn confirm_order(order_id: &str) -> String {
    format!("/orders/{}/confirm", order_id)
  }

  pub fn confirm_purchase(purchase_id: &str) -> String {
    format!("/purchases/{}/confirm", purchase_id)
  }

  pub fn stripe_setup_intents() -> String {
    "/stripe_setup_intents".to_string()
  }

  pub fn braintree_transient_customer_tokens() -> String {
    "/braintree/transient_customer_tokens".to_string()
  }
}
