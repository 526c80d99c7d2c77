// src/lib.rs

//! Marketplace checkout: the client-side core of a cart purchase.
//!
//! The crate turns a buyer's payment selection into processor tokens, builds
//! the purchase request, places the order and drives the card authentication
//! round trip when the processor asks for one. It covers:
//!  - Tokenized payment methods as sum types, flattened into request fields.
//!  - Card, gateway PayPal and native PayPal preparation, with a nonce cache
//!    so a gateway nonce is only ever exchanged once.
//!  - One-off and reusable payment method results.
//!  - A step-based order flow with a single card challenge per order.
//!  - Per-line-item results that always cover every requested item.
//!
//! Networking goes through the [`HttpClient`] trait and the processor SDK
//! through [`CardProcessor`]; both are supplied by the host.

pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod http;
pub mod order;
pub mod payment;
pub mod purchase;

// --- Re-exports for the Public API ---

pub use crate::client::Checkout;
pub use crate::config::ClientConfig;
pub use crate::error::{CheckoutError, CheckoutResult};
pub use crate::flow::{ContextData, Flow, FlowControl, FlowOutcome};
pub use crate::http::{AbortController, AbortSignal, HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestClient};
pub use crate::order::{ensure_valid_cart_result, OrderState};

pub use crate::payment::braintree::BraintreePaymentMethodData;
pub use crate::payment::card::{CardPaymentMethodData, ProductRef};
pub use crate::payment::params::{
  serialize_card_params_into_query_params_object, CardFamilyParams, CardParams, FutureChargeIds, PayPalBraintreeParams,
  PayPalNativeParams, PayPalParams, PaymentMethodKind, PaymentMethodParams, PaymentRequestParams, ProcessorError,
  TokenizedPaymentMethod,
};
pub use crate::payment::paypal::PayPalApproval;
pub use crate::payment::processor::{BillingDetails, CardElement, CardProcessor, ProcessorPaymentMethod, ProcessorResolver, StaticProcessors};
pub use crate::payment::result::{PaymentMethodResult, SelectedPaymentMethod};

pub use crate::purchase::line_item::{CartPurchaseResult, LineItemResult, PurchaseFailure, PurchaseReceipt, ServerLineItem};
pub use crate::purchase::request::{
  create_purchases_request_data, GiftInfo, LineItemPayload, PurchaseContext, PurchasePayload, PurchasesRequestData,
  ShippingInfo,
};
