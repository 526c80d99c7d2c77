// checkout/src/purchase/request.rs

//! The purchase request body, built in one place.
//!
//! [`create_purchases_request_data`] is pure and total. It decides which
//! address, gift and payment fields reach the server:
//!
//! * with shipping info, the full shipping address is sent;
//! * otherwise a US tax election sends only a zip code and a Canadian one only
//!   a province, so `state` and `zip_code` never travel together;
//! * a gift names the recipient by account id or by email, never both;
//! * exactly one family of payment fields is present: the saved-card marker,
//!   card token fields, PayPal fields or a structured processor error.

use crate::payment::params::serialize_card_params_into_query_params_object;
use crate::payment::result::PaymentMethodResult;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomFieldValue {
  pub id: String,
  pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedOffer {
  pub id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub original_variant_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub original_product_id: Option<String>,
}

/// One cart entry as the checkout form knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItemPayload {
  /// Client-generated and unique within one request. The only reliable way
  /// to find this entry in the server's answer.
  pub uid: String,
  pub permalink: String,
  pub perceived_price_cents: u64,
  pub quantity: u32,
  /// Pay-what-you-want amount as typed by the buyer.
  pub price_range: Option<String>,
  pub discount_code: Option<String>,
  pub affiliate_id: Option<String>,
  pub recommended_by: Option<String>,
  pub recommender_model_name: Option<String>,
  pub variant_ids: Vec<String>,
  /// Recurrence price for memberships.
  pub price_id: Option<String>,
  pub is_preorder: bool,
  pub is_rental: bool,
  pub custom_fields: Vec<CustomFieldValue>,
  pub tip_cents: Option<u64>,
  pub call_start_time: Option<String>,
  pub pay_in_installments: bool,
  pub accepted_offer: Option<AcceptedOffer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingInfo {
  pub full_name: String,
  pub street_address: String,
  pub city: String,
  pub state: String,
  pub zip_code: String,
  pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GiftInfo {
  ExistingUser { giftee_id: String, note: Option<String> },
  Email { giftee_email: String, note: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasePayload {
  pub email: String,
  pub full_name: Option<String>,
  pub country: Option<String>,
  pub zip_code: Option<String>,
  pub state: Option<String>,
  /// Country the buyer declared for tax purposes.
  pub tax_country_election: Option<String>,
  pub vat_id: Option<String>,
  pub shipping_info: Option<ShippingInfo>,
  pub gift: Option<GiftInfo>,
  pub payment_method: PaymentMethodResult,
  pub line_items: Vec<LineItemPayload>,
}

/// Request metadata that does not come from the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseContext {
  pub browser_guid: String,
  pub recaptcha_response: Option<String>,
  pub referrer: Option<String>,
  pub locale: Option<String>,
  pub is_mobile: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemRequestData {
  pub uid: String,
  pub permalink: String,
  pub perceived_price_cents: u64,
  pub quantity: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub price_range: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub discount_code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub affiliate_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub recommended_by: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub recommender_model_name: Option<String>,
  pub variants: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub price_id: Option<String>,
  pub is_preorder: bool,
  pub is_rental: bool,
  pub custom_fields: Vec<CustomFieldValue>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tip_cents: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub call_start_time: Option<String>,
  pub pay_in_installments: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub accepted_offer: Option<AcceptedOffer>,
}

impl From<&LineItemPayload> for LineItemRequestData {
  fn from(item: &LineItemPayload) -> Self {
    Self {
      uid: item.uid.clone(),
      permalink: item.permalink.clone(),
      perceived_price_cents: item.perceived_price_cents,
      quantity: item.quantity,
      price_range: item.price_range.clone(),
      discount_code: item.discount_code.clone(),
      affiliate_id: item.affiliate_id.clone(),
      recommended_by: item.recommended_by.clone(),
      recommender_model_name: item.recommender_model_name.clone(),
      variants: item.variant_ids.clone(),
      price_id: item.price_id.clone(),
      is_preorder: item.is_preorder,
      is_rental: item.is_rental,
      custom_fields: item.custom_fields.clone(),
      tip_cents: item.tip_cents,
      call_start_time: item.call_start_time.clone(),
      pay_in_installments: item.pay_in_installments,
      accepted_offer: item.accepted_offer.clone(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurchaseFields {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub full_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub street_address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub zip_code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub business_vat_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GiftFields {
  pub is_gift: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub giftee_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub giftee_email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub gift_note: Option<String>,
}

/// The exact body `POST /orders` expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchasesRequestData {
  pub email: String,
  pub browser_guid: String,
  #[serde(rename = "g-recaptcha-response", skip_serializing_if = "Option::is_none")]
  pub recaptcha_response: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub referrer: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub locale: Option<String>,
  pub is_mobile: bool,
  pub line_items: Vec<LineItemRequestData>,
  pub purchase: PurchaseFields,
  #[serde(flatten)]
  pub gift: Option<GiftFields>,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub use_existing_card: bool,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub save_payment_method: bool,
  /// Provider fields from the payment method, merged at the top level.
  #[serde(flatten)]
  pub payment_fields: Map<String, Value>,
}

impl PurchasesRequestData {
  /// `(uid, permalink)` of every requested line item, in request order.
  pub fn requested_line_items(&self) -> Vec<(String, String)> {
    self
      .line_items
      .iter()
      .map(|item| (item.uid.clone(), item.permalink.clone()))
      .collect()
  }
}

fn address_fields(payload: &PurchasePayload) -> PurchaseFields {
  let base = PurchaseFields {
    full_name: payload.full_name.clone(),
    country: payload.country.clone(),
    business_vat_id: payload.vat_id.clone(),
    ..Default::default()
  };

  if let Some(shipping) = &payload.shipping_info {
    return PurchaseFields {
      full_name: Some(shipping.full_name.clone()),
      country: Some(shipping.country.clone()),
      street_address: Some(shipping.street_address.clone()),
      city: Some(shipping.city.clone()),
      state: Some(shipping.state.clone()),
      zip_code: Some(shipping.zip_code.clone()),
      ..base
    };
  }

  match payload.tax_country_election.as_deref() {
    Some("US") => {
      // The card form collects its own zip code; a saved card has none, so
      // the checkout form's value is used instead.
      let card_zip = match &payload.payment_method {
        PaymentMethodResult::Card { zip_code, .. } => zip_code.clone(),
        PaymentMethodResult::Saved | PaymentMethodResult::PayPal { .. } | PaymentMethodResult::Error(_) => None,
      };
      PurchaseFields {
        zip_code: card_zip.or_else(|| payload.zip_code.clone()),
        ..base
      }
    }
    Some("CA") => PurchaseFields {
      state: payload.state.clone(),
      ..base
    },
    _ => base,
  }
}

fn gift_fields(gift: &GiftInfo) -> GiftFields {
  match gift {
    GiftInfo::ExistingUser { giftee_id, note } => GiftFields {
      is_gift: true,
      giftee_id: Some(giftee_id.clone()),
      giftee_email: None,
      gift_note: note.clone(),
    },
    GiftInfo::Email { giftee_email, note } => GiftFields {
      is_gift: true,
      giftee_id: None,
      giftee_email: Some(giftee_email.clone()),
      gift_note: note.clone(),
    },
  }
}

pub fn create_purchases_request_data(payload: &PurchasePayload, purchase: &PurchaseContext) -> PurchasesRequestData {
  let (use_existing_card, payment_fields) = match payload.payment_method.params() {
    None => (true, Map::new()),
    Some(params) => (false, serialize_card_params_into_query_params_object(&params)),
  };

  PurchasesRequestData {
    email: payload.email.clone(),
    browser_guid: purchase.browser_guid.clone(),
    recaptcha_response: purchase.recaptcha_response.clone(),
    referrer: purchase.referrer.clone(),
    locale: purchase.locale.clone(),
    is_mobile: purchase.is_mobile,
    line_items: payload.line_items.iter().map(LineItemRequestData::from).collect(),
    purchase: address_fields(payload),
    gift: payload.gift.as_ref().map(gift_fields),
    use_existing_card,
    save_payment_method: payload.payment_method.keep_on_file(),
    payment_fields,
  }
}
