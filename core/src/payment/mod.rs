// checkout/src/payment/mod.rs

//! Payment method tokens: their shapes, how each provider produces them, and
//! how a buyer's selection becomes a one-off or reusable result.

pub mod braintree;
pub mod card;
pub mod params;
pub mod paypal;
pub mod processor;
pub mod result;
