// checkout/src/payment/paypal.rs

use super::params::PayPalNativeParams;

/// What the PayPal SDK hands back once the buyer approves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayPalApproval {
  /// A single charge against a PayPal order.
  OneTime { order_id: String },
  /// A billing agreement that allows later charges.
  BillingAgreement { token: String, billing_agreement_id: String },
}

pub fn prepare_paypal_payment_method_data(approval: PayPalApproval) -> PayPalNativeParams {
  match approval {
    PayPalApproval::OneTime { order_id } => PayPalNativeParams::OneTime {
      paypal_order_id: order_id,
    },
    PayPalApproval::BillingAgreement {
      token,
      billing_agreement_id,
    } => PayPalNativeParams::BillingAgreement {
      billing_agreement_id,
      token,
    },
  }
}
