// checkout/src/payment/result.rs

//! From the buyer's payment selection to the token bundle a purchase needs.
//!
//! Two strengths are offered. The one-off result is enough for a single
//! charge. The reusable result additionally creates a setup intent (and runs
//! its card challenge) so the card can be charged again, which recurring and
//! installment products need. PayPal results pass through untouched by the
//! upgrade.

use super::braintree::BraintreePaymentMethodData;
use super::card::{CardPaymentMethodData, ProductRef};
use super::params::{
  CardFamilyParams, PayPalParams, PaymentMethodParams, PaymentRequestParams, ProcessorError, TokenizedPaymentMethod,
};
use super::paypal::{prepare_paypal_payment_method_data, PayPalApproval};
use crate::client::Checkout;
use crate::error::CheckoutResult;
use tracing::instrument;

/// The method picked in the checkout form. Consumed by one submission.
#[derive(Debug, Clone)]
pub enum SelectedPaymentMethod {
  /// The card already stored on the buyer's account.
  Saved,
  Card {
    data: CardPaymentMethodData,
    keep_on_file: bool,
    zip_code: Option<String>,
  },
  PayPalBraintree {
    data: BraintreePaymentMethodData,
    keep_on_file: bool,
  },
  PayPalNative {
    approval: PayPalApproval,
    keep_on_file: bool,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethodResult {
  /// No payment data; the server charges the account's stored method.
  Saved,
  Card {
    params: CardFamilyParams,
    keep_on_file: bool,
    zip_code: Option<String>,
  },
  PayPal {
    params: PayPalParams,
    keep_on_file: bool,
  },
  Error(ProcessorError),
}

impl PaymentMethodResult {
  /// The tokenized params behind this result, if any.
  pub fn params(&self) -> Option<PaymentMethodParams> {
    match self {
      PaymentMethodResult::Saved => None,
      PaymentMethodResult::Card { params, .. } => {
        Some(PaymentMethodParams::Success(TokenizedPaymentMethod::from(params.clone())))
      }
      PaymentMethodResult::PayPal { params, .. } => {
        Some(PaymentMethodParams::Success(TokenizedPaymentMethod::from(params.clone())))
      }
      PaymentMethodResult::Error(error) => Some(PaymentMethodParams::Error(error.clone())),
    }
  }

  pub fn keep_on_file(&self) -> bool {
    match self {
      PaymentMethodResult::Card { keep_on_file, .. } | PaymentMethodResult::PayPal { keep_on_file, .. } => *keep_on_file,
      PaymentMethodResult::Saved | PaymentMethodResult::Error(_) => false,
    }
  }
}

impl Checkout {
  /// Tokenizes the selection for a one-off charge.
  ///
  /// Only transport failures are `Err`; processor refusals become
  /// [`PaymentMethodResult::Error`].
  #[instrument(skip_all)]
  pub async fn get_payment_method_result(&self, selected: SelectedPaymentMethod) -> CheckoutResult<PaymentMethodResult> {
    let result = match selected {
      SelectedPaymentMethod::Saved => PaymentMethodResult::Saved,
      SelectedPaymentMethod::Card {
        data,
        keep_on_file,
        zip_code,
      } => match self.prepare_card_payment_method_data(&data).await {
        Ok(card) => PaymentMethodResult::Card {
          params: CardFamilyParams::Card(card),
          keep_on_file,
          zip_code,
        },
        Err(error) => PaymentMethodResult::Error(error),
      },
      SelectedPaymentMethod::PayPalBraintree { data, keep_on_file } => {
        match self.prepare_braintree_payment_method_data(&data).await? {
          Ok(braintree) => PaymentMethodResult::PayPal {
            params: PayPalParams::Braintree(braintree),
            keep_on_file,
          },
          Err(error) => PaymentMethodResult::Error(error),
        }
      }
      SelectedPaymentMethod::PayPalNative { approval, keep_on_file } => PaymentMethodResult::PayPal {
        params: PayPalParams::Native(prepare_paypal_payment_method_data(approval)),
        keep_on_file,
      },
    };
    Ok(result)
  }

  /// Tokenizes the selection so it can be charged again later.
  #[instrument(skip_all, fields(num_products = products.len()))]
  pub async fn get_reusable_payment_method_result(
    &self,
    selected: SelectedPaymentMethod,
    products: &[ProductRef],
  ) -> CheckoutResult<PaymentMethodResult> {
    let result = self.get_payment_method_result(selected).await?;
    self.make_reusable(result, products).await
  }

  /// Wraps what the browser payment sheet produced.
  pub fn get_payment_request_payment_method_result(
    &self,
    params: Result<PaymentRequestParams, ProcessorError>,
  ) -> PaymentMethodResult {
    match params {
      Ok(payment_request) => PaymentMethodResult::Card {
        zip_code: payment_request.zip_code.clone(),
        params: CardFamilyParams::PaymentRequest(payment_request),
        keep_on_file: false,
      },
      Err(error) => PaymentMethodResult::Error(error),
    }
  }

  #[instrument(skip_all, fields(num_products = products.len()))]
  pub async fn get_reusable_payment_request_payment_method_result(
    &self,
    params: Result<PaymentRequestParams, ProcessorError>,
    products: &[ProductRef],
  ) -> CheckoutResult<PaymentMethodResult> {
    let result = self.get_payment_request_payment_method_result(params);
    self.make_reusable(result, products).await
  }

  async fn make_reusable(&self, result: PaymentMethodResult, products: &[ProductRef]) -> CheckoutResult<PaymentMethodResult> {
    match result {
      PaymentMethodResult::Card {
        params,
        keep_on_file,
        zip_code,
      } => {
        let setup = self.prepare_future_charges(products, params).await?;
        Ok(match self.confirm_card_if_needed(setup).await {
          Ok(params) => PaymentMethodResult::Card {
            params,
            keep_on_file,
            zip_code,
          },
          Err(error) => PaymentMethodResult::Error(error),
        })
      }
      passthrough @ (PaymentMethodResult::Saved | PaymentMethodResult::PayPal { .. } | PaymentMethodResult::Error(_)) => {
        Ok(passthrough)
      }
    }
  }
}
