// checkout/src/purchase/confirm.rs

//! Card authentication and the confirm round trip that follows it.

use super::line_item::{LineItemResult, ScaChallenge, ScaKind, ServerLineItem};
use crate::client::Checkout;
use crate::error::CheckoutResult;
use crate::http::{request_json, HttpRequest, Routes};
use crate::payment::params::ProcessorError;
use serde_json::{json, Map, Value};
use tracing::{error, info, instrument, warn};

/// Body for both confirm endpoints. The processor's verdict is forwarded even
/// when it failed, so the server can record it.
pub(crate) fn confirm_body(challenge: &ScaChallenge, processor_error: Option<&ProcessorError>) -> Value {
  let mut body = Map::new();
  body.insert("client_secret".to_string(), json!(challenge.client_secret));
  if let Some(error) = processor_error {
    body.insert("stripe_error".to_string(), json!(error));
  }
  Value::Object(body)
}

impl Checkout {
  /// Runs the client-side challenge on the processor that owns the intent.
  ///
  /// Only a failure to resolve that processor is `Err`; the challenge's own
  /// outcome is returned as the optional processor error.
  #[instrument(skip_all, fields(kind = ?kind, connect_account = ?challenge.stripe_connect_account_id))]
  pub(crate) async fn run_card_challenge(
    &self,
    kind: ScaKind,
    challenge: &ScaChallenge,
  ) -> CheckoutResult<Option<ProcessorError>> {
    let processor = self
      .processors
      .processor(challenge.stripe_connect_account_id.as_deref())
      .await?;
    let outcome = match kind {
      ScaKind::CardAction => processor.confirm_card_payment(&challenge.client_secret).await,
      ScaKind::CardSetup => processor.confirm_card_setup(&challenge.client_secret).await,
    };
    match outcome {
      Ok(()) => {
        info!("Card challenge passed.");
        Ok(None)
      }
      Err(processor_error) => {
        warn!(error = %processor_error, "Card challenge failed.");
        Ok(Some(processor_error))
      }
    }
  }

  /// Finishes a single purchase that stopped for card authentication.
  ///
  /// Already settled items come back unchanged. Never fails: anything that
  /// goes wrong is logged and reported as a failed line item.
  #[instrument(skip_all)]
  pub async fn confirm_line_item(&self, item: ServerLineItem) -> LineItemResult {
    let (kind, challenge) = match item.into_challenge() {
      Ok(pending) => pending,
      Err(settled) => return settled,
    };
    match self.confirm_purchase(kind, &challenge).await {
      Ok(result) => result,
      Err(e) => {
        error!(error = %e, purchase_id = %challenge.confirm_id, "Purchase confirmation failed.");
        LineItemResult::failed()
      }
    }
  }

  async fn confirm_purchase(&self, kind: ScaKind, challenge: &ScaChallenge) -> CheckoutResult<LineItemResult> {
    let processor_error = self.run_card_challenge(kind, challenge).await?;
    request_json(
      self.http.as_ref(),
      HttpRequest::post_json(
        Routes::confirm_purchase(&challenge.confirm_id),
        confirm_body(challenge, processor_error.as_ref()),
      ),
    )
    .await
  }
}
