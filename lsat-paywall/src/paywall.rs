use std::sync::Arc;

use bon::Builder;
use http::{Request, Response};
use lsat_core::{
    lightning::LightningBackend,
    lsat::{Lsat, VerificationResult},
    transport::{client_supports_lsat, lsat_authorization},
    types::{Caveat, PaymentHash, Preimage, RequestContext},
};

use crate::errors::ErrorResponse;

/// Prices a request in satoshis.
pub trait AmountFn: Send + Sync {
    fn amount(&self, context: &RequestContext) -> u64;
}

impl<F> AmountFn for F
where
    F: Fn(&RequestContext) -> u64 + Send + Sync,
{
    fn amount(&self, context: &RequestContext) -> u64 {
        self(context)
    }
}

/// The same price for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAmount(pub u64);

impl AmountFn for FixedAmount {
    fn amount(&self, _context: &RequestContext) -> u64 {
        self.0
    }
}

/// Caveats a token for this request must carry.
pub trait CaveatFn: Send + Sync {
    fn caveats(&self, context: &RequestContext) -> Vec<Caveat>;
}

impl<F> CaveatFn for F
where
    F: Fn(&RequestContext) -> Vec<Caveat> + Send + Sync,
{
    fn caveats(&self, context: &RequestContext) -> Vec<Caveat> {
        self(context)
    }
}

/// What the paywall decided about a request, available to the handler as a
/// request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LsatState {
    /// The client does not speak LSAT; serve free content.
    Free,
    /// A valid token and preimage were presented.
    Paid {
        preimage: Preimage,
        payment_hash: PaymentHash,
    },
}

impl LsatState {
    pub fn is_paid(&self) -> bool {
        matches!(self, LsatState::Paid { .. })
    }
}

/// A http paywall that gates resources behind LSAT tokens.
///
/// Every request is classified as one of:
///
/// - **Paid**: an `Authorization` header with an LSAT scheme verified.
/// - **Error**: such a header was present and did not verify; answered with `500`.
/// - **Challenge**: no credential, but the client announced LSAT support; answered with
///   `402 Payment Required` and a fresh `WWW-Authenticate` challenge.
/// - **Free**: anything else.
#[derive(Builder)]
pub struct PayWall<B: LightningBackend> {
    /// The token service issuing and verifying tokens.
    #[builder(into)]
    pub lsat: Arc<Lsat<B>>,
    /// Price of a request.
    #[builder(with = |pricing: impl AmountFn + 'static| Arc::new(pricing) as Arc<dyn AmountFn>)]
    pub pricing: Arc<dyn AmountFn>,
    /// Caveats attached to issued tokens and required from presented ones.
    #[builder(with = |caveats: impl CaveatFn + 'static| Arc::new(caveats) as Arc<dyn CaveatFn>)]
    pub caveats: Option<Arc<dyn CaveatFn>>,
}

impl<B: LightningBackend> Clone for PayWall<B> {
    fn clone(&self) -> Self {
        PayWall {
            lsat: self.lsat.clone(),
            pricing: self.pricing.clone(),
            caveats: self.caveats.clone(),
        }
    }
}

impl<B: LightningBackend> std::fmt::Debug for PayWall<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayWall")
            .field("scheme", &self.lsat.config.scheme)
            .field("caveats", &self.caveats.is_some())
            .finish_non_exhaustive()
    }
}

impl<B: LightningBackend> PayWall<B> {
    /// Caveats that apply to this request.
    pub fn expected_caveats(&self, context: &RequestContext) -> Vec<Caveat> {
        self.caveats
            .as_ref()
            .map(|caveats| caveats.caveats(context))
            .unwrap_or_default()
    }

    /// Classify a request.
    ///
    /// `Err` is the response to send instead of running the handler: either a
    /// `402` challenge or a `500` for a rejected credential.
    pub async fn classify(&self, context: &RequestContext) -> Result<LsatState, ErrorResponse> {
        if let Some(authorization) = lsat_authorization(&context.headers) {
            let expected = self.expected_caveats(context);
            return match self.lsat.verify(authorization, &expected, context) {
                VerificationResult::Paid {
                    preimage,
                    payment_hash,
                } => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("LSAT verified: payment_hash='{payment_hash}'");

                    Ok(LsatState::Paid {
                        preimage,
                        payment_hash,
                    })
                }
                VerificationResult::Error(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("LSAT rejected: {err}");

                    Err(ErrorResponse::from(err))
                }
                VerificationResult::Free => Ok(LsatState::Free),
            };
        }

        if !client_supports_lsat(&context.headers) {
            return Ok(LsatState::Free);
        }

        let amount = self.pricing.amount(context);
        let caveats = self.expected_caveats(context);
        let issuance = self
            .lsat
            .issue(amount, &caveats, context)
            .await
            .inspect_err(|_err| {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to issue LSAT challenge: {_err}");
            })?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "LSAT challenge issued: payment_hash='{}', amount_sats={amount}",
            issuance.invoice.payment_hash
        );

        Err(ErrorResponse::payment_required(issuance.challenge))
    }

    /// Classify the request and run `handler` unless a response is due.
    ///
    /// The handler finds the [`LsatState`] in the request extensions.
    pub async fn handle<Fun, Fut, Req, Res>(
        &self,
        mut request: Request<Req>,
        handler: Fun,
    ) -> Result<Response<Res>, ErrorResponse>
    where
        Fun: FnOnce(Request<Req>) -> Fut,
        Fut: Future<Output = Response<Res>>,
    {
        let context = RequestContext::from(&request);
        let state = self.classify(&context).await?;

        request.extensions_mut().insert(state);
        Ok(handler(request).await)
    }
}
