use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::types::{PaymentHash, RequestContext};

/// A Lightning invoice issued for an LSAT challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Must be the payment hash embedded in the macaroon identifier.
    pub payment_hash: PaymentHash,
    /// Encoded payment request, e.g. a BOLT11 string.
    pub payment_request: String,
    pub amount_sats: u64,
}

/// What the paywall asks a Lightning backend for.
#[derive(Builder, Debug, Clone)]
pub struct InvoiceRequest {
    pub amount_sats: u64,
    #[builder(into, default = "LSAT".to_string())]
    pub memo: String,
    /// Metadata of the request being priced.
    #[builder(default)]
    pub context: RequestContext,
}

/// Settlement state of an invoice as reported by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Open,
    Settled,
    Canceled,
    Accepted,
}

impl InvoiceStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, InvoiceStatus::Settled)
    }
}
