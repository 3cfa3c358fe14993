//! [`MacaroonIdentifier`] is the fixed layout identifier embedded in every LSAT macaroon.

use crate::{
    errors::{Error, Result},
    types::{PaymentHash, TokenId},
};

/// The only identifier version currently issued and accepted.
pub const IDENTIFIER_VERSION: u16 = 0;

/// Encoded identifier length: version (2) + payment hash (32) + token id (32).
pub const IDENTIFIER_LEN: usize = 2 + 32 + 32;

/// Identifier of an LSAT macaroon.
///
/// Binds a macaroon to the payment hash of the invoice it was issued for. The
/// root key is never part of it.
///
/// ```
/// use lsat_core::types::{MacaroonIdentifier, PaymentHash, TokenId};
///
/// let id = MacaroonIdentifier::new(PaymentHash([1; 32]), TokenId([2; 32]));
/// let bytes = id.encode();
/// assert_eq!(bytes.len(), 66);
/// assert_eq!(MacaroonIdentifier::decode(&bytes).unwrap(), id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacaroonIdentifier {
    pub version: u16,
    pub payment_hash: PaymentHash,
    pub token_id: TokenId,
}

impl MacaroonIdentifier {
    pub fn new(payment_hash: PaymentHash, token_id: TokenId) -> Self {
        MacaroonIdentifier {
            version: IDENTIFIER_VERSION,
            payment_hash,
            token_id,
        }
    }

    /// Identifier for a freshly issued token with a random token id.
    pub fn fresh(payment_hash: PaymentHash) -> Self {
        Self::new(payment_hash, TokenId::random())
    }

    /// Big-endian version, then payment hash, then token id.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IDENTIFIER_LEN);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(self.payment_hash.as_bytes());
        out.extend_from_slice(self.token_id.as_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != IDENTIFIER_LEN {
            return Err(Error::MalformedIdentifier(format!(
                "expected {IDENTIFIER_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let version = u16::from_be_bytes([bytes[0], bytes[1]]);
        if version != IDENTIFIER_VERSION {
            return Err(Error::MalformedIdentifier(format!(
                "unsupported version {version}"
            )));
        }

        let payment_hash = PaymentHash::from_slice(&bytes[2..34])
            .ok_or_else(|| Error::MalformedIdentifier("truncated payment hash".into()))?;
        let token_id = TokenId::from_slice(&bytes[34..])
            .ok_or_else(|| Error::MalformedIdentifier("truncated token id".into()))?;

        Ok(MacaroonIdentifier {
            version,
            payment_hash,
            token_id,
        })
    }
}
