//! Issuance and verification orchestrators.
//!
//! [`Lsat`] ties a [`LsatConfig`], a [`LightningBackend`] and a caveat
//! registry together. It holds no mutable state, so one instance can be
//! shared across all requests.

use bon::Builder;

use crate::{
    caveat::Satisfiers,
    config::LsatConfig,
    errors::{Error, Result},
    lightning::LightningBackend,
    token::{encode_macaroon, mint_macaroon, verify_macaroon},
    transport::{Challenge, Credential},
    types::{
        Caveat, Invoice, InvoiceRequest, MacaroonIdentifier, PaymentHash, Preimage,
        RequestContext,
    },
};

/// Classification of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// No credential, and the client does not speak LSAT.
    Free,
    /// The credential verified.
    Paid {
        preimage: Preimage,
        payment_hash: PaymentHash,
    },
    /// A credential was presented and rejected.
    Error(Error),
}

impl VerificationResult {
    pub fn is_paid(&self) -> bool {
        matches!(self, VerificationResult::Paid { .. })
    }

    pub fn as_error(&self) -> Option<&Error> {
        match self {
            VerificationResult::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// Everything produced by one successful issuance.
#[derive(Debug, Clone)]
pub struct Issuance {
    pub challenge: Challenge,
    pub invoice: Invoice,
    pub identifier: MacaroonIdentifier,
}

/// The LSAT token service.
#[derive(Builder, Debug)]
pub struct Lsat<B: LightningBackend> {
    pub config: LsatConfig,
    /// Selected once at setup.
    pub backend: B,
    #[builder(default)]
    pub satisfiers: Satisfiers,
}

impl<B: LightningBackend> Lsat<B> {
    /// Issue a new token: invoice, identifier, signed macaroon, challenge.
    ///
    /// The backend call is bounded by `config.invoice_timeout`. Nothing is
    /// stored, so dropping this future leaves no state behind.
    pub async fn issue(
        &self,
        amount_sats: u64,
        caveats: &[Caveat],
        context: &RequestContext,
    ) -> Result<Issuance> {
        let request = InvoiceRequest::builder()
            .amount_sats(amount_sats)
            .memo(self.config.memo.clone())
            .context(context.clone())
            .build();

        let invoice = tokio::time::timeout(
            self.config.invoice_timeout,
            self.backend.issue_invoice(request),
        )
        .await
        .map_err(|_| {
            Error::invoice_generation(format!(
                "backend did not answer within {:?}",
                self.config.invoice_timeout
            ))
        })?
        .map_err(Error::invoice_generation)?;

        let identifier = MacaroonIdentifier::fresh(invoice.payment_hash);
        let macaroon = mint_macaroon(
            &self.config.server_secret,
            &identifier,
            caveats,
            self.config.location.clone(),
        )?;

        let challenge = Challenge {
            scheme: self.config.scheme,
            macaroon: encode_macaroon(&macaroon)?,
            invoice: invoice.payment_request.clone(),
        };

        Ok(Issuance {
            challenge,
            invoice,
            identifier,
        })
    }

    /// Verify an `Authorization` header value.
    ///
    /// Never returns [`VerificationResult::Free`]: a presented credential is
    /// either paid or an error.
    pub fn verify(
        &self,
        authorization: &str,
        expected: &[Caveat],
        context: &RequestContext,
    ) -> VerificationResult {
        match Credential::parse(authorization) {
            Ok(credential) => self.verify_credential(&credential, expected, context),
            Err(err) => VerificationResult::Error(err),
        }
    }

    /// Verify an already decoded credential.
    pub fn verify_credential(
        &self,
        credential: &Credential,
        expected: &[Caveat],
        context: &RequestContext,
    ) -> VerificationResult {
        let result = verify_macaroon(
            &credential.macaroon,
            expected,
            &self.config.server_secret,
            &credential.preimage,
            &self.satisfiers,
            context,
        );

        match result {
            Ok(identifier) => VerificationResult::Paid {
                preimage: credential.preimage,
                payment_hash: identifier.payment_hash,
            },
            Err(err) => VerificationResult::Error(err),
        }
    }
}
