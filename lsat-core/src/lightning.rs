//! Lightning backend interface.
//!
//! A backend only has to issue invoices. The paywall never branches on the
//! concrete backend; it is chosen once when the [`Lsat`](crate::lsat::Lsat)
//! service is built.

use std::sync::Arc;

use crate::types::{Invoice, InvoiceRequest, InvoiceStatus, PaymentHash};

/// Issues invoices for LSAT challenges.
///
/// The returned [`Invoice::payment_hash`] is what the macaroon root key is
/// derived from, so it must be the real hash of the returned payment request.
pub trait LightningBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    fn issue_invoice(
        &self,
        request: InvoiceRequest,
    ) -> impl Future<Output = Result<Invoice, Self::Error>> + Send;
}

/// Backends able to report the settlement state of an invoice.
pub trait InvoiceLookup {
    type Error: std::error::Error + Send + Sync + 'static;

    fn lookup_invoice(
        &self,
        payment_hash: &PaymentHash,
    ) -> impl Future<Output = Result<InvoiceStatus, Self::Error>> + Send;
}

impl<B: LightningBackend + Send + Sync> LightningBackend for Arc<B> {
    type Error = B::Error;

    fn issue_invoice(
        &self,
        request: InvoiceRequest,
    ) -> impl Future<Output = Result<Invoice, Self::Error>> + Send {
        (**self).issue_invoice(request)
    }
}
