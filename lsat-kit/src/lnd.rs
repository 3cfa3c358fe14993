//! LND REST backend.
//!
//! Talks to the REST proxy of an LND node, authenticated with a node macaroon
//! passed as hex in the `Grpc-Metadata-macaroon` header.

use std::time::Duration;

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE},
};
use bon::Builder;
use http::{HeaderMap, HeaderName, HeaderValue};
use lsat_core::{
    lightning::{InvoiceLookup, LightningBackend},
    types::{Invoice, InvoiceRequest, InvoiceStatus, PaymentHash},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::DEFAULT_REQUEST_TIMEOUT;

pub const MACAROON_HEADER: &str = "grpc-metadata-macaroon";

/// Connection settings for an LND node.
#[derive(Builder, Clone, Serialize, Deserialize)]
pub struct LndConfig {
    /// REST address of the node, e.g. `https://localhost:8080`.
    pub address: Url,
    /// Hex encoded node macaroon with invoice permissions.
    #[builder(into)]
    pub macaroon_hex: String,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    #[serde(
        default = "crate::default_request_timeout",
        with = "lsat_core::config::duration_secs"
    )]
    pub timeout: Duration,
    /// Accept the self-signed certificate most nodes ship with.
    #[builder(default)]
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl std::fmt::Debug for LndConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LndConfig")
            .field("address", &self.address.as_str())
            .field("macaroon_hex", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LndClientError {
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("HTTP request error: {0}")]
    HttpRequestError(#[from] reqwest::Error),
    #[error("Serialization/Deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Invalid node macaroon: {0}")]
    InvalidMacaroon(String),
    #[error("LND returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected LND response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
struct AddInvoiceRequest<'a> {
    /// int64 fields are strings in the REST API.
    value: String,
    memo: &'a str,
}

#[derive(Debug, Deserialize)]
struct AddInvoiceResponse {
    r_hash: String,
    payment_request: String,
}

#[derive(Debug, Deserialize)]
struct LookupInvoiceResponse {
    #[serde(default)]
    state: Option<InvoiceStatus>,
    #[serde(default)]
    settled: bool,
}

/// An LND node reachable over REST.
#[derive(Debug, Clone)]
pub struct LndClient {
    pub address: Url,
    pub client: reqwest::Client,
    pub headers: HeaderMap,
}

impl LndClient {
    pub fn new(config: LndConfig) -> Result<Self, LndClientError> {
        if hex::decode(&config.macaroon_hex).is_err() {
            return Err(LndClientError::InvalidMacaroon(
                "macaroon is not hex encoded".to_string(),
            ));
        }
        let value = HeaderValue::from_str(&config.macaroon_hex)
            .map_err(|err| LndClientError::InvalidMacaroon(err.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(MACAROON_HEADER), value);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(LndClient {
            address: config.address,
            client,
            headers,
        })
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, LndClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LndClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn decode_r_hash(r_hash: &str) -> Result<PaymentHash, LndClientError> {
    let bytes = STANDARD
        .decode(r_hash)
        .or_else(|_| URL_SAFE.decode(r_hash))
        .map_err(|err| LndClientError::InvalidResponse(format!("r_hash: {err}")))?;
    PaymentHash::from_slice(&bytes).ok_or_else(|| {
        LndClientError::InvalidResponse(format!("r_hash has {} bytes", bytes.len()))
    })
}

impl LightningBackend for LndClient {
    type Error = LndClientError;

    async fn issue_invoice(&self, request: InvoiceRequest) -> Result<Invoice, Self::Error> {
        let response = self
            .client
            .post(self.address.join("v1/invoices")?)
            .headers(self.headers.clone())
            .json(&AddInvoiceRequest {
                value: request.amount_sats.to_string(),
                memo: &request.memo,
            })
            .send()
            .await?;

        let added: AddInvoiceResponse = Self::read_json(response).await?;
        let payment_hash = decode_r_hash(&added.r_hash)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "LND invoice added: payment_hash='{payment_hash}', amount_sats={}",
            request.amount_sats
        );

        Ok(Invoice {
            payment_hash,
            payment_request: added.payment_request,
            amount_sats: request.amount_sats,
        })
    }
}

impl InvoiceLookup for LndClient {
    type Error = LndClientError;

    async fn lookup_invoice(&self, payment_hash: &PaymentHash) -> Result<InvoiceStatus, Self::Error> {
        let response = self
            .client
            .get(self.address.join(&format!("v1/invoice/{}", payment_hash.to_hex()))?)
            .headers(self.headers.clone())
            .send()
            .await?;

        let invoice: LookupInvoiceResponse = Self::read_json(response).await?;
        Ok(match invoice.state {
            Some(state) => state,
            None if invoice.settled => InvoiceStatus::Settled,
            None => InvoiceStatus::Open,
        })
    }
}
