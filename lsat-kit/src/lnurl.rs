//! Lightning Address backend.
//!
//! Invoices are requested from an LNURL-pay service (LUD-06) found through a
//! Lightning Address (LUD-16). Nothing is needed on the server side except the
//! address, but settlement cannot be looked up afterwards.

use std::{str::FromStr, time::Duration};

use bon::Builder;
use lightning_invoice::Bolt11Invoice;
use lsat_core::{
    lightning::LightningBackend,
    types::{Invoice, InvoiceRequest, PaymentHash},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::DEFAULT_REQUEST_TIMEOUT;

const PAY_REQUEST_TAG: &str = "payRequest";

#[derive(Builder, Debug, Clone, Serialize, Deserialize)]
pub struct LnurlConfig {
    /// Lightning Address, `name@domain`.
    #[builder(into)]
    pub address: String,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    #[serde(
        default = "crate::default_request_timeout",
        with = "lsat_core::config::duration_secs"
    )]
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum LnurlClientError {
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("HTTP request error: {0}")]
    HttpRequestError(#[from] reqwest::Error),
    #[error("Serialization/Deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Invalid Lightning Address: {0}")]
    InvalidAddress(String),
    #[error("LNURL service error: {0}")]
    Service(String),
    #[error("Unexpected LNURL tag: {0}")]
    UnexpectedTag(String),
    #[error("Amount of {amount_msat} msat is outside [{min_msat}, {max_msat}]")]
    AmountOutOfRange {
        amount_msat: u64,
        min_msat: u64,
        max_msat: u64,
    },
    #[error("Invalid invoice: {0}")]
    InvalidInvoice(String),
    #[error("Invoice is for {actual} msat, requested {expected} msat")]
    AmountMismatch { expected: u64, actual: u64 },
}

#[derive(Debug, Deserialize)]
enum ErrorStatus {
    #[serde(rename = "ERROR")]
    Error,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[allow(dead_code)]
    status: ErrorStatus,
    #[serde(default)]
    reason: String,
}

/// LNURL services answer either with the payload or `{"status":"ERROR"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LnurlResponse<T> {
    Error(ErrorResponse),
    Ok(T),
}

impl<T> LnurlResponse<T> {
    fn into_result(self) -> Result<T, LnurlClientError> {
        match self {
            LnurlResponse::Ok(value) => Ok(value),
            LnurlResponse::Error(err) => Err(LnurlClientError::Service(err.reason)),
        }
    }
}

/// First step of LNURL-pay.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub tag: String,
    pub callback: Url,
    pub min_sendable: u64,
    pub max_sendable: u64,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub comment_allowed: usize,
}

#[derive(Debug, Deserialize)]
struct CallbackResponse {
    pr: String,
}

/// Resolves a Lightning Address into its LUD-16 pay URL.
///
/// ```
/// use lsat_kit::lnurl::pay_url_for_address;
///
/// let url = pay_url_for_address("satoshi@example.com").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/.well-known/lnurlp/satoshi");
/// ```
pub fn pay_url_for_address(address: &str) -> Result<Url, LnurlClientError> {
    let (name, domain) = address
        .trim()
        .split_once('@')
        .ok_or_else(|| LnurlClientError::InvalidAddress(address.to_string()))?;
    if name.is_empty() || domain.is_empty() || domain.contains('/') {
        return Err(LnurlClientError::InvalidAddress(address.to_string()));
    }
    Ok(Url::parse(&format!(
        "https://{domain}/.well-known/lnurlp/{}",
        name.to_lowercase()
    ))?)
}

#[derive(Debug, Clone)]
pub struct LnurlClient {
    pub pay_url: Url,
    pub client: reqwest::Client,
}

impl LnurlClient {
    pub fn new(config: LnurlConfig) -> Result<Self, LnurlClientError> {
        LnurlClient::from_pay_url(pay_url_for_address(&config.address)?, config.timeout)
    }

    /// Use an LNURL-pay endpoint directly instead of a Lightning Address.
    pub fn from_pay_url(pay_url: Url, timeout: Duration) -> Result<Self, LnurlClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(LnurlClient { pay_url, client })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, LnurlClientError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<LnurlResponse<T>>(&body) {
            Ok(parsed) => parsed.into_result(),
            Err(_) if !status.is_success() => Err(LnurlClientError::Service(format!(
                "status {status}: {}",
                String::from_utf8_lossy(&body)
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch and validate the pay request of the service.
    pub async fn pay_request(&self) -> Result<PayRequest, LnurlClientError> {
        let pay_request: PayRequest = self.get_json(self.pay_url.clone()).await?;
        if pay_request.tag != PAY_REQUEST_TAG {
            return Err(LnurlClientError::UnexpectedTag(pay_request.tag));
        }
        Ok(pay_request)
    }
}

fn callback_url(pay_request: &PayRequest, amount_msat: u64, memo: &str) -> Url {
    let mut url = pay_request.callback.clone();
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("amount", &amount_msat.to_string());
        if !memo.is_empty() && memo.chars().count() <= pay_request.comment_allowed {
            query.append_pair("comment", memo);
        }
    }
    url
}

fn payment_hash_of(invoice: &Bolt11Invoice) -> Result<PaymentHash, LnurlClientError> {
    PaymentHash::from_str(&invoice.payment_hash().to_string())
        .map_err(|err| LnurlClientError::InvalidInvoice(err.to_string()))
}

impl LightningBackend for LnurlClient {
    type Error = LnurlClientError;

    async fn issue_invoice(&self, request: InvoiceRequest) -> Result<Invoice, Self::Error> {
        let pay_request = self.pay_request().await?;

        let amount_msat = request.amount_sats.checked_mul(1000).unwrap_or(u64::MAX);
        if amount_msat < pay_request.min_sendable || amount_msat > pay_request.max_sendable {
            return Err(LnurlClientError::AmountOutOfRange {
                amount_msat,
                min_msat: pay_request.min_sendable,
                max_msat: pay_request.max_sendable,
            });
        }

        let callback: CallbackResponse = self
            .get_json(callback_url(&pay_request, amount_msat, &request.memo))
            .await?;

        let invoice = Bolt11Invoice::from_str(&callback.pr)
            .map_err(|err| LnurlClientError::InvalidInvoice(err.to_string()))?;
        if let Some(actual) = invoice.amount_milli_satoshis()
            && actual != amount_msat
        {
            return Err(LnurlClientError::AmountMismatch {
                expected: amount_msat,
                actual,
            });
        }
        let payment_hash = payment_hash_of(&invoice)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "LNURL invoice received: payment_hash='{payment_hash}', amount_msat={amount_msat}"
        );

        Ok(Invoice {
            payment_hash,
            payment_request: callback.pr,
            amount_sats: request.amount_sats,
        })
    }
}
