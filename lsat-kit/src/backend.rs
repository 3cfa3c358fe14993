//! Selecting a Lightning backend from configuration.

use std::{fmt::Display, str::FromStr};

use lsat_core::{
    errors::Error,
    lightning::LightningBackend,
    types::{Invoice, InvoiceRequest},
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "lnd")]
use crate::lnd::{LndClient, LndClientError, LndConfig};
#[cfg(feature = "lnurl")]
use crate::lnurl::{LnurlClient, LnurlClientError, LnurlConfig};

/// Names of the supported backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Lnd,
    Lnurl,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Lnd => "LND",
            BackendKind::Lnurl => "LNURL",
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LND" => Ok(BackendKind::Lnd),
            "LNURL" => Ok(BackendKind::Lnurl),
            _ => Err(Error::UnsupportedBackend(s.to_string())),
        }
    }
}

/// Backend configuration, tagged by `type`.
///
/// ```
/// use lsat_kit::backend::{BackendKind, LightningConfig};
///
/// let config: LightningConfig = serde_json::from_str(
///     r#"{ "type": "LNURL", "address": "satoshi@example.com" }"#,
/// )
/// .unwrap();
/// assert_eq!(config.kind(), BackendKind::Lnurl);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LightningConfig {
    #[cfg(feature = "lnd")]
    #[serde(rename = "LND")]
    Lnd(LndConfig),
    #[cfg(feature = "lnurl")]
    #[serde(rename = "LNURL")]
    Lnurl(LnurlConfig),
}

impl LightningConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            #[cfg(feature = "lnd")]
            LightningConfig::Lnd(_) => BackendKind::Lnd,
            #[cfg(feature = "lnurl")]
            LightningConfig::Lnurl(_) => BackendKind::Lnurl,
        }
    }
}

/// Any backend this crate provides, chosen once at setup.
#[derive(Debug, Clone)]
pub enum AnyBackend {
    #[cfg(feature = "lnd")]
    Lnd(LndClient),
    #[cfg(feature = "lnurl")]
    Lnurl(LnurlClient),
}

#[derive(Debug, thiserror::Error)]
pub enum AnyBackendError {
    #[cfg(feature = "lnd")]
    #[error(transparent)]
    Lnd(#[from] LndClientError),
    #[cfg(feature = "lnurl")]
    #[error(transparent)]
    Lnurl(#[from] LnurlClientError),
}

impl AnyBackend {
    pub fn from_config(config: LightningConfig) -> Result<Self, Error> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Initializing {} Lightning backend", config.kind());

        let backend = match config {
            #[cfg(feature = "lnd")]
            LightningConfig::Lnd(config) => {
                AnyBackend::Lnd(LndClient::new(config).map_err(config_error)?)
            }
            #[cfg(feature = "lnurl")]
            LightningConfig::Lnurl(config) => {
                AnyBackend::Lnurl(LnurlClient::new(config).map_err(config_error)?)
            }
        };
        Ok(backend)
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            #[cfg(feature = "lnd")]
            AnyBackend::Lnd(_) => BackendKind::Lnd,
            #[cfg(feature = "lnurl")]
            AnyBackend::Lnurl(_) => BackendKind::Lnurl,
        }
    }
}

fn config_error(err: impl Display) -> Error {
    Error::Config(format!("Error initializing Lightning backend: {err}"))
}

impl TryFrom<LightningConfig> for AnyBackend {
    type Error = Error;

    fn try_from(config: LightningConfig) -> Result<Self, Self::Error> {
        AnyBackend::from_config(config)
    }
}

impl LightningBackend for AnyBackend {
    type Error = AnyBackendError;

    async fn issue_invoice(&self, request: InvoiceRequest) -> Result<Invoice, Self::Error> {
        match self {
            #[cfg(feature = "lnd")]
            AnyBackend::Lnd(client) => Ok(client.issue_invoice(request).await?),
            #[cfg(feature = "lnurl")]
            AnyBackend::Lnurl(client) => Ok(client.issue_invoice(request).await?),
        }
    }
}
