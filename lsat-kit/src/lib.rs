//! # LSAT Kit
//!
//! Lightning backends for [`lsat-core`](lsat_core). Each backend implements
//! [`LightningBackend`](lsat_core::lightning::LightningBackend) and is enabled
//! by its own cargo feature:
//!
//! - **`lnd`**: [`lnd::LndClient`], the REST API of an LND node.
//! - **`lnurl`**: [`lnurl::LnurlClient`], any Lightning Address (LNURL-pay).
//!
//! With [`backend::LightningConfig`] the backend can be picked from a config
//! file at startup:
//!
//! ```no_run
//! use lsat_kit::backend::{AnyBackend, LightningConfig};
//!
//! let config: LightningConfig = serde_json::from_str(r#"{
//!     "type": "LND",
//!     "address": "https://localhost:8080",
//!     "macaroon_hex": "0201036c6e64",
//!     "accept_invalid_certs": true
//! }"#).unwrap();
//!
//! let backend = AnyBackend::from_config(config).unwrap();
//! ```

use std::time::Duration;

#[cfg(any(feature = "lnd", feature = "lnurl"))]
pub mod backend;
#[cfg(feature = "lnd")]
pub mod lnd;
#[cfg(feature = "lnurl")]
pub mod lnurl;

/// Default upper bound for one HTTP request to a backend.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[cfg(any(feature = "lnd", feature = "lnurl"))]
fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}
