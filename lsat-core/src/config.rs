use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{root_key::ServerSecret, transport::AuthScheme};

pub const DEFAULT_MEMO: &str = "LSAT";
pub const DEFAULT_INVOICE_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable LSAT service configuration.
///
/// Built once at startup, either with the builder or deserialized from a
/// config file. Nothing in this crate reads the process environment.
///
/// ```
/// use lsat_core::{config::LsatConfig, root_key::ServerSecret};
///
/// let config = LsatConfig::builder()
///     .server_secret(ServerSecret::new("a long random secret").unwrap())
///     .build();
/// assert_eq!(config.memo, "LSAT");
/// ```
#[derive(Builder, Debug, Clone, Serialize, Deserialize)]
pub struct LsatConfig {
    /// Secret all macaroon root keys are derived from.
    pub server_secret: ServerSecret,
    /// Scheme used when rendering challenges.
    #[builder(default)]
    #[serde(default)]
    pub scheme: AuthScheme,
    /// Memo attached to issued invoices.
    #[builder(into, default = DEFAULT_MEMO.to_string())]
    #[serde(default = "default_memo")]
    pub memo: String,
    /// Optional macaroon location hint.
    #[builder(into)]
    #[serde(default)]
    pub location: Option<String>,
    /// Upper bound for one invoice request to the Lightning backend.
    #[builder(default = DEFAULT_INVOICE_TIMEOUT)]
    #[serde(default = "default_invoice_timeout", with = "duration_secs")]
    pub invoice_timeout: Duration,
}

fn default_memo() -> String {
    DEFAULT_MEMO.to_string()
}

fn default_invoice_timeout() -> Duration {
    DEFAULT_INVOICE_TIMEOUT
}

/// Durations as whole seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
