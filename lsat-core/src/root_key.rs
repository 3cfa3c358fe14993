//! Root key derivation.
//!
//! Macaroon root keys are never stored. They are recomputed from the server
//! secret and the payment hash found in the macaroon identifier.

use hmac::{Hmac, Mac, digest::KeyInit};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    errors::{Error, Result},
    types::PaymentHash,
};

type HmacSha256 = Hmac<Sha256>;

/// The server-side secret all root keys are derived from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerSecret(Vec<u8>);

impl ServerSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(Error::Config("server secret must not be empty".into()));
        }
        Ok(ServerSecret(secret))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for ServerSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ServerSecret(<redacted>)")
    }
}

impl TryFrom<String> for ServerSecret {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ServerSecret::new(value)
    }
}

impl From<ServerSecret> for String {
    fn from(secret: ServerSecret) -> Self {
        String::from_utf8_lossy(&secret.0).into_owned()
    }
}

/// A macaroon signing key bound to one payment hash.
#[derive(Clone, PartialEq, Eq)]
pub struct RootKey([u8; 32]);

impl RootKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for RootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RootKey(<redacted>)")
    }
}

/// HMAC-SHA256 over the payment hash, keyed with the server secret.
pub fn derive_root_key(secret: &ServerSecret, payment_hash: &PaymentHash) -> Result<RootKey> {
    let mut mac = <HmacSha256 as KeyInit>::new_from_slice(secret.as_bytes())
        .map_err(|err| Error::Config(format!("server secret rejected by HMAC: {err}")))?;
    mac.update(payment_hash.as_bytes());
    Ok(RootKey(mac.finalize().into_bytes().into()))
}
