//! Payment hashes, preimages and token ids.
//!
//! All three are fixed 32 byte values rendered as lowercase hex.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::{Error, Result};

macro_rules! bytes32 {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Build from a slice, which must be exactly 32 bytes long.
            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; 32]>::try_from(bytes).ok().map($name)
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                $name(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(s.trim(), &mut bytes)?;
                Ok($name(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

bytes32!(
    /// The commitment of a Lightning invoice: SHA-256 of its preimage.
    PaymentHash
);

bytes32!(
    /// The secret revealed by paying an invoice.
    Preimage
);

bytes32!(
    /// Random per-issuance token identity.
    TokenId
);

impl Preimage {
    /// SHA-256 of the preimage.
    pub fn payment_hash(&self) -> PaymentHash {
        PaymentHash(Sha256::digest(self.0).into())
    }

    /// Parse the hex form carried in an `Authorization` header.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidPreimageEncoding("empty preimage".into()));
        }
        s.parse()
            .map_err(|err| Error::InvalidPreimageEncoding(format!("{s}: {err}")))
    }
}

impl TokenId {
    pub fn random() -> Self {
        TokenId(rand::random())
    }
}

/// Check that `preimage` hashes to `payment_hash`.
///
/// The comparison runs in constant time.
pub fn verify_preimage(preimage: &[u8], payment_hash: &PaymentHash) -> Result<Preimage> {
    let preimage = Preimage::from_slice(preimage).ok_or_else(|| {
        Error::MalformedPreimage(format!(
            "expected 32 bytes, got {}",
            preimage.len()
        ))
    })?;

    let computed = preimage.payment_hash();
    if bool::from(computed.0[..].ct_eq(&payment_hash.0[..])) {
        Ok(preimage)
    } else {
        Err(Error::PreimageMismatch {
            preimage: preimage.to_hex(),
            payment_hash: payment_hash.to_hex(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_zero_preimage_hash() {
        let preimage = Preimage([0u8; 32]);
        assert_eq!(
            preimage.payment_hash().to_hex(),
            "66687aadf862bd776c8fc18b8e9f8e20089714856ee233b3902a591d0d5f2925"
        );
    }

    #[test]
    fn test_verify_preimage() {
        let preimage = Preimage([7u8; 32]);
        let hash = preimage.payment_hash();

        assert_eq!(verify_preimage(&preimage.0, &hash).unwrap(), preimage);

        let err = verify_preimage(&[8u8; 32], &hash).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreimageMismatch);

        let err = verify_preimage(&[7u8; 31], &hash).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPreimage);
    }

    #[test]
    fn test_preimage_from_hex() {
        let zeros = "00".repeat(32);
        assert_eq!(Preimage::from_hex(&zeros).unwrap(), Preimage([0u8; 32]));

        let too_long = "00".repeat(33);
        for bad in ["", "zz", "abcd", too_long.as_str()] {
            assert_eq!(
                Preimage::from_hex(bad).unwrap_err().kind(),
                ErrorKind::InvalidPreimageEncoding,
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_payment_hash_serde_as_hex() {
        let hash = PaymentHash([0xab; 32]);
        let json = serde_json::to_value(hash).unwrap();
        assert_eq!(json, serde_json::json!("ab".repeat(32)));
        let back: PaymentHash = serde_json::from_value(json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_token_ids_are_random() {
        assert_ne!(TokenId::random(), TokenId::random());
    }
}
