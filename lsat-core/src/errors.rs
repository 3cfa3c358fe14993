use std::fmt::Display;

/// Error types for LSAT token operations.
///
/// Every variant carries a human readable detail. None of them is fatal: the
/// caller decides how to turn them into a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The `Authorization` header does not have the `<scheme> <macaroon>:<preimage>` shape.
    #[error("Malformed LSAT header: {0}")]
    MalformedHeader(String),

    /// The macaroon could not be decoded into a macaroon.
    #[error("Invalid macaroon encoding: {0}")]
    InvalidMacaroonEncoding(String),

    /// The preimage is not a hex encoded 32 byte value.
    #[error("Invalid preimage encoding: {0}")]
    InvalidPreimageEncoding(String),

    /// The macaroon identifier has the wrong length or an unsupported version.
    #[error("Malformed macaroon identifier: {0}")]
    MalformedIdentifier(String),

    /// Raw preimage bytes are not 32 bytes long.
    #[error("Malformed preimage: {0}")]
    MalformedPreimage(String),

    /// The macaroon signature chain does not verify under the derived root key.
    #[error("Invalid macaroon signature: {0}")]
    SignatureInvalid(String),

    /// A caveat was not satisfied by the request.
    #[error("Caveats don't match: {caveat}: {reason}")]
    CaveatMismatch { caveat: String, reason: String },

    /// SHA-256 of the preimage is not the payment hash of the macaroon.
    #[error("Invalid Preimage {preimage} for PaymentHash {payment_hash}")]
    PreimageMismatch {
        preimage: String,
        payment_hash: String,
    },

    /// The Lightning backend failed to produce an invoice.
    #[error("Invoice generation failed: {0}")]
    InvoiceGenerationFailed(String),

    /// The macaroon primitive failed to create or serialize a token.
    #[error("Failed to mint macaroon: {0}")]
    MintFailed(String),

    /// The configured Lightning backend type is not known.
    #[error("Unsupported Lightning backend: {0}")]
    UnsupportedBackend(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Flat classification of [`Error`], without the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedHeader,
    InvalidMacaroonEncoding,
    InvalidPreimageEncoding,
    MalformedIdentifier,
    MalformedPreimage,
    SignatureInvalid,
    CaveatMismatch,
    PreimageMismatch,
    InvoiceGenerationFailed,
    MintFailed,
    UnsupportedBackend,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedHeader(_) => ErrorKind::MalformedHeader,
            Error::InvalidMacaroonEncoding(_) => ErrorKind::InvalidMacaroonEncoding,
            Error::InvalidPreimageEncoding(_) => ErrorKind::InvalidPreimageEncoding,
            Error::MalformedIdentifier(_) => ErrorKind::MalformedIdentifier,
            Error::MalformedPreimage(_) => ErrorKind::MalformedPreimage,
            Error::SignatureInvalid(_) => ErrorKind::SignatureInvalid,
            Error::CaveatMismatch { .. } => ErrorKind::CaveatMismatch,
            Error::PreimageMismatch { .. } => ErrorKind::PreimageMismatch,
            Error::InvoiceGenerationFailed(_) => ErrorKind::InvoiceGenerationFailed,
            Error::MintFailed(_) => ErrorKind::MintFailed,
            Error::UnsupportedBackend(_) => ErrorKind::UnsupportedBackend,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub fn caveat_mismatch(caveat: impl Display, reason: impl Display) -> Self {
        Error::CaveatMismatch {
            caveat: caveat.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Wrap any backend failure, keeping its message as the cause.
    pub fn invoice_generation(cause: impl Display) -> Self {
        Error::InvoiceGenerationFailed(cause.to_string())
    }
}

/// A specialized `Result` type for LSAT core operations.
pub type Result<T> = std::result::Result<T, Error>;
