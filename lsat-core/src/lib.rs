//! LSAT core library.
//!
//! This library provides the token engine of the LSAT / L402 protocol: macaroons
//! bound to Lightning payment hashes, caveats, and proof of payment.
//!
//! ## Modules
//!
//! - [`types`]: payment hashes, preimages, macaroon identifiers, caveats, invoices.
//! - [`root_key`]: deriving macaroon root keys from a server secret.
//! - [`caveat`]: caveat satisfiers and the registry used during verification.
//! - [`token`]: minting, encoding and verifying macaroons.
//! - [`transport`]: `WWW-Authenticate` / `Authorization` header formats.
//! - [`lightning`]: the interface Lightning backends implement.
//! - [`lsat`]: the issuance and verification orchestrators.
//!
//! ## Example
//!
//! ```
//! use http::Method;
//! use lsat_core::{
//!     caveat::Satisfiers,
//!     root_key::ServerSecret,
//!     token::{mint_macaroon, verify_macaroon},
//!     types::{Caveat, MacaroonIdentifier, Preimage, RequestContext},
//! };
//!
//! let secret = ServerSecret::new("testsecret").unwrap();
//! let preimage = Preimage([0; 32]);
//! let identifier = MacaroonIdentifier::fresh(preimage.payment_hash());
//!
//! let macaroon = mint_macaroon(&secret, &identifier, &[Caveat::path("/protected")], None).unwrap();
//!
//! let context = RequestContext::new(Method::GET, "/protected");
//! let verified = verify_macaroon(
//!     &macaroon,
//!     &[],
//!     &secret,
//!     &preimage,
//!     &Satisfiers::default(),
//!     &context,
//! )
//! .unwrap();
//! assert_eq!(verified, identifier);
//! ```

pub mod caveat;
pub mod config;
pub mod errors;
pub mod lightning;
pub mod lsat;
pub mod root_key;
pub mod token;
pub mod transport;
pub mod types;
