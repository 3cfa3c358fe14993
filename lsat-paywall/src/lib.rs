//! # LSAT Paywall
//!
//! A framework-agnostic HTTP paywall for the LSAT / L402 protocol.
//!
//! This crate provides [`PayWall`](paywall::PayWall), which sits in front of a
//! resource handler and either lets the request through (free or paid), or
//! answers it directly with a `402 Payment Required` challenge or a `500` for a
//! rejected credential.
//!
//! ## Quick Start
//!
//! ```rust
//! use lsat_core::{
//!     config::LsatConfig,
//!     lightning::LightningBackend,
//!     lsat::Lsat,
//!     root_key::ServerSecret,
//!     types::{Caveat, Invoice, InvoiceRequest, PaymentHash},
//! };
//! use lsat_paywall::paywall::{FixedAmount, PayWall};
//!
//! # #[derive(Debug)]
//! # struct Node;
//! # impl LightningBackend for Node {
//! #     type Error = std::io::Error;
//! #     async fn issue_invoice(&self, request: InvoiceRequest) -> Result<Invoice, Self::Error> {
//! #         Ok(Invoice {
//! #             payment_hash: PaymentHash([0; 32]),
//! #             payment_request: "lnbc1".into(),
//! #             amount_sats: request.amount_sats,
//! #         })
//! #     }
//! # }
//! let lsat = Lsat::builder()
//!     .config(
//!         LsatConfig::builder()
//!             .server_secret(ServerSecret::new("a long random secret").unwrap())
//!             .build(),
//!     )
//!     .backend(Node)
//!     .build();
//!
//! let paywall = PayWall::builder()
//!     .lsat(lsat)
//!     .pricing(FixedAmount(10))
//!     .caveats(|ctx: &lsat_core::types::RequestContext| vec![Caveat::path(ctx.path.clone())])
//!     .build();
//! ```
//!
//! ## Modules
//!
//! - [`paywall`]: The [`PayWall`](paywall::PayWall) struct, pricing and caveat functions,
//!   and the [`LsatState`](paywall::LsatState) handed to handlers.
//! - [`errors`]: The responses the paywall sends instead of running the handler.
//!
//! ## Framework Integration
//!
//! With the `axum` feature, `PayWall` is a [`tower::Layer`]:
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/protected", get(protected))
//!     .layer(paywall);
//!
//! async fn protected(Extension(state): Extension<LsatState>) -> &'static str {
//!     if state.is_paid() { "Protected content" } else { "Free content" }
//! }
//! ```
//!
//! Any other framework can call [`PayWall::handle`](paywall::PayWall::handle) or
//! [`PayWall::classify`](paywall::PayWall::classify) directly.

#[cfg(feature = "axum")]
pub mod axum;
pub mod errors;
pub mod paywall;
