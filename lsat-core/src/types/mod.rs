//! Core types used across the LSAT kit.

mod caveat;
mod identifier;
mod invoice;
mod payment;

pub use caveat::*;
pub use identifier::*;
pub use invoice::*;
pub use payment::*;
