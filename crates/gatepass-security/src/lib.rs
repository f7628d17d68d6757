//! # Gatepass Security
//!
//! JWT issuance and validation for Gatepass. Request-level authorization is
//! enforced by the caller-side gateway and is not part of this crate.

pub mod jwt;

pub use jwt::*;
