//! # Gatepass Core
//!
//! Core types, traits, and error definitions for Gatepass.
//! This crate holds the attendee domain model and the contracts of the
//! external collaborators (token issuance, object storage, time) that the
//! service layer orchestrates.

pub mod clock;
pub mod domain;
pub mod error;
pub mod result;
pub mod traits;
pub mod validation;

pub use clock::*;
pub use domain::*;
pub use error::*;
pub use result::*;
pub use traits::*;
pub use validation::*;

// Re-export shaku for dependency injection
pub use shaku::Interface;
