//! # Gatepass REST
//!
//! REST API layer using Axum.
//! Provides the attendee endpoints under `/api/users`, health checks and the
//! OpenAPI document.

pub mod controllers;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
