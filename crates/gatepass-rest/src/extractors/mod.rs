//! Custom Axum extractors.

mod registration;
mod validated;

pub use registration::*;
pub use validated::*;
