//! # Gatepass Storage
//!
//! S3-compatible implementation of [`gatepass_core::ObjectStorage`] used for
//! attendee profile images.

mod s3;

pub use s3::*;
