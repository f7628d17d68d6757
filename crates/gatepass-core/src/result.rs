//! Result type aliases for Gatepass.

use crate::GatepassError;

/// A specialized `Result` type for Gatepass operations.
pub type GatepassResult<T> = Result<T, GatepassError>;
