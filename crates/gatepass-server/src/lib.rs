//! # Gatepass Server Library
//!
//! Wiring, logging and startup utilities for the Gatepass server binary.

pub mod di;
pub mod logging;
pub mod startup;
