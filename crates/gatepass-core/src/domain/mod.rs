//! Attendee domain model.

pub mod user;
pub mod value_objects;

pub use user::*;
pub use value_objects::*;
