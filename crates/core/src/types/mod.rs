//! Identifier and value types shared by every Bocado crate.

pub mod email;
pub mod id;

pub use email::{Email, EmailError};
pub use id::*;
