//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `flags` - Feature flag resolution and per-user caching
//! - `pantry` - Session-scoped pantry state with optimistic writes

pub mod auth;
pub mod flags;
pub mod pantry;

pub use auth::{AuthError, AuthService};
pub use flags::{FlagCache, FlagResolver, FlagSource};
pub use pantry::{PantryService, PantrySessions, PantryStore};
