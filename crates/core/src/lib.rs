//! Bocado Core - Domain types and logic.
//!
//! This crate provides the typed domain shared by all Bocado components:
//! - `server` - JSON API consumed by the mobile web client
//! - `cli` - Migrations and feature-flag administration
//!
//! # Architecture
//!
//! The core crate contains only types, pure functions and traits - no I/O,
//! no database access, no HTTP clients. Stored documents enter the domain
//! through the validating decoders here, so everything downstream works with
//! canonical shapes.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs and emails
//! - [`layers`] - Merge sparse override layers against a total default map
//! - [`flags`] - Feature flag layers and precedence resolution
//! - [`pantry`] - Kitchen inventory grouped by zone with freshness badges
//! - [`profile`] - Profile sanitizer and registration form splitting
//! - [`saved`] - Saved recipes and restaurants with deterministic IDs
//! - [`recommendation`] - Payloads of the recommendation endpoint

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod flags;
pub mod layers;
pub mod pantry;
pub mod profile;
pub mod recommendation;
pub mod saved;
pub mod types;

pub use flags::{FeatureFlag, FeatureFlags, FlagOverrides, UnknownFlag};
pub use pantry::{
    CategoryFilter, Freshness, KitchenItem, KitchenItemPatch, NewKitchenItem, Pantry,
    PantryChange, PantryError, Zone, ZoneSummary,
};
pub use profile::{
    AuthFields, DEFAULT_LANGUAGE, RegistrationForm, SeparatedUserData, UserProfile,
    sanitize_profile_data, separate_user_data,
};
pub use recommendation::{RecommendationRequest, RecommendationResponse, RecommendationType};
pub use saved::{SavedItem, SavedItemError, SavedItemId, SavedKind};
pub use types::*;
