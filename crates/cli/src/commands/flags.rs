//! Feature flag management.
//!
//! # Usage
//!
//! ```bash
//! # Resolved flags for anonymous visitors, plus the Global layer
//! bocado flags show
//!
//! # Resolved flags for one user, plus their User layer
//! bocado flags show --user 5f0c...
//!
//! # Turn a flag on for everyone
//! bocado flags set pantryV2 true
//!
//! # Remove a user's override so the Global layer shows through
//! bocado flags unset --user 5f0c... pantryV2
//! ```
//!
//! Running servers pick up changes once their flag cache expires, or right
//! away for clients that ask for `?refresh=true`.

use bocado_core::flags::resolve_flags;
use bocado_core::{FeatureFlag, FlagOverrides, UserId};
use bocado_server::db::flags::decode_document;
use bocado_server::db::{FlagRepository, FlagScope};

use super::{CommandError, connect};

/// Print each layer and the resolved map for `user`.
///
/// # Errors
///
/// Returns an error if the database cannot be reached.
pub async fn show(user: Option<UserId>) -> Result<(), CommandError> {
    let pool = connect().await?;
    let repo = FlagRepository::new(&pool);

    let global = load(repo, FlagScope::Global).await?;
    let user_layer = match user {
        Some(id) => load(repo, FlagScope::User(id)).await?,
        None => FlagOverrides::new(),
    };

    print_layer(FlagScope::Global, &global);
    if let Some(id) = user {
        print_layer(FlagScope::User(id), &user_layer);
    }

    let flags = resolve_flags(&global, &user_layer);
    tracing::info!("Resolved:");
    for (flag, enabled) in flags.iter() {
        let source = if user_layer.get(flag).is_some() {
            "user"
        } else if global.get(flag).is_some() {
            "global"
        } else {
            "default"
        };
        tracing::info!("  {flag}: {enabled} ({source})");
    }

    Ok(())
}

/// Store an override for `flag` in the layer of `user` (Global if `None`).
///
/// # Errors
///
/// Returns an error if the database cannot be reached.
pub async fn set(user: Option<UserId>, flag: FeatureFlag, value: bool) -> Result<(), CommandError> {
    let pool = connect().await?;
    let scope = FlagScope::from(user);

    let overrides = FlagRepository::new(&pool)
        .set_override(scope, flag, value)
        .await?;

    tracing::info!(%scope, %flag, value, "Override stored");
    print_layer(scope, &overrides);
    Ok(())
}

/// Remove the override for `flag` from the layer of `user` (Global if `None`).
///
/// # Errors
///
/// Returns an error if the database cannot be reached.
pub async fn unset(user: Option<UserId>, flag: FeatureFlag) -> Result<(), CommandError> {
    let pool = connect().await?;
    let scope = FlagScope::from(user);

    let overrides = FlagRepository::new(&pool)
        .unset_override(scope, flag)
        .await?;

    tracing::info!(%scope, %flag, "Override removed");
    print_layer(scope, &overrides);
    Ok(())
}

async fn load(repo: FlagRepository<'_>, scope: FlagScope) -> Result<FlagOverrides, CommandError> {
    Ok(repo
        .get_document(scope)
        .await?
        .map(|document| decode_document(scope, &document))
        .unwrap_or_default())
}

fn print_layer(scope: FlagScope, overrides: &FlagOverrides) {
    if overrides.is_empty() {
        tracing::info!("{scope}: no overrides");
        return;
    }
    tracing::info!("{scope}:");
    for (flag, value) in overrides.iter() {
        tracing::info!("  {flag}: {value}");
    }
}
