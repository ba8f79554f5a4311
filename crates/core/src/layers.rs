//! Sparse override layers merged against a total default map.
//!
//! Feature flags (User over Global over Default) and the profile sanitizer
//! (stored values over the per-field default table) both resolve values
//! this way. The default map fixes the key set: a layer can only change
//! the value of a key the defaults already define.

use std::collections::BTreeMap;

/// Resolve one key against `layers`, ordered from highest precedence to
/// lowest, falling back to `default`.
pub fn lookup<'a, K: Ord, V>(key: &K, default: &'a V, layers: &[&'a BTreeMap<K, V>]) -> &'a V {
    layers
        .iter()
        .find_map(|layer| layer.get(key))
        .unwrap_or(default)
}

/// Resolve every key of `defaults` against `layers`.
///
/// `layers` is ordered from highest precedence to lowest. Keys present in a
/// layer but missing from `defaults` are ignored.
#[must_use]
pub fn merge_layers<K, V>(defaults: &BTreeMap<K, V>, layers: &[&BTreeMap<K, V>]) -> BTreeMap<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    defaults
        .iter()
        .map(|(key, default)| (key.clone(), lookup(key, default, layers).clone()))
        .collect()
}
