//! Feature flags and their three-layer precedence.
//!
//! Every flag has a compiled-in default, so a resolved [`FeatureFlags`] map
//! is always total. Two sparse layers can override the defaults: the Global
//! layer (admin-controlled) and the User layer (per account). Precedence is
//! fixed: **User > Global > Default**.
//!
//! ```
//! use bocado_core::flags::{FeatureFlag, FlagOverrides, is_feature_enabled, resolve_flags};
//!
//! let mut global = FlagOverrides::new();
//! global.set(FeatureFlag::PantryV2, true);
//! let mut user = FlagOverrides::new();
//! user.set(FeatureFlag::PantryV2, false);
//!
//! let flags = resolve_flags(&global, &user);
//! assert!(!flags.get(FeatureFlag::PantryV2));
//! assert!(!is_feature_enabled(FeatureFlag::PantryV2, &global, &user));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::layers;

/// Key holding the flag map inside a stored flag document.
pub const FLAGS_DOCUMENT_KEY: &str = "flags";

/// The fixed set of feature flags known to this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureFlag {
    #[serde(rename = "newRecommendationUI")]
    NewRecommendationUi,
    PantryV2,
    EnableAnalytics,
    SavedRestaurants,
    MealPlanner,
    DebugMode,
}

impl FeatureFlag {
    /// Every flag, in wire-name order of declaration.
    pub const ALL: [Self; 6] = [
        Self::NewRecommendationUi,
        Self::PantryV2,
        Self::EnableAnalytics,
        Self::SavedRestaurants,
        Self::MealPlanner,
        Self::DebugMode,
    ];

    /// Name used in stored documents and JSON responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewRecommendationUi => "newRecommendationUI",
            Self::PantryV2 => "pantryV2",
            Self::EnableAnalytics => "enableAnalytics",
            Self::SavedRestaurants => "savedRestaurants",
            Self::MealPlanner => "mealPlanner",
            Self::DebugMode => "debugMode",
        }
    }

    /// Compiled-in value used when no layer overrides the flag.
    #[must_use]
    pub const fn default_value(self) -> bool {
        match self {
            Self::EnableAnalytics | Self::SavedRestaurants => true,
            Self::NewRecommendationUi | Self::PantryV2 | Self::MealPlanner | Self::DebugMode => {
                false
            }
        }
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flag name that is not part of this build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feature flag: {0}")]
pub struct UnknownFlag(pub String);

impl FromStr for FeatureFlag {
    type Err = UnknownFlag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| UnknownFlag(s.to_owned()))
    }
}

/// A sparse override layer (Global or User).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlagOverrides(BTreeMap<FeatureFlag, bool>);

/// An entry of a stored flag document that could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkippedEntry {
    /// The key does not name a known flag.
    UnknownFlag(String),
    /// The value stored for a known flag is not a boolean.
    NotBoolean(FeatureFlag),
}

impl fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFlag(name) => write!(f, "unknown flag '{name}'"),
            Self::NotBoolean(flag) => write!(f, "non-boolean value for '{flag}'"),
        }
    }
}

/// A stored flag document whose overall shape is wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlagDocumentError {
    #[error("flag document is not an object")]
    NotAnObject,
    #[error("flag document has no 'flags' object")]
    MissingFlags,
}

/// Result of decoding a stored flag document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedOverrides {
    /// The usable overrides.
    pub overrides: FlagOverrides,
    /// Entries that were present but ignored.
    pub skipped: Vec<SkippedEntry>,
}

impl FlagOverrides {
    /// An empty layer (overrides nothing).
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Override `flag` with `value`.
    pub fn set(&mut self, flag: FeatureFlag, value: bool) {
        self.0.insert(flag, value);
    }

    /// Remove the override for `flag`, returning the previous value.
    pub fn unset(&mut self, flag: FeatureFlag) -> Option<bool> {
        self.0.remove(&flag)
    }

    /// The override for `flag`, if this layer defines one.
    #[must_use]
    pub fn get(&self, flag: FeatureFlag) -> Option<bool> {
        self.0.get(&flag).copied()
    }

    /// Whether this layer overrides nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the defined overrides.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureFlag, bool)> + '_ {
        self.0.iter().map(|(flag, value)| (*flag, *value))
    }

    /// Decode a stored document of the shape `{"flags": {name: bool, ...}}`.
    ///
    /// Unknown names and non-boolean values are skipped and reported in
    /// [`DecodedOverrides::skipped`] rather than failing the whole layer.
    ///
    /// # Errors
    ///
    /// Returns [`FlagDocumentError`] if the document is not an object or has
    /// no `flags` object.
    pub fn from_document(document: &Value) -> Result<DecodedOverrides, FlagDocumentError> {
        let object = document.as_object().ok_or(FlagDocumentError::NotAnObject)?;
        let flags = object
            .get(FLAGS_DOCUMENT_KEY)
            .and_then(Value::as_object)
            .ok_or(FlagDocumentError::MissingFlags)?;

        let mut decoded = DecodedOverrides::default();
        for (name, value) in flags {
            match (name.parse::<FeatureFlag>(), value.as_bool()) {
                (Ok(flag), Some(value)) => decoded.overrides.set(flag, value),
                (Ok(flag), None) => decoded.skipped.push(SkippedEntry::NotBoolean(flag)),
                (Err(UnknownFlag(name)), _) => decoded.skipped.push(SkippedEntry::UnknownFlag(name)),
            }
        }
        Ok(decoded)
    }

    /// Encode this layer as a stored document.
    #[must_use]
    pub fn to_document(&self) -> Value {
        let flags: Map<String, Value> = self
            .iter()
            .map(|(flag, value)| (flag.as_str().to_owned(), Value::Bool(value)))
            .collect();

        let mut document = Map::new();
        document.insert(FLAGS_DOCUMENT_KEY.to_owned(), Value::Object(flags));
        Value::Object(document)
    }
}

impl FromIterator<(FeatureFlag, bool)> for FlagOverrides {
    fn from_iter<I: IntoIterator<Item = (FeatureFlag, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A fully resolved flag map: every known flag has a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureFlags(BTreeMap<FeatureFlag, bool>);

impl FeatureFlags {
    /// The Default layer on its own.
    #[must_use]
    pub fn defaults() -> Self {
        Self(default_table())
    }

    /// Effective value of `flag`.
    #[must_use]
    pub fn get(&self, flag: FeatureFlag) -> bool {
        self.0
            .get(&flag)
            .copied()
            .unwrap_or_else(|| flag.default_value())
    }

    /// Iterate all flags with their effective values.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureFlag, bool)> + '_ {
        self.0.iter().map(|(flag, value)| (*flag, *value))
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::defaults()
    }
}

fn default_table() -> BTreeMap<FeatureFlag, bool> {
    FeatureFlag::ALL
        .into_iter()
        .map(|flag| (flag, flag.default_value()))
        .collect()
}

/// Merge the Global and User layers over the defaults.
#[must_use]
pub fn resolve_flags(global: &FlagOverrides, user: &FlagOverrides) -> FeatureFlags {
    FeatureFlags(layers::merge_layers(&default_table(), &[&user.0, &global.0]))
}

/// Effective value of a single flag given already-loaded layers.
#[must_use]
pub fn is_feature_enabled(flag: FeatureFlag, global: &FlagOverrides, user: &FlagOverrides) -> bool {
    let default = flag.default_value();
    *layers::lookup(&flag, &default, &[&user.0, &global.0])
}

/// Whether any flag differs between two resolved maps.
#[must_use]
pub fn have_flags_changed(previous: &FeatureFlags, current: &FeatureFlags) -> bool {
    FeatureFlag::ALL
        .into_iter()
        .any(|flag| previous.get(flag) != current.get(flag))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_no_overrides_resolves_to_defaults() {
        let flags = resolve_flags(&FlagOverrides::new(), &FlagOverrides::new());
        for flag in FeatureFlag::ALL {
            assert_eq!(flags.get(flag), flag.default_value(), "{flag}");
        }
        assert_eq!(flags, FeatureFlags::defaults());
    }

    #[test]
    fn test_user_beats_global_and_default() {
        for flag in FeatureFlag::ALL {
            let value = !flag.default_value();
            let global: FlagOverrides = [(flag, !value)].into_iter().collect();
            let user: FlagOverrides = [(flag, value)].into_iter().collect();

            assert_eq!(resolve_flags(&global, &user).get(flag), value, "{flag}");
            assert_eq!(is_feature_enabled(flag, &global, &user), value, "{flag}");
        }
    }

    #[test]
    fn test_global_applies_when_user_is_silent() {
        for flag in FeatureFlag::ALL {
            let value = !flag.default_value();
            let global: FlagOverrides = [(flag, value)].into_iter().collect();

            assert_eq!(resolve_flags(&global, &FlagOverrides::new()).get(flag), value);
            assert_eq!(is_feature_enabled(flag, &global, &FlagOverrides::new()), value);
        }
    }

    #[test]
    fn test_layers_only_touch_their_flags() {
        let global: FlagOverrides = [(FeatureFlag::MealPlanner, true)].into_iter().collect();
        let user: FlagOverrides = [(FeatureFlag::EnableAnalytics, false)].into_iter().collect();

        let flags = resolve_flags(&global, &user);
        assert!(flags.get(FeatureFlag::MealPlanner));
        assert!(!flags.get(FeatureFlag::EnableAnalytics));
        assert!(flags.get(FeatureFlag::SavedRestaurants));
        assert!(!flags.get(FeatureFlag::PantryV2));
    }

    #[test]
    fn test_have_flags_changed() {
        let a = FeatureFlags::defaults();
        let b = FeatureFlags::defaults();
        assert!(!have_flags_changed(&a, &b));

        for flag in FeatureFlag::ALL {
            let user: FlagOverrides = [(flag, !flag.default_value())].into_iter().collect();
            let changed = resolve_flags(&FlagOverrides::new(), &user);
            assert!(have_flags_changed(&a, &changed), "{flag}");
        }
    }

    #[test]
    fn test_parse_flag_names() {
        assert_eq!(
            "newRecommendationUI".parse::<FeatureFlag>(),
            Ok(FeatureFlag::NewRecommendationUi)
        );
        assert_eq!(
            "darkMode".parse::<FeatureFlag>(),
            Err(UnknownFlag("darkMode".to_owned()))
        );
        for flag in FeatureFlag::ALL {
            assert_eq!(flag.as_str().parse::<FeatureFlag>(), Ok(flag));
        }
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for flag in FeatureFlag::ALL {
            assert_eq!(serde_json::to_value(flag).unwrap(), json!(flag.as_str()));
        }
    }

    #[test]
    fn test_from_document_skips_bad_entries() {
        let document = json!({
            "flags": {
                "pantryV2": true,
                "debugMode": "yes",
                "legacyHome": false
            }
        });

        let decoded = FlagOverrides::from_document(&document).unwrap();
        assert_eq!(decoded.overrides.get(FeatureFlag::PantryV2), Some(true));
        assert_eq!(decoded.overrides.get(FeatureFlag::DebugMode), None);
        assert_eq!(
            decoded.skipped,
            vec![
                SkippedEntry::NotBoolean(FeatureFlag::DebugMode),
                SkippedEntry::UnknownFlag("legacyHome".to_owned()),
            ]
        );
    }

    #[test]
    fn test_from_document_shape_errors() {
        assert_eq!(
            FlagOverrides::from_document(&json!([true])),
            Err(FlagDocumentError::NotAnObject)
        );
        assert_eq!(
            FlagOverrides::from_document(&json!({"pantryV2": true})),
            Err(FlagDocumentError::MissingFlags)
        );
    }

    #[test]
    fn test_document_encoding() {
        let mut layer = FlagOverrides::new();
        layer.set(FeatureFlag::MealPlanner, true);
        assert_eq!(layer.to_document(), json!({"flags": {"mealPlanner": true}}));

        assert_eq!(layer.unset(FeatureFlag::MealPlanner), Some(true));
        assert!(layer.is_empty());
    }

    #[test]
    fn test_resolved_flags_serialize_by_name() {
        let value = serde_json::to_value(FeatureFlags::defaults()).unwrap();
        assert_eq!(value["enableAnalytics"], json!(true));
        assert_eq!(value["newRecommendationUI"], json!(false));
        assert_eq!(value.as_object().unwrap().len(), FeatureFlag::ALL.len());
    }
}
