//! Canonical user profile and the sanitizer that produces it.
//!
//! Stored profile documents are loosely shaped: fields go missing, numbers
//! arrive as strings or as numbers, lists arrive empty. Everything passes
//! through [`sanitize_profile_data`] on its way in, which never fails and
//! always yields a fully populated [`UserProfile`]:
//!
//! - numeric-like fields (`age`, `weight`, `height`) are strings, `""` when
//!   the input is not a finite number;
//! - list fields are never empty: a missing or empty list becomes the
//!   field's sentinel (`["Ninguna"]`, `["Ninguno"]`, `["Sin especificar"]`),
//!   which the client renders verbatim;
//! - text fields fall back to their default (`gender` to `"Hombre"`).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::layers;

/// Language stored with a profile when none (or an unsupported one) is given.
pub const DEFAULT_LANGUAGE: &str = "es";

/// Languages the client ships translations for.
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["es", "en"];

/// Normalized registration and health data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub age: String,
    pub weight: String,
    pub height: String,
    pub country: String,
    pub city: String,
    pub activity_level: String,
    pub activity_frequency: String,
    pub eating_habit: String,
    pub cooking_affinity: String,
    pub nutritional_goal: Vec<String>,
    pub allergies: Vec<String>,
    pub other_allergies: String,
    pub diseases: Vec<String>,
    pub other_diseases: String,
    pub disliked_foods: Vec<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            gender: "Hombre".to_owned(),
            age: String::new(),
            weight: String::new(),
            height: String::new(),
            country: String::new(),
            city: String::new(),
            activity_level: String::new(),
            activity_frequency: String::new(),
            eating_habit: String::new(),
            cooking_affinity: String::new(),
            nutritional_goal: vec!["Sin especificar".to_owned()],
            allergies: vec!["Ninguna".to_owned()],
            other_allergies: String::new(),
            diseases: vec!["Ninguna".to_owned()],
            other_diseases: String::new(),
            disliked_foods: vec!["Ninguno".to_owned()],
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text,
    Numeric,
    List,
}

/// Wire name and kind of every profile field.
const FIELDS: [(&str, FieldKind); 18] = [
    ("firstName", FieldKind::Text),
    ("lastName", FieldKind::Text),
    ("gender", FieldKind::Text),
    ("age", FieldKind::Numeric),
    ("weight", FieldKind::Numeric),
    ("height", FieldKind::Numeric),
    ("country", FieldKind::Text),
    ("city", FieldKind::Text),
    ("activityLevel", FieldKind::Text),
    ("activityFrequency", FieldKind::Text),
    ("eatingHabit", FieldKind::Text),
    ("cookingAffinity", FieldKind::Text),
    ("nutritionalGoal", FieldKind::List),
    ("allergies", FieldKind::List),
    ("otherAllergies", FieldKind::Text),
    ("diseases", FieldKind::List),
    ("otherDiseases", FieldKind::Text),
    ("dislikedFoods", FieldKind::List),
];

/// Per-field default table, derived from [`UserProfile::default`].
static DEFAULTS: LazyLock<BTreeMap<&'static str, Value>> = LazyLock::new(|| {
    let defaults = match serde_json::to_value(UserProfile::default()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    FIELDS
        .iter()
        .map(|(key, _)| (*key, defaults.get(*key).cloned().unwrap_or(Value::Null)))
        .collect()
});

impl FieldKind {
    /// Canonical value for `raw`, or `None` when the default should apply.
    fn normalize(self, raw: &Value) -> Option<Value> {
        match self {
            Self::Text => text(raw).map(Value::String),
            Self::Numeric => numeric(raw).map(Value::String),
            Self::List => list(raw),
        }
    }
}

fn render_number(number: &serde_json::Number) -> Option<String> {
    if number.is_i64() || number.is_u64() {
        return Some(number.to_string());
    }
    number
        .as_f64()
        .filter(|value| value.is_finite())
        .map(|value| value.to_string())
}

fn text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => render_number(n),
        _ => None,
    }
}

fn numeric(raw: &Value) -> Option<String> {
    match raw {
        Value::Number(n) => render_number(n),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(|_| trimmed.to_owned())
        }
        _ => None,
    }
}

fn list(raw: &Value) -> Option<Value> {
    let entries: Vec<Value> = raw
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| Value::String(entry.to_owned()))
        .collect();

    (!entries.is_empty()).then_some(Value::Array(entries))
}

/// Normalize an arbitrary stored record into the canonical profile.
///
/// `None`, `null` and non-object inputs yield [`UserProfile::default`].
/// Unknown keys are ignored.
#[must_use]
pub fn sanitize_profile_data(raw: Option<&Value>) -> UserProfile {
    let Some(Value::Object(record)) = raw else {
        return UserProfile::default();
    };

    let present: BTreeMap<&'static str, Value> = FIELDS
        .iter()
        .filter_map(|(key, kind)| {
            let value = kind.normalize(record.get(*key)?)?;
            Some((*key, value))
        })
        .collect();

    let merged: Map<String, Value> = layers::merge_layers(&*DEFAULTS, &[&present])
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect();

    serde_json::from_value(Value::Object(merged)).unwrap_or_default()
}

/// Normalize a language code, falling back to [`DEFAULT_LANGUAGE`].
#[must_use]
pub fn normalize_language(raw: Option<&str>) -> String {
    raw.map(|code| code.trim().to_lowercase())
        .filter(|code| SUPPORTED_LANGUAGES.contains(&code.as_str()))
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_owned())
}

/// The combined registration submission: account fields plus the profile
/// wizard's answers.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Every other submitted field.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl RegistrationForm {
    /// Whether the confirmation matches the password.
    #[must_use]
    pub fn passwords_match(&self) -> bool {
        self.password == self.confirm_password
    }
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("confirm_password", &"[REDACTED]")
            .field("language", &self.language)
            .field("rest", &self.rest)
            .finish()
    }
}

/// Account fields of a registration.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthFields {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AuthFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthFields")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A registration split into account fields and profile document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatedUserData {
    pub auth: AuthFields,
    pub profile: UserProfile,
    pub language: String,
}

/// Split a registration into account fields and the sanitized profile.
///
/// The confirmation password is dropped; neither password field can reach
/// the profile.
#[must_use]
pub fn separate_user_data(form: RegistrationForm) -> SeparatedUserData {
    let RegistrationForm {
        name,
        email,
        password,
        confirm_password: _,
        language,
        rest,
    } = form;

    SeparatedUserData {
        auth: AuthFields {
            name: name.trim().to_owned(),
            email,
            password,
        },
        profile: sanitize_profile_data(Some(&Value::Object(rest))),
        language: normalize_language(language.as_deref()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sanitize(value: &Value) -> UserProfile {
        sanitize_profile_data(Some(value))
    }

    #[test]
    fn test_none_yields_defaults() {
        let profile = sanitize_profile_data(None);
        assert_eq!(profile.allergies, ["Ninguna"]);
        assert_eq!(profile.diseases, ["Ninguna"]);
        assert_eq!(profile.gender, "Hombre");
        assert_eq!(profile.disliked_foods, ["Ninguno"]);
        assert_eq!(profile.nutritional_goal, ["Sin especificar"]);
        assert_eq!(profile.weight, "");
    }

    #[test]
    fn test_null_and_non_objects_yield_defaults() {
        assert_eq!(sanitize(&Value::Null), UserProfile::default());
        assert_eq!(sanitize(&json!("profile")), UserProfile::default());
        assert_eq!(sanitize(&json!([1, 2])), UserProfile::default());
    }

    #[test]
    fn test_numeric_fields() {
        assert_eq!(sanitize(&json!({"weight": 70.5})).weight, "70.5");
        assert_eq!(sanitize(&json!({"weight": 70})).weight, "70");
        assert_eq!(sanitize(&json!({"weight": "abc"})).weight, "");
        assert_eq!(sanitize(&json!({"weight": " 68.2 "})).weight, "68.2");
        assert_eq!(sanitize(&json!({"height": "NaN"})).height, "");
        assert_eq!(sanitize(&json!({"height": null})).height, "");
        assert_eq!(sanitize(&json!({"age": true})).age, "");
        assert_eq!(sanitize(&json!({"age": "31"})).age, "31");
    }

    #[test]
    fn test_empty_lists_become_sentinels() {
        let profile = sanitize(&json!({
            "allergies": [],
            "diseases": [""],
            "dislikedFoods": null,
            "nutritionalGoal": "Perder peso"
        }));
        assert_eq!(profile.allergies, ["Ninguna"]);
        assert_eq!(profile.diseases, ["Ninguna"]);
        assert_eq!(profile.disliked_foods, ["Ninguno"]);
        assert_eq!(profile.nutritional_goal, ["Sin especificar"]);
    }

    #[test]
    fn test_lists_keep_string_entries() {
        let profile = sanitize(&json!({"allergies": ["Gluten", 4, " Lactosa "]}));
        assert_eq!(profile.allergies, ["Gluten", "Lactosa"]);
    }

    #[test]
    fn test_text_fields() {
        let profile = sanitize(&json!({
            "firstName": "  Marta ",
            "gender": "",
            "city": 28001,
            "country": {"name": "España"}
        }));
        assert_eq!(profile.first_name, "Marta");
        assert_eq!(profile.gender, "Hombre");
        assert_eq!(profile.city, "28001");
        assert_eq!(profile.country, "");
    }

    #[test]
    fn test_sanitized_profile_is_stable() {
        let raw = json!({"weight": 80, "allergies": ["Frutos secos"], "gender": "Mujer"});
        let once = sanitize(&raw);
        let twice = sanitize(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);
    }

    fn form(value: Value) -> RegistrationForm {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_separate_user_data_is_disjoint() {
        let separated = separate_user_data(form(json!({
            "name": "Marta Ruiz",
            "email": "marta@example.com",
            "password": "s3creta!",
            "confirmPassword": "s3creta!",
            "language": "en",
            "gender": "Mujer",
            "weight": 61,
            "allergies": ["Gluten"]
        })));

        assert_eq!(separated.auth.name, "Marta Ruiz");
        assert_eq!(separated.auth.email, "marta@example.com");
        assert_eq!(separated.auth.password, "s3creta!");
        assert_eq!(separated.language, "en");
        assert_eq!(separated.profile.gender, "Mujer");
        assert_eq!(separated.profile.weight, "61");

        let profile = serde_json::to_value(&separated.profile).unwrap();
        let profile = profile.as_object().unwrap();
        for key in ["name", "email", "password", "confirmPassword"] {
            assert!(!profile.contains_key(key), "{key} leaked into profile");
        }
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let form = form(json!({"email": "a@b.co", "password": "hunter22", "confirmPassword": "hunter22"}));
        assert!(!format!("{form:?}").contains("hunter22"));
        assert!(form.passwords_match());

        let separated = separate_user_data(form);
        assert!(!format!("{separated:?}").contains("hunter22"));
    }

    #[test]
    fn test_language_normalization() {
        assert_eq!(normalize_language(None), "es");
        assert_eq!(normalize_language(Some(" EN ")), "en");
        assert_eq!(normalize_language(Some("fr")), "es");
    }
}
