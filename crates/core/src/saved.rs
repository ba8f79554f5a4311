//! Saved recipes and restaurants.
//!
//! A saved item's id is derived from its owner and its normalized title, so
//! saving the same recipe twice writes the same record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::UserId;

/// What kind of recommendation was saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedKind {
    Recipe,
    Restaurant,
}

impl SavedKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recipe => "recipe",
            Self::Restaurant => "restaurant",
        }
    }
}

impl fmt::Display for SavedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SavedKind {
    type Err = SavedItemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recipe" => Ok(Self::Recipe),
            "restaurant" => Ok(Self::Restaurant),
            other => Err(SavedItemError::InvalidKind(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SavedItemError {
    #[error("title must contain at least one letter or digit")]
    EmptyTitle,
    #[error("invalid saved item type: {0}")]
    InvalidKind(String),
}

/// Deterministic saved-item id: `{user}_{slug}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedItemId(String);

impl SavedItemId {
    /// Derive the id for `title` saved by `user`.
    ///
    /// ```
    /// use bocado_core::{SavedItemId, UserId};
    ///
    /// let user = UserId::generate();
    /// let a = SavedItemId::derive(user, "Tortilla de Patatas").unwrap();
    /// let b = SavedItemId::derive(user, "  tortilla   de patatas! ").unwrap();
    /// assert_eq!(a, b);
    /// assert!(a.as_str().ends_with("_tortilla-de-patatas"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `SavedItemError::EmptyTitle` if the title has no letters or
    /// digits.
    pub fn derive(user: UserId, title: &str) -> Result<Self, SavedItemError> {
        let slug = slug(title);
        if !slug.chars().any(char::is_alphanumeric) {
            return Err(SavedItemError::EmptyTitle);
        }
        Ok(Self(format!("{user}_{slug}")))
    }

    /// Wrap an id read from storage or a request path.
    #[must_use]
    pub const fn from_raw(raw: String) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SavedItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercased title with whitespace runs turned into `-`, then stripped of
/// everything but alphanumerics and `-`.
fn slug(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect()
}

/// A saved recipe or restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
    pub id: SavedItemId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: SavedKind,
    pub title: String,
    /// Recommendation payload as received from the client.
    pub data: Value,
    pub saved_at: DateTime<Utc>,
}

impl SavedItem {
    /// Build a saved item with its derived id.
    ///
    /// # Errors
    ///
    /// Returns `SavedItemError::EmptyTitle` if the title has no letters or
    /// digits.
    pub fn new(
        user_id: UserId,
        kind: SavedKind,
        title: &str,
        data: Value,
        saved_at: DateTime<Utc>,
    ) -> Result<Self, SavedItemError> {
        Ok(Self {
            id: SavedItemId::derive(user_id, title)?,
            user_id,
            kind,
            title: title.trim().to_owned(),
            data,
            saved_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Ensalada César"), "ensalada-césar");
        assert_eq!(slug("  Pollo   al curry (rápido) "), "pollo-al-curry-rápido");
        assert_eq!(slug("!!! ???"), "-");
        // Punctuation between words is stripped after the dashes are placed
        assert_eq!(slug("a ! b"), "a--b");
        assert_eq!(slug("Tortilla de Patatas!"), "tortilla-de-patatas");
    }

    #[test]
    fn test_same_title_same_id() {
        let user = UserId::generate();
        let first = SavedItem::new(user, SavedKind::Recipe, "Gazpacho", json!({}), Utc::now()).unwrap();
        let second =
            SavedItem::new(user, SavedKind::Recipe, " GAZPACHO ", json!({"v": 2}), Utc::now()).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.title, "GAZPACHO");
    }

    #[test]
    fn test_ids_are_scoped_by_user() {
        let a = SavedItemId::derive(UserId::generate(), "Paella").unwrap();
        let b = SavedItemId::derive(UserId::generate(), "Paella").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_title_rejected() {
        assert_eq!(
            SavedItemId::derive(UserId::generate(), " ... "),
            Err(SavedItemError::EmptyTitle)
        );
        assert_eq!(
            SavedItemId::derive(UserId::generate(), "¡¡ !!"),
            Err(SavedItemError::EmptyTitle)
        );
    }

    #[test]
    fn test_kind_wire_names() {
        assert_eq!("restaurant".parse::<SavedKind>(), Ok(SavedKind::Restaurant));
        assert!("menu".parse::<SavedKind>().is_err());
        let item = SavedItem::new(
            UserId::generate(),
            SavedKind::Restaurant,
            "Casa Lucio",
            json!({"address": "Cava Baja 35"}),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(serde_json::to_value(&item).unwrap()["type"], json!("restaurant"));
    }
}
