//! Kitchen inventory grouped by zone and category.
//!
//! A [`Pantry`] holds one user's items in insertion order. Navigation is two
//! levels deep: the zone list (each zone with an urgency badge counting items
//! that are `soon` or `expired`) and the item grid of one zone filtered by
//! the active category.
//!
//! Every mutation returns a [`PantryChange`] that [`Pantry::revert`] can undo,
//! so callers can apply a change locally before it is persisted and roll it
//! back if persisting fails.
//!
//! Freshness is stored metadata set by the user or an external classifier;
//! nothing here derives it from dates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::KitchenItemId;

/// Category assigned when an item is created without one.
pub const DEFAULT_CATEGORY: &str = "Otros";

/// Storage zone of a kitchen item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Despensa,
    Nevera,
    Congelador,
}

impl Zone {
    /// All zones in display order.
    pub const ALL: [Self; 3] = [Self::Despensa, Self::Nevera, Self::Congelador];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Despensa => "Despensa",
            Self::Nevera => "Nevera",
            Self::Congelador => "Congelador",
        }
    }

    /// Glyph used for items created without an emoji.
    #[must_use]
    pub const fn default_emoji(self) -> &'static str {
        match self {
            Self::Despensa => "🥫",
            Self::Nevera => "🥛",
            Self::Congelador => "🧊",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = PantryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|zone| zone.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PantryError::InvalidZone(s.to_owned()))
    }
}

/// How much usable life an item has left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    #[default]
    Fresh,
    Soon,
    Expired,
}

impl Freshness {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Soon => "soon",
            Self::Expired => "expired",
        }
    }

    /// Whether the item counts towards its zone's urgency badge.
    #[must_use]
    pub const fn is_urgent(self) -> bool {
        matches!(self, Self::Soon | Self::Expired)
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Freshness {
    type Err = PantryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fresh" => Ok(Self::Fresh),
            "soon" => Ok(Self::Soon),
            "expired" => Ok(Self::Expired),
            other => Err(PantryError::InvalidFreshness(other.to_owned())),
        }
    }
}

/// Errors raised by pantry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PantryError {
    #[error("kitchen item {0} not found")]
    NotFound(KitchenItemId),
    #[error("kitchen item {0} already exists")]
    DuplicateId(KitchenItemId),
    #[error("item name cannot be empty")]
    EmptyName,
    #[error("update has no fields to change")]
    EmptyPatch,
    #[error("invalid zone: {0}")]
    InvalidZone(String),
    #[error("invalid freshness: {0}")]
    InvalidFreshness(String),
    #[error("quantity {0} is too large")]
    InvalidQuantity(u32),
}

/// Largest quantity the store can hold.
pub const MAX_QUANTITY: u32 = i32::MAX.unsigned_abs();

const fn check_quantity(quantity: u32) -> Result<u32, PantryError> {
    if quantity > MAX_QUANTITY {
        return Err(PantryError::InvalidQuantity(quantity));
    }
    Ok(quantity)
}

fn normalize_category(raw: &str) -> String {
    match raw.trim() {
        "" => DEFAULT_CATEGORY.to_owned(),
        category => category.to_owned(),
    }
}

fn normalize_emoji(raw: &str, zone: Zone) -> String {
    match raw.trim() {
        "" => zone.default_emoji().to_owned(),
        emoji => emoji.to_owned(),
    }
}

/// One pantry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenItem {
    pub id: KitchenItemId,
    pub name: String,
    pub zone: Zone,
    pub category: String,
    pub quantity: u32,
    pub freshness: Freshness,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

const fn default_quantity() -> u32 {
    1
}

/// Fields supplied by the client when adding an item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewKitchenItem {
    pub name: String,
    pub zone: Zone,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub freshness: Freshness,
    #[serde(default)]
    pub emoji: String,
}

impl NewKitchenItem {
    /// Validate and stamp the new item.
    ///
    /// # Errors
    ///
    /// Returns `PantryError::EmptyName` if the name is blank and
    /// `PantryError::InvalidQuantity` above [`MAX_QUANTITY`].
    pub fn into_item(
        self,
        id: KitchenItemId,
        created_at: DateTime<Utc>,
    ) -> Result<KitchenItem, PantryError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PantryError::EmptyName);
        }

        Ok(KitchenItem {
            id,
            name: name.to_owned(),
            zone: self.zone,
            category: normalize_category(&self.category),
            quantity: check_quantity(self.quantity)?,
            freshness: self.freshness,
            emoji: normalize_emoji(&self.emoji, self.zone),
            created_at,
        })
    }
}

/// Partial update: only supplied fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness: Option<Freshness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl KitchenItemPatch {
    /// Patch that only toggles freshness.
    #[must_use]
    pub fn freshness(freshness: Freshness) -> Self {
        Self {
            freshness: Some(freshness),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.zone.is_none()
            && self.category.is_none()
            && self.quantity.is_none()
            && self.freshness.is_none()
            && self.emoji.is_none()
    }

    /// Check the patch can be applied to any item.
    ///
    /// # Errors
    ///
    /// Returns `PantryError::EmptyPatch` for a patch with no fields and
    /// `PantryError::EmptyName` for a blank name, and
    /// `PantryError::InvalidQuantity` above [`MAX_QUANTITY`].
    pub fn validate(&self) -> Result<(), PantryError> {
        if self.is_empty() {
            return Err(PantryError::EmptyPatch);
        }
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(PantryError::EmptyName);
        }
        if let Some(quantity) = self.quantity {
            check_quantity(quantity)?;
        }
        Ok(())
    }

    fn apply_to(&self, item: &mut KitchenItem) {
        if let Some(name) = &self.name {
            item.name = name.trim().to_owned();
        }
        if let Some(zone) = self.zone {
            item.zone = zone;
        }
        if let Some(category) = &self.category {
            item.category = normalize_category(category);
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(freshness) = self.freshness {
            item.freshness = freshness;
        }
        if let Some(emoji) = &self.emoji {
            item.emoji = normalize_emoji(emoji, item.zone);
        }
    }
}

/// Active category of the item grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl CategoryFilter {
    #[must_use]
    pub fn matches(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => name.trim().to_lowercase() == category.trim().to_lowercase(),
        }
    }
}

impl From<Option<&str>> for CategoryFilter {
    fn from(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::All,
            Some(name) if name.eq_ignore_ascii_case("all") || name.eq_ignore_ascii_case("todos") => {
                Self::All
            }
            Some(name) => Self::Named(name.to_owned()),
        }
    }
}

/// One row of the zone list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSummary {
    pub zone: Zone,
    pub item_count: usize,
    /// Items whose freshness is `soon` or `expired`.
    pub urgent_count: usize,
}

/// Undo record for a pantry mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PantryChange {
    Added(KitchenItemId),
    Updated(KitchenItem),
    Removed { index: usize, item: KitchenItem },
}

/// One user's kitchen inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pantry {
    items: Vec<KitchenItem>,
}

impl Pantry {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build from stored items, ordering them by creation.
    #[must_use]
    pub fn from_items(mut items: Vec<KitchenItem>) -> Self {
        items.sort_by_key(|item| (item.created_at, item.id));
        Self { items }
    }

    #[must_use]
    pub fn items(&self) -> &[KitchenItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: KitchenItemId) -> Option<&KitchenItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn position(&self, id: KitchenItemId) -> Result<usize, PantryError> {
        self.items
            .iter()
            .position(|item| item.id == id)
            .ok_or(PantryError::NotFound(id))
    }

    /// Append an item.
    ///
    /// # Errors
    ///
    /// Returns `PantryError::DuplicateId` if an item with the same id exists.
    pub fn add(&mut self, item: KitchenItem) -> Result<PantryChange, PantryError> {
        if self.get(item.id).is_some() {
            return Err(PantryError::DuplicateId(item.id));
        }
        let id = item.id;
        self.items.push(item);
        Ok(PantryChange::Added(id))
    }

    /// Apply a partial update in place.
    ///
    /// # Errors
    ///
    /// Returns `PantryError::NotFound` for an unknown id, or the patch's
    /// validation error.
    pub fn update(
        &mut self,
        id: KitchenItemId,
        patch: &KitchenItemPatch,
    ) -> Result<PantryChange, PantryError> {
        patch.validate()?;
        let index = self.position(id)?;
        let item = self
            .items
            .get_mut(index)
            .ok_or(PantryError::NotFound(id))?;
        let previous = item.clone();
        patch.apply_to(item);
        Ok(PantryChange::Updated(previous))
    }

    /// Remove an item.
    ///
    /// # Errors
    ///
    /// Returns `PantryError::NotFound` for an unknown id.
    pub fn remove(&mut self, id: KitchenItemId) -> Result<PantryChange, PantryError> {
        let index = self.position(id)?;
        let item = self.items.remove(index);
        Ok(PantryChange::Removed { index, item })
    }

    /// Undo a change returned by [`add`](Self::add), [`update`](Self::update)
    /// or [`remove`](Self::remove).
    pub fn revert(&mut self, change: PantryChange) {
        match change {
            PantryChange::Added(id) => self.items.retain(|item| item.id != id),
            PantryChange::Updated(previous) => {
                if let Some(item) = self.items.iter_mut().find(|item| item.id == previous.id) {
                    *item = previous;
                }
            }
            PantryChange::Removed { index, item } => {
                let index = index.min(self.items.len());
                self.items.insert(index, item);
            }
        }
    }

    /// Number of `soon` or `expired` items in `zone`.
    #[must_use]
    pub fn urgent_count(&self, zone: Zone) -> usize {
        self.items
            .iter()
            .filter(|item| item.zone == zone && item.freshness.is_urgent())
            .count()
    }

    /// The zone list, one row per zone in display order.
    #[must_use]
    pub fn zone_summaries(&self) -> Vec<ZoneSummary> {
        Zone::ALL
            .into_iter()
            .map(|zone| ZoneSummary {
                zone,
                item_count: self.items.iter().filter(|item| item.zone == zone).count(),
                urgent_count: self.urgent_count(zone),
            })
            .collect()
    }

    /// Items of `zone` in the active category, in insertion order.
    #[must_use]
    pub fn items_in(&self, zone: Zone, filter: &CategoryFilter) -> Vec<&KitchenItem> {
        self.items
            .iter()
            .filter(|item| item.zone == zone && filter.matches(&item.category))
            .collect()
    }

    /// Distinct categories of `zone` in first-seen order.
    #[must_use]
    pub fn categories(&self, zone: Zone) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for item in self.items.iter().filter(|item| item.zone == zone) {
            if !categories.contains(&item.category.as_str()) {
                categories.push(&item.category);
            }
        }
        categories
    }
}
