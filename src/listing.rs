//! Listing record model
//!
//! Defines the fixed set of property categories, the field-set variant each
//! category is extracted with, and the listing record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel written wherever an optional field could not be extracted
pub const NOT_AVAILABLE: &str = "N/A";

/// Property categories crawled from the site
///
/// Each category owns one logical collection in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Appartements,
    Villas,
    Maisons,
    Riads,
    LocauxCommerciaux,
    Terrains,
}

impl Category {
    /// All categories, in the order they are reported and exported
    pub const ALL: [Category; 6] = [
        Self::Appartements,
        Self::Villas,
        Self::Maisons,
        Self::Riads,
        Self::LocauxCommerciaux,
        Self::Terrains,
    ];

    /// Public name of the category, as used in URLs and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Appartements => "appartements",
            Self::Villas => "villas",
            Self::Maisons => "maisons",
            Self::Riads => "riads",
            Self::LocauxCommerciaux => "locaux_commerciaux",
            Self::Terrains => "terrains",
        }
    }

    /// Storage collection identifier for this category
    pub fn collection(&self) -> &'static str {
        // Collections share the category's public name
        self.as_str()
    }

    /// Field-set variant used when extracting listings of this category
    pub fn field_set(&self) -> FieldSet {
        match self {
            Self::Terrains => FieldSet::LandParcel,
            _ => FieldSet::Standard,
        }
    }

    /// Parses a collection identifier back into its category
    pub fn from_collection(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.collection() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = crate::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| crate::ConfigError::UnknownCategory(s.to_string()))
    }
}

/// Which set of detail fields a category carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSet {
    /// Surface plus room, bedroom and bathroom counts
    Standard,
    /// Surface only
    LandParcel,
}

/// Room-count attributes carried by standard listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAttributes {
    pub rooms: Option<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
}

/// One listing as shown on a category index page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub category: Category,
    pub title: String,
    pub price: Option<String>,
    pub location: Option<String>,
    pub surface: Option<String>,
    /// `None` for land parcels
    pub attributes: Option<RoomAttributes>,
    /// Canonical detail-page URL; unique within the category
    pub link: String,
    pub image_url: Option<String>,
    pub city: String,
    /// Set by the store on first successful insert
    pub created_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// Creates a listing with only its required fields set
    pub fn new(
        category: Category,
        title: impl Into<String>,
        link: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        let attributes = match category.field_set() {
            FieldSet::Standard => Some(RoomAttributes::default()),
            FieldSet::LandParcel => None,
        };

        Self {
            category,
            title: title.into(),
            price: None,
            location: None,
            surface: None,
            attributes,
            link: link.into(),
            image_url: None,
            city: city.into(),
            created_at: None,
        }
    }
}

/// Renders an optional field the way exports and logs show it
pub fn or_not_available(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}
