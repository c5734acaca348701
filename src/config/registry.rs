//! Category registry
//!
//! Maps every category to its listing-index URL and field-set variant.
//! Built once from the validated configuration and shared read-only
//! afterwards.

use crate::config::types::Config;
use crate::listing::{Category, FieldSet};
use crate::ConfigError;
use std::collections::BTreeMap;

/// Resolved settings for one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryConfig {
    pub category: Category,
    /// First index page; later pages append a page-index suffix
    pub index_url: String,
    pub field_set: FieldSet,
}

/// Immutable category → settings lookup
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    entries: BTreeMap<Category, CategoryConfig>,
}

impl CategoryRegistry {
    /// Builds the registry from built-in defaults plus config overrides
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut entries: BTreeMap<Category, CategoryConfig> = Category::ALL
            .into_iter()
            .map(|category| (category, default_entry(category)))
            .collect();

        for entry in &config.categories {
            let category: Category = entry.name.parse()?;
            if let Some(resolved) = entries.get_mut(&category) {
                resolved.index_url = entry.index_url.clone();
            }
        }

        Ok(Self { entries })
    }

    /// Looks up a category by its public name
    pub fn resolve(&self, name: &str) -> Result<&CategoryConfig, ConfigError> {
        let category: Category = name.parse()?;
        self.get(category)
            .ok_or_else(|| ConfigError::UnknownCategory(name.to_string()))
    }

    pub fn get(&self, category: Category) -> Option<&CategoryConfig> {
        self.entries.get(&category)
    }

    /// Iterates over all categories in reporting order
    pub fn iter(&self) -> impl Iterator<Item = &CategoryConfig> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self {
            entries: Category::ALL
                .into_iter()
                .map(|category| (category, default_entry(category)))
                .collect(),
        }
    }
}

/// Built-in Marrakech sale listings for each category
fn default_index_url(category: Category) -> &'static str {
    match category {
        Category::Appartements => "https://www.mubawab.ma/fr/ct/marrakech/immobilier-a-vendre",
        Category::Villas => {
            "https://www.mubawab.ma/fr/st/marrakech/villas-et-maisons-de-luxe-a-vendre"
        }
        Category::Maisons => "https://www.mubawab.ma/fr/st/marrakech/maisons-a-vendre",
        Category::Riads => "https://www.mubawab.ma/fr/st/marrakech/riads-a-vendre",
        Category::LocauxCommerciaux => "https://www.mubawab.ma/fr/st/marrakech/locaux-a-vendre",
        Category::Terrains => "https://www.mubawab.ma/fr/st/marrakech/terrains-a-vendre",
    }
}

fn default_entry(category: Category) -> CategoryConfig {
    CategoryConfig {
        category,
        index_url: default_index_url(category).to_string(),
        field_set: category.field_set(),
    }
}
