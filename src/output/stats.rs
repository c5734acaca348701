//! Link statistics from the listing database
//!
//! This module reports, per category, how many stored listings carry a
//! usable detail link.

use crate::listing::Category;
use crate::storage::ListingStore;
use crate::url::is_site_link;
use crate::HarvestError;

/// Link counts of one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLinkStats {
    pub category: Category,

    /// Listings whose link belongs to the site
    pub with_links: u64,

    /// All stored listings
    pub total: u64,
}

impl CategoryLinkStats {
    pub fn percentage(&self) -> f64 {
        percentage(self.with_links, self.total)
    }
}

/// Link statistics summary
#[derive(Debug, Clone, Default)]
pub struct LinkStatistics {
    pub categories: Vec<CategoryLinkStats>,
}

impl LinkStatistics {
    pub fn total_with_links(&self) -> u64 {
        self.categories.iter().map(|c| c.with_links).sum()
    }

    pub fn total(&self) -> u64 {
        self.categories.iter().map(|c| c.total).sum()
    }

    pub fn percentage(&self) -> f64 {
        percentage(self.total_with_links(), self.total())
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}

/// Loads link statistics from storage
///
/// # Arguments
///
/// * `store` - The listing store to query
/// * `link_domain` - Domain a link must belong to in order to count
///
/// # Returns
///
/// * `Ok(LinkStatistics)` - One entry per category, in reporting order
/// * `Err(HarvestError)` - Failed to query the store
pub fn load_link_statistics(
    store: &dyn ListingStore,
    link_domain: &str,
) -> Result<LinkStatistics, HarvestError> {
    let mut categories = Vec::with_capacity(Category::ALL.len());

    for category in Category::ALL {
        let links = store.links(category)?;
        let with_links = links
            .iter()
            .filter(|link| is_site_link(link, link_domain))
            .count() as u64;

        categories.push(CategoryLinkStats {
            category,
            with_links,
            total: links.len() as u64,
        });
    }

    Ok(LinkStatistics { categories })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_link_statistics(stats: &LinkStatistics) {
    println!("=== Listing Link Statistics ===\n");

    for entry in &stats.categories {
        println!(
            "{:20}: {:6}/{:6} ({:5.1}%)",
            entry.category.as_str(),
            entry.with_links,
            entry.total,
            entry.percentage()
        );
    }

    println!("{}", "-".repeat(50));
    println!(
        "{:20}: {:6}/{:6} ({:5.1}%)",
        "TOTAL",
        stats.total_with_links(),
        stats.total(),
        stats.percentage()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Listing;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_empty_statistics() {
        let stats = LinkStatistics::default();
        assert_eq!(stats.total(), 0);
        assert_eq!(stats.percentage(), 0.0);
    }

    #[test]
    fn test_load_counts_valid_links() {
        let store = SqliteStorage::new_in_memory().unwrap();
        let good = Listing::new(
            Category::Villas,
            "Villa",
            "https://www.mubawab.ma/fr/a/1",
            "Marrakech",
        );
        let bad = Listing::new(Category::Villas, "Villa", "N/A", "Marrakech");
        store.upsert(Category::Villas, &[good, bad]).unwrap();

        let stats = load_link_statistics(&store, "mubawab.ma").unwrap();
        assert_eq!(stats.categories.len(), Category::ALL.len());

        let villas = &stats.categories[1];
        assert_eq!(villas.category, Category::Villas);
        assert_eq!(villas.with_links, 1);
        assert_eq!(villas.total, 2);
        assert_eq!(villas.percentage(), 50.0);
        assert_eq!(stats.total(), 2);
    }
}
