//! HTML extractor for listing index pages
//!
//! This module handles parsing index-page HTML to extract:
//! - The total page count of a category (from the first page)
//! - One `Listing` per listing block on a page
//!
//! Extraction is best-effort: a block without a title or detail link is
//! skipped, and a missing optional field is left unset.

use crate::config::{CategoryConfig, SiteConfig};
use crate::listing::{Category, FieldSet, Listing, RoomAttributes};
use crate::url::resolve_link;
use scraper::{ElementRef, Html, Selector};

const SURFACE_MARKER: &str = "m²";
const HECTARE_MARKER: &str = "hectare";
const ROOMS_MARKER: &str = "Pièce";
const BEDROOMS_MARKER: &str = "Chambre";
const BATHROOMS_MARKER: &str = "bain";

/// Attributes tried in order for a block's image reference
const IMAGE_ATTRS: [&str; 4] = ["src", "data-src", "data-original", "data-lazy"];

/// Computes the number of index pages from the first page's HTML
///
/// Reads the result count from `span#numResults` (first integer in its text)
/// and the page size from `input#pageSize`. If either is missing or
/// unreadable the category is treated as a single page.
///
/// # Example
///
/// ```
/// use listing_harvester::crawler::count_total_pages;
///
/// let html = r#"<span id="numResults">45 annonces</span><input id="pageSize" value="20">"#;
/// assert_eq!(count_total_pages(html), 3);
/// assert_eq!(count_total_pages("<html></html>"), 1);
/// ```
pub fn count_total_pages(html: &str) -> u32 {
    let document = Html::parse_document(html);

    let Some(total_results) = select_first(&document, "span#numResults")
        .map(|el| el.text().collect::<String>())
        .and_then(|text| first_integer(&text))
    else {
        tracing::debug!("No readable result count; assuming a single page");
        return 1;
    };

    let Some(page_size) = select_first(&document, "input#pageSize")
        .and_then(|el| el.value().attr("value"))
        .and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|size| *size > 0)
    else {
        tracing::debug!("No readable page size; assuming a single page");
        return 1;
    };

    let pages = total_results.div_ceil(page_size).max(1);
    tracing::info!("{} results, {} per page: {} pages", total_results, page_size, pages);
    pages
}

fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

/// Returns the first run of ASCII digits in `text` as a number
fn first_integer(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Joins an element's text nodes and collapses whitespace runs
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

struct Selectors {
    card: Selector,
    title: Selector,
    anchor: Selector,
    price: Selector,
    location: Selector,
    image: Selector,
    feature: Selector,
}

impl Selectors {
    fn compile() -> Option<Self> {
        Some(Self {
            card: Selector::parse("li.listingBox, div.listingBox").ok()?,
            title: Selector::parse("h2.listingTit").ok()?,
            anchor: Selector::parse("a").ok()?,
            price: Selector::parse("span.priceTag").ok()?,
            location: Selector::parse("span.listingH3").ok()?,
            image: Selector::parse("img").ok()?,
            feature: Selector::parse("div.adDetails div.adDetailFeature").ok()?,
        })
    }
}

/// Extracts listings of one category from index pages
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    category: Category,
    field_set: FieldSet,
    origin: String,
    city: String,
}

impl ListingExtractor {
    pub fn new(category: &CategoryConfig, site: &SiteConfig) -> Self {
        Self {
            category: category.category,
            field_set: category.field_set,
            origin: site.origin.clone(),
            city: site.city.clone(),
        }
    }

    /// Parses every listing block on a page
    ///
    /// # Arguments
    ///
    /// * `html` - The index page content
    ///
    /// # Returns
    ///
    /// The listings found, in page order. Blocks lacking a title or a
    /// detail link are skipped.
    pub fn parse_listings(&self, html: &str) -> Vec<Listing> {
        let Some(selectors) = Selectors::compile() else {
            tracing::error!("Listing selectors failed to compile");
            return Vec::new();
        };

        let document = Html::parse_document(html);
        document
            .select(&selectors.card)
            .filter_map(|card| self.parse_block(card, &selectors))
            .collect()
    }

    fn parse_block(&self, card: ElementRef<'_>, sel: &Selectors) -> Option<Listing> {
        let Some(anchor) = card
            .select(&sel.title)
            .next()
            .and_then(|title| title.select(&sel.anchor).next())
        else {
            tracing::debug!("Skipping {} block without a title link", self.category);
            return None;
        };

        let title = element_text(anchor);
        let href = anchor.value().attr("href").map(str::trim).unwrap_or("");
        if title.is_empty() || href.is_empty() {
            tracing::debug!("Skipping {} block missing title or link", self.category);
            return None;
        }

        let mut listing = Listing::new(
            self.category,
            title,
            resolve_link(&self.origin, href),
            self.city.as_str(),
        );

        let optional_text = |selector: &Selector| {
            card.select(selector)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty())
        };
        listing.price = optional_text(&sel.price);
        listing.location = optional_text(&sel.location);

        listing.image_url = card.select(&sel.image).next().and_then(|img| {
            IMAGE_ATTRS
                .iter()
                .filter_map(|attr| img.value().attr(attr))
                .map(str::trim)
                .find(|value| !value.is_empty())
                .map(|value| resolve_link(&self.origin, value))
        });

        let features: Vec<String> = card.select(&sel.feature).map(element_text).collect();
        self.classify_features(&features, &mut listing);

        Some(listing)
    }

    /// Assigns feature fragments to detail fields by marker substring
    ///
    /// A fragment fills at most one field, and the first fragment matching a
    /// field wins.
    fn classify_features(&self, features: &[String], listing: &mut Listing) {
        let mut attrs = RoomAttributes::default();

        for text in features {
            match self.field_set {
                FieldSet::LandParcel => {
                    if text.contains(SURFACE_MARKER) || text.contains(HECTARE_MARKER) {
                        listing.surface.get_or_insert_with(|| text.clone());
                    }
                }
                FieldSet::Standard => {
                    let slot = if text.contains(SURFACE_MARKER) {
                        &mut listing.surface
                    } else if text.contains(ROOMS_MARKER) {
                        &mut attrs.rooms
                    } else if text.contains(BEDROOMS_MARKER) {
                        &mut attrs.bedrooms
                    } else if text.contains(BATHROOMS_MARKER) {
                        &mut attrs.bathrooms
                    } else {
                        continue;
                    };
                    slot.get_or_insert_with(|| text.clone());
                }
            }
        }

        if self.field_set == FieldSet::Standard {
            listing.attributes = Some(attrs);
        }
    }
}
