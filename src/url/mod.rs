//! URL handling module for Listing-Harvester
//!
//! This module builds index-page URLs, resolves listing links found on a page
//! against the site origin, and decides which stored links count as valid
//! detail-page links.

mod domain;

pub use domain::is_site_link;

/// Builds the URL of an index page
///
/// Page 1 is the bare index URL; later pages append the site's `:p:N` suffix.
///
/// # Examples
///
/// ```
/// use listing_harvester::url::page_url;
///
/// assert_eq!(page_url("https://example.com/villas", 1), "https://example.com/villas");
/// assert_eq!(page_url("https://example.com/villas", 3), "https://example.com/villas:p:3");
/// ```
pub fn page_url(index_url: &str, page: u32) -> String {
    if page <= 1 {
        index_url.to_string()
    } else {
        format!("{}:p:{}", index_url, page)
    }
}

/// Resolves a link found on a listing page
///
/// A root-relative link (starting with '/') is prefixed with the site origin;
/// anything else passes through unchanged.
///
/// # Examples
///
/// ```
/// use listing_harvester::url::resolve_link;
///
/// assert_eq!(
///     resolve_link("https://example.com", "/fr/a/123"),
///     "https://example.com/fr/a/123"
/// );
/// assert_eq!(
///     resolve_link("https://example.com", "https://cdn.example.com/x.jpg"),
///     "https://cdn.example.com/x.jpg"
/// );
/// ```
pub fn resolve_link(origin: &str, href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), href)
    } else {
        href.to_string()
    }
}
