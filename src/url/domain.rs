use crate::listing::NOT_AVAILABLE;
use url::Url;

/// Returns true if a stored link is a usable detail-page link of the site
///
/// The link must be non-empty, not the "N/A" sentinel, parse as an HTTP(S)
/// URL, and its host must be `site_domain` or one of its subdomains.
pub fn is_site_link(link: &str, site_domain: &str) -> bool {
    let link = link.trim();
    if link.is_empty() || link == NOT_AVAILABLE {
        return false;
    }

    let Ok(url) = Url::parse(link) else {
        return false;
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    let Some(host) = url.host_str().map(|h| h.to_lowercase()) else {
        return false;
    };

    let site_domain = site_domain.to_lowercase();
    host == site_domain || host.ends_with(&format!(".{}", site_domain))
}
