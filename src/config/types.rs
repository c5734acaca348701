use serde::Deserialize;

/// Main configuration structure for Listing-Harvester
///
/// Every section is optional; missing sections and keys fall back to the
/// built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub site: SiteConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
    #[serde(rename = "category")]
    pub categories: Vec<CategoryEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of pages processed concurrently
    pub max_workers: u32,

    /// Fetch attempts per page before giving up
    pub max_attempts: u32,

    /// Timeout of a single fetch attempt (seconds)
    pub request_timeout_secs: u64,

    /// Fixed wait between two failed attempts (milliseconds)
    pub retry_delay_ms: u64,

    /// Delay before the first attempt (milliseconds)
    pub base_delay_ms: u64,

    /// Extra delay added per previous attempt (milliseconds)
    pub backoff_step_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            max_attempts: 3,
            request_timeout_secs: 15,
            retry_delay_ms: 1000,
            base_delay_ms: 100,
            backoff_step_ms: 200,
        }
    }
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Origin that relative listing links are resolved against
    pub origin: String,

    /// Domain a stored link must belong to in order to be exported
    pub link_domain: String,

    /// City tag written on every listing
    pub city: String,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: "https://www.mubawab.ma".to_string(),
            link_domain: "mubawab.ma".to_string(),
            city: "Marrakech".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Default path of the CSV export
    pub export_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "listings.db".to_string(),
            export_path: "property_links.csv".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Socket address the API listens on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Override of a category's listing-index URL
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CategoryEntry {
    /// Category name (e.g., "villas")
    pub name: String,

    /// First index page of the category
    pub index_url: String,
}
