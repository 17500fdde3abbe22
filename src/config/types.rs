use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for url-sentry
///
/// Every section is optional in the TOML file; missing values fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub checker: CheckerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Worker pool and HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Maximum number of probes in flight at once
    pub concurrency: usize,

    /// Per-probe timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Whether TLS certificates are verified
    #[serde(rename = "verify-tls")]
    pub verify_tls: bool,

    /// Maximum redirect hops followed or traced
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl CheckerConfig {
    /// Returns the per-probe timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            timeout_ms: 5_000,
            verify_tls: false,
            max_redirects: 10,
            user_agent: format!("url-sentry/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Output format for result tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the result table (CSV file or SQLite database)
    pub path: String,

    /// Result table format
    pub format: OutputFormat,

    /// Optional path of a markdown summary written after the batch
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "results.csv".to_string(),
            format: OutputFormat::Csv,
            summary_path: None,
        }
    }
}

/// Keyword tables used by the page classifiers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Sectors below this confidence are reported as "unknown"
    #[serde(rename = "min-confidence")]
    pub min_confidence: f64,

    /// Phrases that mark a placeholder page
    #[serde(rename = "dummy-keywords")]
    pub dummy_keywords: Vec<String>,

    /// Ordered sector table; earlier sectors win confidence ties
    pub sectors: Vec<SectorEntry>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            dummy_keywords: strings(&[
                "under construction",
                "coming soon",
                "placeholder",
                "dummy page",
            ]),
            sectors: vec![
                SectorEntry::new(
                    "healthcare",
                    &["pharmaceutical", "biopharmaceutical", "drug", "medicine"],
                ),
                SectorEntry::new(
                    "life science",
                    &["biotech", "biological", "lab equipment", "chemicals"],
                ),
                SectorEntry::new(
                    "electronics",
                    &["semiconductor", "display", "materials", "electronics"],
                ),
                SectorEntry::new(
                    "emerging fields",
                    &["innovation", "research", "new technology"],
                ),
            ],
        }
    }
}

/// One sector of the classification table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SectorEntry {
    /// Sector name reported on a match
    pub name: String,

    /// Keywords scored against page text (matched case-insensitively)
    pub keywords: Vec<String>,
}

impl SectorEntry {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: strings(keywords),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
