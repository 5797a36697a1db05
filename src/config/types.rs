use serde::Deserialize;

/// Main configuration structure for Kumo-Loom
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub crawl: CrawlConfig,
}

/// Scheduler behavior configuration
///
/// Read only from the instance it was handed to; two schedulers never share
/// configuration state.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of concurrently-running execution units
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: u32,

    /// Completed-job count that triggers a runtime recycle. The comparison
    /// is strictly greater: the recycle fires one completion past this
    /// value.
    #[serde(rename = "reset-threshold")]
    pub reset_threshold: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            reset_threshold: 50,
        }
    }
}

/// Render runtime configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Completion cache configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Path to the SQLite cache database; in-memory cache when absent
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,
}

/// Crawl policy applied by the CLI when feeding discovered requests back
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// URLs submitted at startup
    pub seeds: Vec<String>,

    /// Whether discovered requests are resubmitted
    #[serde(rename = "follow-links", default = "default_true")]
    pub follow_links: bool,

    /// Restrict resubmission to hosts of the seed URLs
    #[serde(rename = "same-host-only", default = "default_true")]
    pub same_host_only: bool,

    /// Cap on total submissions for one run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_pages() -> u32 {
    500
}
