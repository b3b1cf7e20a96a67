use serde::Deserialize;
use std::time::Duration;
use url::form_urlencoded;

/// Main configuration structure for Sillage
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub delays: DelayConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Retry and backoff behavior of the fetcher
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Attempts allowed per URL for transient failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base of the exponential backoff (seconds)
    #[serde(rename = "backoff-base-secs", default = "default_backoff_base")]
    pub backoff_base_secs: u64,

    /// Upper bound of a single backoff wait (seconds)
    #[serde(rename = "backoff-cap-secs", default = "default_backoff_cap")]
    pub backoff_cap_secs: u64,

    /// Wait applied to a throttling response without a Retry-After hint (seconds)
    #[serde(rename = "throttle-wait-secs", default = "default_throttle_wait")]
    pub throttle_wait_secs: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base(),
            backoff_cap_secs: default_backoff_cap(),
            throttle_wait_secs: default_throttle_wait(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Politeness delays inserted between requests
#[derive(Debug, Clone, Deserialize)]
pub struct DelayConfig {
    /// Pause after every successful fetch
    #[serde(rename = "after-fetch", default = "default_after_fetch")]
    pub after_fetch: DelayRange,

    /// Pause between discovery keys
    #[serde(rename = "between-keys", default = "default_between_keys")]
    pub between_keys: DelayRange,

    /// Pause after each extracted item
    #[serde(rename = "between-items", default = "default_between_items")]
    pub between_items: DelayRange,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            after_fetch: default_after_fetch(),
            between_keys: default_between_keys(),
            between_items: default_between_items(),
        }
    }
}

/// An inclusive range of milliseconds a random delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DelayRange {
    #[serde(rename = "min-ms")]
    pub min_ms: u64,

    #[serde(rename = "max-ms")]
    pub max_ms: u64,
}

impl DelayRange {
    /// Creates a range from whole seconds
    pub const fn from_secs(min: u64, max: u64) -> Self {
        Self {
            min_ms: min * 1000,
            max_ms: max * 1000,
        }
    }

    /// A range that never waits
    pub const fn zero() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
        }
    }

    /// Draws a uniformly distributed duration from the range
    pub fn sample(&self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(fastrand::u64(self.min_ms..=self.max_ms))
    }
}

/// Identification sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Full User-Agent header value
    #[serde(default = "default_user_agent")]
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: default_user_agent(),
        }
    }
}

/// Where and how item URLs are discovered
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Site root used to resolve site-relative links
    #[serde(rename = "site-url", default = "default_site_url")]
    pub site_url: String,

    /// Search endpoint template; `{key}` is replaced by each discovery key
    #[serde(rename = "search-url", default = "default_search_url")]
    pub search_url: String,

    /// Discovery keys, queried in order
    #[serde(default = "default_keys")]
    pub keys: Vec<String>,

    /// Path fragment identifying item links
    #[serde(rename = "item-path-marker", default = "default_item_path_marker")]
    pub item_path_marker: String,
}

impl DiscoveryConfig {
    /// Builds the search URL for one discovery key
    ///
    /// The key is form-encoded, so reserved characters such as `&`, `#` and
    /// `+` reach the search as literal text.
    pub fn search_url_for(&self, key: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
        self.search_url.replace("{key}", &encoded)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            search_url: default_search_url(),
            keys: default_keys(),
            item_path_marker: default_item_path_marker(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory all artifacts are written into
    #[serde(default = "default_output_directory")]
    pub directory: String,

    /// Stem shared by every artifact name
    #[serde(rename = "artifact-stem", default = "default_artifact_stem")]
    pub artifact_stem: String,

    /// Record count cadence of checkpoint writes
    #[serde(rename = "checkpoint-interval", default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            artifact_stem: default_artifact_stem(),
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_base() -> u64 {
    30
}

fn default_backoff_cap() -> u64 {
    300
}

fn default_throttle_wait() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

fn default_after_fetch() -> DelayRange {
    DelayRange::from_secs(5, 10)
}

fn default_between_keys() -> DelayRange {
    DelayRange::from_secs(2, 4)
}

fn default_between_items() -> DelayRange {
    DelayRange::from_secs(5, 10)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36".to_string()
}

fn default_site_url() -> String {
    "https://www.fragrantica.es".to_string()
}

fn default_search_url() -> String {
    "https://www.fragrantica.es/buscar/?query={key}".to_string()
}

fn default_keys() -> Vec<String> {
    vec!["a".to_string()]
}

fn default_item_path_marker() -> String {
    "/perfume/".to_string()
}

fn default_output_directory() -> String {
    ".".to_string()
}

fn default_artifact_stem() -> String {
    "perfumes".to_string()
}

fn default_checkpoint_interval() -> usize {
    50
}
