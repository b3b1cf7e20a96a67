//! Crawler module for discovering and extracting items
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with backoff and throttling awareness
//! - Pacing (politeness delays and the sleep seam)
//! - Item URL discovery through the search endpoint
//! - Per-field isolated item extraction
//! - Overall run coordination

mod coordinator;
mod discovery;
mod extractor;
mod fetcher;
mod pacing;

pub use coordinator::{Coordinator, RunReport};
pub use discovery::{extract_item_links, Discoverer};
pub use extractor::{parse_item, Extractor, FieldError};
pub use fetcher::{
    build_http_client, FetchError, FetchTarget, Fetcher, Page, DEFAULT_MAX_RETRIES,
    MIN_THROTTLE_WAIT,
};
pub use pacing::{backoff_delay, pause, retry_after, RecordingSleeper, Sleeper, TokioSleeper};

use crate::config::Config;
use crate::Result;
use tokio_util::sync::CancellationToken;

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Discover item URLs for every configured key
/// 2. Extract a record from each item page
/// 3. Write checkpoints and the final artifacts
///
/// Tripping `cancel` stops the run at the next loop boundary and writes the
/// interrupted artifact.
///
/// # Example
///
/// ```no_run
/// use sillage::config::Config;
/// use sillage::crawler::harvest;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = harvest(&Config::default(), CancellationToken::new()).await?;
/// println!("{} records", report.records);
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: &Config, cancel: CancellationToken) -> Result<RunReport> {
    let coordinator = Coordinator::from_config(config, cancel)?;
    Ok(coordinator.run().await)
}
