//! Item URL discovery
//!
//! One search request per discovery key; every item link found on the result
//! page is normalized and unioned into a single set.

use crate::config::{Config, DelayRange, DiscoveryConfig};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pacing::{pause, Sleeper};
use crate::url::{is_item_link, normalize_item_url};
use crate::Result;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Discovers item URLs through the site's search endpoint
pub struct Discoverer {
    fetcher: Arc<Fetcher>,
    config: DiscoveryConfig,
    site: Url,
    between_keys: DelayRange,
    sleeper: Arc<dyn Sleeper>,
}

impl Discoverer {
    /// Creates a discoverer
    ///
    /// Fails if the configured site URL does not parse.
    pub fn new(
        fetcher: Arc<Fetcher>,
        config: &Config,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        let site = Url::parse(&config.discovery.site_url)?;

        Ok(Self {
            fetcher,
            config: config.discovery.clone(),
            site,
            between_keys: config.delays.between_keys,
            sleeper,
        })
    }

    /// Runs discovery for every key in order
    ///
    /// A key whose search page cannot be fetched is skipped; the remaining
    /// keys still run. Cancellation is checked before each key and ends the
    /// pause between keys; whatever was found so far is returned.
    ///
    /// # Returns
    ///
    /// The discovered URLs in sorted order.
    pub async fn discover_all(&self, keys: &[String], cancel: &CancellationToken) -> Vec<String> {
        let mut all_urls = BTreeSet::new();

        for key in keys {
            if cancel.is_cancelled() {
                tracing::warn!("Discovery cancelled before key '{}'", key);
                break;
            }

            let Some(found) = self.discover_key(key).await else {
                continue;
            };

            let found_count = found.len();
            all_urls.extend(found);
            tracing::info!(
                "Found {} items for key '{}', {} discovered in total",
                found_count,
                key,
                all_urls.len()
            );

            tokio::select! {
                _ = pause(self.sleeper.as_ref(), self.between_keys.sample()) => {}
                _ = cancel.cancelled() => {}
            }
        }

        all_urls.into_iter().collect()
    }

    /// Queries the search endpoint for one key
    ///
    /// Returns `None` if the search page could not be fetched.
    pub async fn discover_key(&self, key: &str) -> Option<BTreeSet<String>> {
        let search_url = self.config.search_url_for(key);
        tracing::info!("Searching items for key '{}': {}", key, search_url);

        let Some(page) = self.fetcher.fetch(&search_url).await else {
            tracing::warn!("Skipping key '{}': search page unavailable", key);
            return None;
        };

        Some(extract_item_links(
            &page.body,
            &self.site,
            &self.config.item_path_marker,
        ))
    }
}

/// Extracts every normalized item link from a search result page
///
/// Only anchors whose raw `href` contains `item_path_marker` are considered.
/// Links that fail to normalize are dropped.
pub fn extract_item_links(html: &str, site: &Url, item_path_marker: &str) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    let mut links = BTreeSet::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if !is_item_link(href, item_path_marker) {
            continue;
        }

        match normalize_item_url(href, site) {
            Ok(url) => {
                tracing::trace!("Item link {} -> {}", href, url);
                links.insert(url);
            }
            Err(e) => tracing::debug!("Dropping link {}: {}", href, e),
        }
    }

    links
}
