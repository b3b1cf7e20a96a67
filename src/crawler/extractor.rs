//! Item page extraction
//!
//! Each field has its own routine returning `Result<_, FieldError>`. The
//! assembler swaps a failed field for its empty default and logs it, so one
//! malformed section never costs the rest of the record.

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::record::{ItemRecord, ScentPyramid};
use crate::url::brand_from_url;
use crate::SillageError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Style marker of a single note cell inside a pyramid tier
const NOTE_CELL_STYLE: &str = "margin: 0.2rem";

/// Prefixes stripped from the heading's gender qualifier
const GENDER_PREFIXES: &[&str] = &["para ", "for "];

/// Why a single field could not be extracted
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("invalid selector: {0}")]
    Selector(&'static str),

    #[error("missing element: {0}")]
    MissingElement(&'static str),

    #[error("not a number: '{0}'")]
    InvalidNumber(String),
}

/// Pyramid tier a section heading refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Top,
    Heart,
    Base,
}

impl Tier {
    /// Classifies a section heading; labels in several languages are accepted
    fn from_heading(heading: &str) -> Option<Self> {
        if heading.contains("Salida") || heading.contains("Top") {
            Some(Self::Top)
        } else if heading.contains("Middle")
            || heading.contains("Heart")
            || heading.contains("Corazón")
        {
            Some(Self::Heart)
        } else if heading.contains("Base") {
            Some(Self::Base)
        } else {
            None
        }
    }
}

/// Fetches item pages and turns them into records
pub struct Extractor {
    fetcher: Arc<Fetcher>,
    item_path_marker: String,
}

impl Extractor {
    pub fn new(fetcher: Arc<Fetcher>, config: &Config) -> Self {
        Self {
            fetcher,
            item_path_marker: config.discovery.item_path_marker.clone(),
        }
    }

    /// Extracts the record behind one item URL
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - The page was fetched; fields that failed are empty
    /// * `Ok(None)` - The page could not be fetched (already logged)
    /// * `Err(SillageError)` - The URL itself is unusable
    pub async fn extract(&self, url: &str) -> Result<Option<ItemRecord>, SillageError> {
        Url::parse(url)?;

        let Some(page) = self.fetcher.fetch(url).await else {
            tracing::warn!("No page for {}, skipping item", url);
            return Ok(None);
        };

        Ok(Some(parse_item(url, &page.body, &self.item_path_marker)))
    }
}

/// Builds a record from an item page
///
/// Pure with respect to its inputs: the same page always yields the same
/// record.
pub fn parse_item(url: &str, html: &str, item_path_marker: &str) -> ItemRecord {
    let document = Html::parse_document(html);

    let (name, gender_from_title) = isolate(url, "title", extract_title(&document));
    let accords = isolate(url, "accords", extract_accords(&document));
    let rating = isolate(url, "rating", extract_rating(&document));
    let scent_pyramid = isolate(url, "scent pyramid", extract_pyramid(&document));
    let longevity = isolate(url, "longevity", extract_longevity(&document));
    let year = isolate(url, "year", extract_year(&document));
    let gender = isolate(url, "gender", extract_gender(&document));

    ItemRecord {
        url: url.to_string(),
        brand: brand_from_url(url, item_path_marker),
        name,
        gender_from_title,
        accords,
        rating,
        scent_pyramid,
        longevity,
        year,
        gender,
    }
}

/// Replaces a failed field with its default, logging the cause
fn isolate<T: Default>(url: &str, field: &str, result: Result<T, FieldError>) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!("Error extracting {} from {}: {}", field, url, e);
        T::default()
    })
}

fn selector(css: &'static str) -> Result<Selector, FieldError> {
    Selector::parse(css).map_err(|_| FieldError::Selector(css))
}

/// All text below an element with runs of whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first element matching `css`, if any and non-empty
fn first_text(document: &Html, css: &'static str) -> Result<Option<String>, FieldError> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty()))
}

/// Name and gender qualifier from the primary heading
///
/// The name is the heading's own first text; the qualifier comes from a
/// nested `<small>`. Both are empty when the heading is absent.
fn extract_title(document: &Html) -> Result<(String, String), FieldError> {
    let heading_sel = selector(r#"h1[itemprop="name"]"#)?;
    let small_sel = selector("small")?;

    let Some(heading) = document.select(&heading_sel).next() else {
        return Ok((String::new(), String::new()));
    };

    let name = heading
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .unwrap_or_default()
        .to_string();

    let gender = heading
        .select(&small_sel)
        .next()
        .map(element_text)
        .map(|qualifier| strip_gender_prefix(&qualifier))
        .unwrap_or_default();

    Ok((name, gender))
}

fn strip_gender_prefix(qualifier: &str) -> String {
    let trimmed = qualifier.trim();
    GENDER_PREFIXES
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Accord labels from every grid container, first occurrence wins
fn extract_accords(document: &Html) -> Result<Vec<String>, FieldError> {
    let grid_sel = selector("div.grid-x")?;
    let accord_sel = selector("div.accord-bar, div.accord-box")?;

    let mut seen = HashSet::new();
    let mut accords = Vec::new();

    for grid in document.select(&grid_sel) {
        for accord in grid.select(&accord_sel) {
            let label = element_text(accord);
            if !label.is_empty() && seen.insert(label.clone()) {
                accords.push(label);
            }
        }
    }

    Ok(accords)
}

/// Average rating; the info-note block is consulted only when the primary
/// rating element yields nothing
fn extract_rating(document: &Html) -> Result<Option<f64>, FieldError> {
    let primary_sel = selector(r#"span[itemprop="ratingValue"]"#)?;
    let fallback_sel = selector(r#"div.info-note span[itemprop="ratingValue"]"#)?;

    let primary_error = match document.select(&primary_sel).next().map(parse_rating) {
        Some(Ok(rating)) => return Ok(Some(rating)),
        Some(Err(e)) => Some(e),
        None => None,
    };

    match document.select(&fallback_sel).next().map(parse_rating) {
        Some(Ok(rating)) => Ok(Some(rating)),
        Some(Err(e)) => Err(primary_error.unwrap_or(e)),
        None => primary_error.map_or(Ok(None), Err),
    }
}

fn parse_rating(element: ElementRef<'_>) -> Result<f64, FieldError> {
    let text = element_text(element);
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FieldError::InvalidNumber(text)),
    }
}

/// Top, heart and base notes keyed by the pyramid's section headings
///
/// Each `<h4>` heading is paired with the next `pyramid-level` block in
/// document order; consecutive headings share that block. A heading without
/// its bold label, or a note cell without its anchor, invalidates the whole
/// pyramid.
fn extract_pyramid(document: &Html) -> Result<ScentPyramid, FieldError> {
    let pyramid_sel = selector("div#pyramid")?;
    let label_sel = selector("b")?;

    let mut pyramid = ScentPyramid::default();

    let Some(container) = document.select(&pyramid_sel).next() else {
        return Ok(pyramid);
    };

    let mut pending_headings: Vec<String> = Vec::new();

    for node in container.descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };

        match element.value().name() {
            "h4" => {
                let label = element
                    .select(&label_sel)
                    .next()
                    .ok_or(FieldError::MissingElement("pyramid section label"))?;
                pending_headings.push(element_text(label));
            }
            "pyramid-level" => {
                if pending_headings.is_empty() {
                    continue;
                }
                let notes = extract_notes(element)?;
                for heading in pending_headings.drain(..) {
                    match Tier::from_heading(&heading) {
                        Some(Tier::Top) => pyramid.top = notes.clone(),
                        Some(Tier::Heart) => pyramid.heart = notes.clone(),
                        Some(Tier::Base) => pyramid.base = notes.clone(),
                        None => tracing::debug!("Ignoring pyramid section '{}'", heading),
                    }
                }
            }
            _ => {}
        }
    }

    Ok(pyramid)
}

/// Note names of one tier: the text right after each note cell's anchor
fn extract_notes(level: ElementRef<'_>) -> Result<Vec<String>, FieldError> {
    let cell_sel = selector("div")?;
    let anchor_sel = selector("a")?;

    let mut notes = Vec::new();

    let cells = level.select(&cell_sel).filter(|cell| {
        cell.value()
            .attr("style")
            .is_some_and(|style| style.contains(NOTE_CELL_STYLE))
    });

    for cell in cells {
        let anchor = cell
            .select(&anchor_sel)
            .next()
            .ok_or(FieldError::MissingElement("note anchor"))?;

        let note = anchor
            .next_sibling()
            .and_then(|node| node.value().as_text().map(|text| text.trim().to_string()));

        if let Some(note) = note.filter(|n| !n.is_empty()) {
            notes.push(note);
        }
    }

    Ok(notes)
}

fn extract_longevity(document: &Html) -> Result<Option<String>, FieldError> {
    first_text(document, "div.longevity-box")
}

fn extract_year(document: &Html) -> Result<Option<String>, FieldError> {
    first_text(document, r#"span[itemprop="dateCreated"]"#)
}

fn extract_gender(document: &Html) -> Result<Option<String>, FieldError> {
    first_text(document, "div.gender-box")
}
