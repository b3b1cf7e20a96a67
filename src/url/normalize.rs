use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a discovered link to its canonical absolute form
///
/// Every item link passes through here before it is inserted into or compared
/// against the discovered set, so that all spellings of one page collapse to a
/// single string.
///
/// # Forms
///
/// | Input | Treatment |
/// |-------|-----------|
/// | `https://host/path` | parsed as-is |
/// | `//host/path` | site scheme prepended |
/// | `/path` or `path` | resolved against the site root |
///
/// The fragment is dropped; the remainder of the URL is kept verbatim apart
/// from the canonicalization the `url` crate performs (lowercase scheme and
/// host, percent-encoding).
///
/// # Examples
///
/// ```
/// use sillage::url::normalize_item_url;
/// use url::Url;
///
/// let site = Url::parse("https://www.fragrantica.es").unwrap();
/// let a = normalize_item_url("/perfume/dior/123.html", &site).unwrap();
/// let b = normalize_item_url("//www.fragrantica.es/perfume/dior/123.html", &site).unwrap();
/// let c = normalize_item_url("https://www.fragrantica.es/perfume/dior/123.html", &site).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(b, c);
/// ```
pub fn normalize_item_url(href: &str, site: &Url) -> UrlResult<String> {
    let href = href.trim();

    if href.is_empty() {
        return Err(UrlError::Parse("empty link".to_string()));
    }

    let mut url = if href.starts_with("http:") || href.starts_with("https:") {
        Url::parse(href)
    } else {
        site.join(href)
    }
    .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    Ok(url.to_string())
}

/// Returns true if the link target points at an item page
pub fn is_item_link(href: &str, item_path_marker: &str) -> bool {
    href.contains(item_path_marker)
}
