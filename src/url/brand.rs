/// Derives the brand from an item URL
///
/// The brand is the path segment directly after the item path marker, with
/// hyphens turned into spaces. Returns `None` when the marker is absent or is
/// not followed by a complete segment.
///
/// # Examples
///
/// ```
/// use sillage::url::brand_from_url;
///
/// let brand = brand_from_url("https://site/perfume/some-brand/12345.html", "/perfume/");
/// assert_eq!(brand.as_deref(), Some("some brand"));
/// ```
pub fn brand_from_url(url: &str, item_path_marker: &str) -> Option<String> {
    let (_, rest) = url.split_once(item_path_marker)?;
    let (segment, _) = rest.split_once('/')?;

    if segment.is_empty() {
        return None;
    }

    Some(segment.replace('-', " "))
}
