use crate::UrlError;
use url::Url;

/// Link targets that are never fetched
const EXCLUDED_MARKERS: &[&str] = &["mailto:", "javascript:"];

/// Drops everything from the first `#` onwards
///
/// Applied to every discovered link before admission so that `page#a`,
/// `page#b` and `page` collapse to a single frontier entry.
///
/// # Examples
///
/// ```
/// use kumo_index::url::strip_fragment;
///
/// assert_eq!(strip_fragment("https://example.com/p#a"), "https://example.com/p");
/// assert_eq!(strip_fragment("https://example.com/p"), "https://example.com/p");
/// ```
pub fn strip_fragment(link: &str) -> &str {
    match link.find('#') {
        Some(idx) => &link[..idx],
        None => link,
    }
}

/// Checks a URL against the admission policy and returns its canonical form
///
/// # Admission Rules
///
/// 1. Reject anything containing `mailto:` or `javascript:`
/// 2. Reject anything still carrying a fragment marker (`#`); discovered
///    links are expected to have gone through [`strip_fragment`] first
/// 3. Parse as an absolute URL; relative links must already be resolved
/// 4. Only `http` and `https` schemes with a host are accepted
///
/// The returned string is the `url` crate's serialization, which lowercases
/// the host and gives an empty path a trailing `/`.
///
/// # Examples
///
/// ```
/// use kumo_index::url::admission_url;
///
/// let url = admission_url("http://A.TEST").unwrap();
/// assert_eq!(url, "http://a.test/");
///
/// assert!(admission_url("mailto:someone@a.test").is_err());
/// assert!(admission_url("/relative/path").is_err());
/// ```
pub fn admission_url(raw: &str) -> Result<String, UrlError> {
    let raw = raw.trim();

    if let Some(marker) = EXCLUDED_MARKERS.iter().find(|m| raw.contains(*m)) {
        return Err(UrlError::Excluded(marker.to_string()));
    }

    if raw.contains('#') {
        return Err(UrlError::Excluded("#".to_string()));
    }

    let url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url.to_string())
}
