use crate::UrlError;
use url::Url;

/// Schemes accepted as already present
const KNOWN_SCHEMES: &[&str] = &["http://", "https://"];

/// Scheme prepended to bare hosts
const DEFAULT_SCHEME: &str = "http://";

/// Returns true if the URL already carries an `http://` or `https://` prefix
///
/// The check is ASCII case-insensitive and ignores surrounding whitespace.
pub fn has_scheme(raw: &str) -> bool {
    let trimmed = raw.trim();
    KNOWN_SCHEMES.iter().any(|scheme| {
        trimmed
            .get(..scheme.len())
            .map(|prefix| prefix.eq_ignore_ascii_case(scheme))
            .unwrap_or(false)
    })
}

/// Prefixes `http://` to URLs that lack a scheme
///
/// Pure and idempotent: `ensure_scheme(&ensure_scheme(u)) == ensure_scheme(u)`.
///
/// # Examples
///
/// ```
/// use url_sentry::url::ensure_scheme;
///
/// assert_eq!(ensure_scheme("www.example.com"), "http://www.example.com");
/// assert_eq!(ensure_scheme("https://example.com"), "https://example.com");
/// ```
pub fn ensure_scheme(raw: &str) -> String {
    let trimmed = raw.trim();
    if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME, trimmed)
    }
}

/// Parses a scheme-prefixed URL and checks that it is fetchable over HTTP
///
/// # Returns
///
/// * `Ok(Url)` - Parsed HTTP(S) URL with a host
/// * `Err(UrlError)` - Empty, malformed, or non-HTTP URL
pub fn parse_http_url(normalized: &str) -> Result<Url, UrlError> {
    if normalized.trim().is_empty() {
        return Err(UrlError::Empty);
    }

    let url = Url::parse(normalized).map_err(|e| UrlError::Parse(format!("{}: {}", normalized, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(UrlError::Parse(format!("{}: missing host", normalized)));
    }

    Ok(url)
}
