//! Filename extraction from URL path.

use super::content_disposition::percent_decode_bytes;

/// Extracts the last path segment from a URL for use as a filename hint.
///
/// The query string and fragment are ignored and the segment is
/// percent-decoded. Returns `None` if the path is empty or root.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let owned;
    let path = match url::Url::parse(url) {
        Ok(parsed) => {
            owned = parsed.path().to_string();
            owned.as_str()
        }
        // Not an absolute URL: strip query/fragment by hand.
        Err(_) => url.split(['?', '#']).next().unwrap_or(""),
    };
    let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
    let decoded = String::from_utf8_lossy(&percent_decode_bytes(segment)).into_owned();
    if decoded.is_empty() || decoded == "." || decoded == ".." {
        return None;
    }
    Some(decoded)
}
