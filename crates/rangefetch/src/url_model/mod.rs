//! URL modeling and filename derivation.
//!
//! Picks the local filename for a download from the Content-Disposition
//! header, the URL path, or a timestamp placeholder, in that order.

mod content_disposition;
mod path;
mod sanitize;

pub use content_disposition::parse_content_disposition_filename;
pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename;

use std::time::{SystemTime, UNIX_EPOCH};

/// Placeholder name used when neither the header nor the URL yields a usable name:
/// `download-<unix seconds>.bin`.
pub fn fallback_filename() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("download-{}.bin", secs)
}

/// Derives a safe filename for saving a download.
///
/// Order: `content_disposition` filename (if present and well-formed), then the
/// last path segment of `url` without its query string, then
/// [`fallback_filename`]. A malformed header never fails resolution; it only
/// falls through. The result is sanitized.
///
/// # Examples
///
/// - `derive_filename("https://example.com/archive.zip", None)` → `"archive.zip"`
/// - `derive_filename("https://example.com/", Some("attachment; filename=\"report.pdf\""))` → `"report.pdf"`
pub fn derive_filename(url: &str, content_disposition: Option<&str>) -> String {
    let from_header = content_disposition
        .and_then(parse_content_disposition_filename)
        .map(|s| sanitize_filename(&s))
        .filter(|s| !s.is_empty());
    if let Some(name) = from_header {
        return name;
    }

    filename_from_url_path(url)
        .map(|s| sanitize_filename(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(fallback_filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_path_names_the_file() {
        assert_eq!(derive_filename("https://example.com/archive.zip", None), "archive.zip");
        assert_eq!(
            derive_filename("https://cdn.example.com/a/b/tensorflow-2.3.1.whl?sig=abc#sha256=1f", None),
            "tensorflow-2.3.1.whl"
        );
        assert_eq!(
            derive_filename("https://example.com/%5Bsub%5D%20ep01.mp4", None),
            "[sub] ep01.mp4"
        );
    }

    #[test]
    fn header_name_wins_over_url() {
        let cases = [
            ("attachment; filename=\"report.pdf\"", "report.pdf"),
            ("attachment; filename=plain.bin", "plain.bin"),
            ("inline; filename*=UTF-8''na%C3%AFve.txt", "naïve.txt"),
        ];
        for (header, want) in cases {
            assert_eq!(derive_filename("https://example.com/archive.zip", Some(header)), want);
        }
    }

    #[test]
    fn malformed_header_falls_through_to_url() {
        for header in ["attachment; filename=\"broken", "attachment; filename=two words", "attachment"] {
            assert_eq!(
                derive_filename("https://example.com/archive.zip", Some(header)),
                "archive.zip",
                "{}",
                header
            );
        }
    }

    #[test]
    fn header_path_components_are_neutralised() {
        assert_eq!(
            derive_filename("https://example.com/a.bin", Some("attachment; filename=\"../../etc/passwd\"")),
            "_.._etc_passwd"
        );
        assert_eq!(
            derive_filename("https://example.com/a.bin", Some("attachment; filename=\"..\"")),
            "a.bin"
        );
    }

    #[test]
    fn nothing_usable_gives_timestamp_placeholder() {
        for url in ["https://example.com/", "https://example.com", "https://example.com/.."] {
            let name = derive_filename(url, None);
            assert!(name.starts_with("download-"), "{} -> {}", url, name);
            assert!(name.ends_with(".bin"));
            assert!(name["download-".len()..name.len() - 4].parse::<u64>().is_ok());
        }
    }
}
