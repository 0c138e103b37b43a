//! Parse HTTP response header lines into a [`HeadResponse`].

/// Headers of the final response of a HEAD request (after redirects).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct HeadResponse {
    pub status: Option<u32>,
    pub content_length: Option<u64>,
    /// `total` from `Content-Range: bytes start-end/total`.
    pub content_range_total: Option<u64>,
    pub accept_ranges: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_disposition: Option<String>,
}

impl HeadResponse {
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }
}

/// Parse collected header lines. libcurl hands over the headers of every
/// response in a redirect chain, so each status line starts over.
pub(crate) fn parse_headers<S: AsRef<str>>(lines: &[S]) -> HeadResponse {
    let mut out = HeadResponse::default();

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            out = HeadResponse {
                status: parse_status_line(line),
                ..HeadResponse::default()
            };
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            out.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("content-range") {
            out.content_range_total = parse_content_range_total(value);
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            out.accept_ranges = value
                .split(',')
                .any(|unit| unit.trim().eq_ignore_ascii_case("bytes"));
        } else if name.eq_ignore_ascii_case("etag") {
            out.etag = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("last-modified") {
            out.last_modified = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-disposition") {
            out.content_disposition = Some(value.to_string());
        }
    }

    out
}

/// `HTTP/1.1 206 Partial Content` → `Some(206)`.
fn parse_status_line(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Total length from a `Content-Range` value. `bytes 0-0/12345` → `Some(12345)`;
/// an unknown total (`*`) or malformed value → `None`.
pub(crate) fn parse_content_range_total(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix("bytes")?;
    let (_, total) = rest.rsplit_once('/')?;
    total.trim().parse().ok()
}
