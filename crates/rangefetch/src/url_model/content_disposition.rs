//! Content-Disposition header parsing (`filename` and `filename*`).
//!
//! The parser is strictly literal: a parameter value is either a quoted string
//! (backslash escapes honoured) or a bare token. Anything else is rejected and
//! the caller falls back to the URL path.

/// Extracts the filename from a raw Content-Disposition header value.
///
/// Supports:
/// - `filename="value"` (quoted; `\"` and `\\` unescaped)
/// - `filename=value` (bare token: no whitespace, quotes, backslashes or control chars)
/// - `filename*=UTF-8''percent-encoded` (RFC 5987; also ISO-8859-1)
///
/// `filename*` takes precedence when both are present and valid. Returns `None`
/// for malformed or empty values.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let mut plain: Option<String> = None;
    let mut extended: Option<String> = None;

    for (name, value) in parse_params(header_value) {
        if name.eq_ignore_ascii_case("filename*") {
            if extended.is_none() {
                extended = decode_ext_value(&value).filter(|s| !s.is_empty());
            }
        } else if name.eq_ignore_ascii_case("filename") && plain.is_none() && !value.is_empty() {
            plain = Some(value);
        }
    }

    extended.or(plain)
}

/// Splits `type; name=value; name="quoted"` into well-formed `(name, value)` pairs.
///
/// Malformed parameters are skipped. An unterminated quoted string ends
/// parsing, since the rest of the header cannot be delimited reliably.
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut rest = match input.split_once(';') {
        Some((_, r)) => r,
        None => return out,
    };

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let eq = rest.find('=');
        let semi = rest.find(';');
        let (name, after) = match (eq, semi) {
            (Some(e), Some(s)) if s < e => {
                // Parameter without a value: skip it.
                rest = &rest[s + 1..];
                continue;
            }
            (Some(e), _) => (rest[..e].trim(), rest[e + 1..].trim_start()),
            (None, _) => break,
        };
        let name_ok = is_token(name);

        if let Some(quoted) = after.strip_prefix('"') {
            let (value, remaining) = match read_quoted(quoted) {
                Some(v) => v,
                None => break,
            };
            let remaining = remaining.trim_start();
            let well_formed = remaining.is_empty() || remaining.starts_with(';');
            if name_ok && well_formed {
                out.push((name.to_string(), value));
            }
            match remaining.find(';') {
                Some(s) => rest = &remaining[s + 1..],
                None => break,
            }
        } else {
            let (raw, remaining) = match after.split_once(';') {
                Some((v, r)) => (v.trim(), Some(r)),
                None => (after.trim(), None),
            };
            if name_ok && is_token(raw) {
                out.push((name.to_string(), raw.to_string()));
            }
            match remaining {
                Some(r) => rest = r,
                None => break,
            }
        }
    }

    out
}

/// Reads a quoted string body (opening quote already consumed). Returns the
/// unescaped value and the input after the closing quote, or `None` if the
/// closing quote is missing.
fn read_quoted(s: &str) -> Option<(String, &str)> {
    let mut value = String::with_capacity(s.len());
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(escaped);
            }
            '"' => return Some((value, &s[i + 1..])),
            c if c.is_control() => return None,
            c => value.push(c),
        }
    }
    None
}

/// Bare token: non-empty, no whitespace, quotes, backslashes or control chars.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| !c.is_whitespace() && !c.is_control() && c != '"' && c != '\\' && c != ';')
}

/// Decodes an RFC 5987 `ext-value`: `charset'language'percent-encoded`.
fn decode_ext_value(v: &str) -> Option<String> {
    let mut parts = v.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;
    let bytes = percent_decode_bytes(encoded);
    if charset.eq_ignore_ascii_case("utf-8") {
        String::from_utf8(bytes).ok()
    } else if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(bytes.into_iter().map(char::from).collect())
    } else {
        None
    }
}

/// Percent-decode to raw bytes. Invalid escapes are kept literally.
pub(super) fn percent_decode_bytes(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
