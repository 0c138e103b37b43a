//! Filesystem-safe filename sanitization.

/// Linux NAME_MAX, in bytes.
const NAME_MAX: usize = 255;

/// Sanitizes a candidate filename before it is joined onto the download directory.
///
/// - Replaces NUL, `/`, `\` and control characters with `_` (runs collapse to one)
/// - Trims leading/trailing whitespace and dots, so the result is never hidden
///   and never `.` or `..`
/// - Limits length to 255 bytes, cutting on a char boundary
///
/// Interior spaces and all other characters are kept.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_replaced = false;

    for c in name.chars() {
        if c == '\0' || c == '/' || c == '\\' || c.is_control() {
            if !prev_replaced {
                out.push('_');
            }
            prev_replaced = true;
        } else {
            out.push(c);
            prev_replaced = false;
        }
    }

    let trimmed = out.trim_matches(|c: char| c.is_whitespace() || c == '.');

    let mut take = trimmed.len().min(NAME_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
