//! Output file lifecycle.
//!
//! Creates and preallocates `<name>.part`, accepts concurrent positioned
//! writes from the segment fetchers, syncs, and renames to the final name on
//! success. A failed job leaves the `.part` file in place.

mod builder;
mod writer;

pub use builder::StorageWriterBuilder;
pub use writer::StorageWriter;

use std::path::{Path, PathBuf};

/// Temporary file suffix used before the final rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `file.iso` → `file.iso.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}
