//! Path utilities for locating workspace files in tests.

use std::io::Write;
use std::path::PathBuf;

/// Returns the workspace root directory.
///
/// This is determined by walking up from the test-utils manifest directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Returns the workspace `config/` directory.
pub fn config_dir() -> PathBuf {
    workspace_root().join("config")
}

/// Writes `contents` to a temporary file that is removed when dropped.
pub fn write_temp_file(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

/// Writes [`crate::SRID_CSV`] to a temporary `.csv` file.
pub fn write_srid_csv() -> tempfile::NamedTempFile {
    write_temp_file(crate::SRID_CSV, ".csv")
}
