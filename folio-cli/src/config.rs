use crate::error::{CliError, CliResult};
use std::path::{Path, PathBuf};

const CATALOG_FILE: &str = "folio.toml";

/// Walk up from `start` looking for a `folio.toml` file.
fn find_catalog_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CATALOG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Resolve the catalog file: the `--config` override if given, otherwise
/// the nearest `folio.toml` walking up from the current directory.
pub fn require_catalog_path(config_override: Option<&Path>) -> CliResult<PathBuf> {
    if let Some(p) = config_override {
        return Ok(p.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|_| CliError::NoCatalog)?;
    find_catalog_from(&cwd).ok_or(CliError::NoCatalog)
}
