/// DISDRODB active configuration.
///
/// Resolves the archive base directory used by every routine. Resolution
/// order: explicit `--base-dir` argument, then the `DISDRODB_BASE_DIR`
/// environment variable (a `.env` file is honored), then the optional
/// `disdrodb.toml` file in the working directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::{DisdrodbError, Result};

/// Name of the optional configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "disdrodb.toml";

/// Environment variable pointing at the archive base directory.
pub const BASE_DIR_ENV: &str = "DISDRODB_BASE_DIR";

#[derive(Debug, Deserialize)]
struct ConfigFile {
    base_dir: Option<String>,
}

/// Resolves the DISDRODB base directory.
///
/// The returned path is checked to exist and be a directory, so callers can
/// build archive paths from it without re-validating.
pub fn resolve_base_dir(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return check_base_dir(Path::new(dir));
    }

    // Load a .env file if present, then consult the environment.
    dotenv::dotenv().ok();
    if let Ok(dir) = std::env::var(BASE_DIR_ENV) {
        return check_base_dir(Path::new(&dir));
    }

    // Fall back to the configuration file.
    if let Some(dir) = read_config_file(Path::new(CONFIG_FILE_NAME))? {
        return check_base_dir(Path::new(&dir));
    }

    Err(DisdrodbError::InvalidArchive(format!(
        "no base directory configured: pass --base-dir, set {}, or create {}",
        BASE_DIR_ENV, CONFIG_FILE_NAME
    )))
}

/// Reads `base_dir` from a TOML configuration file, if the file exists.
fn read_config_file(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&content)
        .map_err(|e| DisdrodbError::InvalidArchive(format!("invalid {}: {}", path.display(), e)))?;
    Ok(config.base_dir)
}

fn check_base_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(DisdrodbError::InvalidArchive(format!(
            "base directory {} does not exist or is not a directory",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
