//! File System Utilities
//!
//! Configuration and log directory management.

use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const QUALIFIER: &str = "io";
const ORGANIZATION: &str = "bambubeacon";
const APPLICATION: &str = "bambu-beacon";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).ok_or_else(|| Error::Invalid {
        message: "Could not determine project directories".to_string(),
    })
}

/// Get or create the application's configuration directory
///
/// Platform-specific locations:
/// - **Linux**: `~/.config/bambu-beacon/` or `$XDG_CONFIG_HOME/bambu-beacon/`
/// - **macOS**: `~/Library/Application Support/io.bambubeacon.bambu-beacon/`
/// - **Windows**: `C:\Users\<User>\AppData\Roaming\bambubeacon\bambu-beacon\config\`
pub fn get_or_create_config_dir() -> Result<PathBuf> {
    let project_dirs = project_dirs()?;
    let config_dir = project_dirs.config_dir();
    ensure_dir(config_dir)?;
    Ok(config_dir.to_path_buf())
}

/// Get or create the data directory, used for log files
pub fn get_or_create_data_dir() -> Result<PathBuf> {
    let project_dirs = project_dirs()?;
    let data_dir = project_dirs.data_dir();
    ensure_dir(data_dir)?;
    Ok(data_dir.to_path_buf())
}

/// Create `dir` (and parents) if it does not exist yet
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Check if running in development mode
pub fn is_development() -> bool {
    cfg!(debug_assertions)
}
