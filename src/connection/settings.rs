//! Settings Storage
//!
//! Loads and saves [`PrinterSettings`] as TOML. The settings store is owned
//! outside the client; the client only reads snapshots of it.

use crate::domain::config::PrinterSettings;
use crate::error::Result;
use crate::helpers::{ensure_dir, get_or_create_config_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the settings file inside the config directory
pub const SETTINGS_FILE: &str = "settings.toml";

/// A read-only source of printer settings
pub trait SettingsSource {
    /// Read the current settings snapshot
    fn load(&self) -> Result<PrinterSettings>;
}

impl SettingsSource for PrinterSettings {
    fn load(&self) -> Result<PrinterSettings> {
        Ok(self.clone())
    }
}

/// TOML settings file
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Settings file in the platform config directory
    pub fn default_location() -> Result<Self> {
        let dir = get_or_create_config_dir()?;
        Ok(Self::new(dir.join(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write settings back to the file
    pub fn save(&self, settings: &PrinterSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let content = toml::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

impl SettingsSource for FileSettings {
    /// A missing or blank file yields defaults
    fn load(&self) -> Result<PrinterSettings> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Settings file not found, using defaults");
            return Ok(PrinterSettings::default());
        }

        let value = fs::read_to_string(&self.path)?;
        if value.trim().is_empty() {
            return Ok(PrinterSettings::default());
        }

        let settings: PrinterSettings = toml::from_str(&value)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("bambu-beacon-{}-{}", std::process::id(), name))
            .join(SETTINGS_FILE)
    }

    #[test]
    fn test_missing_file_is_default() {
        let source = FileSettings::new(temp_path("missing"));
        let settings = source.load().expect("load");
        assert_eq!(settings, PrinterSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("save");
        let source = FileSettings::new(&path);
        let settings = PrinterSettings {
            printer_ip: "10.0.0.7".to_string(),
            serial: "01S00C000000000".to_string(),
            access_code: "abcd1234".to_string(),
            ignore_codes: vec!["HMS_0300_0100_0001_0007".to_string()],
            ..Default::default()
        };

        source.save(&settings).expect("save");
        let loaded = source.load().expect("load");
        assert_eq!(loaded, settings);

        let _ = fs::remove_dir_all(path.parent().expect("parent"));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let path = temp_path("invalid");
        ensure_dir(path.parent().expect("parent")).expect("dir");
        fs::write(&path, "printer_ip = [").expect("write");

        let result = FileSettings::new(&path).load();
        assert!(matches!(result, Err(Error::TomlDe { .. })));

        let _ = fs::remove_dir_all(path.parent().expect("parent"));
    }
}
