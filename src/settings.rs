use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "folio";

/// Persisted configuration. Deliberately small: the readable content
/// palette is not here because it is not a preference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory the picker lists `.epub` files from.
    #[serde(default = "default_library_dir")]
    pub library_dir: String,

    /// Horizontal margin, in cells, around the page content.
    #[serde(default = "default_margin")]
    pub margin: u16,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_library_dir() -> String {
    ".".to_string()
}

fn default_margin() -> u16 {
    2
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            library_dir: default_library_dir(),
            margin: default_margin(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(SETTINGS_FILENAME))
    }

    /// Load from the default location. A missing or malformed file falls
    /// back to defaults; configuration problems never stop the viewer.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        match serde_yaml::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("ignoring malformed settings at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("no config directory on this platform"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load_from(Path::new("/no/such/config.yaml"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "{{{ not yaml").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn partial_file_fills_the_rest_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "library_dir: /books\n").unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.library_dir, "/books");
        assert_eq!(settings.margin, default_margin());
        assert_eq!(settings.version, CURRENT_VERSION);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);

        let settings = Settings {
            version: CURRENT_VERSION,
            library_dir: "/books".into(),
            margin: 6,
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }
}
