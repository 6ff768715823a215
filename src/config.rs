//! Runtime settings: built-in defaults, optionally overridden by a JSON file
//! and then by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::{Encoding, FileReader, HeaderMode};
use crate::map::builder::{check_zoom, MapOptions, DEFAULT_ICON_SIZE};
use crate::map::{madrid_central_polygon, Tiles, DEFAULT_INITIAL_LOCATION, DEFAULT_ZOOM};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Directories
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub icons_dir: PathBuf,

    // Map
    pub initial_location: (f64, f64),
    pub zoom: u8,
    pub tiles: Tiles,
    pub default_icon: String,
    pub icon_size: (u32, u32),
    /// GeoJSON rings (`[lon, lat]`) drawn by `--polygon`.
    pub polygon: Vec<Vec<[f64; 2]>>,
    pub polygon_popup: String,

    // File reader, in probing order
    pub separators: Vec<char>,
    pub encodings: Vec<Encoding>,
    pub header: HeaderMode,

    /// `error`, `warn`, `info`, `debug` or `trace`. `RUST_LOG` takes precedence.
    pub log_level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("./resources/data/"),
            output_dir: PathBuf::from("./generated_maps/"),
            icons_dir: PathBuf::from("./resources/images/icons/"),
            initial_location: DEFAULT_INITIAL_LOCATION,
            zoom: DEFAULT_ZOOM,
            tiles: Tiles::default(),
            default_icon: "forecast.png".to_string(),
            icon_size: DEFAULT_ICON_SIZE,
            polygon: madrid_central_polygon(),
            polygon_popup: "Área de Madrid Central".to_string(),
            separators: vec![',', ';'],
            encodings: vec![Encoding::Utf8, Encoding::Latin1],
            header: HeaderMode::Infer,
            log_level: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path.as_ref()))?;

        let settings: Self =
            serde_json::from_str(&content).context("Failed to parse settings JSON")?;

        Ok(settings)
    }

    /// Defaults, or the given file when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_zoom(self.zoom)?;

        let (lat, lon) = self.initial_location;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            anyhow::bail!("Initial location {:?} is not a valid (lat, lon)", self.initial_location);
        }
        if self.separators.is_empty() {
            anyhow::bail!("At least one file separator must be configured");
        }
        if let Some(sep) = self.separators.iter().find(|c| !c.is_ascii()) {
            anyhow::bail!("File separator '{sep}' is not an ASCII character");
        }
        if self.encodings.is_empty() {
            anyhow::bail!("At least one file encoding must be configured");
        }
        if self.icon_size.0 == 0 || self.icon_size.1 == 0 {
            anyhow::bail!("Icon size must be positive, got {:?}", self.icon_size);
        }
        if let Some(level) = &self.log_level {
            level
                .parse::<log::LevelFilter>()
                .map_err(|_| anyhow::anyhow!("Unknown log level '{level}'"))?;
        }

        Ok(())
    }

    pub fn file_reader(&self) -> FileReader {
        FileReader::new(
            self.data_dir.clone(),
            self.separators.clone(),
            self.encodings.clone(),
            self.header,
        )
    }

    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            location: self.initial_location,
            zoom: self.zoom,
            tiles: self.tiles.clone(),
            output_dir: self.output_dir.clone(),
            icons_dir: self.icons_dir.clone(),
            icon_size: self.icon_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.zoom, 13);
        assert_eq!(settings.separators, vec![',', ';']);
        assert_eq!(settings.polygon[0].len(), 15);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"{{"zoom": 11, "encodings": ["latin1"], "header": "none",
                "tiles": "CartoDB positron"}}"#
        )
        .unwrap();
        temp_file.flush().unwrap();

        let settings = Settings::load(Some(temp_file.path())).unwrap();
        assert_eq!(settings.zoom, 11);
        assert_eq!(settings.encodings, vec![Encoding::Latin1]);
        assert_eq!(settings.header, HeaderMode::None);
        assert_eq!(settings.tiles, Tiles::Named("CartoDB positron".into()));
        assert_eq!(settings.default_icon, "forecast.png");
    }

    #[test]
    fn test_serialized_settings_load_back() {
        let temp_file = NamedTempFile::new().unwrap();
        let settings = Settings {
            zoom: 9,
            log_level: Some("debug".into()),
            ..Settings::default()
        };

        let json = serde_json::to_string_pretty(&settings).unwrap();
        fs::write(temp_file.path(), json).unwrap();
        let loaded = Settings::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_validation_errors() {
        let bad_zoom = Settings {
            zoom: 0,
            ..Settings::default()
        };
        assert!(bad_zoom.validate().is_err());

        let no_encodings = Settings {
            encodings: Vec::new(),
            ..Settings::default()
        };
        assert!(no_encodings.validate().is_err());

        let bad_level = Settings {
            log_level: Some("loud".into()),
            ..Settings::default()
        };
        assert!(bad_level.validate().is_err());
    }

    #[test]
    fn test_unknown_encoding_in_file_is_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, r#"{{"encodings": ["ebcdic"]}}"#).unwrap();
        temp_file.flush().unwrap();

        assert!(Settings::load_from_file(temp_file.path()).is_err());
    }
}
