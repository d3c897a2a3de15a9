//! Quadrupole configuration file.
//!
//! An INI file with one section holding the correction coefficients. Keys
//! may be separated from values by `:` or `=`:
//!
//! ```ini
//! [quadrupole]
//! ; 1/length
//! mag: 6.25e-8
//! ; degrees
//! angle: 32
//! ```

use std::path::{Path, PathBuf};

use configparser::ini::Ini;

use crate::error::ConfigError;
use crate::quadrupole::QuadrupoleModel;

/// File name of the configuration in the user's home directory.
pub const CONFIG_FILE_NAME: &str = ".adjustFanucFiles.dat";

/// Section holding the coefficients.
pub const QUADRUPOLE_SECTION: &str = "quadrupole";

/// Parsed configuration file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustConfig {
    /// The `[quadrupole]` section.
    pub quadrupole: QuadrupoleSection,
}

/// Coefficients of the `[quadrupole]` section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadrupoleSection {
    /// Quadrupole magnitude, 1/length.
    pub mag: f64,
    /// Quadrupole angle in degrees.
    pub angle: f64,
}

impl AdjustConfig {
    /// `~/.adjustFanucFiles.dat`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] when no home directory is set.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Reads and parses the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`], [`ConfigError::Read`] or any
    /// error of [`Self::parse`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parses configuration text; `path` only labels errors.
    ///
    /// Section and key names are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on bad syntax,
    /// [`ConfigError::MissingKey`] when the section or a key is absent and
    /// [`ConfigError::InvalidNumber`] for a non-numeric value.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut ini = Ini::new();
        ini.read(contents.to_string())
            .map_err(|message| ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            })?;

        Ok(Self {
            quadrupole: QuadrupoleSection {
                mag: float_value(&ini, path, "mag")?,
                angle: float_value(&ini, path, "angle")?,
            },
        })
    }

    /// Builds the correction model.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMagnitude`] or [`ConfigError::InvalidAngle`].
    pub fn model(&self) -> Result<QuadrupoleModel, ConfigError> {
        QuadrupoleModel::from_magnitude_angle(self.quadrupole.mag, self.quadrupole.angle)
    }
}

/// Loads the configuration at `path` and builds its model.
///
/// # Errors
///
/// Returns any [`ConfigError`]; the caller should then process no files.
pub fn load_model(path: impl AsRef<Path>) -> Result<QuadrupoleModel, ConfigError> {
    AdjustConfig::from_file(path)?.model()
}

fn float_value(ini: &Ini, path: &Path, key: &'static str) -> Result<f64, ConfigError> {
    let value = ini
        .get(QUADRUPOLE_SECTION, key)
        .ok_or_else(|| ConfigError::MissingKey {
            path: path.to_path_buf(),
            section: QUADRUPOLE_SECTION,
            key,
        })?;
    let parsed: Result<f64, _> = value.trim().parse();
    parsed.map_err(|source| ConfigError::InvalidNumber {
        path: path.to_path_buf(),
        key,
        value,
        source,
    })
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
