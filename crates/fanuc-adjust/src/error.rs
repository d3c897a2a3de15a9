//! Error types for configuration loading, point inversion and file adjustment.

use std::io;
use std::num::ParseFloatError;
use std::path::PathBuf;

use thiserror::Error;

use crate::quadrupole::Point2D;
use crate::report::Severity;

/// Errors raised while loading the quadrupole configuration.
///
/// Any of these disables the whole run: no model is constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file {} not found", .0.display())]
    NotFound(PathBuf),

    /// The configuration file exists but could not be read.
    #[error("could not read config file {}: {source}", .path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The configuration file is not valid INI.
    #[error("invalid config file {}: {message}", .path.display())]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A required section or key is absent.
    #[error("{}: missing [{section}] {key}", .path.display())]
    MissingKey {
        /// Path of the configuration file.
        path: PathBuf,
        /// Section searched.
        section: &'static str,
        /// Key that was not found.
        key: &'static str,
    },

    /// A value is not a floating-point number.
    #[error("{}: {key} = {value:?} is not a number: {source}", .path.display())]
    InvalidNumber {
        /// Path of the configuration file.
        path: PathBuf,
        /// Key holding the value.
        key: &'static str,
        /// Raw value text.
        value: String,
        /// Underlying parse error.
        source: ParseFloatError,
    },

    /// Quadrupole magnitude is negative or not finite.
    #[error("quadrupole magnitude must be finite and >= 0, got {0}")]
    InvalidMagnitude(f64),

    /// Quadrupole angle is not finite.
    #[error("quadrupole angle must be finite, got {0}")]
    InvalidAngle(f64),

    /// Neither `HOME` nor `USERPROFILE` is set.
    #[error("could not determine the home directory")]
    NoHomeDir,
}

/// Errors raised by the numerical inverse of the quadrupole transform.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InversionError {
    /// Newton iteration did not reach the tolerance.
    #[error("inverse did not converge for ({}, {}) after {iterations} iterations (residual {residual:e})", .point.x, .point.y)]
    NoConvergence {
        /// Distorted point being inverted.
        point: Point2D,
        /// Iterations performed.
        iterations: u32,
        /// Forward residual of the last iterate.
        residual: f64,
    },

    /// The forward map folds at the current iterate.
    #[error("quadrupole map is singular near ({}, {})", .point.x, .point.y)]
    SingularJacobian {
        /// Distorted point being inverted.
        point: Point2D,
    },

    /// Input or an iterate is NaN or infinite.
    #[error("non-finite value while inverting ({}, {})", .point.x, .point.y)]
    NonFinite {
        /// Distorted point being inverted.
        point: Point2D,
    },
}

/// Errors raised while adjusting a single drill file.
///
/// Skip reasons ([`AdjustError::OutputExists`], [`AdjustError::AlreadyAdjusted`],
/// [`AdjustError::NameMarkedAdjusted`]) are warnings; the rest are errors.
/// None of them stops a batch.
#[derive(Debug, Error)]
pub enum AdjustError {
    /// The derived output file already exists.
    #[error("Skipping {}: {} already exists", .input.display(), .output.display())]
    OutputExists {
        /// Input file.
        input: PathBuf,
        /// Derived output file that is already present.
        output: PathBuf,
    },

    /// The file content carries an `(Adjusted ...)` annotation.
    #[error("Skipping {}: already adjusted", .input.display())]
    AlreadyAdjusted {
        /// Input file.
        input: PathBuf,
    },

    /// The file name says it is already adjusted.
    #[error("Skipping {}: name marks file as adjusted", .input.display())]
    NameMarkedAdjusted {
        /// Input file.
        input: PathBuf,
    },

    /// The path has no usable file name.
    #[error("invalid drill file path {}", .0.display())]
    InvalidPath(PathBuf),

    /// The input file could not be read.
    #[error("could not read {}: {source}", .path.display())]
    Input {
        /// Input file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The input file is not UTF-8 text.
    #[error("{} is not UTF-8 text", .path.display())]
    NotUtf8 {
        /// Input file.
        path: PathBuf,
    },

    /// The output file could not be written.
    #[error("could not write {}: {source}", .path.display())]
    Output {
        /// Output file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A coordinate pair could not be corrected.
    #[error("line {line}: {source}")]
    Inversion {
        /// 1-based input line number.
        line: usize,
        /// Inversion failure.
        source: InversionError,
    },

    /// A coordinate field matched the pattern but is not a number.
    #[error("line {line}: invalid coordinate `{raw}`")]
    InvalidCoordinate {
        /// 1-based input line number.
        line: usize,
        /// Offending field text.
        raw: String,
    },

    /// The coordinate-line pattern failed to compile.
    #[error("coordinate pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl AdjustError {
    /// Severity this error is reported with.
    pub const fn severity(&self) -> Severity {
        if self.skip_reason().is_some() {
            Severity::Warning
        } else {
            Severity::Error
        }
    }

    /// Short reason text when the file was skipped rather than failed.
    pub const fn skip_reason(&self) -> Option<&'static str> {
        match self {
            Self::OutputExists { .. } => Some("already exists"),
            Self::AlreadyAdjusted { .. } => Some("already adjusted"),
            Self::NameMarkedAdjusted { .. } => Some("name marks file as adjusted"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_reasons_are_warnings() {
        let exists = AdjustError::OutputExists {
            input: PathBuf::from("a.par"),
            output: PathBuf::from("aAdjusted.txt"),
        };
        assert_eq!(exists.severity(), Severity::Warning);
        assert_eq!(exists.skip_reason(), Some("already exists"));

        let adjusted = AdjustError::AlreadyAdjusted {
            input: PathBuf::from("a.par"),
        };
        assert_eq!(adjusted.severity(), Severity::Warning);
        assert_eq!(adjusted.skip_reason(), Some("already adjusted"));
    }

    #[test]
    fn io_failures_are_errors() {
        let err = AdjustError::Input {
            path: PathBuf::from("missing.par"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.severity(), Severity::Error);
        assert!(err.skip_reason().is_none());
        assert!(err.to_string().contains("missing.par"));
    }
}
