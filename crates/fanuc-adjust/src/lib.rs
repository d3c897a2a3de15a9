#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::indexing_slicing)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `FanucAdjust`: quadrupole correction of plug-plate Fanuc drill files.
//!
//! The drilling machine misplaces holes by a small 2-fold symmetric
//! (quadrupole) field. This crate inverts that field for every `G60 X.. Y..`
//! line of a drill file and writes the corrected copy as
//! `<name>Adjusted.txt` beside the original.

pub mod config;
pub mod discover;
pub mod drill;
pub mod error;
pub mod processor;
pub mod quadrupole;
pub mod report;

use std::path::Path;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::drill::{adjust_text, name_marks_adjusted, output_file_name, CoordinatePattern};
use crate::error::AdjustError;
use crate::quadrupole::QuadrupoleModel;

/// Version written into every adjustment annotation.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Adjusted drill text returned to JavaScript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdjustedText {
    /// Name the adjusted file should be saved under.
    pub output_name: String,
    /// Complete adjusted file content.
    pub text: String,
    /// Number of coordinate pairs corrected.
    pub adjusted_count: usize,
}

/// Initialize the WASM module. Sets up the panic hook for debugging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Adjust a dropped drill file held in memory.
///
/// Returns [`AdjustedText`] as a `JsValue` via `serde-wasm-bindgen`; saving
/// it is left to the page.
///
/// # Errors
///
/// Returns a descriptive error string if the parameters are invalid, the
/// file is already adjusted, or a coordinate cannot be corrected.
#[wasm_bindgen]
pub fn adjust_drill_text(
    file_name: &str,
    text: &str,
    magnitude: f64,
    angle: f64,
) -> Result<JsValue, JsValue> {
    let adjusted = adjust_drill_text_internal(file_name, text, magnitude, angle)
        .map_err(|e| JsValue::from_str(&e))?;
    serde_wasm_bindgen::to_value(&adjusted).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Internal adjust logic shared between the wasm export and native tests.
///
/// # Errors
///
/// Same as [`adjust_drill_text`], as a plain string.
#[doc(hidden)]
pub fn adjust_drill_text_internal(
    file_name: &str,
    text: &str,
    magnitude: f64,
    angle: f64,
) -> Result<AdjustedText, String> {
    let model = QuadrupoleModel::from_magnitude_angle(magnitude, angle).map_err(|e| e.to_string())?;
    adjust_named_text(Path::new(file_name), text, &model).map_err(|e| e.to_string())
}

fn adjust_named_text(
    path: &Path,
    text: &str,
    model: &QuadrupoleModel,
) -> Result<AdjustedText, AdjustError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| AdjustError::InvalidPath(path.to_path_buf()))?;
    let base_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    if name_marks_adjusted(base_name) {
        return Err(AdjustError::NameMarkedAdjusted {
            input: path.to_path_buf(),
        });
    }

    let pattern = CoordinatePattern::new()?;
    let adjusted = adjust_text(path, text, model, &pattern)?;
    Ok(AdjustedText {
        output_name: output_file_name(file_name),
        text: adjusted.text,
        adjusted_count: adjusted.adjusted_count,
    })
}
