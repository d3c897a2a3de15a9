//! Expansion of command-line paths into drill files to adjust.
//!
//! Files named on the command line are taken as given. A directory
//! contributes its `pl*Fanuc*.par` entries (one level, sorted), leaving out
//! hidden files and names already marked adjusted.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::drill::name_marks_adjusted;
use crate::error::AdjustError;

/// True for file names of raw drill files: `pl*Fanuc*.par`, any case.
pub fn is_drill_file_name(file_name: &str) -> bool {
    if file_name.starts_with('.') {
        return false;
    }
    let lower = file_name.to_ascii_lowercase();
    let Some(stem) = lower.strip_suffix(".par") else {
        return false;
    };
    stem.starts_with("pl") && stem.contains("fanuc") && !name_marks_adjusted(stem)
}

/// Expands `args` into the ordered list of files to process.
///
/// # Errors
///
/// Returns [`AdjustError::Input`] if a directory cannot be listed.
pub fn collect_drill_files<P: AsRef<Path>>(args: &[P]) -> Result<Vec<PathBuf>, AdjustError> {
    let mut files = Vec::new();
    for arg in args {
        let arg = arg.as_ref();
        if arg.is_dir() {
            files.extend(drill_files_in(arg)?);
        } else {
            files.push(arg.to_path_buf());
        }
    }
    Ok(files)
}

fn drill_files_in(dir: &Path) -> Result<Vec<PathBuf>, AdjustError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| AdjustError::Input {
            path: dir.to_path_buf(),
            source: err.into(),
        })?;
        let matches = entry.file_name().to_str().is_some_and(is_drill_file_name);
        if matches && entry.path().is_file() {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}
