//! Output file naming for adjusted drill files.

use std::path::{Path, PathBuf};

/// Name fragment marking raw machine output.
pub const UNADJUSTED_MARKER: &str = "Unadjusted";

/// Name fragment marking corrected output.
pub const ADJUSTED_MARKER: &str = "Adjusted";

/// Extension of every adjusted file.
pub const OUTPUT_EXTENSION: &str = "txt";

/// Derives the adjusted base name from an input base name.
///
/// The first case-insensitive `unadjusted` becomes `Adjusted`; a name
/// without it gets `Adjusted` appended. The result always differs from
/// `base_name`.
pub fn output_base_name(base_name: &str) -> String {
    let lower = base_name.to_ascii_lowercase();
    let marker = UNADJUSTED_MARKER.to_ascii_lowercase();
    // ASCII lowercasing keeps byte offsets, so the index is valid in `base_name`.
    match lower.find(&marker) {
        Some(start) => {
            let end = start + marker.len();
            format!(
                "{}{ADJUSTED_MARKER}{}",
                base_name.get(..start).unwrap_or_default(),
                base_name.get(end..).unwrap_or_default()
            )
        }
        None => format!("{base_name}{ADJUSTED_MARKER}"),
    }
}

/// Derives the adjusted file name (`<base>.txt`) from an input file name.
pub fn output_file_name(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    format!("{}.{OUTPUT_EXTENSION}", output_base_name(base))
}

/// Output path next to `input`, or `None` if `input` has no UTF-8 file name.
pub fn output_path(input: &Path) -> Option<PathBuf> {
    let file_name = input.file_name()?.to_str()?;
    Some(input.with_file_name(output_file_name(file_name)))
}

/// True when a base name says the file was already adjusted.
///
/// `plFanucAdjusted-0050` is, `plFanucUnadjusted-0050` is not.
pub fn name_marks_adjusted(base_name: &str) -> bool {
    let lower = base_name.to_ascii_lowercase();
    lower.contains("adjusted") && !lower.contains("unadjusted")
}
