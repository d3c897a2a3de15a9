//! In-memory adjustment of a whole drill file.
//!
//! The complete output is built in a `String` before anything touches the
//! disk, so a failure on any line leaves no partial output behind.

use std::path::Path;

use crate::error::AdjustError;
use crate::quadrupole::{Point2D, QuadrupoleModel};
use crate::VERSION;

use super::line::CoordinatePattern;

/// Lower-case start of the annotation line written into adjusted files.
pub const ADJUSTED_COMMENT_PREFIX: &str = "(adjusted";

/// Zero-based output position of the annotation line.
pub const ANNOTATION_LINE_INDEX: usize = 2;

const DEFAULT_TERMINATOR: &str = "\n";

/// Result of adjusting one drill file in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustedDrill {
    /// Complete output text, annotation included.
    pub text: String,
    /// Number of coordinate pairs rewritten.
    pub adjusted_count: usize,
    /// Number of input lines.
    pub input_lines: usize,
}

/// Annotation recording the correction parameters and tool version.
pub fn annotation(model: &QuadrupoleModel) -> String {
    let (magnitude, angle) = model.magnitude_angle();
    format!("(Adjusted qpMag={magnitude} qpAngle={angle} version={VERSION})")
}

/// True when `line` is an adjustment annotation, ignoring case and indentation.
pub fn is_adjusted_marker(line: &str) -> bool {
    line.trim_start()
        .get(..ADJUSTED_COMMENT_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(ADJUSTED_COMMENT_PREFIX))
}

/// Applies the inverse quadrupole correction to every coordinate line of `text`.
///
/// Lines end at `\r\n`, `\n` or a lone `\r`. Non-coordinate lines are
/// copied verbatim, line terminators are kept, and the [`annotation`] is inserted before the third line (or appended
/// when the file is shorter). `source` only labels errors.
///
/// # Errors
///
/// Returns [`AdjustError::AlreadyAdjusted`] if any line is an annotation,
/// [`AdjustError::InvalidCoordinate`] for an unparsable field, and
/// [`AdjustError::Inversion`] if a point cannot be corrected.
pub fn adjust_text(
    source: &Path,
    text: &str,
    model: &QuadrupoleModel,
    pattern: &CoordinatePattern,
) -> Result<AdjustedDrill, AdjustError> {
    let note = annotation(model);
    let mut out = String::with_capacity(text.len() + note.len() + 2);
    let mut terminator = None;
    let mut adjusted_count = 0;
    let mut input_lines = 0;
    let mut last_terminated = true;

    for (index, (content, line_end)) in split_lines(text).enumerate() {
        let line_number = index + 1;
        input_lines = line_number;
        last_terminated = !line_end.is_empty();

        if terminator.is_none() && !line_end.is_empty() {
            terminator = Some(line_end);
        }

        if is_adjusted_marker(content) {
            return Err(AdjustError::AlreadyAdjusted {
                input: source.to_path_buf(),
            });
        }

        if index == ANNOTATION_LINE_INDEX {
            out.push_str(&note);
            out.push_str(terminator.unwrap_or(DEFAULT_TERMINATOR));
        }

        if let Some(coords) = pattern.classify(content) {
            let measured = Point2D::new(
                parse_field(coords.x, line_number)?,
                parse_field(coords.y, line_number)?,
            );
            let corrected = model
                .apply_one(measured, true)
                .map_err(|err| AdjustError::Inversion {
                    line: line_number,
                    source: err,
                })?;
            out.push_str(&coords.rewrite(corrected));
            adjusted_count += 1;
        } else {
            out.push_str(content);
        }
        out.push_str(line_end);
    }

    if input_lines <= ANNOTATION_LINE_INDEX {
        let line_end = terminator.unwrap_or(DEFAULT_TERMINATOR);
        if !last_terminated {
            out.push_str(line_end);
        }
        out.push_str(&note);
        out.push_str(line_end);
    }

    Ok(AdjustedDrill {
        text: out,
        adjusted_count,
        input_lines,
    })
}

/// Yields `(content, terminator)` for each line; the last may have no terminator.
fn split_lines<'a>(text: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(end) = rest.find(|c: char| c == '\r' || c == '\n') else {
            let line = rest;
            rest = "";
            return Some((line, ""));
        };
        let (content, tail) = rest.split_at(end);
        let width = if tail.starts_with("\r\n") { 2 } else { 1 };
        let (line_end, next) = tail.split_at(width);
        rest = next;
        Some((content, line_end))
    })
}

fn parse_field(raw: &str, line: usize) -> Result<f64, AdjustError> {
    raw.parse::<f64>()
        .map_err(|_| AdjustError::InvalidCoordinate {
            line,
            raw: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::expect_used)]
    fn setup(magnitude: f64, angle: f64) -> (QuadrupoleModel, CoordinatePattern) {
        (
            QuadrupoleModel::from_magnitude_angle(magnitude, angle).expect("valid model"),
            CoordinatePattern::new().expect("coordinate pattern compiles"),
        )
    }

    fn run(text: &str, magnitude: f64) -> Result<AdjustedDrill, AdjustError> {
        let (model, pattern) = setup(magnitude, 0.0);
        adjust_text(Path::new("plFanuc-1.par"), text, &model, &pattern)
    }

    #[test]
    fn annotation_goes_before_third_line() {
        let result = run("header1\nheader2\nG60 X10.12345 Y-3.4 ;comment\n", 0.0);
        assert!(result.is_ok(), "expected Ok, got {:?}", result.as_ref().err());
        if let Ok(adjusted) = result {
            let lines: Vec<&str> = adjusted.text.lines().collect();
            assert_eq!(lines.len(), 4);
            assert_eq!(lines.first(), Some(&"header1"));
            assert_eq!(lines.get(1), Some(&"header2"));
            assert_eq!(
                lines.get(2).copied(),
                Some(format!("(Adjusted qpMag=0 qpAngle=0 version={VERSION})").as_str())
            );
            assert_eq!(lines.get(3), Some(&"G60 X10.12345 Y-3.40000 ;comment"));
            assert_eq!(adjusted.adjusted_count, 1);
            assert_eq!(adjusted.input_lines, 3);
        }
    }

    #[test]
    fn crlf_terminators_are_preserved() {
        let result = run("a\r\nb\r\nG60 X1 Y2\r\nM30", 0.0);
        assert!(result.is_ok());
        if let Ok(adjusted) = result {
            assert!(adjusted
                .text
                .starts_with("a\r\nb\r\n(Adjusted qpMag=0 qpAngle=0 version="));
            assert!(adjusted.text.ends_with(")\r\nG60 X1.00000 Y2.00000\r\nM30"));
        }
    }

    #[test]
    fn carriage_return_only_lines_are_split() {
        let result = run("h1\rh2\rG60 X300 Y0\rG60 X200 Y0\r", 1e-6);
        assert!(result.is_ok(), "expected Ok, got {:?}", result.as_ref().err());
        if let Ok(adjusted) = result {
            assert_eq!(adjusted.input_lines, 4);
            assert_eq!(adjusted.adjusted_count, 2);
            assert!(adjusted.text.starts_with("h1\rh2\r(Adjusted qpMag="));
            assert!(!adjusted.text.contains('\n'));
            assert!(!adjusted.text.contains("X300 "));
            assert!(!adjusted.text.contains("X200 "));
            assert_eq!(adjusted.text.matches('\r').count(), 5);
        }
    }

    #[test]
    fn carriage_return_only_marker_is_detected() {
        let result = run("h1\rh2\rG60 X300 Y0\rG60 X200 Y0\r(Adjusted x)\r", 1e-6);
        assert!(
            matches!(result, Err(AdjustError::AlreadyAdjusted { .. })),
            "got {result:?}"
        );
    }

    #[test]
    fn mixed_terminators_are_kept_per_line() {
        let lines: Vec<(&str, &str)> = split_lines("a\r\nb\rc\nd").collect();
        assert_eq!(
            lines,
            vec![("a", "\r\n"), ("b", "\r"), ("c", "\n"), ("d", "")]
        );
        assert_eq!(split_lines("").count(), 0);
        assert_eq!(split_lines("\r\r").collect::<Vec<_>>(), vec![("", "\r"), ("", "\r")]);
    }

    #[test]
    fn short_file_gets_annotation_appended() {
        let result = run("G60 X1 Y2", 0.0);
        assert!(result.is_ok());
        if let Ok(adjusted) = result {
            let lines: Vec<&str> = adjusted.text.lines().collect();
            assert_eq!(lines.len(), 2);
            assert_eq!(lines.first(), Some(&"G60 X1.00000 Y2.00000"));
            assert!(lines.get(1).is_some_and(|l| is_adjusted_marker(l)));
        }
    }

    #[test]
    fn empty_file_gets_only_the_annotation() {
        let result = run("", 0.0);
        assert!(result.is_ok());
        if let Ok(adjusted) = result {
            assert_eq!(adjusted.input_lines, 0);
            assert_eq!(adjusted.adjusted_count, 0);
            assert!(is_adjusted_marker(&adjusted.text));
            assert!(adjusted.text.ends_with('\n'));
        }
    }

    #[test]
    fn already_adjusted_content_is_refused() {
        for marker in ["(Adjusted qpMag=1e-7)", "   (ADJUSTED by hand)", "\t(adjusted"] {
            let text = format!("h1\nh2\nG60 X1 Y2\n{marker}\nG60 X3 Y4\n");
            let result = run(&text, 1e-7);
            assert!(
                matches!(result, Err(AdjustError::AlreadyAdjusted { .. })),
                "marker {marker:?} not detected"
            );
        }
    }

    #[test]
    fn marker_must_start_the_line() {
        assert!(!is_adjusted_marker("G60 X1 Y2 (adjusted)"));
        assert!(!is_adjusted_marker("(adjust"));
        assert!(is_adjusted_marker("  (Adjusted qpMag=0"));
    }

    #[test]
    fn non_coordinate_lines_are_copied_verbatim() {
        let text = "%\nO0050 (plate 50)\nG90 G21\n  odd   spacing \nM30\n";
        let result = run(text, 1e-6);
        assert!(result.is_ok());
        if let Ok(adjusted) = result {
            assert_eq!(adjusted.adjusted_count, 0);
            let without_note: Vec<&str> = adjusted
                .text
                .lines()
                .filter(|l| !is_adjusted_marker(l))
                .collect();
            assert_eq!(without_note, text.lines().collect::<Vec<_>>());
        }
    }

    #[test]
    fn coordinates_move_by_inverse_correction() {
        let (model, pattern) = setup(1e-6, 0.0);
        let result = adjust_text(
            Path::new("plFanuc-1.par"),
            "h1\nh2\nG60 X300 Y0\n",
            &model,
            &pattern,
        );
        assert!(result.is_ok());
        if let Ok(adjusted) = result {
            // Along the quadrupole axis the field is purely radial: x + m x^2 = 300,
            // so x = (sqrt(1 + 4 m 300) - 1) / 2m.
            let expected = (1.0012_f64.sqrt() - 1.0) / 2e-6;
            let expected_line = format!("G60 X{expected:.5} Y0.00000");
            assert!(
                adjusted.text.contains(&expected_line),
                "missing {expected_line} in {}",
                adjusted.text
            );
        }
    }

    #[test]
    fn inversion_failure_reports_line_number() {
        let result = run("h1\nh2\nG60 X1e999 Y0\n", 1e-6);
        // `1e999` is not a coordinate field, so the line passes through.
        assert!(result.is_ok());

        let huge = format!("h1\nG60 X{} Y0\n", "9".repeat(400));
        let result = run(&huge, 1e-6);
        assert!(
            matches!(result, Err(AdjustError::Inversion { line: 2, .. })),
            "got {result:?}"
        );
    }
}
