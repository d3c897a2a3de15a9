//! Per-file and batch entry points that read, adjust and write drill files.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::drill::{adjust_text, name_marks_adjusted, output_path, CoordinatePattern};
use crate::error::AdjustError;
use crate::quadrupole::QuadrupoleModel;
use crate::report::{report, MessageSink, Severity};

/// Outcome of a successfully adjusted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// File that was read.
    pub input: PathBuf,
    /// File that was written.
    pub output: PathBuf,
    /// Number of coordinate pairs corrected.
    pub adjusted_count: usize,
}

/// A file left alone because it was already handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// File that was skipped.
    pub input: PathBuf,
    /// Why it was skipped.
    pub reason: &'static str,
}

/// A file that could not be adjusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    /// File that failed.
    pub input: PathBuf,
    /// Error description.
    pub message: String,
}

/// Per-file outcomes of a batch, in processing order within each list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files written.
    pub adjusted: Vec<FileReport>,
    /// Files skipped with a warning.
    pub skipped: Vec<SkippedFile>,
    /// Files that failed with an error.
    pub failed: Vec<FailedFile>,
}

impl BatchSummary {
    /// True when at least one file failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Total coordinate pairs corrected across the batch.
    pub fn adjusted_pairs(&self) -> usize {
        self.adjusted.iter().map(|r| r.adjusted_count).sum()
    }

    fn record(&mut self, input: &Path, result: Result<FileReport, AdjustError>) {
        match result {
            Ok(report) => self.adjusted.push(report),
            Err(err) => match err.skip_reason() {
                Some(reason) => self.skipped.push(SkippedFile {
                    input: input.to_path_buf(),
                    reason,
                }),
                None => self.failed.push(FailedFile {
                    input: input.to_path_buf(),
                    message: err.to_string(),
                }),
            },
        }
    }
}

/// Applies one quadrupole correction to drill files.
#[derive(Debug, Clone)]
pub struct FileAdjuster {
    model: QuadrupoleModel,
    pattern: CoordinatePattern,
}

impl FileAdjuster {
    /// Creates an adjuster for `model`.
    ///
    /// # Errors
    ///
    /// Returns [`AdjustError::Pattern`] if the line pattern fails to compile.
    pub fn new(model: QuadrupoleModel) -> Result<Self, AdjustError> {
        Ok(Self {
            model,
            pattern: CoordinatePattern::new()?,
        })
    }

    /// The correction this adjuster applies.
    pub const fn model(&self) -> &QuadrupoleModel {
        &self.model
    }

    /// Adjusts one drill file, writing `<name>Adjusted.txt` next to it.
    ///
    /// The input is never modified and an existing output is never
    /// overwritten. The outcome is also reported to `sink`: info on
    /// success, a warning for a skip, an error for a failure.
    ///
    /// # Errors
    ///
    /// Returns the skip reason or failure as an [`AdjustError`]; see
    /// [`AdjustError::severity`].
    pub fn process_file(
        &self,
        path: &Path,
        sink: Option<&dyn MessageSink>,
    ) -> Result<FileReport, AdjustError> {
        let result = self.adjust_file(path);
        match &result {
            Ok(done) => report(sink, &success_message(done), Severity::Info),
            Err(err) => report(sink, &err.to_string(), err.severity()),
        }
        result
    }

    /// Adjusts each path in order; one file's failure never stops the rest.
    pub fn process_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
        sink: Option<&dyn MessageSink>,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for path in paths {
            let path = path.as_ref();
            summary.record(path, self.process_file(path, sink));
        }
        summary
    }

    fn adjust_file(&self, path: &Path) -> Result<FileReport, AdjustError> {
        let base_name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| AdjustError::InvalidPath(path.to_path_buf()))?;
        if name_marks_adjusted(base_name) {
            return Err(AdjustError::NameMarkedAdjusted {
                input: path.to_path_buf(),
            });
        }

        let output =
            output_path(path).ok_or_else(|| AdjustError::InvalidPath(path.to_path_buf()))?;
        if output.exists() {
            return Err(AdjustError::OutputExists {
                input: path.to_path_buf(),
                output,
            });
        }

        let bytes = fs::read(path).map_err(|source| AdjustError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|_| AdjustError::NotUtf8 {
            path: path.to_path_buf(),
        })?;

        let adjusted = adjust_text(path, &text, &self.model, &self.pattern)?;
        write_new_file(&output, adjusted.text.as_bytes()).map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                AdjustError::OutputExists {
                    input: path.to_path_buf(),
                    output: output.clone(),
                }
            } else {
                AdjustError::Output {
                    path: output.clone(),
                    source,
                }
            }
        })?;

        Ok(FileReport {
            input: path.to_path_buf(),
            output,
            adjusted_count: adjusted.adjusted_count,
        })
    }
}

/// Batch entry point for callers that may have no model.
///
/// With `model == None` (configuration failed) nothing is processed and
/// nothing is reported.
///
/// # Errors
///
/// Returns [`AdjustError::Pattern`] if the line pattern fails to compile.
pub fn process_files<P: AsRef<Path>>(
    model: Option<&QuadrupoleModel>,
    paths: &[P],
    sink: Option<&dyn MessageSink>,
) -> Result<BatchSummary, AdjustError> {
    let Some(model) = model else {
        return Ok(BatchSummary::default());
    };
    Ok(FileAdjuster::new(*model)?.process_files(paths, sink))
}

// `create_new` keeps a file created after the existence check intact; a
// failed write removes what it created.
fn write_new_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let written = file.write_all(contents).and_then(|()| file.flush());
    if let Err(err) = written {
        drop(file);
        // The write error is the one worth reporting.
        let _ = fs::remove_file(path);
        return Err(err);
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn success_message(done: &FileReport) -> String {
    format!(
        "Wrote {}; adjusted {} x,y positions from {}",
        display_name(&done.output),
        done.adjusted_count,
        display_name(&done.input)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MessageLog;

    #[allow(clippy::expect_used)]
    fn adjuster(magnitude: f64) -> FileAdjuster {
        let model = QuadrupoleModel::from_magnitude_angle(magnitude, 12.0).expect("valid model");
        FileAdjuster::new(model).expect("coordinate pattern compiles")
    }

    #[allow(clippy::expect_used)]
    fn scratch() -> tempfile::TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn writes_adjusted_file_next_to_input() {
        let dir = scratch();
        let input = dir.path().join("plSouthFanucUnadjusted-0101.par");
        fs::write(&input, "h1\nh2\nG60 X1 Y2\nG60 X-3 Y4\n").expect("write input");

        let log = MessageLog::new();
        let result = adjuster(0.0).process_file(&input, Some(&log));
        assert!(result.is_ok(), "expected Ok, got {:?}", result.as_ref().err());

        let report = result.expect("checked above");
        assert_eq!(report.adjusted_count, 2);
        assert_eq!(
            report.output,
            dir.path().join("plSouthFanucAdjusted-0101.txt")
        );
        assert!(report.output.is_file());
        assert_eq!(log.count(Severity::Info), 1);
        assert!(log
            .messages()
            .first()
            .is_some_and(|m| m.text.contains("adjusted 2 x,y positions")));
    }

    #[test]
    fn missing_input_is_an_error_without_output() {
        let dir = scratch();
        let input = dir.path().join("plFanuc-0002.par");

        let log = MessageLog::new();
        let result = adjuster(1e-7).process_file(&input, Some(&log));
        assert!(matches!(result, Err(AdjustError::Input { .. })));
        assert_eq!(log.count(Severity::Error), 1);
        assert!(!dir.path().join("plFanuc-0002Adjusted.txt").exists());
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn non_utf8_input_is_rejected() {
        let dir = scratch();
        let input = dir.path().join("plFanuc-0003.par");
        fs::write(&input, [0xff, 0xfe, b'\n']).expect("write input");

        let result = adjuster(0.0).process_file(&input, None);
        assert!(matches!(result, Err(AdjustError::NotUtf8 { .. })));
        assert!(!dir.path().join("plFanuc-0003Adjusted.txt").exists());
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn name_marked_adjusted_is_skipped() {
        let dir = scratch();
        let input = dir.path().join("plFanucAdjusted-0004.par");
        fs::write(&input, "h1\nh2\nG60 X1 Y2\n").expect("write input");

        let log = MessageLog::new();
        let result = adjuster(0.0).process_file(&input, Some(&log));
        assert!(matches!(result, Err(AdjustError::NameMarkedAdjusted { .. })));
        assert_eq!(log.count(Severity::Warning), 1);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn late_marker_leaves_no_output() {
        let dir = scratch();
        let input = dir.path().join("plFanuc-0005.par");
        let text = "h1\nh2\nG60 X1 Y2\nG60 X3 Y4\n  (ADJUSTED earlier)\n";
        fs::write(&input, text).expect("write input");

        let result = adjuster(1e-7).process_file(&input, None);
        assert!(matches!(result, Err(AdjustError::AlreadyAdjusted { .. })));
        assert!(!dir.path().join("plFanuc-0005Adjusted.txt").exists());
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn late_inversion_failure_leaves_no_output() {
        let dir = scratch();
        let input = dir.path().join("plFanuc-0006.par");
        let text = format!("h1\nh2\nG60 X1 Y2\nG60 X3 Y4\nG60 X{} Y0\n", "9".repeat(400));
        fs::write(&input, text).expect("write input");

        let log = MessageLog::new();
        let result = adjuster(1e-7).process_file(&input, Some(&log));
        assert!(
            matches!(result, Err(AdjustError::Inversion { line: 5, .. })),
            "got {result:?}"
        );
        assert_eq!(log.count(Severity::Error), 1);
        assert!(!dir.path().join("plFanuc-0006Adjusted.txt").exists());
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn batch_continues_past_failures() {
        let dir = scratch();
        let good = dir.path().join("plFanuc-0010.par");
        let missing = dir.path().join("plFanuc-0011.par");
        let adjusted = dir.path().join("plFanuc-0012.par");
        fs::write(&good, "h1\nh2\nG60 X1 Y2\n").expect("write input");
        fs::write(&adjusted, "h1\n(Adjusted qpMag=0)\n").expect("write input");

        let summary = adjuster(0.0).process_files(&[&missing, &adjusted, &good], None);
        assert_eq!(summary.adjusted.len(), 1);
        assert_eq!(summary.adjusted_pairs(), 1);
        assert_eq!(
            summary.skipped,
            vec![SkippedFile {
                input: adjusted,
                reason: "already adjusted",
            }]
        );
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.has_failures());
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn missing_model_disables_processing() {
        let dir = scratch();
        let input = dir.path().join("plFanuc-0020.par");
        fs::write(&input, "h1\nh2\nG60 X1 Y2\n").expect("write input");

        let log = MessageLog::new();
        let summary = process_files(None, &[&input], Some(&log)).expect("no pattern error");
        assert_eq!(summary, BatchSummary::default());
        assert!(log.messages().is_empty());
        assert!(!dir.path().join("plFanuc-0020Adjusted.txt").exists());
    }
}
