//! Experiment-tracking sinks.
//!
//! A [`TrackingSink`] receives each trial's parameters, score, and
//! artifact reference, plus the study's name and direction at start.
//! Sink failures must never abort a search: the study logs them and
//! moves on.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::space::Assignment;
use crate::types::{Direction, TrialState};

/// What a sink sees of one finished trial.
#[derive(Clone, Debug, Serialize)]
pub struct TrialReport<'a> {
    /// The trial's index within its study.
    pub index: usize,
    /// The chosen model family's name.
    pub family: &'a str,
    /// The full sampled assignment.
    pub params: &'a Assignment,
    /// The trial's score; NaN for failed trials.
    pub score: f64,
    /// Whether the trial completed or failed.
    pub state: TrialState,
    /// Where the fitted model was persisted, if it was.
    pub artifact: Option<&'a Path>,
}

/// Receives trial metadata for later inspection.
///
/// Implementations must be `Send + Sync`; the study may be moved across
/// threads by callers.
pub trait TrackingSink: Send + Sync {
    /// Called once when a study begins.
    ///
    /// # Errors
    ///
    /// Sink-specific; the study logs and swallows the error.
    fn study_started(&self, name: &str, direction: Direction) -> Result<()>;

    /// Called after every trial, completed or failed.
    ///
    /// # Errors
    ///
    /// Sink-specific; the study logs and swallows the error.
    fn trial_finished(&self, report: &TrialReport<'_>) -> Result<()>;
}

/// A sink that emits `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl TrackingSink for LogSink {
    fn study_started(&self, name: &str, direction: Direction) -> Result<()> {
        tracing::info!(study = name, %direction, "study started");
        Ok(())
    }

    fn trial_finished(&self, report: &TrialReport<'_>) -> Result<()> {
        let params = report
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        match report.state {
            TrialState::Complete => tracing::info!(
                trial = report.index,
                family = report.family,
                score = report.score,
                artifact = ?report.artifact,
                %params,
                "trial completed"
            ),
            TrialState::Failed => tracing::warn!(
                trial = report.index,
                family = report.family,
                %params,
                "trial failed"
            ),
        }
        Ok(())
    }
}

/// A sink that appends one JSON object per trial to a journal file.
///
/// Writes take an exclusive file lock so several processes can share a
/// journal; in-process writes are serialized by a mutex so the lock is
/// held briefly.
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Serialize)]
struct StudyHeader<'a> {
    study: &'a str,
    direction: Direction,
}

impl JsonlSink {
    /// Create a sink that appends to `path`. The file is created on the
    /// first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The journal file this sink appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> Result<()> {
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Tracking(format!("creating {}: {e}", parent.display())))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::Tracking(format!("opening {}: {e}", self.path.display())))?;

        file.lock_exclusive()
            .map_err(|e| Error::Tracking(e.to_string()))?;
        let outcome = writeln!(file, "{line}")
            .and_then(|()| file.flush())
            .map_err(|e| Error::Tracking(e.to_string()));
        let _ = fs2::FileExt::unlock(&file);
        outcome
    }
}

impl TrackingSink for JsonlSink {
    fn study_started(&self, name: &str, direction: Direction) -> Result<()> {
        let header = StudyHeader {
            study: name,
            direction,
        };
        let line = serde_json::to_string(&header).map_err(|e| Error::Tracking(e.to_string()))?;
        self.append(&line)
    }

    fn trial_finished(&self, report: &TrialReport<'_>) -> Result<()> {
        let line = serde_json::to_string(report).map_err(|e| Error::Tracking(e.to_string()))?;
        self.append(&line)
    }
}

/// A sink that drops everything; useful in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TrackingSink for NoopSink {
    fn study_started(&self, _name: &str, _direction: Direction) -> Result<()> {
        Ok(())
    }

    fn trial_finished(&self, _report: &TrialReport<'_>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::BufRead;

    use super::*;
    use crate::space::ParamValue;

    #[test]
    fn jsonl_sink_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trials.jsonl");
        let sink = JsonlSink::new(&path);

        sink.study_started("automl", Direction::Maximize).unwrap();

        let mut params = Assignment::new();
        params.insert("max_depth", ParamValue::Int(6));
        let report = TrialReport {
            index: 0,
            family: "depthwise",
            params: &params,
            score: 0.9,
            state: TrialState::Complete,
            artifact: None,
        };
        sink.trial_finished(&report).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file)
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"maximize\""));
        assert!(lines[1].contains("\"depthwise\""));
        assert!(lines[1].contains("\"max_depth\":6"));
    }

    #[test]
    fn jsonl_lines_parse_back_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trials.jsonl");
        let sink = JsonlSink::new(&path);

        let params = Assignment::new();
        let report = TrialReport {
            index: 3,
            family: "leafwise",
            params: &params,
            score: 1.25,
            state: TrialState::Failed,
            artifact: Some(Path::new("model/model.leafwise.json")),
        };
        sink.trial_finished(&report).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(value["index"], 3);
        assert_eq!(value["state"], "failed");
    }
}
