//! Workspace artifact persistence.
//!
//! Writes one JSON artifact per successful domain, the full aggregated
//! report, and the run summary with a file inventory. Writes are
//! independent per file: a failure writing one artifact is logged and
//! recorded, and every other write still proceeds.

use crate::models::{AggregatedReport, DomainResult, RunSummary};
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Filename of the aggregated report artifact consumed by downstream
/// report renderers.
pub const REPORT_ARTIFACT: &str = "template_data_structure.json";
/// Filename of the run summary artifact.
pub const SUMMARY_ARTIFACT: &str = "query_summary.json";

/// One failed artifact write.
#[derive(Debug, Clone)]
pub struct PersistFailure {
    pub path: PathBuf,
    pub error: String,
}

/// What the persistence pass managed to write.
#[derive(Debug, Clone, Default)]
pub struct PersistOutcome {
    pub written: Vec<PathBuf>,
    pub failed: Vec<PersistFailure>,
}

impl PersistOutcome {
    fn record_json<T: Serialize>(&mut self, path: PathBuf, value: &T) {
        match serde_json::to_string_pretty(value)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&path, json))
        {
            Ok(()) => {
                debug!("Wrote artifact: {}", path.display());
                self.written.push(path);
            }
            Err(e) => {
                warn!("Failed to write artifact {}: {}", path.display(), e);
                self.failed.push(PersistFailure {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }
}

/// The run summary document persisted as `query_summary.json`.
#[derive(Debug, Serialize, Deserialize)]
struct SummaryDocument {
    summary: RunSummary,
    /// Workspace-relative paths of every artifact present after the run.
    files: Vec<String>,
}

/// Persist all run artifacts under the workspace.
pub fn write_artifacts(
    workspace: &Workspace,
    results: &[DomainResult],
    report: &AggregatedReport,
    summary: &RunSummary,
) -> PersistOutcome {
    let mut outcome = PersistOutcome::default();
    let data_dir = workspace.data_dir();

    for result in results.iter().filter(|r| r.success) {
        if let Some(payload) = &result.payload {
            let path = data_dir.join(format!("{}_analysis.json", result.domain));
            outcome.record_json(path, payload);
        }
    }

    outcome.record_json(data_dir.join(REPORT_ARTIFACT), report);

    append_run_log(workspace, summary);

    // Inventory everything present before the summary itself is written,
    // including artifacts left by earlier runs against a reused workspace.
    let files = inventory(workspace.root());
    outcome.record_json(
        data_dir.join(SUMMARY_ARTIFACT),
        &SummaryDocument {
            summary: summary.clone(),
            files,
        },
    );

    outcome
}

/// Workspace-relative paths of all files under the root, sorted.
fn inventory(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

/// Append a line-oriented record of the run to `logs/run.log`. Reused
/// workspaces accumulate one block per run.
fn append_run_log(workspace: &Workspace, summary: &RunSummary) {
    let path = workspace.logs_dir().join("run.log");
    let result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut file| {
            writeln!(
                file,
                "{} domains={} successful={} failed={} ready={}",
                chrono::Utc::now().to_rfc3339(),
                summary.total,
                summary.successful,
                summary.failed,
                summary.ready
            )?;
            for failure in &summary.failures {
                writeln!(file, "  failed {}: {}", failure.domain, failure.error)?;
            }
            Ok(())
        });

    if let Err(e) = result {
        warn!("Failed to append run log {}: {}", path.display(), e);
    }
}
