//! Per-run workspace allocation.
//!
//! A workspace is the directory tree that holds every artifact of one
//! screening run: queried data, map images, rendered reports, and logs.
//! Callers may supply an existing directory to converge multiple runs for
//! the same project onto a single tree.

use crate::error::{Result, ScreeningError};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fixed subdirectory names created under every workspace root.
const SUBDIRS: [&str; 4] = ["data", "maps", "reports", "logs"];

/// The per-run directory tree.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Allocate a fresh workspace for a project, or reuse `override_dir`
    /// verbatim when one is supplied.
    ///
    /// Fresh mode sanitizes the project name, appends a timestamp, and
    /// creates the root plus the four fixed subdirectories. Reuse mode
    /// never allocates a sibling directory; it only ensures the
    /// subdirectories exist, so repeated runs share one tree.
    pub fn create(
        project_name: &str,
        base_dir: &Path,
        override_dir: Option<&Path>,
    ) -> Result<Self> {
        let root = match override_dir {
            Some(dir) => {
                info!("Reusing workspace: {}", dir.display());
                dir.to_path_buf()
            }
            None => {
                let stamp = Utc::now().format("%Y%m%d_%H%M%S");
                let name = format!("{}_{}", sanitize_project_name(project_name), stamp);
                let root = base_dir.join(name);
                info!("Creating workspace: {}", root.display());
                root
            }
        };

        create_dir(&root)?;
        for sub in SUBDIRS {
            create_dir(&root.join(sub))?;
        }

        Ok(Self { root })
    }

    /// Open an existing workspace without creating anything. Used by tests
    /// and downstream tools that only read artifacts.
    #[allow(dead_code)] // Utility for downstream tooling
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(ScreeningError::WorkspaceIo {
                path: root.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such workspace"),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for queried JSON artifacts.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Directory for map images.
    #[allow(dead_code)] // Path accessor for map-producing adapters
    pub fn maps_dir(&self) -> PathBuf {
        self.root.join("maps")
    }

    /// Directory for rendered reports.
    #[allow(dead_code)] // Path accessor for downstream report renderers
    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    /// Directory for run logs.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

/// Strip characters outside letters/digits/space/hyphen/underscore and
/// collapse whitespace runs to single underscores.
pub fn sanitize_project_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect();

    let collapsed: Vec<&str> = cleaned.split_whitespace().collect();
    let joined = collapsed.join("_");

    if joined.is_empty() {
        "screening".to_string()
    } else {
        joined
    }
}

fn create_dir(path: &Path) -> Result<()> {
    debug!("Ensuring directory: {}", path.display());
    fs::create_dir_all(path).map_err(|source| ScreeningError::WorkspaceIo {
        path: path.display().to_string(),
        source,
    })
}
