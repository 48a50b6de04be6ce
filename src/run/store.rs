//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{CoreError, CoreResult};
use crate::run::RunId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Sim,
    Ris,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Sim => "sim",
            RunKind::Ris => "ris",
        }
    }
}

/// Status as observed purely from what's on disk, used by `RunStore::list`.
/// Distinct from `progress::RunStatus`: a run with no `summary.json` yet is
/// `Initializing`, a state the in-memory job table never reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunListStatus {
    Initializing,
    Queued,
    Running,
    Completed,
    Failed,
}

/// A handle to one run's directory. `RunStore::allocate` is the only way to
/// create a fresh one; `Run::from_parts` reconstructs a handle to an existing
/// directory whose kind is already known from context (e.g. a worker binary
/// that only ever handles one `RunKind`).
#[derive(Debug, Clone)]
pub struct Run {
    id: RunId,
    kind: RunKind,
    dir: PathBuf,
}

impl Run {
    pub fn from_parts(id: RunId, kind: RunKind, dir: PathBuf) -> Self {
        Run { id, kind, dir }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn kind(&self) -> RunKind {
        self.kind
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.join("data")
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.dir.join("plots")
    }

    pub fn viewer_dir(&self) -> PathBuf {
        self.dir.join("viewer")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunListEntry {
    pub run_id: RunId,
    pub kind: Option<RunKind>,
    pub status: RunListStatus,
}

/// Owns the `<root>/<run_id>/` directory tree. See SPEC_FULL.md §4.1.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

const SUBDIRS: &[&str] = &["data", "plots", "viewer"];
const KIND_MARKER: &str = "kind";

impl RunStore {
    pub fn new(root: PathBuf) -> CoreResult<Self> {
        if !root.is_dir() {
            return Err(CoreError::InvalidConfig(format!(
                "run store root is not a directory: {}",
                root.display()
            )));
        }
        Ok(RunStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.root.join(run_id.as_str())
    }

    /// Allocates a fresh run id and creates its directory skeleton atomically
    /// (the directory itself is the existence check: `create_dir` fails if it's
    /// already there). Retries with a new id on collision are the caller's job
    /// (JobScheduler retries up to 3 times per SPEC_FULL.md §4.6).
    pub async fn allocate(&self, kind: RunKind) -> CoreResult<Run> {
        let id = RunId::generate();
        let dir = self.run_dir(&id);

        match tokio::fs::create_dir(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(CoreError::CollisionError(id.to_string()));
            }
            Err(e) => return Err(CoreError::IoError(e)),
        }

        for sub in SUBDIRS {
            tokio::fs::create_dir(dir.join(sub)).await?;
        }

        tokio::fs::write(dir.join(KIND_MARKER), kind.as_str()).await?;

        debug!(run_id = %id, kind = kind.as_str(), "allocated run directory");
        Ok(Run { id, kind, dir })
    }

    /// Writes `bytes` under `run`'s directory at `rel_path` via write-to-temp +
    /// rename so concurrent readers never observe a partial file (SPEC_FULL.md §4.1,
    /// §9 "atomic-rename concurrency policy"). Grounded on the teacher's
    /// `filestore/staging.rs` tarball-unpack idiom, generalized to one file at a time.
    pub async fn write_atomic(&self, run: &Run, rel_path: &Path, bytes: &[u8]) -> CoreResult<()> {
        let target = run.dir().join(rel_path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let dir_for_tmp = target.parent().unwrap_or(run.dir()).to_path_buf();
        let bytes = bytes.to_vec();
        let target_for_blocking = target.clone();

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir_for_tmp)?;
            tmp.write_all(&bytes)?;
            tmp.flush()?;
            tmp.persist(&target_for_blocking)
                .map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| CoreError::IoError(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        trace!(path = %target.display(), "wrote artifact atomically");
        Ok(())
    }

    /// Enumerates run ids discovered on disk in reverse-chronological order,
    /// optionally restricted to the given `kinds`. Tolerates partially
    /// initialized directories (SPEC_FULL.md §4.1).
    pub fn list(&self, kinds: Option<&[RunKind]>) -> CoreResult<Vec<RunListEntry>> {
        let mut entries = Vec::new();
        let read_dir = std::fs::read_dir(&self.root)?;
        for entry in read_dir {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(run_id) = RunId::parse(&name) else {
                continue;
            };

            let kind = std::fs::read_to_string(entry.path().join(KIND_MARKER))
                .ok()
                .and_then(|s| match s.trim() {
                    "sim" => Some(RunKind::Sim),
                    "ris" => Some(RunKind::Ris),
                    _ => None,
                });

            if let Some(kinds) = kinds {
                if !kind.map_or(false, |k| kinds.contains(&k)) {
                    continue;
                }
            }

            let summary_path = entry.path().join("summary.json");
            let status = if summary_path.is_file() {
                match std::fs::read(&summary_path) {
                    Ok(bytes) => serde_json::from_slice::<serde_json::Value>(&bytes)
                        .ok()
                        .and_then(|v| v.get("status").and_then(|s| s.as_str().map(String::from)))
                        .and_then(|s| match s.as_str() {
                            "running" => Some(RunListStatus::Running),
                            "completed" => Some(RunListStatus::Completed),
                            "failed" => Some(RunListStatus::Failed),
                            _ => None,
                        })
                        .unwrap_or(RunListStatus::Initializing),
                    Err(_) => RunListStatus::Initializing,
                }
            } else {
                RunListStatus::Initializing
            };

            entries.push(RunListEntry {
                run_id,
                kind,
                status,
            });
        }
        entries.sort_by(|a, b| b.run_id.cmp(&a.run_id));
        Ok(entries)
    }

    /// Opens a handle for reading artifacts of an existing run.
    pub fn open(&self, run_id: &RunId) -> CoreResult<PathBuf> {
        let dir = self.run_dir(run_id);
        if !dir.is_dir() {
            return Err(CoreError::NotFound(format!("run {run_id} does not exist")));
        }
        Ok(dir)
    }

    /// Like `open`, but for a caller that already knows the run's kind (e.g. a
    /// worker binary that only ever handles one `RunKind`) and wants a full
    /// `Run` handle back rather than just its directory.
    pub fn open_known(&self, run_id: &RunId, kind: RunKind) -> CoreResult<Run> {
        let dir = self.open(run_id)?;
        Ok(Run::from_parts(run_id.clone(), kind, dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allocate_creates_subdirs() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RunStore::new(tmp.path().to_path_buf()).unwrap();
        let run = store.allocate(RunKind::Sim).await.unwrap();
        assert!(run.data_dir().is_dir());
        assert!(run.plots_dir().is_dir());
        assert!(run.viewer_dir().is_dir());
    }

    #[tokio::test]
    async fn write_atomic_is_whole_or_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RunStore::new(tmp.path().to_path_buf()).unwrap();
        let run = store.allocate(RunKind::Ris).await.unwrap();
        store
            .write_atomic(&run, Path::new("summary.json"), b"{\"status\":\"completed\"}")
            .await
            .unwrap();
        let read = std::fs::read(run.dir().join("summary.json")).unwrap();
        assert_eq!(read, b"{\"status\":\"completed\"}");
    }

    #[tokio::test]
    async fn list_reports_initializing_without_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RunStore::new(tmp.path().to_path_buf()).unwrap();
        let _run = store.allocate(RunKind::Sim).await.unwrap();
        let entries = store.list(None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, RunListStatus::Initializing);
        assert_eq!(entries[0].kind, Some(RunKind::Sim));
    }

    #[tokio::test]
    async fn list_filters_by_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RunStore::new(tmp.path().to_path_buf()).unwrap();
        store.allocate(RunKind::Sim).await.unwrap();
        store.allocate(RunKind::Ris).await.unwrap();

        let sim_only = store.list(Some(&[RunKind::Sim])).unwrap();
        assert_eq!(sim_only.len(), 1);
        assert_eq!(sim_only[0].kind, Some(RunKind::Sim));

        let both = store.list(None).unwrap();
        assert_eq!(both.len(), 2);
    }
}
