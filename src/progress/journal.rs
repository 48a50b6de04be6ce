//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{watch, Mutex as AsyncMutex, RwLock};
use tracing::warn;

use crate::error::CoreResult;
use crate::progress::ProgressRecord;
use crate::run::RunId;

type Watchers = RwLock<HashMap<String, watch::Sender<ProgressRecord>>>;

/// File-backed, single-writer-per-run progress+log channel (SPEC_FULL.md §4.2).
///
/// The file on disk (`progress.json`) remains authoritative; the in-memory
/// `watch` channel per run is purely a latency optimization for the
/// gateway's long-poll endpoint (SPEC_FULL.md §9).
pub struct ProgressJournal {
    root: PathBuf,
    watchers: Watchers,
    log_locks: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ProgressJournal {
    pub fn new(root: PathBuf) -> Self {
        ProgressJournal {
            root,
            watchers: RwLock::new(HashMap::new()),
            log_locks: AsyncMutex::new(HashMap::new()),
        }
    }

    fn progress_path(&self, run_id: &RunId) -> PathBuf {
        self.root.join(run_id.as_str()).join("progress.json")
    }

    fn log_path(&self, run_id: &RunId) -> PathBuf {
        self.root.join(run_id.as_str()).join("run.log")
    }

    /// Overwrites `progress.json` atomically, clamping any attempted backward
    /// transition (SPEC_FULL.md §4.2, §8 property 3).
    pub async fn update(&self, run_id: &RunId, record: ProgressRecord) -> CoreResult<()> {
        let path = self.progress_path(run_id);

        let previous = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<ProgressRecord>(&bytes).ok(),
            Err(_) => None,
        };

        let record = if let Some(previous) = &previous {
            if previous.allows_transition_to(&record) {
                record
            } else {
                warn!(run_id = %run_id, "clamped out-of-order progress update");
                previous.clone()
            }
        } else {
            record
        };

        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| crate::error::CoreError::IoError(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        write_atomic_file(&path, &bytes).await?;

        let watchers = self.watchers.read().await;
        if let Some(tx) = watchers.get(run_id.as_str()) {
            let _ = tx.send(record);
        }

        Ok(())
    }

    /// Returns the latest record without blocking writers.
    pub async fn snapshot(&self, run_id: &RunId) -> CoreResult<Option<ProgressRecord>> {
        let path = self.progress_path(run_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes).ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(crate::error::CoreError::IoError(e)),
        }
    }

    /// Subscribes to in-memory updates for a run; the file remains authoritative.
    pub async fn subscribe(&self, run_id: &RunId, initial: ProgressRecord) -> watch::Receiver<ProgressRecord> {
        let mut watchers = self.watchers.write().await;
        if let Some(tx) = watchers.get(run_id.as_str()) {
            return tx.subscribe();
        }
        let (tx, rx) = watch::channel(initial);
        watchers.insert(run_id.as_str().to_string(), tx);
        rx
    }

    /// Appends a UTF-8 line to `run.log`. Appends are serialized per-run via a
    /// per-run lock so concurrent appenders (scheduler line-capture, worker
    /// PROGRESS-adjacent plain lines) never interleave mid-line.
    pub async fn append_log(&self, run_id: &RunId, line: &str) -> CoreResult<()> {
        let lock = {
            let mut locks = self.log_locks.lock().await;
            locks
                .entry(run_id.as_str().to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        let path = self.log_path(run_id);
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(format!("{timestamp} {line}\n").as_bytes()).await?;
        Ok(())
    }
}

async fn write_atomic_file(target: &std::path::Path, bytes: &[u8]) -> CoreResult<()> {
    let dir = target.parent().unwrap_or_else(|| std::path::Path::new("."));
    let dir = dir.to_path_buf();
    let bytes = bytes.to_vec();
    let target = target.to_path_buf();

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        use std::io::Write;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| crate::error::CoreError::IoError(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunKind;

    #[tokio::test]
    async fn update_then_snapshot_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let run_id = RunId::generate();
        tokio::fs::create_dir(tmp.path().join(run_id.as_str())).await.unwrap();
        let journal = ProgressJournal::new(tmp.path().to_path_buf());

        journal.update(&run_id, ProgressRecord::queued()).await.unwrap();
        let snap = journal.snapshot(&run_id).await.unwrap().unwrap();
        assert_eq!(snap.step_index, 0);
        let _ = RunKind::Sim;
    }

    #[tokio::test]
    async fn backward_transition_is_clamped() {
        let tmp = tempfile::tempdir().unwrap();
        let run_id = RunId::generate();
        tokio::fs::create_dir(tmp.path().join(run_id.as_str())).await.unwrap();
        let journal = ProgressJournal::new(tmp.path().to_path_buf());

        journal
            .update(&run_id, ProgressRecord::running(3, "three".into(), 5, Some(0.6)))
            .await
            .unwrap();
        journal
            .update(&run_id, ProgressRecord::running(1, "one".into(), 5, Some(0.1)))
            .await
            .unwrap();

        let snap = journal.snapshot(&run_id).await.unwrap().unwrap();
        assert_eq!(snap.step_index, 3);
    }
}
