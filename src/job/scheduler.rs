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
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::artifact::ArtifactWriter;
use crate::config::{RisAction, RisJobRequest};
use crate::error::{CoreError, CoreResult};
use crate::job::vram::{apply_vram_guard, VramGuard};
use crate::job::{Job, JobAction, JobStatus};
use crate::progress::{parse_worker_line, ProgressJournal, ProgressRecord, WorkerLine};
use crate::run::{Run, RunId, RunKind, RunStore};

const MAX_ALLOCATE_RETRIES: u32 = 3;

type JobTable = Arc<Mutex<HashMap<Uuid, Job>>>;

/// Accepts submissions on the two FIFO queues (`sim`, `ris`), spawns worker
/// subprocesses, captures their output into the `ProgressJournal`, and reaps
/// terminal status (SPEC_FULL.md §4.6).
///
/// Grounded on `endpoint/scheduler.rs`'s `EndpointScheduler`/`LogReceiver`
/// shape: drain captured child output into both a live view and a persisted
/// record. The container lifecycle there (`PreparedContainer` -> ... ->
/// `FinalizedContainer`) is replaced with a plain `tokio::process::Child`
/// spawn/reap, since workers here are OS subprocesses, not containers.
pub struct JobScheduler {
    run_store: Arc<RunStore>,
    journal: Arc<ProgressJournal>,
    job_table: JobTable,
    sim_tx: mpsc::UnboundedSender<Uuid>,
    ris_tx: mpsc::UnboundedSender<Uuid>,
    vram_guard: Arc<dyn VramGuard>,
    vram_threshold_mib: u64,
}

struct WorkerSpawn {
    worker_bin: PathBuf,
    mode_arg: Option<String>,
}

impl JobScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_store: Arc<RunStore>,
        journal: Arc<ProgressJournal>,
        sim_worker_bin: PathBuf,
        ris_worker_bin: PathBuf,
        sim_concurrency: usize,
        ris_concurrency: usize,
        vram_guard: Arc<dyn VramGuard>,
        vram_threshold_mib: u64,
    ) -> Arc<Self> {
        let job_table: JobTable = Arc::new(Mutex::new(HashMap::new()));
        let (sim_tx, sim_rx) = mpsc::unbounded_channel();
        let (ris_tx, ris_rx) = mpsc::unbounded_channel();

        let scheduler = Arc::new(JobScheduler {
            run_store,
            journal,
            job_table,
            sim_tx,
            ris_tx,
            vram_guard,
            vram_threshold_mib,
        });

        scheduler.clone().spawn_dispatch_loop(sim_rx, sim_concurrency, sim_worker_bin);
        scheduler.clone().spawn_dispatch_loop(ris_rx, ris_concurrency, ris_worker_bin);

        scheduler
    }

    fn spawn_dispatch_loop(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<Uuid>, concurrency: usize, worker_bin: PathBuf) {
        let semaphore = Arc::new(Semaphore::new(concurrency));
        tokio::spawn(async move {
            while let Some(job_id) = rx.recv().await {
                let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
                let this = self.clone();
                let worker_bin = worker_bin.clone();
                tokio::spawn(async move {
                    this.dispatch(job_id, worker_bin).await;
                    drop(permit);
                });
            }
        });
    }

    /// Submits a sim job (SPEC_FULL.md §6 `POST /api/jobs`). The VRAM guard,
    /// when it engages, is recorded on the job and reflected in the written config.
    pub async fn submit_sim(&self, payload: serde_json::Value) -> CoreResult<(Uuid, RunId)> {
        let run = self.allocate_with_retries(RunKind::Sim).await?;
        let (payload, vram_applied) = apply_vram_guard(self.vram_guard.as_ref(), self.vram_threshold_mib, payload);

        self.write_config_and_enqueue(run, payload, vram_applied, JobAction::Run, None, &self.sim_tx)
            .await
    }

    /// Submits a RIS Lab job (SPEC_FULL.md §6 `POST /api/ris/jobs`). `action`
    /// and `mode` are read from the submitted payload up front so they land on
    /// the `Job` and get passed on to the worker as a `--mode` flag.
    pub async fn submit_ris(&self, payload: serde_json::Value) -> CoreResult<(Uuid, RunId)> {
        let run = self.allocate_with_retries(RunKind::Ris).await?;

        let request: RisJobRequest = serde_json::from_value(payload.clone())
            .map_err(|e| CoreError::InvalidConfig(format!("ris job payload does not match schema: {e}")))?;
        let action = match request.action {
            RisAction::Run => JobAction::Run,
            RisAction::Validate => JobAction::Validate,
        };
        let mode = Some(request.mode.unwrap_or_else(|| "pattern".to_string()));

        self.write_config_and_enqueue(run, payload, false, action, mode, &self.ris_tx).await
    }

    async fn allocate_with_retries(&self, kind: RunKind) -> CoreResult<Run> {
        let mut last_err = None;
        for _ in 0..MAX_ALLOCATE_RETRIES {
            match self.run_store.allocate(kind).await {
                Ok(run) => return Ok(run),
                Err(CoreError::CollisionError(id)) => {
                    warn!(run_id = %id, "run id collision, retrying allocation");
                    last_err = Some(CoreError::CollisionError(id));
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| CoreError::CollisionError("unknown".into())))
    }

    async fn write_config_and_enqueue(
        &self,
        run: Run,
        payload: serde_json::Value,
        vram_applied: bool,
        action: JobAction,
        mode: Option<String>,
        tx: &mpsc::UnboundedSender<Uuid>,
    ) -> CoreResult<(Uuid, RunId)> {
        let writer = ArtifactWriter::new(&self.run_store);
        // Writing the effective config fails -> job failed before dispatch; no worker
        // is spawned (SPEC_FULL.md §4.6 "Failure semantics").
        writer.write_config_snapshot(&run, &payload).await?;

        let mut job = Job::new(run.id().clone(), run.kind(), action, mode, payload);
        if vram_applied {
            job.mark_vram_guard_applied();
        }
        let job_id = *job.job_id();
        let run_id = job.run_id().clone();

        self.job_table.lock().await.insert(job_id, job);
        self.journal.update(&run_id, ProgressRecord::queued()).await?;

        tx.send(job_id)
            .map_err(|_| CoreError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "dispatch channel closed")))?;

        Ok((job_id, run_id))
    }

    async fn dispatch(&self, job_id: Uuid, worker_bin: PathBuf) {
        let (run_id, kind, mode) = {
            let table = self.job_table.lock().await;
            let Some(job) = table.get(&job_id) else {
                error!(%job_id, "dispatched job vanished from job table");
                return;
            };
            (job.run_id().clone(), job.kind(), job.mode().clone())
        };

        {
            let mut table = self.job_table.lock().await;
            if let Some(job) = table.get_mut(&job_id) {
                job.mark_running();
            }
        }
        if let Err(e) = self
            .journal
            .update(&run_id, ProgressRecord::running(0, "starting".into(), 0, Some(0.0)))
            .await
        {
            error!(%run_id, error = %e, "failed to write running progress record");
        }

        let spawn = WorkerSpawn { worker_bin, mode_arg: mode };
        let result = self.run_worker(&run_id, kind, spawn).await;

        let mut table = self.job_table.lock().await;
        if let Some(job) = table.get_mut(&job_id) {
            match &result {
                Ok(()) => job.mark_completed(),
                Err(e) => job.mark_failed(e.to_string()),
            }
        }
        drop(table);

        let record = match &result {
            Ok(()) => ProgressRecord::completed("done".into(), 0),
            Err(e) => ProgressRecord::failed(0, "failed".into(), 0, e.to_string()),
        };
        if let Err(e) = self.journal.update(&run_id, record).await {
            error!(%run_id, error = %e, "failed to write terminal progress record");
        }
    }

    /// Spawns the worker, captures its stdout line-by-line into the journal
    /// (structured `PROGRESS` lines update it; everything else is appended to
    /// `run.log` verbatim), and reports the terminal outcome.
    async fn run_worker(&self, run_id: &RunId, kind: RunKind, spawn: WorkerSpawn) -> CoreResult<()> {
        let run_dir = self.run_store.run_dir(run_id);

        let mut command = Command::new(&spawn.worker_bin);
        command
            .arg("--run-dir")
            .arg(&run_dir)
            .arg("--run-id")
            .arg(run_id.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(mode) = &spawn.mode_arg {
            command.arg("--mode").arg(mode);
        }

        info!(run_id = %run_id, kind = kind.as_str(), bin = %spawn.worker_bin.display(), "spawning worker");

        let mut child = command
            .spawn()
            .map_err(|e| CoreError::WorkerCrash(format!("failed to spawn worker: {e}")))?;

        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");

        let journal = Arc::clone(&self.journal);
        let run_id_stdout = run_id.clone();
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match parse_worker_line(&line) {
                    WorkerLine::Progress(record) => {
                        if let Err(e) = journal.update(&run_id_stdout, record).await {
                            warn!(run_id = %run_id_stdout, error = %e, "failed to apply worker progress update");
                        }
                    }
                    WorkerLine::Line(text) => {
                        if let Err(e) = journal.append_log(&run_id_stdout, &text).await {
                            warn!(run_id = %run_id_stdout, error = %e, "failed to append worker log line");
                        }
                    }
                }
            }
        });

        let journal = Arc::clone(&self.journal);
        let run_id_stderr = run_id.clone();
        let stderr_task = tokio::spawn(async move {
            let mut last_line = None;
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Err(e) = journal.append_log(&run_id_stderr, &line).await {
                    warn!(run_id = %run_id_stderr, error = %e, "failed to append worker stderr line");
                }
                last_line = Some(line);
            }
            last_line
        });

        let status = child
            .wait()
            .await
            .map_err(|e| CoreError::WorkerCrash(format!("failed to wait on worker: {e}")))?;
        let _ = stdout_task.await;
        let last_stderr_line = stderr_task.await.unwrap_or(None);

        if status.success() {
            Ok(())
        } else {
            let reason = last_stderr_line.unwrap_or_else(|| format!("exit {}", status.code().unwrap_or(-1)));
            Err(CoreError::WorkerCrash(reason))
        }
    }

    pub async fn job_status(&self, job_id: &Uuid) -> Option<JobStatus> {
        self.job_table.lock().await.get(job_id).map(|j| j.status())
    }

    pub async fn list_jobs(&self) -> Vec<Job> {
        self.job_table.lock().await.values().cloned().collect()
    }
}
