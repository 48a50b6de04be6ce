//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use std::sync::Arc;
use std::time::Duration;

use wavebench::job::{JobScheduler, JobStatus, NoOpVramGuard};
use wavebench::progress::ProgressJournal;
use wavebench::run::RunStore;

/// Writes the stand-in `sim-worker` used in place of the real binary: it
/// records its own start/end instant under `--run-dir` before exiting, so the
/// test can tell whether two dispatches overlapped.
fn write_worker_stub(path: &std::path::Path) -> std::io::Result<()> {
    std::fs::write(
        path,
        "#!/bin/sh\n\
         run_dir=\"\"\n\
         while [ \"$#\" -gt 0 ]; do\n\
         \x20 case \"$1\" in\n\
         \x20   --run-dir) run_dir=\"$2\"; shift 2;;\n\
         \x20   *) shift;;\n\
         \x20 esac\n\
         done\n\
         date +%s%N > \"$run_dir/start\"\n\
         sleep 0.3\n\
         date +%s%N > \"$run_dir/end\"\n\
         exit 0\n",
    )?;
    make_executable(path)
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
}

async fn wait_for_terminal(scheduler: &JobScheduler, job_id: uuid::Uuid) -> JobStatus {
    loop {
        match scheduler.job_status(&job_id).await {
            Some(JobStatus::Completed) => return JobStatus::Completed,
            Some(JobStatus::Failed) => return JobStatus::Failed,
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
}

/// SPEC_FULL.md §8 scenario S6: two sim jobs submitted back to back against a
/// scheduler with a single sim slot run one at a time, never overlapping.
#[tokio::test]
async fn two_sim_jobs_one_slot_do_not_overlap() {
    let tmp = tempfile::tempdir().unwrap();
    let run_root = tmp.path().join("runs");
    std::fs::create_dir(&run_root).unwrap();

    let worker_bin = tmp.path().join("sim-worker.sh");
    write_worker_stub(&worker_bin).unwrap();

    let run_store = Arc::new(RunStore::new(run_root.clone()).unwrap());
    let journal = Arc::new(ProgressJournal::new(run_root.clone()));
    let scheduler = JobScheduler::new(
        run_store.clone(),
        journal,
        worker_bin.clone(),
        worker_bin,
        1, // sim_concurrency: a single slot
        1,
        Arc::new(NoOpVramGuard),
        0,
    );

    let (job_a, run_a) = scheduler.submit_sim(serde_json::json!({"profile": "default"})).await.unwrap();
    let (job_b, run_b) = scheduler.submit_sim(serde_json::json!({"profile": "default"})).await.unwrap();

    assert_eq!(wait_for_terminal(&scheduler, job_a).await, JobStatus::Completed);
    assert_eq!(wait_for_terminal(&scheduler, job_b).await, JobStatus::Completed);

    let read_ns = |run_id: &wavebench::run::RunId, file: &str| -> u128 {
        let text = std::fs::read_to_string(run_store.run_dir(run_id).join(file)).unwrap();
        text.trim().parse().unwrap()
    };

    let (a_start, a_end) = (read_ns(&run_a, "start"), read_ns(&run_a, "end"));
    let (b_start, b_end) = (read_ns(&run_b, "start"), read_ns(&run_b, "end"));

    // With one slot, the second dispatch can only start once the first has
    // finished: the intervals [a_start, a_end] and [b_start, b_end] must not
    // overlap, in whichever order the dispatch loop happened to run them.
    assert!(a_end <= b_start || b_end <= a_start, "worker invocations overlapped: a=[{a_start},{a_end}] b=[{b_start},{b_end}]");
}

#[tokio::test]
async fn job_table_reflects_submitted_jobs() {
    let tmp = tempfile::tempdir().unwrap();
    let run_root = tmp.path().join("runs");
    std::fs::create_dir(&run_root).unwrap();

    let worker_bin = tmp.path().join("sim-worker.sh");
    write_worker_stub(&worker_bin).unwrap();

    let run_store = Arc::new(RunStore::new(run_root.clone()).unwrap());
    let journal = Arc::new(ProgressJournal::new(run_root));
    let scheduler = JobScheduler::new(
        run_store,
        journal,
        worker_bin.clone(),
        worker_bin,
        2,
        2,
        Arc::new(NoOpVramGuard),
        0,
    );

    let (job_id, _run_id) = scheduler.submit_sim(serde_json::json!({"profile": "default"})).await.unwrap();
    assert_eq!(wait_for_terminal(&scheduler, job_id).await, JobStatus::Completed);

    let jobs = scheduler.list_jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status(), JobStatus::Completed);
}
