//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::job::JobScheduler;
use crate::progress::ProgressJournal;
use crate::run::RunStore;

/// Shared application state for all HTTP handlers.
///
/// Grounded on the `ryanmaclean-tundra` `ApiState`: `Arc`-wrapped shared
/// collections plus a couple of lock-free counters for cheap status reporting.
#[derive(Clone)]
pub struct AppState {
    pub run_store: Arc<RunStore>,
    pub journal: Arc<ProgressJournal>,
    pub scheduler: Arc<JobScheduler>,
    pub configs_dir: PathBuf,
    pub start_time: Instant,
    /// Lock-free count of jobs submitted since boot, for `/metrics`.
    pub jobs_submitted: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(
        run_store: Arc<RunStore>,
        journal: Arc<ProgressJournal>,
        scheduler: Arc<JobScheduler>,
        configs_dir: PathBuf,
    ) -> Self {
        AppState {
            run_store,
            journal,
            scheduler,
            configs_dir,
            start_time: Instant::now(),
            jobs_submitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn uptime_s(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn record_job_submitted(&self) {
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
    }
}
