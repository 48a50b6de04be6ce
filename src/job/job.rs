//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use chrono::{DateTime, Utc};
use getset::Getters;
use serde::Serialize;
use uuid::Uuid;

use crate::run::{RunId, RunKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// `Job.action` (SPEC_FULL.md §3): `run|validate` for RIS jobs; sim jobs are
/// always `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    Run,
    Validate,
}

/// A scheduled unit of work (SPEC_FULL.md §3 "Job"). Not persisted across
/// process restarts; only its run artifacts are (SPEC_FULL.md §1 Non-goals).
#[derive(Debug, Clone, Getters, Serialize)]
pub struct Job {
    #[getset(get = "pub")]
    pub(super) job_id: Uuid,

    #[getset(get = "pub")]
    pub(super) run_id: RunId,

    #[getset(get_copy = "pub")]
    pub(super) kind: RunKind,

    #[getset(get_copy = "pub")]
    pub(super) action: JobAction,

    /// `pattern|link` for a RIS job (only `pattern` is implemented by the
    /// kernel); absent for sim jobs.
    #[getset(get = "pub")]
    pub(super) mode: Option<String>,

    #[getset(get = "pub")]
    pub(super) created_at: DateTime<Utc>,

    #[getset(get_copy = "pub")]
    pub(super) status: JobStatus,

    #[getset(get = "pub")]
    pub(super) error: Option<String>,

    #[getset(get = "pub")]
    pub(super) vram_guard_applied: bool,

    #[getset(get = "pub")]
    pub(super) payload: serde_json::Value,
}

impl Job {
    pub fn new(run_id: RunId, kind: RunKind, action: JobAction, mode: Option<String>, payload: serde_json::Value) -> Self {
        Job {
            job_id: Uuid::new_v4(),
            run_id,
            kind,
            action,
            mode,
            created_at: Utc::now(),
            status: JobStatus::Queued,
            error: None,
            vram_guard_applied: false,
            payload,
        }
    }

    pub(super) fn mark_running(&mut self) {
        self.status = JobStatus::Running;
    }

    pub(super) fn mark_completed(&mut self) {
        self.status = JobStatus::Completed;
    }

    pub(super) fn mark_failed(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.error = Some(error);
    }

    pub(super) fn mark_vram_guard_applied(&mut self) {
        self.vram_guard_applied = true;
    }
}
