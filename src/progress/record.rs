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
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// One current record per run (SPEC_FULL.md §3 "ProgressRecord").
///
/// Monotone in `(step_index, progress)`; `error` is set iff `status == Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub status: RunStatus,
    pub step_index: u32,
    pub step_name: String,
    pub total_steps: u32,
    pub progress: Option<f64>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn queued() -> Self {
        ProgressRecord {
            status: RunStatus::Queued,
            step_index: 0,
            step_name: String::from("queued"),
            total_steps: 0,
            progress: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn running(step_index: u32, step_name: String, total_steps: u32, progress: Option<f64>) -> Self {
        ProgressRecord {
            status: RunStatus::Running,
            step_index,
            step_name,
            total_steps,
            progress,
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn completed(step_name: String, total_steps: u32) -> Self {
        ProgressRecord {
            status: RunStatus::Completed,
            step_index: total_steps,
            step_name,
            total_steps,
            progress: Some(1.0),
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(step_index: u32, step_name: String, total_steps: u32, error: String) -> Self {
        ProgressRecord {
            status: RunStatus::Failed,
            step_index,
            step_name,
            total_steps,
            progress: None,
            error: Some(error),
            updated_at: Utc::now(),
        }
    }

    /// Ordering key used to reject moves backward (SPEC_FULL.md §4.2, §8 property 3).
    fn order_key(&self) -> (u32, i64) {
        let progress_milli = self.progress.map(|p| (p * 1000.0) as i64).unwrap_or(-1);
        (self.step_index, progress_milli)
    }

    /// True if transitioning from `self` to `next` is a valid move: terminal status
    /// is never replaced, and `(step_index, progress)` is non-decreasing while running.
    pub fn allows_transition_to(&self, next: &ProgressRecord) -> bool {
        match self.status {
            RunStatus::Completed | RunStatus::Failed => false,
            RunStatus::Queued => true,
            RunStatus::Running => match next.status {
                RunStatus::Queued => false,
                RunStatus::Running => next.order_key() >= self.order_key(),
                RunStatus::Completed | RunStatus::Failed => true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_status_rejects_further_transitions() {
        let done = ProgressRecord::completed("done".into(), 3);
        let attempt = ProgressRecord::running(1, "again".into(), 3, Some(0.1));
        assert!(!done.allows_transition_to(&attempt));
    }

    #[test]
    fn running_rejects_backward_progress() {
        let a = ProgressRecord::running(2, "step2".into(), 4, Some(0.5));
        let b = ProgressRecord::running(1, "step1".into(), 4, Some(0.1));
        assert!(!a.allows_transition_to(&b));
    }

    #[test]
    fn running_accepts_forward_progress() {
        let a = ProgressRecord::running(2, "step2".into(), 4, Some(0.5));
        let b = ProgressRecord::running(2, "step2".into(), 4, Some(0.7));
        assert!(a.allows_transition_to(&b));
    }
}
