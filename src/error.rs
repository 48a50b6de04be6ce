//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use thiserror::Error;

/// Error categories for the core control plane (see SPEC_FULL.md §7).
///
/// Application code composes these with `anyhow::Context` where only
/// propagation is needed; the gateway matches on the variant to pick
/// an HTTP status.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("run id collision: {0}")]
    CollisionError(String),

    #[error("invalid grid request: {0}")]
    InvalidGrid(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("worker crashed: {0}")]
    WorkerCrash(String),

    #[error("artifact io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CoreError {
    /// Coarse category used by the gateway to pick a status code.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::InvalidConfig(_) | CoreError::InvalidGrid(_) => 400,
            CoreError::NotFound(_) => 404,
            CoreError::CollisionError(_)
            | CoreError::BackendUnavailable(_)
            | CoreError::WorkerCrash(_)
            | CoreError::IoError(_) => 500,
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
