//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use serde::{Deserialize, Serialize};

use crate::config::util::default_include_ris;

/// A requested radio-map rectangle, before `GridAligner::align` snaps it (SPEC_FULL.md §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadioMapRequest {
    pub cell_size: (f64, f64),
    pub center: (f64, f64, f64),
    #[serde(default)]
    pub requested_size: Option<(f64, f64)>,
    #[serde(default)]
    pub auto_size: Option<AutoSize>,
    #[serde(default)]
    pub padding: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoSize {
    #[serde(default = "default_include_ris")]
    pub include_ris: bool,
}

/// Top-level sim-job submission payload (SPEC_FULL.md §6 `POST /api/jobs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimJobRequest {
    pub profile: String,
    pub base_config: serde_json::Value,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub runtime: Option<serde_json::Value>,
    #[serde(default)]
    pub simulation: Option<serde_json::Value>,
    #[serde(default)]
    pub radio_map: Option<RadioMapRequest>,
    pub scene: serde_json::Value,
    #[serde(default)]
    pub ris: Option<serde_json::Value>,
}

/// Top-level RIS Lab job submission payload (SPEC_FULL.md §6 `POST /api/ris/jobs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RisJobRequest {
    pub action: RisAction,
    #[serde(default)]
    pub config_path: Option<String>,
    #[serde(default)]
    pub config_data: Option<crate::config::RisConfig>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub reference: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RisAction {
    Run,
    Validate,
}
