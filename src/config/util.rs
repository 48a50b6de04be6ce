//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

//! This module contains default functions that are called by serde when deserializing the
//! configuration and having to use default values.

/// The default progress bar format
pub fn default_progress_format() -> String {
    String::from("{elapsed_precise} {percent:>3}% {bar:5.cyan/blue} | {msg}")
}

/// The default spinner format
pub fn default_spinner_format() -> String {
    String::from("{spinner} {msg}")
}

/// The default directory the gateway scans for named preset configs
pub fn default_configs_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("configs")
}

/// The default number of concurrently running sim-queue jobs
pub fn default_sim_concurrency() -> usize {
    1
}

/// The default number of concurrently running ris-queue jobs
pub fn default_ris_concurrency() -> usize {
    1
}

/// The default free-VRAM threshold (MiB) below which the VRAM guard engages
pub fn default_vram_guard_threshold_mib() -> u64 {
    2048
}

/// The default normalization mode for pattern_sweep
pub fn default_normalization() -> crate::config::Normalization {
    crate::config::Normalization::Peak0db
}

/// Whether RIS panel elements are eligible members of an auto-sized map bounding box by default
pub fn default_include_ris() -> bool {
    true
}
