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

use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use getset::Getters;
use serde::Deserialize;

use crate::config::Configuration;
use crate::config::util::*;

/// The server's own configuration, deserialized straight off TOML + an environment overlay.
///
/// Follows the same two-phase pattern as the rest of this crate's config handling:
/// deserialize first, `validate()` second, and only hand a validated `Configuration`
/// to the rest of the program.
#[derive(Debug, Getters, Deserialize)]
pub struct NotValidatedConfiguration {
    #[getset(get = "pub")]
    compatibility: semver::VersionReq,

    #[getset(get = "pub")]
    run_root: PathBuf,

    #[serde(default = "default_configs_dir")]
    #[getset(get = "pub")]
    configs_dir: PathBuf,

    #[serde(default = "default_progress_format")]
    #[getset(get = "pub")]
    progress_format: String,

    #[serde(default = "default_spinner_format")]
    #[getset(get = "pub")]
    spinner_format: String,

    #[serde(default = "default_sim_concurrency")]
    #[getset(get = "pub")]
    sim_concurrency: usize,

    #[serde(default = "default_ris_concurrency")]
    #[getset(get = "pub")]
    ris_concurrency: usize,

    #[serde(default = "default_vram_guard_threshold_mib")]
    #[getset(get = "pub")]
    vram_guard_threshold_mib: u64,

    #[getset(get = "pub")]
    sim_worker_bin: PathBuf,

    #[getset(get = "pub")]
    ris_worker_bin: PathBuf,

    #[getset(get = "pub")]
    bind_addr: String,
}

impl NotValidatedConfiguration {
    pub fn validate(self) -> Result<Configuration> {
        let crate_version = semver::Version::parse(env!("CARGO_PKG_VERSION"))
            .context("Parsing version of crate (CARGO_PKG_VERSION) into semver::Version object")?;

        if !self.compatibility.matches(&crate_version) {
            return Err(anyhow!("Configuration is not compatible to wavebench {}", crate_version));
        }

        if !self.run_root.is_dir() {
            return Err(anyhow!("Not a directory: run_root = {}", self.run_root.display()));
        }

        // configs_dir is allowed to not (yet) exist: `GET /api/configs` reports an
        // empty list rather than failing startup over an optional preset directory.

        if self.sim_concurrency == 0 {
            return Err(anyhow!("sim_concurrency must be >= 1"));
        }

        if self.ris_concurrency == 0 {
            return Err(anyhow!("ris_concurrency must be >= 1"));
        }

        if !self.sim_worker_bin.is_file() {
            return Err(anyhow!("Not a file: sim_worker_bin = {}", self.sim_worker_bin.display()));
        }

        if !self.ris_worker_bin.is_file() {
            return Err(anyhow!("Not a file: ris_worker_bin = {}", self.ris_worker_bin.display()));
        }

        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(anyhow!("Not a valid socket address: bind_addr = {}", self.bind_addr));
        }

        Ok(Configuration { inner: self })
    }
}
