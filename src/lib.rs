//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

//! Shared control-plane library backing the `wavebenchd` server binary and the
//! `sim-worker`/`ris-worker` worker binaries. The teacher crate this is
//! transformed from built a single `butido` binary with no library target;
//! this crate splits a library out so the worker binaries (spawned as
//! subprocesses by `JobScheduler`, SPEC_FULL.md §4.6) can share the config,
//! run-store, progress and RIS-kernel code with the server, the way
//! `seanchatmangpt-knhk` splits its `knhk` lib from its `execute_revops`
//! worker binary.

pub mod artifact;
pub mod config;
pub mod error;
pub mod gateway;
pub mod grid;
pub mod job;
pub mod progress;
pub mod ris;
pub mod run;
pub mod tracer;
pub mod util;
