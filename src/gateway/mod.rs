//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

//! The HTTP surface (SPEC_FULL.md §6): run/config/job listing and submission,
//! the static artifact file service, and the ambient `/healthz` + `/metrics`
//! probes. Grounded on the shared-state shape of the `ryanmaclean-tundra`
//! `ApiState` (`Arc<RwLock<...>>` collections, `Arc<AtomicUsize>` counters),
//! wired through `axum`, which the teacher already carries in its dependency
//! graph for its own (docker-facing) HTTP needs.

mod state;
pub use state::*;

mod routes;
pub use routes::*;
