//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

//! Renders the fixed artifact set per run kind (SPEC_FULL.md §4.5). Grounded on
//! the teacher's `filestore/mod.rs` "fixed set of named files under a root, all
//! atomic" shape.

mod hash;
pub use hash::*;

mod npy;
pub use npy::*;

mod writer;
pub use writer::*;
