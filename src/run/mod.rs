//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

//! Run identity and the on-disk artifact tree that a run owns (SPEC_FULL.md §3, §4.1).
//!
//! Grounded on `filestore/path.rs`'s validated-newtype + atomic-write idiom, generalized
//! from "artifact tarball under a staging root" to "arbitrary file under a run root".

mod id;
pub use id::*;

mod store;
pub use store::*;
