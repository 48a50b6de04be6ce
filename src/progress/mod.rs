//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

//! The progress/log channel (SPEC_FULL.md §4.2), and the worker stdout protocol
//! that feeds it (SPEC_FULL.md §6). Grounded on the teacher's `log/item.rs` +
//! `log/parser.rs` (`LogItem`, `#BUTIDO:` line grammar) and `endpoint/scheduler.rs`'s
//! `LogReceiver`.

mod record;
pub use record::*;

mod journal;
pub use journal::*;

mod protocol;
pub use protocol::*;
