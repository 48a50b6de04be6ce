//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use crate::progress::ProgressRecord;

const TAG: &str = "PROGRESS ";

/// One line of worker stdout, classified per SPEC_FULL.md §6: a structured
/// `PROGRESS {json}` update, or an opaque line destined for `run.log` verbatim.
///
/// Grounded on the teacher's `log/item.rs` `LogItem` enum and `log/parser.rs`'s
/// `#BUTIDO:` grammar; our protocol has a single tag, so a prefix-strip +
/// `serde_json::from_str` replaces the teacher's `pom` grammar entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerLine {
    Progress(ProgressRecord),
    Line(String),
}

/// Parses one line of worker stdout. Malformed `PROGRESS` payloads degrade to
/// an opaque `Line` rather than being dropped, so no diagnostic output is lost.
pub fn parse_worker_line(line: &str) -> WorkerLine {
    match line.strip_prefix(TAG) {
        Some(json) => match serde_json::from_str::<ProgressRecord>(json) {
            Ok(record) => WorkerLine::Progress(record),
            Err(_) => WorkerLine::Line(line.to_string()),
        },
        None => WorkerLine::Line(line.to_string()),
    }
}

/// Formats a `ProgressRecord` as the stdout line a worker process emits.
pub fn format_progress_line(record: &ProgressRecord) -> String {
    format!("{TAG}{}", serde_json::to_string(record).expect("ProgressRecord always serializes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_progress_line_is_opaque() {
        match parse_worker_line("starting scene load") {
            WorkerLine::Line(l) => assert_eq!(l, "starting scene load"),
            _ => panic!("expected Line"),
        }
    }

    #[test]
    fn well_formed_progress_line_parses() {
        let record = ProgressRecord::running(2, "tracing".into(), 5, Some(0.4));
        let line = format_progress_line(&record);
        match parse_worker_line(&line) {
            WorkerLine::Progress(parsed) => {
                assert_eq!(parsed.step_index, 2);
                assert_eq!(parsed.step_name, "tracing");
            }
            _ => panic!("expected Progress"),
        }
    }

    #[test]
    fn malformed_progress_payload_degrades_to_line() {
        match parse_worker_line("PROGRESS not-json") {
            WorkerLine::Line(l) => assert_eq!(l, "PROGRESS not-json"),
            _ => panic!("expected Line fallback"),
        }
    }
}
