//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use std::fmt;
use std::sync::Mutex;

use chrono::Utc;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// `YYYYMMDD-HHMMSS-NNNNN`: UTC wall clock plus a 5-digit per-second counter,
/// monotonic within this process (SPEC_FULL.md §3 "Run").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(String);

struct Counter {
    second_key: String,
    next: u32,
}

lazy_static! {
    static ref COUNTER: Mutex<Counter> = Mutex::new(Counter {
        second_key: String::new(),
        next: 0,
    });
}

impl RunId {
    /// Allocates a fresh, process-unique run id for the current instant.
    pub fn generate() -> Self {
        let now = Utc::now();
        let second_key = now.format("%Y%m%d-%H%M%S").to_string();

        let seq = {
            let mut counter = COUNTER.lock().expect("run id counter mutex poisoned");
            if counter.second_key != second_key {
                counter.second_key = second_key.clone();
                counter.next = 0;
            }
            let seq = counter.next;
            counter.next += 1;
            seq
        };

        RunId(format!("{second_key}-{seq:05}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses a run id back out of its string form, e.g. when reconstructing
    /// `RunId`s while listing a run root on disk.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 3 {
            return None;
        }
        if parts[0].len() == 8
            && parts[1].len() == 6
            && parts[2].len() == 5
            && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()))
        {
            Some(RunId(s.to_string()))
        } else {
            None
        }
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_id() {
        assert!(RunId::parse("20260101-120000-00001").is_some());
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(RunId::parse("not-a-run-id").is_none());
        assert!(RunId::parse("20260101-1200-00001").is_none());
    }

    #[test]
    fn generated_ids_are_distinct_and_parseable() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
        assert!(RunId::parse(a.as_str()).is_some());
        assert!(RunId::parse(b.as_str()).is_some());
    }
}
