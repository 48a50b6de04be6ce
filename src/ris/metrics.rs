//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use serde::Serialize;

/// `sidelobe_metrics(theta_deg, pattern_db) -> {...}` (SPEC_FULL.md §4.4 op 4).
#[derive(Debug, Clone, Serialize)]
pub struct SidelobeMetrics {
    pub peak_deg: f64,
    pub peak_db: f64,
    pub first_null_deg: Option<f64>,
    pub sll_db: Option<f64>,
}

pub fn sidelobe_metrics(theta_deg: &[f64], pattern_db: &[f64]) -> SidelobeMetrics {
    let (peak_idx, peak_db) = theta_deg
        .iter()
        .enumerate()
        .map(|(idx, _)| (idx, pattern_db[idx]))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .expect("pattern_db must be non-empty");
    let peak_deg = theta_deg[peak_idx];

    let null_threshold = peak_db - 20.0;

    let left_null = find_null(pattern_db, peak_idx, null_threshold, -1);
    let right_null = find_null(pattern_db, peak_idx, null_threshold, 1);

    let first_null_deg = match (left_null, right_null) {
        (Some(l), Some(r)) => {
            let dl = (peak_deg - theta_deg[l]).abs();
            let dr = (theta_deg[r] - peak_deg).abs();
            Some(if dl <= dr { theta_deg[l] } else { theta_deg[r] })
        }
        (Some(l), None) => Some(theta_deg[l]),
        (None, Some(r)) => Some(theta_deg[r]),
        (None, None) => None,
    };

    let sll_db = match (left_null, right_null) {
        (Some(l), Some(r)) if l < r => {
            let outside: f64 = pattern_db[..l]
                .iter()
                .chain(pattern_db[r + 1..].iter())
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max);
            if outside.is_finite() {
                Some(outside - peak_db)
            } else {
                None
            }
        }
        _ => None,
    };

    SidelobeMetrics { peak_deg, peak_db, first_null_deg, sll_db }
}

/// Walks away from the peak looking for a local minimum at least 20 dB below
/// peak (SPEC_FULL.md §4.4 op 4). `direction` is -1 (left) or 1 (right).
/// Returns an index into `pattern_db`/`theta_deg`; callers look up the angle.
fn find_null(pattern_db: &[f64], peak_idx: usize, threshold: f64, direction: i64) -> Option<usize> {
    let n = pattern_db.len() as i64;
    let mut idx = peak_idx as i64 + direction;
    while idx > 0 && idx < n - 1 {
        let is_local_min = pattern_db[idx as usize] <= pattern_db[(idx - 1) as usize]
            && pattern_db[idx as usize] <= pattern_db[(idx + 1) as usize];
        if is_local_min && pattern_db[idx as usize] < threshold {
            return Some(idx as usize);
        }
        idx += direction;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_peak_and_symmetric_nulls() {
        let theta_deg: Vec<f64> = (-90..=90).step_by(2).map(|v| v as f64).collect();
        let pattern_db: Vec<f64> = theta_deg
            .iter()
            .map(|&t| {
                let x = (t as f64).to_radians() * 10.0;
                let sinc = if x.abs() < 1e-9 { 1.0 } else { x.sin() / x };
                20.0 * sinc.abs().max(1e-6).log10()
            })
            .collect();
        let metrics = sidelobe_metrics(&theta_deg, &pattern_db);
        assert!((metrics.peak_deg).abs() < 2.0);
        assert!(metrics.peak_db > -1e-6);
    }
}
