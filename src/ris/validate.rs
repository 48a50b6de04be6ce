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

/// `validate(theta_deg, pattern_db, ref_theta, ref_pattern) -> {...}`
/// (SPEC_FULL.md §4.4 op 5).
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub rmse_db: f64,
    pub peak_deg_error: f64,
    pub peak_db_error: f64,
    pub pass: bool,
}

const RMSE_THRESHOLD_DB: f64 = 3.0;
const PEAK_ANGLE_THRESHOLD_DEG: f64 = 2.0;

pub fn validate(
    theta_deg: &[f64],
    pattern_db: &[f64],
    ref_theta_deg: &[f64],
    ref_pattern_db: &[f64],
) -> ValidationResult {
    let ref_peak_normalized = peak_normalize(ref_pattern_db);
    let computed_peak_normalized = peak_normalize(pattern_db);

    let resampled_ref: Vec<f64> = theta_deg
        .iter()
        .map(|&theta| interpolate(ref_theta_deg, &ref_peak_normalized, theta))
        .collect();

    let mse: f64 = computed_peak_normalized
        .iter()
        .zip(resampled_ref.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        / computed_peak_normalized.len() as f64;
    let rmse_db = mse.sqrt();

    let (computed_peak_idx, computed_peak_db) = argmax(pattern_db);
    let (ref_peak_idx, ref_peak_db) = argmax(ref_pattern_db);
    let peak_deg_error = theta_deg[computed_peak_idx] - ref_theta_deg[ref_peak_idx];
    let peak_db_error = computed_peak_db - ref_peak_db;

    let pass = rmse_db <= RMSE_THRESHOLD_DB && peak_deg_error.abs() <= PEAK_ANGLE_THRESHOLD_DEG;

    ValidationResult { rmse_db, peak_deg_error, peak_db_error, pass }
}

fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i, v))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .expect("values must be non-empty")
}

fn peak_normalize(pattern_db: &[f64]) -> Vec<f64> {
    let (_, peak) = argmax(pattern_db);
    pattern_db.iter().map(|&v| v - peak).collect()
}

/// Linear interpolation with edge clamping (SPEC_FULL.md §4.4 op 5).
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    let idx = xs.partition_point(|&v| v <= x);
    let (x0, x1) = (xs[idx - 1], xs[idx]);
    let (y0, y1) = (ys[idx - 1], ys[idx]);
    let t = (x - x0) / (x1 - x0);
    y0 + t * (y1 - y0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_reference_passes_with_zero_error() {
        let theta: Vec<f64> = (-10..=10).map(|v| v as f64).collect();
        let pattern: Vec<f64> = theta.iter().map(|&t| -((t).powi(2)) / 10.0).collect();
        let result = validate(&theta, &pattern, &theta, &pattern);
        assert!(result.rmse_db < 1e-6);
        assert_eq!(result.peak_deg_error, 0.0);
        assert!(result.pass);
    }

    #[test]
    fn shifted_peak_fails_and_reports_error() {
        let theta: Vec<f64> = (-20..=20).map(|v| v as f64).collect();
        let pattern: Vec<f64> = theta.iter().map(|&t| -((t).powi(2)) / 5.0).collect();
        let shifted: Vec<f64> = theta.iter().map(|&t| -((t - 5.0).powi(2)) / 5.0).collect();
        let result = validate(&theta, &pattern, &theta, &shifted);
        assert!((result.peak_deg_error - (-5.0)).abs() < 1e-6 || (result.peak_deg_error - 5.0).abs() < 1e-6);
        assert!(!result.pass);
    }
}
