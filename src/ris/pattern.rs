//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use ndarray::Array2;

use crate::config::{Experiment, Normalization, RxSweep};
use crate::ris::geometry::{distance, ElementGrid, LocalFrame};
use crate::ris::wavenumber;

const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct PatternSweep {
    pub theta_deg: Vec<f64>,
    pub pattern_linear: Vec<f64>,
    pub pattern_db: Vec<f64>,
}

/// `pattern_sweep(PhaseMap, RxSweep, experiment) -> (theta_deg[], pattern_linear[], pattern_db[])`
/// (SPEC_FULL.md §4.4 op 3).
///
/// Complex arithmetic is done by hand as `(re, im)` f64 pairs: no example repo in
/// the retrieval pack depends on `num-complex`, and the summation here only needs
/// addition, a unit-phasor multiply and a magnitude — not enough surface to justify
/// an otherwise ungrounded dependency (see DESIGN.md).
///
/// The tx/rx points sit at `tx_angle_deg`/the swept `theta` direction, each at
/// their own configured distance from the panel's reference point (world
/// origin, the same reference the direction vectors are taken against), so
/// the per-element phase is the exact spherical path length rather than a
/// far-field plane-wave approximation — elements closer to a near-field
/// source pick up a measurably different phase than elements farther away.
pub fn pattern_sweep(
    phase: &Array2<f64>,
    amplitude: Option<&Array2<f64>>,
    rx_sweep: &RxSweep,
    experiment: &Experiment,
    normalization: Normalization,
    grid: &ElementGrid,
    frame: &LocalFrame,
) -> PatternSweep {
    let k = wavenumber(experiment.frequency_hz);
    let (ny, nx) = grid.shape();

    let direction = |theta_rad: f64| -> [f64; 3] {
        let s = theta_rad.sin();
        let c = theta_rad.cos();
        [
            s * frame.x_hat[0] + c * frame.z_hat[0],
            s * frame.x_hat[1] + c * frame.z_hat[1],
            s * frame.x_hat[2] + c * frame.z_hat[2],
        ]
    };

    let point_at = |dir: [f64; 3], dist: f64| -> [f64; 3] { [dir[0] * dist, dir[1] * dist, dir[2] * dist] };

    let tx_dir = direction(experiment.tx_angle_deg.to_radians());
    let tx_pos = point_at(tx_dir, experiment.tx_distance_m);

    let mut theta_deg = Vec::new();
    let mut n = rx_sweep.start;
    while n <= rx_sweep.stop + 1e-9 {
        theta_deg.push(n);
        n += rx_sweep.step;
    }

    let mut pattern_linear = Vec::with_capacity(theta_deg.len());

    for &theta in &theta_deg {
        let rx_dir = direction(theta.to_radians());
        let rx_pos = point_at(rx_dir, experiment.rx_distance_m);
        let mut re = 0.0_f64;
        let mut im = 0.0_f64;

        for j in 0..ny {
            for i in 0..nx {
                let p = grid.at(j, i);
                let total_phase = phase[[j, i]] + k * (distance(p, tx_pos) - distance(p, rx_pos));
                let a = amplitude.map(|arr| arr[[j, i]]).unwrap_or(1.0);
                re += a * total_phase.cos();
                im += a * total_phase.sin();
            }
        }

        pattern_linear.push(re * re + im * im);
    }

    normalize(&mut pattern_linear, normalization);

    let pattern_db: Vec<f64> = pattern_linear
        .iter()
        .map(|&v| 10.0 * v.max(EPSILON).log10())
        .collect();

    PatternSweep { theta_deg, pattern_linear, pattern_db }
}

fn normalize(pattern_linear: &mut [f64], mode: Normalization) {
    if let Normalization::Peak0db = mode {
        let peak = pattern_linear.iter().cloned().fold(0.0_f64, f64::max);
        if peak > 0.0 {
            for v in pattern_linear.iter_mut() {
                *v /= peak;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Control, Geometry};
    use crate::ris::{quantize, synthesize_phase};

    fn geometry() -> Geometry {
        Geometry {
            nx: 20,
            ny: 20,
            dx: 4.9e-3,
            dy: 4.9e-3,
            origin: [0.0, 0.0, 0.0],
            normal: [1.0, 0.0, 0.0],
            x_axis_hint: [0.0, 1.0, 0.0],
        }
    }

    #[test]
    fn steered_pattern_peaks_near_steer_angle() {
        let geometry = geometry();
        let frame = LocalFrame::from_geometry(&geometry);
        let grid = ElementGrid::build(&geometry, &frame);
        let control = Control::Steer { az_deg: 30.0, el_deg: 0.0, phase_offset_deg: 0.0 };
        let phase = synthesize_phase(&control, 28e9, &grid, &frame);
        let phase = quantize(&phase, 1);

        let experiment = Experiment {
            frequency_hz: 28e9,
            tx_angle_deg: -60.0,
            tx_distance_m: 2.0,
            rx_distance_m: 2.0,
            tx_gain_dbi: 0.0,
            rx_gain_dbi: 0.0,
            tx_power_dbm: 0.0,
            reflection_coeff: 1.0,
        };
        let rx_sweep = RxSweep { start: -90.0, stop: 90.0, step: 2.0 };
        let sweep = pattern_sweep(&phase, None, &rx_sweep, &experiment, Normalization::Peak0db, &grid, &frame);

        let (peak_idx, _) = sweep
            .pattern_db
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        let peak_theta = sweep.theta_deg[peak_idx];
        assert!((peak_theta - 30.0).abs() <= 2.5, "peak at {peak_theta}");
    }

    #[test]
    fn peak_normalization_yields_unit_max() {
        let geometry = geometry();
        let frame = LocalFrame::from_geometry(&geometry);
        let grid = ElementGrid::build(&geometry, &frame);
        let control = Control::Uniform { phase_deg: 0.0 };
        let phase = synthesize_phase(&control, 28e9, &grid, &frame);
        let experiment = Experiment {
            frequency_hz: 28e9,
            tx_angle_deg: 0.0,
            tx_distance_m: 2.0,
            rx_distance_m: 2.0,
            tx_gain_dbi: 0.0,
            rx_gain_dbi: 0.0,
            tx_power_dbm: 0.0,
            reflection_coeff: 1.0,
        };
        let rx_sweep = RxSweep { start: -10.0, stop: 10.0, step: 1.0 };
        let sweep = pattern_sweep(&phase, None, &rx_sweep, &experiment, Normalization::Peak0db, &grid, &frame);
        let peak = sweep.pattern_linear.iter().cloned().fold(0.0, f64::max);
        assert!((peak - 1.0).abs() < 1e-9);
    }
}
