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

use crate::config::Control;
use crate::ris::geometry::{distance, ElementGrid, LocalFrame};
use crate::ris::wavenumber;

/// Wraps a phase value into `(-pi, pi]` (SPEC_FULL.md §4.4, §8 property 5).
pub fn wrap_phase(phi: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let wrapped = phi - two_pi * ((phi + std::f64::consts::PI) / two_pi).floor();
    if wrapped <= -std::f64::consts::PI {
        wrapped + two_pi
    } else {
        wrapped
    }
}

/// `synthesize_phase(config) -> PhaseMap[ny,nx]` (SPEC_FULL.md §4.4 op 1).
pub fn synthesize_phase(
    control: &Control,
    frequency_hz: f64,
    grid: &ElementGrid,
    frame: &LocalFrame,
) -> Array2<f64> {
    let k = wavenumber(frequency_hz);
    let (ny, nx) = grid.shape();
    let mut phase = Array2::<f64>::zeros((ny, nx));

    match control {
        Control::Steer { az_deg, el_deg, phase_offset_deg } => {
            let az = az_deg.to_radians();
            let el = el_deg.to_radians();
            let phi0 = phase_offset_deg.to_radians();
            for j in 0..ny {
                for i in 0..nx {
                    let p = grid.at(j, i);
                    let p_x = p[0] * frame.x_hat[0] + p[1] * frame.x_hat[1] + p[2] * frame.x_hat[2];
                    let p_y = p[0] * frame.y_hat[0] + p[1] * frame.y_hat[1] + p[2] * frame.y_hat[2];
                    let phi = -k * (el.sin() * p_x + el.cos() * az.sin() * p_y) + phi0;
                    phase[[j, i]] = wrap_phase(phi);
                }
            }
        }
        Control::Uniform { phase_deg } => {
            let phi = wrap_phase(phase_deg.to_radians());
            phase.fill(phi);
        }
        Control::Focus { focal_point } => {
            for j in 0..ny {
                for i in 0..nx {
                    let p = grid.at(j, i);
                    let phi = -k * distance(p, *focal_point);
                    phase[[j, i]] = wrap_phase(phi);
                }
            }
        }
        Control::Gradient { sources, targets } => {
            for j in 0..ny {
                for i in 0..nx {
                    let p = grid.at(j, i);
                    let phi = -k * (distance(p, *sources) + distance(p, *targets));
                    phase[[j, i]] = wrap_phase(phi);
                }
            }
        }
    }

    phase
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Geometry;

    fn geometry() -> Geometry {
        Geometry {
            nx: 8,
            ny: 8,
            dx: 5e-3,
            dy: 5e-3,
            origin: [0.0, 0.0, 0.0],
            normal: [1.0, 0.0, 0.0],
            x_axis_hint: [0.0, 1.0, 0.0],
        }
    }

    #[test]
    fn all_phases_are_wrapped() {
        let geometry = geometry();
        let frame = LocalFrame::from_geometry(&geometry);
        let grid = ElementGrid::build(&geometry, &frame);
        let control = Control::Steer { az_deg: 30.0, el_deg: 0.0, phase_offset_deg: 0.0 };
        let phase = synthesize_phase(&control, 28e9, &grid, &frame);
        for &v in phase.iter() {
            assert!(v > -std::f64::consts::PI - 1e-9 && v <= std::f64::consts::PI + 1e-9);
        }
    }

    #[test]
    fn uniform_control_is_constant() {
        let geometry = geometry();
        let frame = LocalFrame::from_geometry(&geometry);
        let grid = ElementGrid::build(&geometry, &frame);
        let control = Control::Uniform { phase_deg: 45.0 };
        let phase = synthesize_phase(&control, 28e9, &grid, &frame);
        let first = phase[[0, 0]];
        for &v in phase.iter() {
            assert!((v - first).abs() < 1e-12);
        }
    }

    #[test]
    fn wrap_phase_handles_boundary() {
        assert!((wrap_phase(std::f64::consts::PI) - std::f64::consts::PI).abs() < 1e-9);
        assert!(wrap_phase(-std::f64::consts::PI) > 0.0 - 1e-9);
    }
}
