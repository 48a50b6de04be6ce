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

use crate::config::Geometry;

type Vec3 = [f64; 3];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

fn normalize(a: Vec3) -> Vec3 {
    let n = norm(a);
    [a[0] / n, a[1] / n, a[2] / n]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// The panel's local right-handed frame, derived from `normal`/`x_axis_hint`
/// via Gram-Schmidt orthonormalization (SPEC_FULL.md §4.4).
pub struct LocalFrame {
    pub x_hat: Vec3,
    pub y_hat: Vec3,
    pub z_hat: Vec3,
}

impl LocalFrame {
    pub fn from_geometry(geometry: &Geometry) -> Self {
        let z_hat = normalize(geometry.normal);
        let hint = geometry.x_axis_hint;
        let x_unprojected = sub(hint, scale(z_hat, dot(hint, z_hat)));
        let x_hat = normalize(x_unprojected);
        let y_hat = cross(z_hat, x_hat);
        LocalFrame { x_hat, y_hat, z_hat }
    }
}

/// Per-element Cartesian positions, one component array per axis so the
/// kernel can operate on them with plain `ndarray` arithmetic.
pub struct ElementGrid {
    pub px: Array2<f64>,
    pub py: Array2<f64>,
    pub pz: Array2<f64>,
}

impl ElementGrid {
    /// `p(i,j) = origin + (i - (nx-1)/2)*dx*x_hat + (j - (ny-1)/2)*dy*y_hat`
    /// (SPEC_FULL.md §4.4).
    pub fn build(geometry: &Geometry, frame: &LocalFrame) -> Self {
        let (nx, ny) = (geometry.nx, geometry.ny);
        let mut px = Array2::<f64>::zeros((ny, nx));
        let mut py = Array2::<f64>::zeros((ny, nx));
        let mut pz = Array2::<f64>::zeros((ny, nx));

        let cx = (nx as f64 - 1.0) / 2.0;
        let cy = (ny as f64 - 1.0) / 2.0;

        for j in 0..ny {
            for i in 0..nx {
                let off_x = (i as f64 - cx) * geometry.dx;
                let off_y = (j as f64 - cy) * geometry.dy;
                let p = [
                    geometry.origin[0] + off_x * frame.x_hat[0] + off_y * frame.y_hat[0],
                    geometry.origin[1] + off_x * frame.x_hat[1] + off_y * frame.y_hat[1],
                    geometry.origin[2] + off_x * frame.x_hat[2] + off_y * frame.y_hat[2],
                ];
                px[[j, i]] = p[0];
                py[[j, i]] = p[1];
                pz[[j, i]] = p[2];
            }
        }

        ElementGrid { px, py, pz }
    }

    pub fn at(&self, j: usize, i: usize) -> Vec3 {
        [self.px[[j, i]], self.py[[j, i]], self.pz[[j, i]]]
    }

    pub fn shape(&self) -> (usize, usize) {
        self.px.dim()
    }
}

pub(crate) fn distance(a: Vec3, b: Vec3) -> f64 {
    norm(sub(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> Geometry {
        Geometry {
            nx: 4,
            ny: 4,
            dx: 5e-3,
            dy: 5e-3,
            origin: [0.0, 0.0, 0.0],
            normal: [1.0, 0.0, 0.0],
            x_axis_hint: [0.0, 1.0, 0.0],
        }
    }

    #[test]
    fn frame_is_orthonormal() {
        let frame = LocalFrame::from_geometry(&geometry());
        assert!((dot(frame.x_hat, frame.z_hat)).abs() < 1e-9);
        assert!((dot(frame.y_hat, frame.z_hat)).abs() < 1e-9);
        assert!((norm(frame.x_hat) - 1.0).abs() < 1e-9);
        assert!((norm(frame.y_hat) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn grid_is_centered_on_origin() {
        let geometry = geometry();
        let frame = LocalFrame::from_geometry(&geometry);
        let grid = ElementGrid::build(&geometry, &frame);
        let (ny, nx) = grid.shape();
        let mut sum = [0.0; 3];
        for j in 0..ny {
            for i in 0..nx {
                let p = grid.at(j, i);
                sum[0] += p[0];
                sum[1] += p[1];
                sum[2] += p[2];
            }
        }
        assert!(sum[0].abs() < 1e-9);
        assert!(sum[1].abs() < 1e-9);
        assert!(sum[2].abs() < 1e-9);
    }
}
