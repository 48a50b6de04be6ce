//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Canonical, snapped radio-map grid metadata (SPEC_FULL.md §3 "RadioMapGrid").
///
/// `cell_centers` is the sole source of truth for all downstream placement;
/// no other component re-derives it independently (SPEC_FULL.md §9 design note).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioMapGrid {
    pub cell_size: (f64, f64),
    pub center: (f64, f64, f64),
    pub size: (f64, f64),
    pub orientation_rad: (f64, f64, f64),
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl RadioMapGrid {
    /// Per-cell 3-D world positions, `cell_centers[row][col] = [x, y, z]`
    /// (SPEC_FULL.md §4.5 `viewer/heatmap.json`), `row` indexing `ys` and
    /// `col` indexing `xs`. Each in-plane offset from `center` is rotated by
    /// `orientation_rad` (intrinsic X-then-Y-then-Z Euler angles) before being
    /// translated back to world coordinates.
    pub fn cell_centers_3d(&self) -> Vec<Vec<[f64; 3]>> {
        let (cx, cy, cz) = self.center;
        self.ys
            .iter()
            .map(|&y| {
                self.xs
                    .iter()
                    .map(|&x| {
                        let [dx, dy, dz] = rotate_euler(x - cx, y - cy, 0.0, self.orientation_rad);
                        [cx + dx, cy + dy, cz + dz]
                    })
                    .collect()
            })
            .collect()
    }
}

/// Rotates `(x, y, z)` by Euler angles `(rx, ry, rz)`, applied in X, then Y,
/// then Z order.
fn rotate_euler(x: f64, y: f64, z: f64, (rx, ry, rz): (f64, f64, f64)) -> [f64; 3] {
    let (sx, cx) = rx.sin_cos();
    let (y1, z1) = (y * cx - z * sx, y * sx + z * cx);
    let x1 = x;

    let (sy, cy) = ry.sin_cos();
    let (x2, z2) = (x1 * cy + z1 * sy, -x1 * sy + z1 * cy);
    let y2 = y1;

    let (sz, cz) = rz.sin_cos();
    let (x3, y3) = (x2 * cz - y2 * sz, x2 * sz + y2 * cz);

    [x3, y3, z2]
}

pub struct AlignRequest {
    pub requested_size: (f64, f64),
    pub cell_size: (f64, f64),
    pub center: (f64, f64, f64),
    pub orientation_rad: (f64, f64, f64),
    /// If set, `requested_size` is ignored and the requested rectangle is
    /// instead the bounding box of `auto_size.bounds` inflated by
    /// `auto_size.padding` on each side (SPEC_FULL.md §4.3 step 1).
    pub auto_size: Option<AutoSizeBounds>,
}

#[derive(Debug, Clone, Copy)]
pub struct AutoSizeBounds {
    pub min: (f64, f64),
    pub max: (f64, f64),
    pub padding: f64,
}

/// Snaps a requested rectangle to an integer number of cells, centered on the
/// requested center (SPEC_FULL.md §4.3).
pub struct GridAligner;

impl GridAligner {
    pub fn align(req: &AlignRequest) -> Result<RadioMapGrid, CoreError> {
        let (cx, cy) = req.cell_size;
        let (cxc, cyc, czc) = req.center;

        let (wx_req, wy_req) = match &req.auto_size {
            Some(auto) => (
                (auto.max.0 - auto.min.0).abs() + 2.0 * auto.padding,
                (auto.max.1 - auto.min.1).abs() + 2.0 * auto.padding,
            ),
            None => req.requested_size,
        };

        if cx <= 0.0 || cy <= 0.0 {
            return Err(CoreError::InvalidGrid("cell_size must be positive".into()));
        }
        if wx_req <= 0.0 || wy_req <= 0.0 {
            return Err(CoreError::InvalidGrid("requested_size must be positive".into()));
        }
        if !cxc.is_finite() || !cyc.is_finite() || !czc.is_finite() {
            return Err(CoreError::InvalidGrid("center must be finite".into()));
        }

        let wx = snap_up(wx_req, cx);
        let wy = snap_up(wy_req, cy);

        let nx = (wx / cx).round() as usize;
        let ny = (wy / cy).round() as usize;

        let xs: Vec<f64> = (0..nx)
            .map(|i| cxc - wx / 2.0 + (i as f64 + 0.5) * cx)
            .collect();
        let ys: Vec<f64> = (0..ny)
            .map(|j| cyc - wy / 2.0 + (j as f64 + 0.5) * cy)
            .collect();

        Ok(RadioMapGrid {
            cell_size: (cx, cy),
            center: (cxc, cyc, czc),
            size: (wx, wy),
            orientation_rad: req.orientation_rad,
            xs,
            ys,
        })
    }
}

/// Snaps `size` up to the nearest multiple of `cell`, at least `2*cell`.
/// If `size` is already an exact multiple, it is left unchanged (tie-break
/// per SPEC_FULL.md §4.3).
fn snap_up(size: f64, cell: f64) -> f64 {
    let ratio = size / cell;
    let rounded = if (ratio - ratio.round()).abs() < 1e-9 {
        ratio.round()
    } else {
        ratio.ceil()
    };
    (rounded.max(2.0)) * cell
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_is_idempotent() {
        let req = AlignRequest {
            requested_size: (37.3, 18.7),
            cell_size: (1.0, 0.5),
            center: (10.0, 2.0, 1.5),
            orientation_rad: (0.0, 0.0, 0.0),
            auto_size: None,
        };
        let once = GridAligner::align(&req).unwrap();
        let req2 = AlignRequest {
            requested_size: once.size,
            cell_size: once.cell_size,
            center: once.center,
            orientation_rad: once.orientation_rad,
            auto_size: None,
        };
        let twice = GridAligner::align(&req2).unwrap();
        assert_eq!(once.size, twice.size);
    }

    #[test]
    fn matches_s5_scenario() {
        // SPEC_FULL.md §8 scenario S5
        let req = AlignRequest {
            requested_size: (37.3, 18.7),
            cell_size: (1.0, 0.5),
            center: (10.0, 2.0, 1.5),
            orientation_rad: (0.0, 0.0, 0.0),
            auto_size: None,
        };
        let grid = GridAligner::align(&req).unwrap();
        assert_eq!(grid.size, (38.0, 19.0));
        assert!((grid.xs[0] - (10.0 - 19.0 + 0.5)).abs() < 1e-9);
        assert!((grid.ys[0] - (2.0 - 9.5 + 0.25)).abs() < 1e-9);
    }

    #[test]
    fn minimum_size_is_two_cells() {
        let req = AlignRequest {
            requested_size: (0.1, 0.1),
            cell_size: (1.0, 1.0),
            center: (0.0, 0.0, 0.0),
            orientation_rad: (0.0, 0.0, 0.0),
            auto_size: None,
        };
        let grid = GridAligner::align(&req).unwrap();
        assert_eq!(grid.size, (2.0, 2.0));
    }

    #[test]
    fn rejects_non_positive_cell_size() {
        let req = AlignRequest {
            requested_size: (10.0, 10.0),
            cell_size: (0.0, 1.0),
            center: (0.0, 0.0, 0.0),
            orientation_rad: (0.0, 0.0, 0.0),
            auto_size: None,
        };
        assert!(GridAligner::align(&req).is_err());
    }

    #[test]
    fn auto_size_bounds_devices_with_padding() {
        let req = AlignRequest {
            requested_size: (1.0, 1.0), // ignored, auto_size takes over
            cell_size: (1.0, 1.0),
            center: (5.0, 5.0, 0.0),
            orientation_rad: (0.0, 0.0, 0.0),
            auto_size: Some(AutoSizeBounds { min: (2.0, 3.0), max: (8.0, 7.0), padding: 1.0 }),
        };
        let grid = GridAligner::align(&req).unwrap();
        // bbox is 6x4, inflated by 1.0 on each side -> 8x6, already multiples of cell_size
        assert_eq!(grid.size, (8.0, 6.0));
    }

    #[test]
    fn cell_centers_3d_unrotated_matches_xy_plane() {
        let req = AlignRequest {
            requested_size: (2.0, 2.0),
            cell_size: (1.0, 1.0),
            center: (0.0, 0.0, 3.0),
            orientation_rad: (0.0, 0.0, 0.0),
            auto_size: None,
        };
        let grid = GridAligner::align(&req).unwrap();
        let centers = grid.cell_centers_3d();
        assert_eq!(centers.len(), grid.ys.len());
        assert_eq!(centers[0].len(), grid.xs.len());
        assert_eq!(centers[0][0], [grid.xs[0], grid.ys[0], 3.0]);
    }
}
