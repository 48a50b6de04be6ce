//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use std::path::Path;

use ndarray::Array2;
use serde::Serialize;
use serde_json::json;

use crate::artifact::{config_hash, canonical_json_bytes, npy_bytes, npz_bytes};
use crate::error::CoreResult;
use crate::grid::RadioMapGrid;
use crate::ris::{PatternSweep, SidelobeMetrics, ValidationResult};
use crate::run::{Run, RunStore};

/// A single-pixel placeholder PNG (valid, minimal). Wiring an actual plotting
/// backend is explicitly left to an integrator (SPEC_FULL.md §1).
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53,
    0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8, 0xCF, 0xC0, 0x00,
    0x00, 0x00, 0x03, 0x00, 0x01, 0x27, 0x5E, 0xDE, 0xFC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E,
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Renders a fixed set of artifacts into a `Run`'s directory, all via
/// `RunStore::write_atomic` (SPEC_FULL.md §4.5).
pub struct ArtifactWriter<'a> {
    store: &'a RunStore,
}

impl<'a> ArtifactWriter<'a> {
    pub fn new(store: &'a RunStore) -> Self {
        ArtifactWriter { store }
    }

    /// Writes `config.yaml`, `config.json` and `config_hash`. Returns the hash.
    pub async fn write_config_snapshot<T: Serialize>(&self, run: &Run, config: &T) -> CoreResult<String> {
        let hash = config_hash(config)
            .map_err(|e| crate::error::CoreError::InvalidConfig(e.to_string()))?;
        let json_bytes = canonical_json_bytes(config)
            .map_err(|e| crate::error::CoreError::InvalidConfig(e.to_string()))?;
        let yaml = serde_yaml::to_string(config)
            .map_err(|e| crate::error::CoreError::InvalidConfig(e.to_string()))?;

        self.store.write_atomic(run, Path::new("config.json"), &json_bytes).await?;
        self.store.write_atomic(run, Path::new("config.yaml"), yaml.as_bytes()).await?;
        self.store.write_atomic(run, Path::new("config_hash"), hash.as_bytes()).await?;

        Ok(hash)
    }

    pub async fn write_summary(&self, run: &Run, summary: &serde_json::Value) -> CoreResult<()> {
        let bytes = serde_json::to_vec_pretty(summary)
            .map_err(|e| crate::error::CoreError::InvalidConfig(e.to_string()))?;
        self.store.write_atomic(run, Path::new("summary.json"), &bytes).await
    }

    pub async fn write_metrics(&self, run: &Run, metrics: &serde_json::Value) -> CoreResult<()> {
        let bytes = serde_json::to_vec_pretty(metrics)
            .map_err(|e| crate::error::CoreError::InvalidConfig(e.to_string()))?;
        self.store.write_atomic(run, Path::new("metrics.json"), &bytes).await
    }

    /// Writes the RIS Lab pattern-mode artifact set (SPEC_FULL.md §4.5).
    pub async fn write_ris_pattern_artifacts(
        &self,
        run: &Run,
        phase: &Array2<f64>,
        sweep: &PatternSweep,
        sidelobe: &SidelobeMetrics,
        quantization_bin_convention: &str,
    ) -> CoreResult<()> {
        let (ny, nx) = phase.dim();
        let phase_flat: Vec<f64> = phase.iter().copied().collect();

        self.store
            .write_atomic(
                run,
                Path::new("data/phase_map.npy"),
                &npy_bytes(&[ny as u64, nx as u64], &phase_flat)?,
            )
            .await?;
        self.store
            .write_atomic(
                run,
                Path::new("data/theta_deg.npy"),
                &npy_bytes(&[sweep.theta_deg.len() as u64], &sweep.theta_deg)?,
            )
            .await?;
        self.store
            .write_atomic(
                run,
                Path::new("data/pattern_linear.npy"),
                &npy_bytes(&[sweep.pattern_linear.len() as u64], &sweep.pattern_linear)?,
            )
            .await?;
        self.store
            .write_atomic(
                run,
                Path::new("data/pattern_db.npy"),
                &npy_bytes(&[sweep.pattern_db.len() as u64], &sweep.pattern_db)?,
            )
            .await?;

        self.store.write_atomic(run, Path::new("plots/phase_map.png"), PLACEHOLDER_PNG).await?;
        self.store.write_atomic(run, Path::new("plots/pattern_cartesian.png"), PLACEHOLDER_PNG).await?;
        self.store.write_atomic(run, Path::new("plots/pattern_polar.png"), PLACEHOLDER_PNG).await?;

        let metrics = json!({
            "peak_deg": sidelobe.peak_deg,
            "peak_db": sidelobe.peak_db,
            "first_null_deg": sidelobe.first_null_deg,
            "sll_db": sidelobe.sll_db,
            "quantization_bin_convention": quantization_bin_convention,
        });
        self.write_metrics(run, &metrics).await
    }

    /// Writes the RIS Lab validation-mode artifact set (SPEC_FULL.md §4.5).
    pub async fn write_ris_validation_artifacts(&self, run: &Run, validation: &ValidationResult) -> CoreResult<()> {
        self.store
            .write_atomic(run, Path::new("plots/validation_overlay.png"), PLACEHOLDER_PNG)
            .await?;
        let metrics = json!({
            "rmse_db": validation.rmse_db,
            "peak_deg_error": validation.peak_deg_error,
            "peak_db_error": validation.peak_db_error,
            "pass": validation.pass,
        });
        self.write_metrics(run, &metrics).await
    }

    /// Writes the sim radio-map viewer artifacts (SPEC_FULL.md §4.5).
    ///
    /// `include_ris` is `Some(bool)` when the map's size was resolved via
    /// `radio_map.auto_size` (recording whether RIS panels were eligible
    /// bounding-box members), `None` when the caller supplied an explicit
    /// `requested_size` (SPEC_FULL.md §9 design note).
    pub async fn write_radio_map(
        &self,
        run: &Run,
        grid: &RadioMapGrid,
        values: &Array2<f64>,
        metric: &str,
        include_ris: Option<bool>,
    ) -> CoreResult<()> {
        let (rows, cols) = values.dim();
        let cell_centers = grid.cell_centers_3d();
        let heatmap_json = json!({
            "metric": metric,
            "grid_shape": [rows, cols],
            "values": values.rows().into_iter().map(|r| r.to_vec()).collect::<Vec<_>>(),
            "cell_centers": cell_centers,
            "center": grid.center,
            "size": grid.size,
            "cell_size": grid.cell_size,
            "orientation": grid.orientation_rad,
            "include_ris": include_ris,
        });
        let bytes = serde_json::to_vec_pretty(&heatmap_json)
            .map_err(|e| crate::error::CoreError::InvalidConfig(e.to_string()))?;
        self.store.write_atomic(run, Path::new("viewer/heatmap.json"), &bytes).await?;

        let values_flat: Vec<f64> = values.iter().copied().collect();
        let members = vec![
            ("values.npy", npy_bytes(&[rows as u64, cols as u64], &values_flat)?),
            ("cell_centers_x.npy", npy_bytes(&[grid.xs.len() as u64], &grid.xs)?),
            ("cell_centers_y.npy", npy_bytes(&[grid.ys.len() as u64], &grid.ys)?),
        ];
        self.store
            .write_atomic(run, Path::new("viewer/heatmap.npz"), &npz_bytes(&members)?)
            .await?;

        let radio_map_plots = json!({
            "plots": [{"name": "radio_map", "path": "plots/radio_map.png", "metric": metric}],
        });
        let plots_bytes = serde_json::to_vec_pretty(&radio_map_plots)
            .map_err(|e| crate::error::CoreError::InvalidConfig(e.to_string()))?;
        self.store
            .write_atomic(run, Path::new("viewer/radio_map_plots.json"), &plots_bytes)
            .await?;

        let csv = radio_map_csv(&cell_centers, values);
        self.store.write_atomic(run, Path::new("data/radio_map.csv"), csv.as_bytes()).await?;

        self.store.write_atomic(run, Path::new("plots/radio_map.png"), PLACEHOLDER_PNG).await
    }

    pub async fn write_viewer_scene(
        &self,
        run: &Run,
        markers: &serde_json::Value,
        paths: &serde_json::Value,
        scene_manifest: &serde_json::Value,
    ) -> CoreResult<()> {
        let markers_bytes = serde_json::to_vec_pretty(markers)
            .map_err(|e| crate::error::CoreError::InvalidConfig(e.to_string()))?;
        let paths_bytes = serde_json::to_vec_pretty(paths)
            .map_err(|e| crate::error::CoreError::InvalidConfig(e.to_string()))?;
        let manifest_bytes = serde_json::to_vec_pretty(scene_manifest)
            .map_err(|e| crate::error::CoreError::InvalidConfig(e.to_string()))?;

        self.store.write_atomic(run, Path::new("viewer/markers.json"), &markers_bytes).await?;
        self.store.write_atomic(run, Path::new("viewer/paths.json"), &paths_bytes).await?;
        self.store
            .write_atomic(run, Path::new("viewer/scene_manifest.json"), &manifest_bytes)
            .await
    }
}

/// Flattens `cell_centers`/`values` into a `x,y,z,value` CSV (SPEC_FULL.md
/// §4.5 `data/*.csv|npz`).
fn radio_map_csv(cell_centers: &[Vec<[f64; 3]>], values: &Array2<f64>) -> String {
    let mut out = String::from("x,y,z,value\n");
    for (row, centers_row) in cell_centers.iter().enumerate() {
        for (col, center) in centers_row.iter().enumerate() {
            let v = values[[row, col]];
            out.push_str(&format!("{},{},{},{}\n", center[0], center[1], center[2], v));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunKind;

    #[tokio::test]
    async fn writes_config_snapshot_and_hash() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RunStore::new(tmp.path().to_path_buf()).unwrap();
        let run = store.allocate(RunKind::Ris).await.unwrap();
        let writer = ArtifactWriter::new(&store);

        let config = json!({"a": 1, "b": 2});
        let hash = writer.write_config_snapshot(&run, &config).await.unwrap();
        assert_eq!(hash.len(), 64);
        assert!(run.dir().join("config.json").is_file());
        assert!(run.dir().join("config.yaml").is_file());
        assert!(run.dir().join("config_hash").is_file());
    }
}
