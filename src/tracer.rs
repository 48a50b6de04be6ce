//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

//! The narrow facade the core consumes the (out-of-scope, third-party)
//! ray-tracing library through (SPEC_FULL.md §1, §7 "BackendUnavailable").
//! `NullTracer` is a minimal, deterministic stand-in — a real integration
//! swaps it for a binding onto the actual solver without touching the
//! scheduler or artifact contract, mirroring the teacher's own separation
//! between the orchestrator and the docker runtime it drives.

use ndarray::Array2;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::grid::RadioMapGrid;

/// The hardware backend a `Tracer` implementation actually runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    CpuLlvm,
    CudaOptix,
}

impl Backend {
    /// The exact single-line verdict string SPEC_FULL.md §7 requires on
    /// `BackendUnavailable`.
    pub fn verdict(&self) -> &'static str {
        match self {
            Backend::CpuLlvm => "RT backend is CPU/LLVM",
            Backend::CudaOptix => "RT backend is CUDA/OptiX",
        }
    }
}

/// A resolved sim-job request, post config-merge, ready for a `Tracer`.
pub struct SimRequest<'a> {
    pub grid: &'a RadioMapGrid,
    pub scene: &'a Value,
    pub requires_gpu: bool,
    pub allow_fallback: bool,
}

pub struct SimOutput {
    pub values: Array2<f64>,
    pub metric: String,
    pub markers: Value,
    pub paths: Value,
    pub scene_manifest: Value,
}

/// Consumes scene + grid, produces a radio map plus viewer artifacts.
/// Pure and deterministic given its inputs (mirrors `RisKernel`'s failure
/// semantics): the only error this trait itself may report is
/// `BackendUnavailable`, via `resolve_backend`.
pub trait Tracer: Send + Sync {
    fn available_backend(&self) -> Backend;
    fn run(&self, request: &SimRequest<'_>) -> CoreResult<SimOutput>;
}

/// Silent fallback is forbidden (SPEC_FULL.md §7): a GPU-required job on a
/// tracer that only has the CPU/LLVM backend fails fast with
/// `BackendUnavailable`, unless the submitted config explicitly allows it.
pub fn resolve_backend(requires_gpu: bool, available: Backend, allow_fallback: bool) -> CoreResult<Backend> {
    let needs_gpu_backend = requires_gpu && available != Backend::CudaOptix;
    if needs_gpu_backend && !allow_fallback {
        return Err(CoreError::BackendUnavailable(available.verdict().to_string()));
    }
    Ok(available)
}

/// A deterministic CPU-only tracer: each cell's metric is the strongest
/// free-space-path-loss contribution among `scene.devices[].position`, in dB.
/// Stands in for the real ray tracer (explicitly out of scope, SPEC_FULL.md §1).
pub struct NullTracer {
    pub frequency_hz: f64,
}

impl NullTracer {
    pub fn new(frequency_hz: f64) -> Self {
        NullTracer { frequency_hz }
    }

    fn free_space_path_loss_db(&self, distance_m: f64) -> f64 {
        let distance_m = distance_m.max(1e-3);
        let wavelength_m = crate::ris::SPEED_OF_LIGHT_M_S / self.frequency_hz;
        20.0 * (4.0 * std::f64::consts::PI * distance_m / wavelength_m).log10()
    }
}

impl Tracer for NullTracer {
    fn available_backend(&self) -> Backend {
        Backend::CpuLlvm
    }

    fn run(&self, request: &SimRequest<'_>) -> CoreResult<SimOutput> {
        resolve_backend(request.requires_gpu, self.available_backend(), request.allow_fallback)?;

        let devices: Vec<(f64, f64, f64)> = request
            .scene
            .get("devices")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|d| d.get("position").and_then(|p| p.as_array()))
                    .filter_map(|p| {
                        if p.len() == 3 {
                            Some((p[0].as_f64()?, p[1].as_f64()?, p[2].as_f64()?))
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let (ny, nx) = (request.grid.ys.len(), request.grid.xs.len());
        let mut values = Array2::<f64>::from_elem((ny, nx), f64::NEG_INFINITY);
        let z = request.grid.center.2;

        for (j, &y) in request.grid.ys.iter().enumerate() {
            for (i, &x) in request.grid.xs.iter().enumerate() {
                let mut best_db = f64::NEG_INFINITY;
                for &(dx, dy, dz) in &devices {
                    let dist = ((x - dx).powi(2) + (y - dy).powi(2) + (z - dz).powi(2)).sqrt();
                    let received_db = -self.free_space_path_loss_db(dist);
                    if received_db > best_db {
                        best_db = received_db;
                    }
                }
                values[[j, i]] = best_db;
            }
        }

        let markers = serde_json::json!({
            "devices": devices.iter().map(|(x, y, z)| serde_json::json!({"position": [x, y, z]})).collect::<Vec<_>>(),
        });
        let paths = serde_json::json!({"paths": []});
        let scene_manifest = request.scene.clone();

        Ok(SimOutput {
            values,
            metric: "received_power_db".to_string(),
            markers,
            paths,
            scene_manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_required_without_fallback_is_rejected() {
        let err = resolve_backend(true, Backend::CpuLlvm, false).unwrap_err();
        assert!(matches!(err, CoreError::BackendUnavailable(_)));
    }

    #[test]
    fn gpu_required_with_fallback_allowed_succeeds() {
        assert!(resolve_backend(true, Backend::CpuLlvm, true).is_ok());
    }

    #[test]
    fn cpu_only_request_always_succeeds() {
        assert!(resolve_backend(false, Backend::CpuLlvm, false).is_ok());
    }
}
