//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use getset::Getters;
use serde::{Deserialize, Serialize};

use crate::config::util::default_normalization;

/// Reflectarray panel geometry (SPEC_FULL.md §3 "RisConfig.geometry").
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Geometry {
    #[getset(get = "pub")]
    pub nx: usize,
    #[getset(get = "pub")]
    pub ny: usize,
    #[getset(get = "pub")]
    pub dx: f64,
    #[getset(get = "pub")]
    pub dy: f64,
    #[getset(get = "pub")]
    pub origin: [f64; 3],
    #[getset(get = "pub")]
    pub normal: [f64; 3],
    #[getset(get = "pub")]
    pub x_axis_hint: [f64; 3],
}

/// The tagged phase-synthesis control variant (SPEC_FULL.md §3 "RisConfig.control").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case", deny_unknown_fields)]
pub enum Control {
    Steer {
        az_deg: f64,
        el_deg: f64,
        #[serde(default)]
        phase_offset_deg: f64,
    },
    Uniform {
        phase_deg: f64,
    },
    Focus {
        focal_point: [f64; 3],
    },
    Gradient {
        sources: [f64; 3],
        targets: [f64; 3],
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quantization {
    pub bits: u8,
    /// Explicit opt-in to bypass the λ/10 element-spacing invariant for continuous
    /// phase (`bits == 0`). Submitters must set this; `bits == 0` alone is not enough.
    #[serde(default)]
    pub allow_sub_lambda_spacing: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    Peak0db,
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RxSweep {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternMode {
    #[serde(default = "default_normalization")]
    pub normalization: Normalization,
    pub rx_sweep_deg: RxSweep,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Experiment {
    pub frequency_hz: f64,
    pub tx_angle_deg: f64,
    pub tx_distance_m: f64,
    pub rx_distance_m: f64,
    #[serde(default)]
    pub tx_gain_dbi: f64,
    #[serde(default)]
    pub rx_gain_dbi: f64,
    #[serde(default)]
    pub tx_power_dbm: f64,
    #[serde(default)]
    pub reflection_coeff: f64,
}

/// The submitted RIS Lab job configuration (SPEC_FULL.md §3).
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RisConfig {
    #[getset(get = "pub")]
    pub geometry: Geometry,
    #[getset(get = "pub")]
    pub control: Control,
    #[serde(default = "default_quantization")]
    #[getset(get = "pub")]
    pub quantization: Quantization,
    #[getset(get = "pub")]
    pub pattern_mode: PatternMode,
    #[getset(get = "pub")]
    pub experiment: Experiment,
    /// Extension point noted in SPEC_FULL.md §9: per-element real amplitude taper.
    /// `None` means uniform amplitude.
    #[serde(default)]
    #[getset(get = "pub")]
    pub amplitude_taper: Option<Vec<Vec<f64>>>,
}

fn default_quantization() -> Quantization {
    Quantization { bits: 0, allow_sub_lambda_spacing: false }
}

impl RisConfig {
    /// Validates the invariants of SPEC_FULL.md §3: non-parallel normal/x_axis_hint,
    /// minimum element spacing unless continuous phase is requested.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.geometry.normal;
        let x = self.geometry.x_axis_hint;
        let cross = [
            n[1] * x[2] - n[2] * x[1],
            n[2] * x[0] - n[0] * x[2],
            n[0] * x[1] - n[1] * x[0],
        ];
        let cross_mag = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
        if cross_mag < 1e-9 {
            return Err("normal and x_axis_hint must not be parallel".to_string());
        }

        let c = 299_792_458.0_f64;
        let lambda = c / self.experiment.frequency_hz;
        let min_spacing = self.geometry.dx.min(self.geometry.dy);
        let spacing_relaxed = self.quantization.bits == 0 && self.quantization.allow_sub_lambda_spacing;
        if !spacing_relaxed && min_spacing < lambda / 10.0 {
            return Err(format!(
                "element spacing {min_spacing} is below lambda/10 ({})",
                lambda / 10.0
            ));
        }

        if self.geometry.nx == 0 || self.geometry.ny == 0 {
            return Err("nx and ny must be positive".to_string());
        }
        if self.geometry.dx <= 0.0 || self.geometry.dy <= 0.0 {
            return Err("dx and dy must be positive".to_string());
        }
        if self.experiment.frequency_hz <= 0.0 {
            return Err("frequency_hz must be positive".to_string());
        }
        if self.experiment.tx_distance_m <= 0.0 || self.experiment.rx_distance_m <= 0.0 {
            return Err("tx_distance_m and rx_distance_m must be positive".to_string());
        }

        Ok(())
    }
}
