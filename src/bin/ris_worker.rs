//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

//! RIS Lab worker (SPEC_FULL.md §10 "Worker harness"). Invoked by the
//! scheduler as `ris-worker --run-dir <dir> --run-id <id>`; reads the
//! `RisJobRequest` the scheduler already wrote into the run directory, runs
//! the reflectarray kernel (`synthesize_phase` -> `quantize` -> `pattern_sweep`
//! -> `sidelobe_metrics`, plus `validate` for `RisAction::Validate`), writes
//! the resulting artifacts, and emits `PROGRESS {json}` lines on stdout.

use std::path::PathBuf;

use tracing::error;
use wavebench::artifact::ArtifactWriter;
use wavebench::config::{RisAction, RisConfig, RisJobRequest};
use wavebench::error::CoreError;
use wavebench::progress::{format_progress_line, ProgressRecord};
use wavebench::ris::{
    pattern_sweep, quantize, sidelobe_metrics, synthesize_phase, validate, ElementGrid, LocalFrame,
    QUANTIZATION_BIN_CONVENTION,
};
use wavebench::run::{RunId, RunKind, RunStore};

fn emit(record: ProgressRecord) {
    println!("{}", format_progress_line(&record));
}

struct Args {
    run_dir: PathBuf,
    run_id: RunId,
    mode: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut run_dir = None;
    let mut run_id = None;
    let mut mode = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--run-dir" => run_dir = args.next(),
            "--run-id" => run_id = args.next(),
            "--mode" => mode = args.next(),
            _ => {}
        }
    }
    let run_dir = run_dir.ok_or("missing --run-dir")?;
    let run_id = run_id.ok_or("missing --run-id")?;
    let run_id = RunId::parse(&run_id).ok_or("malformed --run-id")?;
    Ok(Args { run_dir: PathBuf::from(run_dir), run_id, mode })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "invalid worker arguments");
            std::process::exit(2);
        }
    };

    let code = match run(args).await {
        Ok(()) => 0,
        Err(CoreError::InvalidConfig(msg)) | Err(CoreError::InvalidGrid(msg)) => {
            error!(error = %msg, "ris job rejected for invalid config");
            emit(ProgressRecord::failed(0, "invalid config".into(), 0, msg));
            2
        }
        Err(CoreError::BackendUnavailable(msg)) => {
            error!(error = %msg, "required backend unavailable");
            emit(ProgressRecord::failed(0, "backend unavailable".into(), 0, msg.clone()));
            eprintln!("{msg}");
            3
        }
        Err(e) => {
            error!(error = %e, "ris job failed");
            emit(ProgressRecord::failed(0, "failed".into(), 0, e.to_string()));
            1
        }
    };
    std::process::exit(code);
}

async fn run(args: Args) -> Result<(), CoreError> {
    let root = args
        .run_dir
        .parent()
        .map(PathBuf::from)
        .ok_or_else(|| CoreError::InvalidConfig("run directory has no parent".to_string()))?;
    let store = RunStore::new(root)?;
    let run = store.open_known(&args.run_id, RunKind::Ris)?;
    let writer = ArtifactWriter::new(&store);

    let mode = args.mode.as_deref().unwrap_or("pattern");
    if mode != "pattern" {
        return Err(CoreError::InvalidConfig(format!(
            "ris worker mode '{mode}' is not implemented; only 'pattern' is supported"
        )));
    }

    emit(ProgressRecord::running(0, "loading config".into(), 5, Some(0.0)));
    let config_bytes = tokio::fs::read(args.run_dir.join("config.json")).await?;
    let request: RisJobRequest = serde_json::from_slice(&config_bytes)
        .map_err(|e| CoreError::InvalidConfig(format!("config.json does not match ris job schema: {e}")))?;

    let config = load_ris_config(&request).await?;
    config.validate().map_err(CoreError::InvalidConfig)?;
    writer.write_config_snapshot(&run, &config).await?;

    emit(ProgressRecord::running(1, "synthesizing phase".into(), 5, Some(0.2)));
    let frame = LocalFrame::from_geometry(config.geometry());
    let grid = ElementGrid::build(config.geometry(), &frame);
    let phase = synthesize_phase(config.control(), config.experiment().frequency_hz, &grid, &frame);

    emit(ProgressRecord::running(2, "quantizing phase".into(), 5, Some(0.4)));
    let quantized = quantize(&phase, config.quantization().bits);

    emit(ProgressRecord::running(3, "sweeping pattern".into(), 5, Some(0.6)));
    let amplitude = amplitude_array(&config);
    let sweep = pattern_sweep(
        &quantized,
        amplitude.as_ref(),
        &config.pattern_mode().rx_sweep_deg,
        config.experiment(),
        config.pattern_mode().normalization,
        &grid,
        &frame,
    );
    let sidelobe = sidelobe_metrics(&sweep.theta_deg, &sweep.pattern_db);

    emit(ProgressRecord::running(4, "writing artifacts".into(), 5, Some(0.85)));
    writer
        .write_ris_pattern_artifacts(&run, &quantized, &sweep, &sidelobe, QUANTIZATION_BIN_CONVENTION)
        .await?;

    let summary = if request.action == RisAction::Validate {
        let reference = request
            .reference
            .as_ref()
            .ok_or_else(|| CoreError::InvalidConfig("validate action requires a reference pattern".to_string()))?;
        let ref_theta: Vec<f64> = parse_f64_array(reference, "theta_deg")?;
        let ref_pattern: Vec<f64> = parse_f64_array(reference, "pattern_db")?;
        let result = validate(&sweep.theta_deg, &sweep.pattern_db, &ref_theta, &ref_pattern);
        writer.write_ris_validation_artifacts(&run, &result).await?;
        serde_json::json!({"status": "completed", "action": "validate", "pass": result.pass})
    } else {
        serde_json::json!({"status": "completed", "action": "run"})
    };

    writer.write_summary(&run, &summary).await?;
    emit(ProgressRecord::completed("done".into(), 5));
    Ok(())
}

async fn load_ris_config(request: &RisJobRequest) -> Result<RisConfig, CoreError> {
    if let Some(config) = &request.config_data {
        return Ok(config.clone());
    }
    let path = request
        .config_path
        .as_ref()
        .ok_or_else(|| CoreError::InvalidConfig("ris job requires config_data or config_path".to_string()))?;
    let bytes = tokio::fs::read(path).await?;
    let text = String::from_utf8_lossy(&bytes);
    serde_yaml::from_str(&text)
        .map_err(|e| CoreError::InvalidConfig(format!("{path} does not parse as a RisConfig: {e}")))
}

fn amplitude_array(config: &RisConfig) -> Option<ndarray::Array2<f64>> {
    let taper = config.amplitude_taper().as_ref()?;
    let ny = taper.len();
    let nx = taper.first().map(|row| row.len()).unwrap_or(0);
    let flat: Vec<f64> = taper.iter().flat_map(|row| row.iter().copied()).collect();
    ndarray::Array2::from_shape_vec((ny, nx), flat).ok()
}

fn parse_f64_array(value: &serde_json::Value, field: &str) -> Result<Vec<f64>, CoreError> {
    value
        .get(field)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_f64()).collect())
        .ok_or_else(|| CoreError::InvalidConfig(format!("reference.{field} must be an array of numbers")))
}
