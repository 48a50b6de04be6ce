//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

//! Sim-job worker (SPEC_FULL.md §10 "Worker harness"). Invoked by the
//! scheduler as `sim-worker --run-dir <dir> --run-id <id>`; reads the config
//! the scheduler already wrote into the run directory, runs the `Tracer`
//! facade over the requested scene and (optional) radio map, writes the
//! resulting artifacts, and emits `PROGRESS {json}` lines on stdout.

use std::path::PathBuf;

use tracing::error;
use wavebench::artifact::ArtifactWriter;
use wavebench::config::SimJobRequest;
use wavebench::error::CoreError;
use wavebench::grid::{AlignRequest, AutoSizeBounds, GridAligner};
use wavebench::progress::{format_progress_line, ProgressRecord};
use wavebench::run::{RunId, RunKind, RunStore};
use wavebench::tracer::{NullTracer, SimRequest, Tracer};

/// Recursively collects `(x, y)` from every `"position"` array found anywhere
/// in `value` — the only schema assumption `auto_size` can make about the
/// otherwise opaque scene/RIS payloads (SPEC_FULL.md §4.3 step 1 "devices of
/// interest").
fn collect_device_positions(value: &serde_json::Value, out: &mut Vec<(f64, f64)>) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(pos) = map.get("position").and_then(|v| v.as_array()) {
                if pos.len() >= 2 {
                    if let (Some(x), Some(y)) = (pos[0].as_f64(), pos[1].as_f64()) {
                        out.push((x, y));
                    }
                }
            }
            if let Some(origin) = map.get("origin").and_then(|v| v.as_array()) {
                if origin.len() >= 2 {
                    if let (Some(x), Some(y)) = (origin[0].as_f64(), origin[1].as_f64()) {
                        out.push((x, y));
                    }
                }
            }
            for v in map.values() {
                collect_device_positions(v, out);
            }
        }
        serde_json::Value::Array(arr) => {
            for v in arr {
                collect_device_positions(v, out);
            }
        }
        _ => {}
    }
}

fn bounds_of(points: &[(f64, f64)]) -> Option<((f64, f64), (f64, f64))> {
    let mut points = points.iter();
    let &(x0, y0) = points.next()?;
    let (mut min, mut max) = ((x0, y0), (x0, y0));
    for &(x, y) in points {
        min = (min.0.min(x), min.1.min(y));
        max = (max.0.max(x), max.1.max(y));
    }
    Some((min, max))
}

fn emit(record: ProgressRecord) {
    println!("{}", format_progress_line(&record));
}

struct Args {
    run_dir: PathBuf,
    run_id: RunId,
}

fn parse_args() -> Result<Args, String> {
    let mut run_dir = None;
    let mut run_id = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--run-dir" => run_dir = args.next(),
            "--run-id" => run_id = args.next(),
            _ => {}
        }
    }
    let run_dir = run_dir.ok_or("missing --run-dir")?;
    let run_id = run_id.ok_or("missing --run-id")?;
    let run_id = RunId::parse(&run_id).ok_or("malformed --run-id")?;
    Ok(Args { run_dir: PathBuf::from(run_dir), run_id })
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
            error!(error = %msg, "sim job rejected for invalid config");
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
            error!(error = %e, "sim job failed");
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
    let run = store.open_known(&args.run_id, RunKind::Sim)?;

    emit(ProgressRecord::running(0, "loading config".into(), 4, Some(0.0)));
    let config_bytes = tokio::fs::read(args.run_dir.join("config.json")).await?;
    let request: SimJobRequest = serde_json::from_slice(&config_bytes)
        .map_err(|e| CoreError::InvalidConfig(format!("config.json does not match sim job schema: {e}")))?;

    emit(ProgressRecord::running(1, "aligning grid".into(), 4, Some(0.25)));
    let writer = ArtifactWriter::new(&store);

    let frequency_hz = request
        .ris
        .as_ref()
        .and_then(|v| v.get("experiment"))
        .and_then(|v| v.get("frequency_hz"))
        .and_then(|v| v.as_f64())
        .unwrap_or(28e9);

    let summary = if let Some(radio_map) = &request.radio_map {
        let include_ris = radio_map.auto_size.as_ref().map(|a| a.include_ris);
        let auto_size = match &radio_map.auto_size {
            Some(auto) => {
                let mut points = Vec::new();
                collect_device_positions(&request.scene, &mut points);
                if auto.include_ris {
                    if let Some(ris) = &request.ris {
                        collect_device_positions(ris, &mut points);
                    }
                }
                let (min, max) = bounds_of(&points).ok_or_else(|| {
                    CoreError::InvalidGrid("radio_map.auto_size found no devices of interest in scene".to_string())
                })?;
                Some(AutoSizeBounds { min, max, padding: radio_map.padding })
            }
            None => None,
        };

        let requested_size = radio_map
            .requested_size
            .unwrap_or((radio_map.cell_size.0 * 20.0, radio_map.cell_size.1 * 20.0));
        let grid = GridAligner::align(&AlignRequest {
            requested_size,
            cell_size: radio_map.cell_size,
            center: radio_map.center,
            orientation_rad: (0.0, 0.0, 0.0),
            auto_size,
        })?;

        emit(ProgressRecord::running(2, "running tracer".into(), 4, Some(0.5)));
        let tracer = NullTracer::new(frequency_hz);
        let sim_request = SimRequest {
            grid: &grid,
            scene: &request.scene,
            requires_gpu: false,
            allow_fallback: true,
        };
        let output = tracer.run(&sim_request)?;

        emit(ProgressRecord::running(3, "writing artifacts".into(), 4, Some(0.85)));
        writer.write_radio_map(&run, &grid, &output.values, &output.metric, include_ris).await?;
        writer
            .write_viewer_scene(&run, &output.markers, &output.paths, &output.scene_manifest)
            .await?;

        serde_json::json!({"status": "completed", "profile": request.profile, "radio_map": true})
    } else {
        emit(ProgressRecord::running(2, "running tracer".into(), 4, Some(0.6)));
        serde_json::json!({"status": "completed", "profile": request.profile, "radio_map": false})
    };

    writer.write_summary(&run, &summary).await?;
    emit(ProgressRecord::completed("done".into(), 4));
    Ok(())
}
