//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use std::path::{Component, Path, PathBuf};

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::warn;

use crate::error::CoreError;
use crate::gateway::AppState;
use crate::job::JobStatus;
use crate::run::RunId;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/configs", get(list_configs))
        .route("/api/runs", get(list_runs))
        .route("/api/run/:run_id", get(get_run))
        .route("/api/progress/:run_id", get(get_progress))
        .route("/api/jobs", get(list_sim_jobs).post(submit_sim_job))
        .route("/api/ris/jobs", get(list_ris_jobs).post(submit_ris_job))
        .route("/runs/:run_id/*rel_path", get(serve_artifact))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

fn core_error_response(err: CoreError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"error": err.to_string()}))).into_response()
}

/// `GET /api/configs` — lists named preset configs found under the configured
/// configs directory. A missing directory is an empty list, not an error
/// (SPEC_FULL.md §10 "Configuration").
async fn list_configs(State(state): State<AppState>) -> Response {
    let dir = &state.configs_dir;
    let mut configs = Vec::new();

    let Ok(mut read_dir) = tokio::fs::read_dir(dir).await else {
        return Json(json!({"configs": configs})).into_response();
    };

    while let Ok(Some(entry)) = read_dir.next_entry().await {
        let path = entry.path();
        let is_config = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json") | Some("yaml") | Some("yml")
        );
        if !is_config {
            continue;
        }
        let Ok(bytes) = tokio::fs::read(&path).await else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        let data: serde_json::Value = serde_json::from_slice(&bytes)
            .or_else(|_| serde_yaml::from_str(&text).map_err(|e| e.to_string()))
            .unwrap_or(serde_json::Value::Null);
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        configs.push(json!({"name": name, "path": path.display().to_string(), "data": data}));
    }

    Json(json!({"configs": configs})).into_response()
}

/// `GET /api/runs` — reverse-chronological summary of every run on disk.
async fn list_runs(State(state): State<AppState>) -> Response {
    match state.run_store.list(None) {
        Ok(entries) => {
            let runs: Vec<_> = entries
                .iter()
                .map(|e| {
                    let has_viewer = state.run_store.run_dir(&e.run_id).join("viewer").join("heatmap.json").is_file();
                    json!({
                        "run_id": e.run_id.as_str(),
                        "kind": e.kind.map(|k| k.as_str()),
                        "status": e.status,
                        "has_viewer": has_viewer,
                    })
                })
                .collect();
            Json(json!({"runs": runs})).into_response()
        }
        Err(e) => core_error_response(e),
    }
}

fn parse_run_id(raw: &str) -> Result<RunId, Response> {
    RunId::parse(raw).ok_or_else(|| core_error_response(CoreError::NotFound(format!("malformed run id: {raw}"))))
}

/// `GET /api/run/{run_id}` — config, summary and progress for one run.
async fn get_run(State(state): State<AppState>, AxumPath(run_id): AxumPath<String>) -> Response {
    let run_id = match parse_run_id(&run_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let dir = match state.run_store.open(&run_id) {
        Ok(dir) => dir,
        Err(e) => return core_error_response(e),
    };

    let read_json = |name: &str| -> Option<serde_json::Value> {
        std::fs::read(dir.join(name)).ok().and_then(|b| serde_json::from_slice(&b).ok())
    };

    let progress = state.journal.snapshot(&run_id).await.unwrap_or(None);

    Json(json!({
        "config": read_json("config.json"),
        "summary": read_json("summary.json"),
        "progress": progress,
    }))
    .into_response()
}

/// `GET /api/progress/{run_id}` — the current `ProgressRecord`.
async fn get_progress(State(state): State<AppState>, AxumPath(run_id): AxumPath<String>) -> Response {
    let run_id = match parse_run_id(&run_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.journal.snapshot(&run_id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => core_error_response(CoreError::NotFound(format!("no progress for run {run_id}"))),
        Err(e) => core_error_response(e),
    }
}

async fn list_sim_jobs(State(state): State<AppState>) -> Response {
    jobs_of_kind(&state, crate::run::RunKind::Sim).await
}

async fn list_ris_jobs(State(state): State<AppState>) -> Response {
    jobs_of_kind(&state, crate::run::RunKind::Ris).await
}

async fn jobs_of_kind(state: &AppState, kind: crate::run::RunKind) -> Response {
    let jobs: Vec<_> = state
        .scheduler
        .list_jobs()
        .await
        .into_iter()
        .filter(|j| j.kind() == kind)
        .map(|j| {
            json!({
                "job_id": j.job_id(),
                "run_id": j.run_id().as_str(),
                "action": j.action(),
                "mode": j.mode(),
                "status": job_status_str(j.status()),
                "vram_guard_applied": j.vram_guard_applied(),
                "error": j.error(),
            })
        })
        .collect();
    Json(json!({"jobs": jobs})).into_response()
}

fn job_status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
    }
}

/// `POST /api/jobs` — enqueues a sim job.
async fn submit_sim_job(State(state): State<AppState>, Json(payload): Json<serde_json::Value>) -> Response {
    match state.scheduler.submit_sim(payload).await {
        Ok((job_id, run_id)) => {
            state.record_job_submitted();
            Json(json!({"run_id": run_id.as_str(), "job_id": job_id})).into_response()
        }
        Err(e) => core_error_response(e),
    }
}

/// `POST /api/ris/jobs` — enqueues a "run" or "validate" RIS job.
async fn submit_ris_job(State(state): State<AppState>, Json(payload): Json<serde_json::Value>) -> Response {
    match state.scheduler.submit_ris(payload).await {
        Ok((job_id, run_id)) => {
            state.record_job_submitted();
            Json(json!({"run_id": run_id.as_str(), "job_id": job_id})).into_response()
        }
        Err(e) => core_error_response(e),
    }
}

/// `GET /runs/{run_id}/{rel_path}` — static artifact service. Rejects any
/// path component that escapes the run directory, by component inspection
/// before touching the filesystem, then again by canonical-path containment
/// after resolving symlinks.
async fn serve_artifact(
    State(state): State<AppState>,
    AxumPath((run_id, rel_path)): AxumPath<(String, String)>,
) -> Response {
    let run_id = match parse_run_id(&run_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let rel = Path::new(&rel_path);
    if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
        return core_error_response(CoreError::NotFound("path traversal rejected".into()));
    }

    let run_dir = match state.run_store.open(&run_id) {
        Ok(dir) => dir,
        Err(e) => return core_error_response(e),
    };
    let candidate = run_dir.join(rel);

    let canonical_run_dir = match tokio::fs::canonicalize(&run_dir).await {
        Ok(p) => p,
        Err(_) => return core_error_response(CoreError::NotFound("run directory vanished".into())),
    };
    let canonical_candidate = match tokio::fs::canonicalize(&candidate).await {
        Ok(p) => p,
        Err(_) => return core_error_response(CoreError::NotFound(format!("no such artifact: {rel_path}"))),
    };
    if !canonical_candidate.starts_with(&canonical_run_dir) {
        warn!(run_id = %run_id, path = %rel_path, "rejected artifact path escaping run directory");
        return core_error_response(CoreError::NotFound("path escapes run directory".into()));
    }

    match tokio::fs::read(&canonical_candidate).await {
        Ok(bytes) => (
            [("content-type", content_type_for(&canonical_candidate))],
            bytes,
        )
            .into_response(),
        Err(e) => core_error_response(CoreError::IoError(e)),
    }
}

fn content_type_for(path: &PathBuf) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("npy") | Some("npz") => "application/octet-stream",
        Some("yaml") | Some("yml") => "application/yaml",
        Some("log") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// `GET /healthz` — ambient liveness probe (SPEC_FULL.md §10).
async fn healthz(State(state): State<AppState>) -> Response {
    Json(json!({"status": "ok", "uptime_s": state.uptime_s()})).into_response()
}

/// `GET /metrics` — Prometheus-style plaintext exposition (SPEC_FULL.md §10).
async fn metrics(State(state): State<AppState>) -> Response {
    let jobs = state.scheduler.list_jobs().await;
    let queued = jobs.iter().filter(|j| j.status() == JobStatus::Queued).count();
    let running = jobs.iter().filter(|j| j.status() == JobStatus::Running).count();
    let failed = jobs.iter().filter(|j| j.status() == JobStatus::Failed).count();
    let completed = jobs.iter().filter(|j| j.status() == JobStatus::Completed).count();
    let submitted = state.jobs_submitted.load(std::sync::atomic::Ordering::Relaxed);

    let body = format!(
        "# HELP wavebench_jobs_total Jobs submitted since process start.\n\
         # TYPE wavebench_jobs_total counter\n\
         wavebench_jobs_total {submitted}\n\
         # HELP wavebench_jobs_queued Jobs currently queued.\n\
         # TYPE wavebench_jobs_queued gauge\n\
         wavebench_jobs_queued {queued}\n\
         # HELP wavebench_jobs_running Jobs currently running.\n\
         # TYPE wavebench_jobs_running gauge\n\
         wavebench_jobs_running {running}\n\
         # HELP wavebench_jobs_completed Jobs completed since process start.\n\
         # TYPE wavebench_jobs_completed counter\n\
         wavebench_jobs_completed {completed}\n\
         # HELP wavebench_jobs_failed Jobs failed since process start.\n\
         # TYPE wavebench_jobs_failed counter\n\
         wavebench_jobs_failed {failed}\n\
         # HELP wavebench_uptime_seconds Process uptime in seconds.\n\
         # TYPE wavebench_uptime_seconds gauge\n\
         wavebench_uptime_seconds {uptime}\n",
        uptime = state.uptime_s(),
    );

    ([("content-type", "text/plain; version=0.0.4")], body).into_response()
}
