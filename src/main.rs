#![deny(
    dead_code,
    anonymous_parameters,
    deprecated_in_future,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    non_ascii_idents,
    unsafe_code,
    path_statements,
    trivial_numeric_casts,
    unstable_features,
    unused_extern_crates,
    unused_allocation,
    unused_import_braces,
    unused_imports,
    unused_must_use,
    unused_mut,
    while_true,
)]

mod cli;
mod util;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{debug, info};

use wavebench::config::{Configuration, NotValidatedConfiguration};
use wavebench::gateway::AppState;
use wavebench::job::{JobScheduler, NoOpVramGuard};
use wavebench::progress::ProgressJournal;
use wavebench::run::{RunId, RunStore};

use crate::util::progress::ProgressBars;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    debug!("tracing initialized");

    let cli = cli::cli();
    let cli = cli.get_matches();

    let config_path = cli
        .value_of("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let mut config = ::config::Config::default();
    config
        .merge(::config::File::from(config_path.clone()))?
        .merge(::config::Environment::with_prefix("WAVEBENCH"))?;

    let config = config.try_into::<NotValidatedConfiguration>()?.validate()?;

    let hide_bars = cli.is_present("hide_bars") || crate::util::stdout_is_pipe();
    let progressbars = ProgressBars::setup(config.progress_format().clone(), config.spinner_format().clone(), hide_bars);

    match cli.subcommand() {
        Some(("serve", _)) => serve(config).await,
        Some(("runs", matches)) => match matches.subcommand() {
            Some(("list", _)) => runs_list(&config),
            Some(("show", matches)) => runs_show(&config, matches).await,
            Some(("watch", matches)) => runs_watch(&config, matches, progressbars).await,
            Some((other, _)) => Err(anyhow!("Unknown `runs` subcommand: {}", other)),
            None => Err(anyhow!("No `runs` subcommand given")),
        },
        Some((other, _)) => Err(anyhow!("Unknown subcommand: {}", other)),
        None => Err(anyhow!("No subcommand")),
    }
}

async fn serve(config: Configuration) -> Result<()> {
    let run_store = Arc::new(RunStore::new(config.run_root().clone())?);
    let journal = Arc::new(ProgressJournal::new(config.run_root().clone()));
    let scheduler = JobScheduler::new(
        run_store.clone(),
        journal.clone(),
        config.sim_worker_bin().clone(),
        config.ris_worker_bin().clone(),
        *config.sim_concurrency(),
        *config.ris_concurrency(),
        Arc::new(NoOpVramGuard),
        *config.vram_guard_threshold_mib(),
    );

    let state = AppState::new(run_store, journal, scheduler, config.configs_dir().clone());
    let app = wavebench::gateway::router(state);

    let addr: std::net::SocketAddr = config.bind_addr().parse()?;
    info!(%addr, "wavebenchd listening");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|e| anyhow!("HTTP server error: {e}"))
}

fn runs_list(config: &Configuration) -> Result<()> {
    let run_store = RunStore::new(config.run_root().clone())?;
    for entry in run_store.list(None)? {
        println!(
            "{}\t{}\t{:?}",
            entry.run_id,
            entry.kind.map(|k| k.as_str()).unwrap_or("?"),
            entry.status
        );
    }
    Ok(())
}

fn parse_run_id_arg(matches: &clap::ArgMatches) -> Result<RunId> {
    let raw = matches
        .value_of("run_id")
        .ok_or_else(|| anyhow!("missing RUN_ID argument"))?;
    RunId::parse(raw).ok_or_else(|| anyhow!("malformed run id: {raw}"))
}

async fn runs_show(config: &Configuration, matches: &clap::ArgMatches) -> Result<()> {
    let run_id = parse_run_id_arg(matches)?;
    let run_store = RunStore::new(config.run_root().clone())?;
    let journal = ProgressJournal::new(config.run_root().clone());

    let dir = run_store.open(&run_id)?;
    let read_json = |name: &str| -> Option<serde_json::Value> {
        std::fs::read(dir.join(name)).ok().and_then(|b| serde_json::from_slice(&b).ok())
    };
    let progress = journal.snapshot(&run_id).await?;

    let report = serde_json::json!({
        "run_id": run_id.as_str(),
        "config": read_json("config.json"),
        "summary": read_json("summary.json"),
        "progress": progress,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn runs_watch(config: &Configuration, matches: &clap::ArgMatches, progressbars: ProgressBars) -> Result<()> {
    let run_id = parse_run_id_arg(matches)?;
    let journal = ProgressJournal::new(config.run_root().clone());

    let bar = progressbars.bar();
    bar.set_length(1000);

    loop {
        let Some(record) = journal.snapshot(&run_id).await? else {
            tokio::time::sleep(Duration::from_millis(250)).await;
            continue;
        };

        bar.set_message(record.step_name.clone());
        if let Some(progress) = record.progress {
            bar.set_position((progress * 1000.0) as u64);
        }

        match record.status {
            wavebench::progress::RunStatus::Completed => {
                bar.finish_with_message("completed");
                return Ok(());
            }
            wavebench::progress::RunStatus::Failed => {
                bar.abandon_with_message("failed");
                return Err(anyhow!(record.error.unwrap_or_else(|| "run failed".to_string())));
            }
            wavebench::progress::RunStatus::Queued | wavebench::progress::RunStatus::Running => {
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        }
    }
}
