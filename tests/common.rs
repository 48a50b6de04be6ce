use std::path::Path;

/// Writes a minimal valid `config.toml` plus the `run_root`, `sim-worker` and
/// `ris-worker` stand-ins it points at, so `wavebenchd` can be exercised as a
/// subprocess against a throwaway directory.
///
/// The worker "binaries" are tiny POSIX shell scripts: spawning a real
/// `sim-worker`/`ris-worker` isn't needed for the CLI-surface assertions in
/// `tests/cli.rs`, only that `NotValidatedConfiguration::validate()`'s
/// `is_file()` checks pass.
pub fn setup_cwd<P: AsRef<Path>>(dir: P) -> Result<(), Box<dyn std::error::Error>> {
    let dir = dir.as_ref();
    let run_root = dir.join("runs");
    std::fs::create_dir(&run_root)?;

    let sim_worker_bin = dir.join("sim-worker.sh");
    let ris_worker_bin = dir.join("ris-worker.sh");
    for bin in [&sim_worker_bin, &ris_worker_bin] {
        std::fs::write(bin, "#!/bin/sh\nexit 0\n")?;
        make_executable(bin)?;
    }

    let mut table = toml::value::Table::new();
    table.insert("compatibility".into(), env!("CARGO_PKG_VERSION").into());
    table.insert("run_root".into(), run_root.display().to_string().into());
    table.insert("sim_worker_bin".into(), sim_worker_bin.display().to_string().into());
    table.insert("ris_worker_bin".into(), ris_worker_bin.display().to_string().into());
    table.insert("bind_addr".into(), "127.0.0.1:0".into());
    std::fs::write(dir.join("config.toml"), toml::to_string(&table)?)?;

    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
