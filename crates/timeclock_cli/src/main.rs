//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the configured database and report per-entity row counts.
//! - Keep output deterministic for quick local sanity checks.

use log::error;
use std::process::ExitCode;
use timeclock_core::{
    core_version, init_logging, CoreConfig, Customer, CrudRepository, Job, Pay,
    SqliteCrudRepository,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("timeclock: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir)?;
    }

    let session = config.open_session().map_err(|err| err.to_string())?;
    let jobs = SqliteCrudRepository::<Job>::new(&session)
        .get_all()
        .map_err(|err| err.to_string())?;
    let customers = SqliteCrudRepository::<Customer>::new(&session)
        .get_all()
        .map_err(|err| err.to_string())?;
    let pays = SqliteCrudRepository::<Pay>::new(&session)
        .get_all()
        .map_err(|err| err.to_string())?;

    println!("timeclock_core version={}", core_version());
    println!("profile={:?} actor={}", config.profile, config.actor);
    println!(
        "jobs={} customers={} pays={}",
        jobs.len(),
        customers.len(),
        pays.len()
    );

    session.close().map_err(|err| err.to_string())
}
