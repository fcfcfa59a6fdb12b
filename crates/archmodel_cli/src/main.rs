//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open a meta-model database (file path argument or in-memory) and report
//!   core version, schema version and relationship matrix size.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `archmodel_cli [database_path] [config.toml]`

use archmodel_core::db::migrations::current_user_version;
use archmodel_core::{
    core_version, init_logging_from_config, open_db, open_db_in_memory, ping, EngineConfig,
    ModelEngine,
};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error message={message}");
            eprintln!("archmodel error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let mut args = std::env::args().skip(1);
    let database_arg = args.next();
    let config = match args.next() {
        Some(path) => EngineConfig::load(path).map_err(|err| err.to_string())?,
        None => EngineConfig::default(),
    };
    init_logging_from_config(&config).map_err(|err| err.to_string())?;

    let database_path = database_arg
        .map(Into::into)
        .or_else(|| config.database_path.clone());
    let conn = match &database_path {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
    .map_err(|err| err.to_string())?;

    let schema_version = current_user_version(&conn).map_err(|err| err.to_string())?;
    let engine = ModelEngine::new(&conn, &config).map_err(|err| err.to_string())?;

    println!("archmodel_core ping={}", ping());
    println!("archmodel_core version={}", core_version());
    println!(
        "database={}",
        database_path
            .as_deref()
            .map_or_else(|| ":memory:".to_string(), |path| path.display().to_string())
    );
    println!("schema_version={schema_version}");
    println!("matrix_triples={}", engine.matrix().triple_count());
    Ok(())
}
