mod bootstrap;
mod cheats;
mod config;
mod gameplay;
mod loop_runner;

use std::process::ExitCode;

use narrative_engine::AppError;
use thiserror::Error;
use tracing::error;

use config::ConfigError;

#[derive(Debug, Error)]
pub(crate) enum GameError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    App(#[from] AppError),
}

pub(crate) fn run() -> ExitCode {
    bootstrap::init_tracing();
    let result = bootstrap::build_app()
        .map_err(GameError::from)
        .and_then(loop_runner::run);
    if let Err(err) = result {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
