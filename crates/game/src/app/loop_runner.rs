use narrative_engine::run_app;
use tracing::info;

use super::bootstrap::AppWiring;
use super::GameError;

pub(crate) fn run(app: AppWiring) -> Result<(), GameError> {
    info!(start = %app.start, level = app.scenes.registry().level(), "game_starting");
    run_app(app.config, app.scenes, app.start, app.commands)?;
    info!("game_exited");
    Ok(())
}
