use narrative_engine::{CommandRegistry, LoopConfig, ProgressRegistry, SceneKey, SceneMachine};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::cheats;
use super::config::{ConfigError, GameConfig};
use super::gameplay;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scenes: SceneMachine,
    pub(crate) start: SceneKey,
    pub(crate) commands: CommandRegistry,
}

pub(crate) fn build_app() -> Result<AppWiring, ConfigError> {
    info!("=== gs-tiny-game startup ===");
    let game_config = GameConfig::from_env()?;
    wire(&game_config)
}

fn wire(game_config: &GameConfig) -> Result<AppWiring, ConfigError> {
    let start = game_config.start_scene_key()?;
    info!(
        start = %start,
        start_level = game_config.start_level,
        window_scale = game_config.window_scale,
        "game_config"
    );

    let registry = ProgressRegistry::seeded(game_config.start_level);
    let scenes = SceneMachine::new(gameplay::scene_factory(), registry);

    let mut commands = CommandRegistry::default();
    if let Err(err) = cheats::register_cheats(&mut commands) {
        warn!(error = %err, "cheat_registration_failed");
    }

    let config = LoopConfig {
        window_title: "gs-tiny-game".to_string(),
        window_scale: game_config.window_scale,
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        scenes,
        start,
        commands,
    })
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiring_seeds_the_registry_and_registers_cheats() {
        let game_config = GameConfig {
            start_scene: "IceHockey".to_string(),
            start_level: 2,
            window_scale: 4,
        };
        let app = wire(&game_config).expect("valid config wires");
        assert_eq!(app.start, SceneKey("IceHockey"));
        assert_eq!(app.scenes.registry().level(), 2);
        assert_eq!(app.scenes.active_scene(), None);
        assert_eq!(app.config.window_scale, 4);
        assert!(app.commands.execute("klapaucius").is_some());
        assert_eq!(app.commands.len(), 4);
    }
}
