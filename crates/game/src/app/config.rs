use std::fs;
use std::path::{Path, PathBuf};

use narrative_engine::SceneKey;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::gameplay;

pub(crate) const CONFIG_PATH_ENV_VAR: &str = "GS_CONFIG_PATH";
pub(crate) const START_SCENE_ENV_VAR: &str = "GS_START_SCENE";
pub(crate) const START_LEVEL_ENV_VAR: &str = "GS_START_LEVEL";
pub(crate) const MAX_START_LEVEL: u32 = 3;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config '{}': {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config '{}': {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error("unknown start scene '{0}'")]
    UnknownStartScene(String),
    #[error("start level {0} is out of range (0..={})", MAX_START_LEVEL)]
    StartLevelOutOfRange(u32),
}

/// Startup options. Later sources win: defaults, then the JSON file named by
/// `GS_CONFIG_PATH`, then `GS_START_SCENE` / `GS_START_LEVEL`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub(crate) start_scene: String,
    /// Seeds `completedLevels` for a fresh session.
    pub(crate) start_level: u32,
    pub(crate) window_scale: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_scene: "Title".to_string(),
            start_level: 0,
            window_scale: 3,
        }
    }
}

impl GameConfig {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    pub(crate) fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let file = lookup(CONFIG_PATH_ENV_VAR)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty());
        let mut config = match file {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup);
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut deserializer = serde_json::Deserializer::from_str(&raw);
        let config: Self = serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!(path = %path.display(), "config_file_loaded");
        Ok(config)
    }

    pub(crate) fn start_scene_key(&self) -> Result<SceneKey, ConfigError> {
        gameplay::scene_key_named(&self.start_scene)
            .ok_or_else(|| ConfigError::UnknownStartScene(self.start_scene.clone()))
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(START_SCENE_ENV_VAR) {
            match gameplay::scene_key_named(raw.trim()) {
                Some(key) => self.start_scene = key.0.to_string(),
                None => warn!(
                    var = START_SCENE_ENV_VAR,
                    value = raw.as_str(),
                    "config_override_ignored"
                ),
            }
        }
        if let Some(raw) = lookup(START_LEVEL_ENV_VAR) {
            match raw.trim().parse::<u32>() {
                Ok(level) if level <= MAX_START_LEVEL => self.start_level = level,
                _ => warn!(
                    var = START_LEVEL_ENV_VAR,
                    value = raw.as_str(),
                    "config_override_ignored"
                ),
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.start_scene_key()?;
        if self.start_level > MAX_START_LEVEL {
            return Err(ConfigError::StartLevelOutOfRange(self.start_level));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("game.json");
        fs::write(&path, body).expect("write config file");
        path
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let config = GameConfig::resolve(lookup_from(&[])).expect("defaults are valid");
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.start_scene_key().expect("title"), SceneKey("Title"));
    }

    #[test]
    fn file_values_fill_missing_fields_from_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, r#"{ "start_scene": "Northgate", "start_level": 1 }"#);
        let config = GameConfig::resolve(lookup_from(&[(
            CONFIG_PATH_ENV_VAR,
            path.display().to_string(),
        )]))
        .expect("valid file");
        assert_eq!(config.start_scene, "Northgate");
        assert_eq!(config.start_level, 1);
        assert_eq!(config.window_scale, 3);
    }

    #[test]
    fn env_overrides_win_over_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, r#"{ "start_scene": "Northgate", "start_level": 1 }"#);
        let config = GameConfig::resolve(lookup_from(&[
            (CONFIG_PATH_ENV_VAR, path.display().to_string()),
            (START_SCENE_ENV_VAR, "farmersmarket".to_string()),
            (START_LEVEL_ENV_VAR, " 2 ".to_string()),
        ]))
        .expect("valid overrides");
        assert_eq!(config.start_scene, "FarmersMarket");
        assert_eq!(config.start_level, 2);
    }

    #[test]
    fn invalid_env_overrides_are_ignored() {
        let config = GameConfig::resolve(lookup_from(&[
            (START_SCENE_ENV_VAR, "Moon".to_string()),
            (START_LEVEL_ENV_VAR, "9".to_string()),
        ]))
        .expect("bad overrides fall back");
        assert_eq!(config, GameConfig::default());

        let config = GameConfig::resolve(lookup_from(&[(START_LEVEL_ENV_VAR, "two".to_string())]))
            .expect("unparsable level falls back");
        assert_eq!(config.start_level, 0);
    }

    #[test]
    fn unknown_fields_report_the_failing_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, r#"{ "start_level": "three" }"#);
        let err = GameConfig::from_file(&path).expect_err("wrong type must fail");
        match &err {
            ConfigError::Parse { source, .. } => assert_eq!(source.path().to_string(), "start_level"),
            other => panic!("expected parse error, got {other:?}"),
        }

        let path = write_config(&dir, r#"{ "start_room": "Title" }"#);
        let err = GameConfig::from_file(&path).expect_err("unknown field must fail");
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.json");
        let err = GameConfig::resolve(lookup_from(&[(
            CONFIG_PATH_ENV_VAR,
            missing.display().to_string(),
        )]))
        .expect_err("missing file");
        assert!(matches!(err, ConfigError::Read { .. }), "{err}");
    }

    #[test]
    fn file_values_are_validated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, r#"{ "start_scene": "Boot" }"#);
        let err = GameConfig::resolve(lookup_from(&[(
            CONFIG_PATH_ENV_VAR,
            path.display().to_string(),
        )]))
        .expect_err("unknown scene");
        assert!(matches!(err, ConfigError::UnknownStartScene(ref name) if name == "Boot"));

        let path = write_config(&dir, r#"{ "start_level": 7 }"#);
        let err = GameConfig::resolve(lookup_from(&[(
            CONFIG_PATH_ENV_VAR,
            path.display().to_string(),
        )]))
        .expect_err("level out of range");
        assert!(matches!(err, ConfigError::StartLevelOutOfRange(7)));
    }
}
