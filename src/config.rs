use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::question::Difficulty;
use crate::scoring::ScoringPolicy;
use crate::session::{EngineSettings, DEFAULT_SECONDS_PER_QUESTION, TICK_INTERVAL};
use crate::source::trivia_api::DEFAULT_BASE_URL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Questions bundled with the binary
    #[default]
    Bank,
    /// the-trivia-api.com
    TriviaApi,
}

/// User preferences remembered between runs. Sessions themselves are never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub player_name: String,
    pub difficulty: Difficulty,
    pub question_count: u32,
    pub seconds_per_question: u32,
    pub dwell_ms: u64,
    pub source: SourceKind,
    pub trivia_api_url: String,
    pub scoring: ScoringPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player_name: String::new(),
            difficulty: Difficulty::Easy,
            question_count: 5,
            seconds_per_question: DEFAULT_SECONDS_PER_QUESTION,
            dwell_ms: 1000,
            source: SourceKind::Bank,
            trivia_api_url: DEFAULT_BASE_URL.to_string(),
            scoring: ScoringPolicy::default(),
        }
    }
}

impl Config {
    /// Engine settings derived from these preferences. A scoring table that
    /// breaks the difficulty ordering is replaced by the default one.
    pub fn engine_settings(&self) -> EngineSettings {
        let scoring = match self.scoring.validate() {
            Ok(()) => self.scoring,
            Err(e) => {
                warn!(error = %e, "ignoring configured scoring table");
                ScoringPolicy::default()
            }
        };

        EngineSettings {
            seconds_per_question: self.seconds_per_question.max(1),
            tick_interval: TICK_INTERVAL,
            scoring,
        }
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not write config: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("quizzle_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable config, using defaults");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            player_name: "Ann".into(),
            difficulty: Difficulty::Hard,
            question_count: 20,
            seconds_per_question: 15,
            dwell_ms: 500,
            source: SourceKind::TriviaApi,
            trivia_api_url: "http://localhost:8080/api".into(),
            scoring: ScoringPolicy {
                base_easy: 1,
                base_medium: 2,
                base_hard: 3,
                bonus_per_second: 0,
            },
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn missing_or_corrupt_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, b"{not json").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{"player_name": "Ann", "source": "trivia-api"}"#).unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.player_name, "Ann");
        assert_eq!(cfg.source, SourceKind::TriviaApi);
        assert_eq!(cfg.question_count, Config::default().question_count);
    }

    #[test]
    fn invalid_scoring_falls_back_to_default() {
        let cfg = Config {
            scoring: ScoringPolicy {
                base_easy: 300,
                base_medium: 200,
                base_hard: 100,
                bonus_per_second: 1,
            },
            seconds_per_question: 0,
            ..Config::default()
        };
        let settings = cfg.engine_settings();
        assert_eq!(settings.scoring, ScoringPolicy::default());
        assert_eq!(settings.seconds_per_question, 1);
    }
}
