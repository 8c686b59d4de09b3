use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::quiz::machine::QuizSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub quiz: QuizSettings,
    /// Directory with `<operation>.json` banks. Unset means the embedded banks.
    pub data_dir: Option<PathBuf>,
    /// Where per-chat account state is persisted.
    pub store_dir: PathBuf,
    /// Sqlite file used for dialogue state.
    pub database_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quiz: QuizSettings::default(),
            data_dir: None,
            store_dir: PathBuf::from("store"),
            database_path: "db.sqlite".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(max) = parse(&lookup, "QUIZ_MAX_QUESTIONS")? {
            config.quiz.max_questions = max;
        }
        if let Some(secs) = parse(&lookup, "QUIZ_TIME_LIMIT_SECS")? {
            config.quiz.time_limit = secs;
        }
        if let Some(ms) = parse(&lookup, "QUIZ_ADVANCE_DELAY_MS")? {
            config.quiz.advance_delay = Duration::from_millis(ms);
        }
        config.data_dir = lookup("QUIZ_DATA_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        if let Some(dir) = lookup("STORE_DIR").filter(|dir| !dir.is_empty()) {
            config.store_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("DATABASE_PATH").filter(|path| !path.is_empty()) {
            config.database_path = path;
        }

        if config.quiz.max_questions == 0 {
            return Err(ConfigError::Invalid {
                key: "QUIZ_MAX_QUESTIONS",
                value: "0".to_string(),
            });
        }
        if config.quiz.time_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "QUIZ_TIME_LIMIT_SECS",
                value: "0".to_string(),
            });
        }
        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
