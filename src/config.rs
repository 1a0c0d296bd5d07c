use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub gemini_api_key: String,
    /// Model used for question-variant generation.
    pub generation_model: String,
    /// Faster model used for study-guide generation.
    pub study_model: String,
    pub seed_data_path: String,
    pub exam_size: usize,
    /// Bounded worker pool size for batch generation. The right value depends
    /// on the generation service's rate limits, not on local CPU count.
    pub generation_concurrency: usize,
    /// Fixed delay after each completed generation task, in seconds.
    /// 0 disables pacing.
    pub request_pacing_secs: u64,
    pub generation_max_attempts: u32,
    /// Fraction of an exam filled from the question cache (rest is generated).
    pub cached_ratio: f64,
    /// Fraction of generated slots reserved for a user's weak topics.
    pub weak_topic_boost_ratio: f64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            gemini_api_key: get_env("GEMINI_API_KEY")?,
            generation_model: get_env_or("GENERATION_MODEL", "gemini-2.5-pro"),
            study_model: get_env_or("STUDY_MODEL", "gemini-3-flash-it"),
            seed_data_path: get_env_or("SEED_DATA_PATH", "data/seed_questions.json"),
            exam_size: get_env_parse_or("EXAM_SIZE", 30)?,
            generation_concurrency: get_env_parse_or("GENERATION_CONCURRENCY", 2)?,
            request_pacing_secs: get_env_parse_or("REQUEST_PACING_SECS", 0)?,
            generation_max_attempts: get_env_parse_or("GENERATION_MAX_ATTEMPTS", 3)?,
            cached_ratio: get_env_parse_or("CACHED_RATIO", 0.5)?,
            weak_topic_boost_ratio: get_env_parse_or("WEAK_TOPIC_BOOST_RATIO", 0.3)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
