use crate::error::{ConfigError, Result as AppResult};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Static shared passphrase gating the admin surface. A gate against
    /// casual misuse, not a security boundary.
    pub passphrase: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ContentSourceType {
    File,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    pub source_type: ContentSourceType,
    pub file_path: Option<String>,
    pub http_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Number of options in a multiple-choice round, correct answer included.
    #[serde(default = "default_option_count")]
    pub option_count: usize,
    /// Number of words hidden per fill-in-the-blank round.
    #[serde(default = "default_blank_count")]
    pub blank_count: usize,
    /// Points awarded per correct answer in scored modes.
    #[serde(default = "default_award_points")]
    pub award_points: i64,
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
}

fn default_option_count() -> usize {
    4
}

fn default_blank_count() -> usize {
    3
}

fn default_award_points() -> i64 {
    10
}

fn default_leaderboard_size() -> usize {
    10
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            option_count: default_option_count(),
            blank_count: default_blank_count(),
            award_points: default_award_points(),
            leaderboard_size: default_leaderboard_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub content: ContentConfig,
    #[serde(default)]
    pub game: GameConfig,
}

pub fn load_settings() -> AppResult<AppSettings> {
    let builder = Config::builder()
        .add_source(
            Environment::with_prefix("CATECHIST")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        )
        .add_source(File::with_name("config").required(false));

    let settings = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let settings: AppSettings = settings
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    if settings.admin.passphrase.trim().is_empty() {
        return Err(ConfigError::Missing("admin.passphrase must be non-empty".to_string()).into());
    }
    if settings.game.option_count < 2 {
        return Err(
            ConfigError::InvalidValue("game.option_count must be at least 2".to_string()).into(),
        );
    }

    Ok(settings)
}
