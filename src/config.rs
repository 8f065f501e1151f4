use serde::Deserialize;

use crate::db::HERO_CACHE_KEY;
use crate::models::MediaType;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDB API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Base URL poster paths are appended to
    #[serde(default = "default_tmdb_image_url")]
    pub tmdb_image_url: String,

    /// Redis connection URL. The hero cache stays in process memory when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Key of the single hero cache slot
    #[serde(default = "default_hero_cache_key")]
    pub hero_cache_key: String,

    /// Media type the hero component recommends
    #[serde(default = "default_hero_media_type")]
    pub hero_media_type: MediaType,

    /// Seconds a hero session may go without requests before it is evicted
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,

    /// Seconds between idle session sweeps
    #[serde(default = "default_session_sweep_secs")]
    pub session_sweep_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_hero_cache_key() -> String {
    HERO_CACHE_KEY.to_string()
}

fn default_hero_media_type() -> MediaType {
    MediaType::Movie
}

fn default_session_idle_secs() -> u64 {
    30 * 60
}

fn default_session_sweep_secs() -> u64 {
    60
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
