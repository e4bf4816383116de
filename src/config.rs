use crate::error::{Error, Result};
use crate::sources::ListingKind;

use serde::Deserialize;
use std::{fs, time::Duration};

pub const DEFAULT_CONFIG: &str = "config/config.toml";
pub const DEFAULT_TMDB_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_TABLE: &str = "movies";

pub const TMDB_API_KEY: &str = "TMDB_API_KEY";
pub const SUPABASE_URL: &str = "SUPABASE_URL";
pub const SUPABASE_KEY: &str = "SUPABASE_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbAPIConfig {
    #[serde(default = "default_tmdb_url")]
    pub url: String,
}

impl Default for TmdbAPIConfig {
    fn default() -> TmdbAPIConfig {
        TmdbAPIConfig {
            url: default_tmdb_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for SupabaseConfig {
    fn default() -> SupabaseConfig {
        SupabaseConfig {
            table: default_table(),
        }
    }
}

/// Pacing and default run parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause after each movie's keyword and credit lookups.
    pub item_delay_ms: u64,
    /// Pause after each page.
    pub page_delay_ms: u64,
    pub default_pages: u32,
    pub default_kind: ListingKind,
}

impl PipelineConfig {
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> PipelineConfig {
        PipelineConfig {
            item_delay_ms: 250,
            page_delay_ms: 500,
            default_pages: 2,
            default_kind: ListingKind::Popular,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tmdb_api: TmdbAPIConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_file(filename: &str) -> Result<Config> {
        let config = fs::read_to_string(filename).map_err(|source| Error::Io {
            path: filename.to_owned(),
            source,
        })?;
        let config: Config = toml::from_str(&config)?;
        Ok(config)
    }
}

fn default_tmdb_url() -> String {
    DEFAULT_TMDB_URL.to_owned()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_owned()
}

/// Secrets needed to reach the metadata API and the store.
#[derive(Clone)]
pub struct Credentials {
    pub tmdb_api_key: String,
    pub supabase_url: String,
    pub supabase_key: String,
}

impl Credentials {
    /// Explicit values win; anything missing or blank is looked up through `lookup`.
    pub fn resolve<F>(
        tmdb_api_key: Option<String>,
        supabase_url: Option<String>,
        supabase_key: Option<String>,
        lookup: F,
    ) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: Option<String>, name: &'static str| -> Result<String> {
            explicit
                .filter(|value| !value.trim().is_empty())
                .or_else(|| lookup(name).filter(|value| !value.trim().is_empty()))
                .ok_or(Error::MissingCredential(name))
        };

        Ok(Credentials {
            tmdb_api_key: pick(tmdb_api_key, TMDB_API_KEY)?,
            supabase_url: pick(supabase_url, SUPABASE_URL)?,
            supabase_key: pick(supabase_key, SUPABASE_KEY)?,
        })
    }

    pub fn from_env() -> Result<Credentials> {
        Self::resolve(None, None, None, |name| std::env::var(name).ok())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("tmdb_api_key", &"***")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &"***")
            .finish()
    }
}
