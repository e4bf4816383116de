pub mod tmdb_api;

pub use tmdb_api::TmdbAPI;

use crate::error::Error;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};
use tracing::warn;

/// The two listing categories a run can walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    TopRated,
    Popular,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::TopRated => "top_rated",
            ListingKind::Popular => "popular",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            ListingKind::TopRated => "/movie/top_rated",
            ListingKind::Popular => "/movie/popular",
        }
    }
}

impl FromStr for ListingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_rated" => Ok(ListingKind::TopRated),
            "popular" => Ok(ListingKind::Popular),
            other => Err(Error::InvalidKind(other.to_owned())),
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a listing page. Upstream may omit or null any field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Summary {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub genre_ids: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Page {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "lenient_results")]
    pub results: Vec<Summary>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Keyword {
    pub id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Keywords {
    #[serde(default, deserialize_with = "nullable")]
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CastMember {
    pub name: Option<String>,
    /// Billing order, lower is more prominent.
    pub order: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Credits {
    #[serde(default, deserialize_with = "nullable")]
    pub cast: Vec<CastMember>,
}

/// Treats an explicit `null` the same as a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes each listing entry on its own so one malformed movie only costs
/// that movie, not the whole page.
fn lenient_results<'de, D>(deserializer: D) -> Result<Vec<Summary>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Vec<serde_json::Value> = nullable(deserializer)?;

    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let id = entry.get("id").cloned();
            match serde_json::from_value::<Summary>(entry) {
                Ok(summary) => Some(summary),
                Err(err) => {
                    warn!(?id, "Skipping malformed listing entry: {}", err);
                    None
                }
            }
        })
        .collect())
}

/// Read side of the pipeline.
///
/// Implementations never fail: a non-success status or a transport error is
/// logged and reported as `None`, which callers treat as "no data".
#[async_trait]
pub trait Source: Send + Sync {
    async fn fetch_page(&self, kind: ListingKind, page: u32) -> Option<Page>;

    async fn fetch_keywords(&self, movie_id: u64) -> Option<Vec<Keyword>>;

    async fn fetch_credits(&self, movie_id: u64) -> Option<Vec<CastMember>>;
}
