use crate::config::TmdbAPIConfig;
use crate::error::{Error, Result};
use crate::sources::{CastMember, Credits, Keyword, Keywords, ListingKind, Page, Source};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// Listing and detail lookups against the TMDB v3 API.
#[derive(Debug, Clone)]
pub struct TmdbAPI {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl TmdbAPI {
    pub fn new(config: &TmdbAPIConfig, api_key: &str) -> TmdbAPI {
        TmdbAPI {
            client: reqwest::Client::new(),
            url: config.url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    async fn request<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(%url, ?query, "GET");

        // The request URL carries the API key, keep it out of error messages.
        let response = self
            .client
            .get(url.as_str())
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|err| err.without_url())?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|err| err.without_url())?;
        Ok(serde_json::from_slice::<T>(&body)?)
    }

    async fn fetch<T>(&self, path: &str, query: &[(&str, String)]) -> Option<T>
    where
        T: DeserializeOwned,
    {
        match self.request(path, query).await {
            Ok(json) => Some(json),
            Err(err) => {
                error!(path, ?query, "An error occurred: {}", err);
                None
            }
        }
    }

    /// Most popular movies first released in `year`.
    pub async fn fetch_by_year(&self, year: u16, page: u32) -> Option<Page> {
        let query = [
            ("primary_release_year", year.to_string()),
            ("sort_by", "popularity.desc".to_owned()),
            ("page", page.to_string()),
        ];
        self.fetch("/discover/movie", &query).await
    }

    pub async fn fetch_keywords_json(&self, movie_id: u64) -> Option<Keywords> {
        self.fetch(&format!("/movie/{}/keywords", movie_id), &[]).await
    }

    pub async fn fetch_credits_json(&self, movie_id: u64) -> Option<Credits> {
        self.fetch(&format!("/movie/{}/credits", movie_id), &[]).await
    }
}

#[async_trait]
impl Source for TmdbAPI {
    async fn fetch_page(&self, kind: ListingKind, page: u32) -> Option<Page> {
        self.fetch(kind.endpoint(), &[("page", page.to_string())]).await
    }

    async fn fetch_keywords(&self, movie_id: u64) -> Option<Vec<Keyword>> {
        self.fetch_keywords_json(movie_id).await.map(|json| json.keywords)
    }

    async fn fetch_credits(&self, movie_id: u64) -> Option<Vec<CastMember>> {
        self.fetch_credits_json(movie_id).await.map(|json| json.cast)
    }
}
