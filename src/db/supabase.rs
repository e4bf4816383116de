use crate::config::SupabaseConfig;
use crate::db::{Movie, Sink, UpsertStatus};
use crate::error::{Error, Result};

use async_trait::async_trait;
use tracing::{error, info};

/// Batched insert-or-replace into a Supabase (PostgREST) table keyed on `id`.
#[derive(Debug, Clone)]
pub struct Supabase {
    client: reqwest::Client,
    url: String,
    key: String,
    table: String,
}

impl Supabase {
    pub fn new(config: &SupabaseConfig, url: &str, key: &str) -> Supabase {
        Supabase {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_owned(),
            key: key.to_owned(),
            table: config.table.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.table)
    }

    pub async fn upsert_movies(&self, movies: &[Movie]) -> Result<usize> {
        let url = self.endpoint();

        let response = self
            .client
            .post(url.as_str())
            .query(&[("on_conflict", "id")])
            .header("apikey", self.key.as_str())
            .bearer_auth(&self.key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(movies)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(movies.len())
    }
}

#[async_trait]
impl Sink for Supabase {
    async fn upsert(&self, movies: &[Movie]) -> UpsertStatus {
        if movies.is_empty() {
            info!("No movie data to upsert.");
            return UpsertStatus::Skipped;
        }

        match self.upsert_movies(movies).await {
            Ok(count) => UpsertStatus::Written(count),
            Err(err) => {
                error!(
                    table = %self.table,
                    count = movies.len(),
                    "An error occurred while upserting data to Supabase: {}",
                    err
                );
                UpsertStatus::Failed
            }
        }
    }
}
