pub mod supabase;

pub use supabase::Supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An enriched movie row, keyed by its TMDB `id`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub poster_path: Option<String>,
    pub genre_ids: Vec<u64>,
    pub keywords: Vec<String>,
    pub top_cast: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStatus {
    /// Nothing to write.
    Skipped,
    Written(usize),
    /// Already logged by the sink; the batch is lost.
    Failed,
}

/// Write side of the pipeline. One call per page, never retried.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn upsert(&self, movies: &[Movie]) -> UpsertStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_serialize() {
        let movie = Movie {
            id: 1,
            title: "Movie 1".to_owned(),
            overview: None,
            release_date: Some("1994-09-23".to_owned()),
            popularity: Some(10.5),
            vote_average: None,
            vote_count: Some(3),
            poster_path: None,
            genre_ids: vec![28, 12],
            keywords: vec!["action".to_owned()],
            top_cast: vec!["Actor A".to_owned()],
        };

        let json = serde_json::to_value(&movie).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["title"], "Movie 1");
        assert!(json["overview"].is_null());
        assert_eq!(json["genre_ids"], serde_json::json!([28, 12]));
        assert_eq!(json["keywords"], serde_json::json!(["action"]));
        assert_eq!(json["top_cast"], serde_json::json!(["Actor A"]));
        assert_eq!(json.as_object().unwrap().len(), 11);
    }
}
