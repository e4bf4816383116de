mod config;
pub mod db;
mod error;
mod options;
pub mod sources;
pub mod transform;

pub use config::{
    Config, Credentials, PipelineConfig, SupabaseConfig, TmdbAPIConfig, DEFAULT_CONFIG,
};
pub use db::{Movie, Sink, Supabase, UpsertStatus};
pub use error::{Error, Result};
pub use options::RunOptions;
pub use sources::{ListingKind, Source, Summary, TmdbAPI};

use time::OffsetDateTime;
use tokio::time::sleep;
use tracing::{info, warn};

/// Outcome of one fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    pub page: u32,
    pub results: usize,
    pub enriched: usize,
    pub dropped: usize,
    pub write: UpsertStatus,
}

/// What a run did. Per-item and per-page failures end up here instead of
/// aborting the run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub kind: ListingKind,
    pub started_at: OffsetDateTime,
    pub pages_requested: u32,
    pub pages_fetched: u32,
    pub movies_seen: usize,
    pub movies_enriched: usize,
    pub movies_dropped: usize,
    pub movies_written: usize,
    pub failed_writes: u32,
    pub stopped_early: bool,
    pub pages: Vec<PageReport>,
}

impl RunSummary {
    fn new(kind: ListingKind, pages_requested: u32) -> RunSummary {
        RunSummary {
            kind,
            started_at: OffsetDateTime::now_utc(),
            pages_requested,
            pages_fetched: 0,
            movies_seen: 0,
            movies_enriched: 0,
            movies_dropped: 0,
            movies_written: 0,
            failed_writes: 0,
            stopped_early: false,
            pages: Vec::new(),
        }
    }

    fn record(&mut self, report: PageReport) {
        self.pages_fetched += 1;
        self.movies_seen += report.results;
        self.movies_enriched += report.enriched;
        self.movies_dropped += report.dropped;
        match report.write {
            UpsertStatus::Written(count) => self.movies_written += count,
            UpsertStatus::Failed => self.failed_writes += 1,
            UpsertStatus::Skipped => {}
        }
        self.pages.push(report);
    }
}

/// Walks listing pages, enriches every movie and upserts one batch per page.
///
/// Everything runs sequentially; the configured delays are the only pacing
/// against the upstream rate limit.
pub struct Pipeline<S, K> {
    config: PipelineConfig,
    source: S,
    sink: K,
}

impl Pipeline<TmdbAPI, Supabase> {
    pub fn new(config: &Config, credentials: &Credentials) -> Pipeline<TmdbAPI, Supabase> {
        let source = TmdbAPI::new(&config.tmdb_api, &credentials.tmdb_api_key);
        let sink = Supabase::new(
            &config.supabase,
            &credentials.supabase_url,
            &credentials.supabase_key,
        );

        Pipeline::with_parts(config.pipeline.clone(), source, sink)
    }
}

impl<S, K> Pipeline<S, K>
where
    S: Source,
    K: Sink,
{
    pub fn with_parts(config: PipelineConfig, source: S, sink: K) -> Pipeline<S, K> {
        Pipeline {
            config,
            source,
            sink,
        }
    }

    /// Returns the page's summaries, or `None` once upstream has nothing more.
    async fn extract(&self, kind: ListingKind, page: u32) -> Option<Vec<Summary>> {
        self.source
            .fetch_page(kind, page)
            .await
            .map(|page| page.results)
            .filter(|results| !results.is_empty())
    }

    async fn transform(&self, summaries: &[Summary]) -> Vec<Movie> {
        let mut batch = Vec::with_capacity(summaries.len());

        for movie in summaries {
            if let Some(enriched) = transform::enrich(&self.source, movie).await {
                batch.push(enriched);
            }

            // Two detail requests were just made.
            sleep(self.config.item_delay()).await;
        }

        batch
    }

    async fn load(&self, page: u32, batch: &[Movie]) -> UpsertStatus {
        if batch.is_empty() {
            return UpsertStatus::Skipped;
        }

        info!(page, count = batch.len(), "Upserting movies");
        self.sink.upsert(batch).await
    }

    /// Runs the pipeline for `kind` (`"top_rated"` or `"popular"`) over pages
    /// `1..=total_pages`.
    ///
    /// Only an invalid kind or page count is returned as an error, and both are
    /// checked before any request is made.
    pub async fn run(&self, kind: &str, total_pages: u32) -> Result<RunSummary> {
        let kind: ListingKind = kind.parse()?;
        if total_pages == 0 {
            return Err(Error::InvalidPages(total_pages));
        }

        info!(%kind, total_pages, "Starting data pipeline");
        let start = std::time::Instant::now();
        let mut summary = RunSummary::new(kind, total_pages);

        for page in 1..=total_pages {
            info!(%kind, page, "Fetching page");

            let Some(results) = self.extract(kind, page).await else {
                warn!(%kind, page, "No results returned. Stopping early.");
                summary.stopped_early = true;
                break;
            };

            info!(page, results = results.len(), "Fetched page");

            let batch = self.transform(&results).await;
            let report = PageReport {
                page,
                results: results.len(),
                enriched: batch.len(),
                dropped: results.len() - batch.len(),
                write: self.load(page, &batch).await,
            };

            match report.write {
                UpsertStatus::Written(written) => info!(
                    page,
                    enriched = report.enriched,
                    dropped = report.dropped,
                    written,
                    "Page written"
                ),
                UpsertStatus::Failed => warn!(
                    page,
                    enriched = report.enriched,
                    dropped = report.dropped,
                    "Batch was not written"
                ),
                UpsertStatus::Skipped => {
                    info!(page, dropped = report.dropped, "No valid movies on this page.")
                }
            }
            summary.record(report);

            sleep(self.config.page_delay()).await;
        }

        info!(
            %kind,
            started_at = %summary.started_at,
            pages = summary.pages_fetched,
            seen = summary.movies_seen,
            enriched = summary.movies_enriched,
            dropped = summary.movies_dropped,
            written = summary.movies_written,
            failed_writes = summary.failed_writes,
            stopped_early = summary.stopped_early,
            elapsed = ?start.elapsed(),
            "Data pipeline finished"
        );

        Ok(summary)
    }

    pub async fn run_with(&self, options: Option<RunOptions>) -> Result<RunSummary> {
        let (kind, total_pages) = options.unwrap_or_default().resolve(&self.config);
        self.run(&kind, total_pages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Page;
    use crate::test::helpers::{page, summary, CallLog, MockSink, MockSource, StubServer};

    fn no_delay() -> PipelineConfig {
        PipelineConfig {
            item_delay_ms: 0,
            page_delay_ms: 0,
            ..Default::default()
        }
    }

    fn two_per_page(_: ListingKind, n: u32) -> Option<Page> {
        Some(page(vec![
            summary(u64::from(n) * 10 + 1, "Movie 1"),
            summary(u64::from(n) * 10 + 2, "Movie 2"),
        ]))
    }

    #[tokio::test]
    async fn test_run_single_movie() {
        let log = CallLog::default();
        let source = MockSource::new(log.clone(), |kind, n| {
            (kind == ListingKind::TopRated && n == 1).then(|| page(vec![summary(1, "Movie 1")]))
        });
        let pipeline = Pipeline::with_parts(no_delay(), source, MockSink::new(log.clone()));

        let summary = pipeline.run("top_rated", 1).await.unwrap();
        assert_eq!(summary.movies_written, 1);

        let log = log.lock().unwrap();
        assert_eq!(log.upserts.len(), 1);
        let movie = &log.upserts[0][0];
        assert_eq!(movie.id, 1);
        assert_eq!(movie.title, "Movie 1");
        assert_eq!(movie.genre_ids, vec![28, 12]);
        assert_eq!(movie.keywords, vec!["action", "adventure"]);
        assert_eq!(movie.top_cast, vec!["Actor A", "Actor B", "Actor C"]);
    }

    #[tokio::test]
    async fn test_run_flow() {
        for (kind, listing) in [
            ("top_rated", ListingKind::TopRated),
            ("popular", ListingKind::Popular),
        ] {
            let log = CallLog::default();
            let source = MockSource::new(log.clone(), two_per_page);
            let pipeline = Pipeline::with_parts(no_delay(), source, MockSink::new(log.clone()));

            let summary = pipeline.run(kind, 2).await.unwrap();
            assert_eq!(summary.kind, listing);
            assert_eq!(summary.pages_fetched, 2);
            assert_eq!(summary.movies_seen, 4);
            assert_eq!(summary.movies_written, 4);
            assert!(!summary.stopped_early);

            let log = log.lock().unwrap();
            let (used, other) = match listing {
                ListingKind::TopRated => (&log.top_rated, &log.popular),
                ListingKind::Popular => (&log.popular, &log.top_rated),
            };
            assert_eq!(used, &vec![1, 2]);
            assert!(other.is_empty());
            assert_eq!(log.keywords, vec![11, 12, 21, 22]);
            assert_eq!(log.credits, vec![11, 12, 21, 22]);
            assert_eq!(log.upserts.len(), 2);
            assert_eq!(log.upserts[0].len(), 2);
            assert_eq!(log.upserts[1][0].id, 21);
        }
    }

    #[tokio::test]
    async fn test_run_invalid_kind() {
        let log = CallLog::default();
        let source = MockSource::new(log.clone(), two_per_page);
        let pipeline = Pipeline::with_parts(no_delay(), source, MockSink::new(log.clone()));

        let err = pipeline.run("invalid_type", 1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidKind(_)));
        assert!(err.to_string().contains("Invalid pipeline type"));
        assert_eq!(log.lock().unwrap().network_calls(), 0);
    }

    #[tokio::test]
    async fn test_run_zero_pages() {
        let log = CallLog::default();
        let source = MockSource::new(log.clone(), two_per_page);
        let pipeline = Pipeline::with_parts(no_delay(), source, MockSink::new(log.clone()));

        let err = pipeline.run("popular", 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPages(0)));
        assert_eq!(log.lock().unwrap().network_calls(), 0);
    }

    #[tokio::test]
    async fn test_run_empty_first_page() {
        let log = CallLog::default();
        let source = MockSource::new(log.clone(), |_, _| Some(page(vec![])));
        let pipeline = Pipeline::with_parts(no_delay(), source, MockSink::new(log.clone()));

        let summary = pipeline.run("top_rated", 5).await.unwrap();
        assert!(summary.stopped_early);
        assert_eq!(summary.pages_fetched, 0);

        let log = log.lock().unwrap();
        assert_eq!(log.top_rated, vec![1]);
        assert!(log.upserts.is_empty());
        assert!(log.keywords.is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_exhaustion() {
        let log = CallLog::default();
        let source = MockSource::new(log.clone(), |kind, n| match n {
            1 | 2 => two_per_page(kind, n),
            _ => None,
        });
        let pipeline = Pipeline::with_parts(no_delay(), source, MockSink::new(log.clone()));

        let summary = pipeline.run("popular", 10).await.unwrap();
        assert!(summary.stopped_early);
        assert_eq!(summary.pages_fetched, 2);

        let log = log.lock().unwrap();
        assert_eq!(log.popular, vec![1, 2, 3]);
        assert_eq!(log.upserts.len(), 2);
    }

    #[tokio::test]
    async fn test_run_failed_lookups_keep_movies() {
        let log = CallLog::default();
        let source = MockSource::new(log.clone(), two_per_page)
            .with_keywords(None)
            .with_credits(None);
        let pipeline = Pipeline::with_parts(no_delay(), source, MockSink::new(log.clone()));

        let summary = pipeline.run("top_rated", 1).await.unwrap();
        assert_eq!(summary.movies_written, 2);

        let log = log.lock().unwrap();
        assert!(log.upserts[0]
            .iter()
            .all(|movie| movie.keywords.is_empty() && movie.top_cast.is_empty()));
    }

    #[tokio::test]
    async fn test_run_drops_invalid_movies() {
        let log = CallLog::default();
        let source = MockSource::new(log.clone(), |_, n| {
            let mut no_id = summary(0, "No Id");
            no_id.id = None;
            let untitled = Summary {
                id: Some(7),
                ..Default::default()
            };
            Some(match n {
                1 => page(vec![no_id, untitled, summary(8, "Movie 8")]),
                _ => page(vec![summary(9, "")]),
            })
        });
        let pipeline = Pipeline::with_parts(no_delay(), source, MockSink::new(log.clone()));

        let summary = pipeline.run("popular", 2).await.unwrap();
        assert_eq!(summary.movies_seen, 4);
        assert_eq!(summary.movies_enriched, 1);
        assert_eq!(summary.movies_dropped, 3);
        assert_eq!(summary.pages_fetched, 2);
        assert_eq!(
            summary.pages,
            vec![
                PageReport {
                    page: 1,
                    results: 3,
                    enriched: 1,
                    dropped: 2,
                    write: UpsertStatus::Written(1),
                },
                PageReport {
                    page: 2,
                    results: 1,
                    enriched: 0,
                    dropped: 1,
                    write: UpsertStatus::Skipped,
                },
            ]
        );

        let log = log.lock().unwrap();
        assert_eq!(log.keywords, vec![7, 8, 9]);
        assert_eq!(log.upserts.len(), 1);
        assert_eq!(log.upserts[0][0].id, 8);
    }

    #[tokio::test]
    async fn test_run_continues_after_failed_write() {
        let log = CallLog::default();
        let source = MockSource::new(log.clone(), two_per_page);
        let pipeline = Pipeline::with_parts(no_delay(), source, MockSink::failing(log.clone()));

        let summary = pipeline.run("top_rated", 3).await.unwrap();
        assert_eq!(summary.failed_writes, 3);
        assert_eq!(summary.movies_written, 0);
        assert_eq!(summary.pages.len(), 3);
        assert!(summary
            .pages
            .iter()
            .all(|report| report.enriched == 2 && report.write == UpsertStatus::Failed));
        assert_eq!(log.lock().unwrap().upserts.len(), 3);
    }

    #[tokio::test]
    async fn test_run_with_defaults() {
        let log = CallLog::default();
        let source = MockSource::new(log.clone(), two_per_page);
        let pipeline = Pipeline::with_parts(no_delay(), source, MockSink::new(log.clone()));

        let summary = pipeline.run_with(None).await.unwrap();
        assert_eq!(summary.kind, ListingKind::Popular);
        assert_eq!(summary.pages_requested, 2);

        let options = RunOptions {
            kind: Some("top_rated".to_owned()),
            pages: Some(1),
        };
        pipeline.run_with(Some(options)).await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.popular, vec![1, 2]);
        assert_eq!(log.top_rated, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_paces_requests() {
        let log = CallLog::default();
        let source = MockSource::new(log.clone(), two_per_page);
        let config = PipelineConfig {
            item_delay_ms: 250,
            page_delay_ms: 500,
            ..Default::default()
        };
        let pipeline = Pipeline::with_parts(config, source, MockSink::new(log.clone()));

        let start = tokio::time::Instant::now();
        pipeline.run("popular", 2).await.unwrap();
        // 4 movies * 250ms + 2 pages * 500ms
        assert!(start.elapsed() >= std::time::Duration::from_millis(2000));
        assert!(start.elapsed() < std::time::Duration::from_millis(2100));
    }

    #[tokio::test]
    async fn test_run_against_http() {
        let tmdb = StubServer::start(vec![
            (
                200,
                r#"{"page":1,"results":[{"id":1,"title":"Movie 1","genre_ids":[28,12]}]}"#,
            ),
            (200, r#"{"id":1,"keywords":[{"id":1,"name":"action"},{"id":2,"name":"adventure"}]}"#),
            (
                200,
                r#"{"id":1,"cast":[{"name":"Actor D","order":3},{"name":"Actor A","order":0},{"name":"Actor C","order":2},{"name":"Actor B","order":1}]}"#,
            ),
            (200, r#"{"page":2,"results":[]}"#),
        ])
        .await;
        let supabase = StubServer::start(vec![(201, "")]).await;

        let mut config = Config::default();
        config.tmdb_api.url = tmdb.url.clone();
        config.pipeline = no_delay();
        let credentials = Credentials::resolve(
            Some("dummy_api_key".to_owned()),
            Some(supabase.url.clone()),
            Some("service_key".to_owned()),
            |_| None,
        )
        .unwrap();

        let summary = Pipeline::new(&config, &credentials)
            .run("top_rated", 3)
            .await
            .unwrap();
        assert_eq!(summary.pages_fetched, 1);
        assert_eq!(summary.movies_written, 1);
        assert!(summary.stopped_early);

        let targets: Vec<String> = tmdb.requests().into_iter().map(|r| r.target).collect();
        assert_eq!(
            targets,
            vec![
                "/movie/top_rated?api_key=dummy_api_key&page=1",
                "/movie/1/keywords?api_key=dummy_api_key",
                "/movie/1/credits?api_key=dummy_api_key",
                "/movie/top_rated?api_key=dummy_api_key&page=2",
            ]
        );

        let writes = supabase.requests();
        assert_eq!(writes.len(), 1);
        let movies: Vec<Movie> = serde_json::from_str(&writes[0].body).unwrap();
        assert_eq!(movies[0].keywords, vec!["action", "adventure"]);
        assert_eq!(movies[0].top_cast, vec!["Actor A", "Actor B", "Actor C"]);
    }
}
