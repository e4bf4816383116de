use crate::db::Movie;
use crate::sources::{CastMember, Keyword, Source, Summary};

use tracing::{debug, warn};

pub const TOP_CAST: usize = 3;
pub const UNKNOWN_ORDER: u32 = 999;

pub fn keyword_names(keywords: Option<Vec<Keyword>>) -> Vec<String> {
    keywords
        .unwrap_or_default()
        .into_iter()
        .filter_map(|keyword| keyword.name)
        .collect()
}

/// Names of the first three billed cast members.
///
/// Members without a billing order go after every ordered member; the sort is
/// stable so ties keep their upstream order.
pub fn top_cast(cast: Option<Vec<CastMember>>) -> Vec<String> {
    let mut cast = cast.unwrap_or_default();
    cast.sort_by_key(|member| {
        (
            member.order.is_none(),
            member.order.unwrap_or(UNKNOWN_ORDER),
        )
    });

    cast.into_iter()
        .filter_map(|member| member.name)
        .take(TOP_CAST)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Builds a `Movie` from a listing summary plus its keyword and credit lookups.
///
/// Returns `None` for summaries without an id (no lookups are made) or without a
/// title. Failed lookups degrade to empty lists.
pub async fn enrich<S>(source: &S, summary: &Summary) -> Option<Movie>
where
    S: Source + ?Sized,
{
    let Some(id) = summary.id else {
        warn!("Skipping movie without an id.");
        return None;
    };

    let keywords = keyword_names(source.fetch_keywords(id).await);
    let top_cast = top_cast(source.fetch_credits(id).await);

    let Some(title) = non_empty(summary.title.clone()) else {
        warn!(id, "Skipping movie without a title.");
        return None;
    };

    debug!(id, %title, keywords = keywords.len(), cast = top_cast.len(), "Enriched movie");

    Some(Movie {
        id,
        title,
        overview: summary.overview.clone(),
        release_date: non_empty(summary.release_date.clone()),
        popularity: summary.popularity,
        vote_average: summary.vote_average,
        vote_count: summary.vote_count,
        poster_path: summary.poster_path.clone(),
        genre_ids: summary.genre_ids.clone(),
        keywords,
        top_cast,
    })
}
