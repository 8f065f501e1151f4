use rand::Rng;
use std::ops::RangeInclusive;

use crate::{
    error::AppError,
    models::{CandidateRecord, MediaType, RecentRecommendationEntry, Resolution},
    services::providers::MediaCatalog,
};

/// Match score range for picks drawn from the user's own history
pub const PERSONALIZED_CONFIDENCE: RangeInclusive<u8> = 80..=99;

/// Match score range for picks drawn from the popular list
pub const POPULAR_CONFIDENCE: RangeInclusive<u8> = 70..=84;

/// How far down the popular list a pick may come from
pub const POPULAR_POOL: usize = 5;

/// Why a cascade stage produced nothing
#[derive(thiserror::Error, Debug)]
pub enum StageMiss {
    #[error("no {0} candidates in recent recommendations")]
    NoCandidates(MediaType),

    #[error("candidate id {0:?} is not a catalog id")]
    InvalidId(Option<String>),

    #[error("catalog fetch failed: {0}")]
    Fetch(#[from] AppError),

    #[error("popular list is empty")]
    EmptyPopular,
}

/// Flattens the results of every entry for `target`, keeping their order
pub fn candidate_pool(
    entries: &[RecentRecommendationEntry],
    target: MediaType,
) -> Vec<&CandidateRecord> {
    entries
        .iter()
        .filter(|entry| entry.media_type == target)
        .flat_map(|entry| entry.results.iter())
        .collect()
}

/// First candidate with artwork, otherwise the first candidate
pub fn select_candidate<'a>(pool: &[&'a CandidateRecord]) -> Option<&'a CandidateRecord> {
    pool.iter()
        .find(|candidate| candidate.has_artwork())
        .or_else(|| pool.first())
        .copied()
}

async fn personalized_stage<R>(
    entries: &[RecentRecommendationEntry],
    target: MediaType,
    catalog: &dyn MediaCatalog,
    rng: &mut R,
) -> Result<Resolution, StageMiss>
where
    R: Rng + Send,
{
    let pool = candidate_pool(entries, target);
    let candidate = select_candidate(&pool).ok_or(StageMiss::NoCandidates(target))?;

    let id = candidate
        .id
        .as_ref()
        .and_then(|id| id.as_positive_id())
        .ok_or_else(|| StageMiss::InvalidId(candidate.id.as_ref().map(|id| id.to_string())))?;

    let item = catalog.fetch_by_id(id).await?;
    let confidence = rng.gen_range(PERSONALIZED_CONFIDENCE);

    tracing::info!(
        item_id = item.id,
        candidates = pool.len(),
        confidence,
        provider = catalog.name(),
        "Personalized hero pick"
    );

    Ok(Resolution::picked(item, confidence))
}

async fn popular_stage<R>(catalog: &dyn MediaCatalog, rng: &mut R) -> Result<Resolution, StageMiss>
where
    R: Rng + Send,
{
    let mut popular = catalog.fetch_popular().await?;
    if popular.is_empty() {
        return Err(StageMiss::EmptyPopular);
    }

    let index = rng.gen_range(0..popular.len().min(POPULAR_POOL));
    let item = popular.swap_remove(index);
    let confidence = rng.gen_range(POPULAR_CONFIDENCE);

    tracing::info!(
        item_id = item.id,
        index,
        confidence,
        provider = catalog.name(),
        "Popular hero pick"
    );

    Ok(Resolution::picked(item, confidence))
}

/// Picks the hero recommendation for `target`.
///
/// Tries the user's recent recommendations first and falls back to the
/// catalog's popular list. Every stage failure is logged and falls through;
/// when both stages miss the result is an empty resolution with a zero
/// score. This function never fails.
pub async fn resolve<R>(
    entries: &[RecentRecommendationEntry],
    target: MediaType,
    catalog: &dyn MediaCatalog,
    rng: &mut R,
) -> Resolution
where
    R: Rng + Send,
{
    let outcome = match personalized_stage(entries, target, catalog, rng).await {
        Ok(resolution) => Ok(resolution),
        Err(miss) => {
            match &miss {
                StageMiss::Fetch(e) => {
                    tracing::error!(error = %e, "Error fetching recommended item details")
                }
                other => tracing::debug!(reason = %other, "No personalized hero pick"),
            }
            popular_stage(catalog, rng).await
        }
    };

    outcome.unwrap_or_else(|miss| {
        tracing::warn!(reason = %miss, "No hero recommendation available");
        Resolution::none()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateId, MediaItem};
    use crate::services::providers::MockMediaCatalog;
    use mockall::predicate::eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn item(id: u64) -> MediaItem {
        MediaItem {
            id,
            title: format!("Title {}", id),
            poster_path: Some(format!("/{}.jpg", id)),
            release_date: None,
            genres: vec![],
            overview: None,
        }
    }

    fn candidate(id: i64, poster: Option<&str>) -> CandidateRecord {
        CandidateRecord {
            id: Some(CandidateId::Number(id)),
            poster_path: poster.map(str::to_string),
        }
    }

    fn entry(media_type: MediaType, results: Vec<CandidateRecord>) -> RecentRecommendationEntry {
        RecentRecommendationEntry {
            media_type,
            results,
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_candidate_pool_filters_and_keeps_order() {
        let entries = vec![
            entry(MediaType::Movie, vec![candidate(1, None), candidate(2, None)]),
            entry(MediaType::Tv, vec![candidate(3, None)]),
            entry(MediaType::Movie, vec![candidate(4, None)]),
        ];

        let ids: Vec<_> = candidate_pool(&entries, MediaType::Movie)
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(
            ids,
            vec![
                Some(CandidateId::Number(1)),
                Some(CandidateId::Number(2)),
                Some(CandidateId::Number(4)),
            ]
        );
    }

    #[test]
    fn test_select_candidate_prefers_artwork() {
        let a = candidate(1, None);
        let b = candidate(2, Some("/b.jpg"));
        let c = candidate(3, Some("/c.jpg"));
        let pool = vec![&a, &b, &c];
        assert_eq!(select_candidate(&pool), Some(&b));
    }

    #[test]
    fn test_select_candidate_falls_back_to_first() {
        let a = candidate(1, None);
        let b = candidate(2, Some(""));
        let pool = vec![&a, &b];
        assert_eq!(select_candidate(&pool), Some(&a));
        assert_eq!(select_candidate(&[]), None);
    }

    #[tokio::test]
    async fn test_personalized_pick() {
        let mut catalog = MockMediaCatalog::new();
        catalog
            .expect_fetch_by_id()
            .with(eq(42))
            .times(1)
            .returning(|id| Ok(item(id)));
        catalog.expect_fetch_popular().never();
        catalog.expect_name().return_const("mock");

        let entries = vec![entry(MediaType::Movie, vec![candidate(42, Some("/x.jpg"))])];
        let resolution = resolve(&entries, MediaType::Movie, &catalog, &mut rng()).await;

        assert_eq!(resolution.item, Some(item(42)));
        assert!(PERSONALIZED_CONFIDENCE.contains(&resolution.confidence));
    }

    #[tokio::test]
    async fn test_personalized_confidence_stays_in_range() {
        let mut catalog = MockMediaCatalog::new();
        catalog.expect_fetch_by_id().returning(|id| Ok(item(id)));
        catalog.expect_name().return_const("mock");

        let entries = vec![entry(MediaType::Movie, vec![candidate(5, None)])];
        let mut rng = rng();
        for _ in 0..200 {
            let resolution = resolve(&entries, MediaType::Movie, &catalog, &mut rng).await;
            assert!(PERSONALIZED_CONFIDENCE.contains(&resolution.confidence));
        }
    }

    #[tokio::test]
    async fn test_string_id_is_coerced() {
        let mut catalog = MockMediaCatalog::new();
        catalog
            .expect_fetch_by_id()
            .with(eq(603))
            .times(1)
            .returning(|id| Ok(item(id)));
        catalog.expect_name().return_const("mock");

        let entries = vec![entry(
            MediaType::Movie,
            vec![CandidateRecord {
                id: Some(CandidateId::Text("603".to_string())),
                poster_path: None,
            }],
        )];
        let resolution = resolve(&entries, MediaType::Movie, &catalog, &mut rng()).await;
        assert_eq!(resolution.item.map(|i| i.id), Some(603));
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_through_to_popular() {
        let mut catalog = MockMediaCatalog::new();
        catalog
            .expect_fetch_by_id()
            .times(1)
            .returning(|_| Err(AppError::NotFound("movie 42".to_string())));
        catalog
            .expect_fetch_popular()
            .times(1)
            .returning(|| Ok(vec![item(100)]));
        catalog.expect_name().return_const("mock");

        let entries = vec![entry(MediaType::Movie, vec![candidate(42, Some("/x.jpg"))])];
        let resolution = resolve(&entries, MediaType::Movie, &catalog, &mut rng()).await;

        assert_eq!(resolution.item, Some(item(100)));
        assert!(POPULAR_CONFIDENCE.contains(&resolution.confidence));
    }

    #[tokio::test]
    async fn test_non_numeric_id_skips_fetch() {
        let mut catalog = MockMediaCatalog::new();
        catalog.expect_fetch_by_id().never();
        catalog
            .expect_fetch_popular()
            .times(1)
            .returning(|| Ok(vec![item(100)]));
        catalog.expect_name().return_const("mock");

        let entries = vec![entry(
            MediaType::Movie,
            vec![CandidateRecord {
                id: Some(CandidateId::Text("tt1375666".to_string())),
                poster_path: Some("/x.jpg".to_string()),
            }],
        )];
        let resolution = resolve(&entries, MediaType::Movie, &catalog, &mut rng()).await;
        assert_eq!(resolution.item, Some(item(100)));
    }

    #[tokio::test]
    async fn test_malformed_id_does_not_hide_valid_candidate() {
        let mut catalog = MockMediaCatalog::new();
        catalog
            .expect_fetch_by_id()
            .with(eq(7))
            .times(1)
            .returning(|id| Ok(item(id)));
        catalog.expect_fetch_popular().never();
        catalog.expect_name().return_const("mock");

        let entries: Vec<RecentRecommendationEntry> = serde_json::from_str(
            r#"[{"mediaType": "movie", "results": [{"id": true}, {"id": 7, "poster_path": "/p.jpg"}]}]"#,
        )
        .unwrap();
        let resolution = resolve(&entries, MediaType::Movie, &catalog, &mut rng()).await;
        assert_eq!(resolution.item, Some(item(7)));
    }

    #[tokio::test]
    async fn test_malformed_selected_id_falls_through() {
        let mut catalog = MockMediaCatalog::new();
        catalog.expect_fetch_by_id().never();
        catalog
            .expect_fetch_popular()
            .times(1)
            .returning(|| Ok(vec![item(100)]));
        catalog.expect_name().return_const("mock");

        let entries: Vec<RecentRecommendationEntry> = serde_json::from_str(
            r#"[{"mediaType": "movie", "results": [{"id": 1.5, "poster_path": "/p.jpg"}, {"id": 7}]}]"#,
        )
        .unwrap();
        let resolution = resolve(&entries, MediaType::Movie, &catalog, &mut rng()).await;
        assert_eq!(resolution.item, Some(item(100)));
    }

    #[tokio::test]
    async fn test_other_media_types_ignored() {
        let mut catalog = MockMediaCatalog::new();
        catalog.expect_fetch_by_id().never();
        catalog
            .expect_fetch_popular()
            .times(1)
            .returning(|| Ok(vec![item(100)]));
        catalog.expect_name().return_const("mock");

        let entries = vec![
            entry(MediaType::Tv, vec![candidate(1399, Some("/got.jpg"))]),
            entry(MediaType::Book, vec![candidate(9, None)]),
        ];
        let resolution = resolve(&entries, MediaType::Movie, &catalog, &mut rng()).await;
        assert_eq!(resolution.item, Some(item(100)));
    }

    #[tokio::test]
    async fn test_popular_pick_from_first_five() {
        let mut catalog = MockMediaCatalog::new();
        catalog
            .expect_fetch_popular()
            .returning(|| Ok((1..=20).map(item).collect()));
        catalog.expect_name().return_const("mock");

        let mut rng = rng();
        for _ in 0..200 {
            let resolution = resolve(&[], MediaType::Movie, &catalog, &mut rng).await;
            let id = resolution.item.unwrap().id;
            assert!((1..=5).contains(&id));
            assert!(POPULAR_CONFIDENCE.contains(&resolution.confidence));
        }
    }

    #[tokio::test]
    async fn test_popular_pick_from_three_items() {
        let mut catalog = MockMediaCatalog::new();
        catalog
            .expect_fetch_popular()
            .returning(|| Ok(vec![item(1), item(2), item(3)]));
        catalog.expect_name().return_const("mock");

        let mut rng = rng();
        for _ in 0..50 {
            let resolution = resolve(&[], MediaType::Movie, &catalog, &mut rng).await;
            assert!((1..=3).contains(&resolution.item.unwrap().id));
        }
    }

    #[tokio::test]
    async fn test_empty_popular_is_none() {
        let mut catalog = MockMediaCatalog::new();
        catalog.expect_fetch_popular().returning(|| Ok(vec![]));
        catalog.expect_name().return_const("mock");

        let resolution = resolve(&[], MediaType::Movie, &catalog, &mut rng()).await;
        assert_eq!(resolution, Resolution::none());
    }

    #[tokio::test]
    async fn test_all_stages_failing_is_none() {
        let mut catalog = MockMediaCatalog::new();
        catalog
            .expect_fetch_by_id()
            .returning(|_| Err(AppError::ExternalApi("boom".to_string())));
        catalog
            .expect_fetch_popular()
            .returning(|| Err(AppError::ExternalApi("boom".to_string())));
        catalog.expect_name().return_const("mock");

        let entries = vec![entry(MediaType::Movie, vec![candidate(42, None)])];
        let resolution = resolve(&entries, MediaType::Movie, &catalog, &mut rng()).await;

        assert_eq!(resolution.item, None);
        assert_eq!(resolution.confidence, 0);
    }
}
