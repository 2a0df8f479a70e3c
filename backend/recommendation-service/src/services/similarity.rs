//! Jaccard similarity between rated-sets and neighbor ranking maintenance.

use std::collections::HashSet;
use std::hash::Hash;
use tracing::{debug, info, instrument};

use super::namespace::EntityKind;
use super::CollectionContext;
use crate::error::{AppError, Result};

/// `|A ∩ B| / |A ∪ B|` over in-memory sets.
pub fn jaccard_coefficient<T: Eq + Hash>(left: &HashSet<T>, right: &HashSet<T>) -> Result<f64> {
    let intersection = left.intersection(right).count();
    jaccard_from_counts(intersection, left.len(), right.len())
}

/// Jaccard coefficient from set sizes: `|A ∩ B| / (|A| + |B| - |A ∩ B|)`.
///
/// An empty union has no defined similarity and is reported as an error
/// instead of producing NaN.
pub fn jaccard_from_counts(intersection: usize, left: usize, right: usize) -> Result<f64> {
    let union = (left + right).checked_sub(intersection).ok_or_else(|| {
        AppError::UndefinedSimilarity(format!(
            "intersection {} exceeds combined size {}",
            intersection,
            left + right
        ))
    })?;

    if union == 0 {
        return Err(AppError::UndefinedSimilarity(
            "both sets are empty".to_string(),
        ));
    }
    if intersection > left.min(right) {
        return Err(AppError::UndefinedSimilarity(format!(
            "intersection {} larger than smaller set {}",
            intersection,
            left.min(right)
        )));
    }

    Ok(intersection as f64 / union as f64)
}

/// Maintains user→user and item→item similarity rankings.
pub struct SimilarityEngine {
    ctx: CollectionContext,
}

impl SimilarityEngine {
    pub fn new(ctx: CollectionContext) -> Self {
        Self { ctx }
    }

    /// Jaccard coefficient of two stored sets.
    pub async fn jaccard_between(&self, left_key: &str, right_key: &str) -> Result<f64> {
        let store = &self.ctx.store;
        let intersection = store.intersection_count(left_key, right_key).await?;
        let left = store.cardinality(left_key).await?;
        let right = store.cardinality(right_key).await?;
        jaccard_from_counts(intersection, left, right)
    }

    /// Rescores every user who liked at least one item in common with `user_id`.
    ///
    /// Returns the number of neighbors written to the user's similarity ranking.
    #[instrument(skip(self), fields(collection = %self.ctx.keys.collection()))]
    pub async fn update_user_similarity(&self, user_id: &str) -> Result<usize> {
        self.rescore_neighbors(EntityKind::User, user_id).await
    }

    /// Rescores every item that shares at least one liker with `item_id`.
    #[instrument(skip(self), fields(collection = %self.ctx.keys.collection()))]
    pub async fn update_item_similarity(&self, item_id: &str) -> Result<usize> {
        self.rescore_neighbors(EntityKind::Item, item_id).await
    }

    /// Candidate neighbors are the union of the rated-by sets of everything the
    /// entity liked. A union with a single member can only be the entity
    /// itself, so nothing is written. Existing ranking entries for neighbors
    /// that are not re-derived here are left untouched.
    async fn rescore_neighbors(&self, kind: EntityKind, id: &str) -> Result<usize> {
        let keys = &self.ctx.keys;
        let store = &self.ctx.store;

        let own_key = keys.liked_set(kind, id);
        let rated = store.members(&own_key).await?;
        if rated.is_empty() {
            debug!(entity = ?kind, id = %id, "Nothing liked yet, skipping similarity");
            return Ok(0);
        }

        let rater_keys: Vec<String> = rated
            .iter()
            .map(|rated_id| keys.liked_set(kind.counterpart(), rated_id))
            .collect();
        let candidates = store.union(rater_keys).await?;
        if candidates.len() <= 1 {
            debug!(entity = ?kind, id = %id, "No other candidates share a like");
            return Ok(0);
        }

        let ranking_key = keys.similarity(kind, id);
        let mut scored = 0;
        for other in candidates.iter().filter(|other| other.as_str() != id) {
            let score = self
                .jaccard_between(&own_key, &keys.liked_set(kind, other))
                .await?;
            store.ranked_insert(&ranking_key, score, other).await?;
            scored += 1;
        }

        info!(
            entity = ?kind,
            id = %id,
            candidates = candidates.len(),
            scored = scored,
            "Similarity ranking updated"
        );

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{like_all, memory_context, mock_context};
    use crate::store::{MockSetStore, SetStore, StoreError};

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        let score = jaccard_coefficient(&set(&["i1", "i2", "i3"]), &set(&["i2", "i3"])).unwrap();
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_jaccard_properties() {
        let samples = [
            set(&["a"]),
            set(&["a", "b"]),
            set(&["b", "c", "d"]),
            set(&["x", "y"]),
            set(&[]),
        ];

        for a in &samples {
            for b in &samples {
                if a.is_empty() && b.is_empty() {
                    continue;
                }
                let ab = jaccard_coefficient(a, b).unwrap();
                let ba = jaccard_coefficient(b, a).unwrap();
                assert_eq!(ab, ba);
                assert!((0.0..=1.0).contains(&ab));
                if a.is_disjoint(b) {
                    assert_eq!(ab, 0.0);
                }
            }
            if !a.is_empty() {
                assert_eq!(jaccard_coefficient(a, a).unwrap(), 1.0);
            }
        }
    }

    #[test]
    fn test_jaccard_empty_union_is_undefined() {
        let empty: HashSet<String> = HashSet::new();
        assert!(matches!(
            jaccard_coefficient(&empty, &empty),
            Err(AppError::UndefinedSimilarity(_))
        ));
        assert!(matches!(
            jaccard_from_counts(3, 1, 1),
            Err(AppError::UndefinedSimilarity(_))
        ));
    }

    #[tokio::test]
    async fn test_user_similarity_scores_overlapping_users() {
        let (ctx, store) = memory_context("movies");
        like_all(&ctx, "u1", &["i1", "i2", "i3"]).await;
        like_all(&ctx, "u2", &["i2", "i3"]).await;
        like_all(&ctx, "u3", &["i9"]).await;

        let engine = SimilarityEngine::new(ctx.clone());
        assert_eq!(engine.update_user_similarity("u1").await.unwrap(), 1);

        let ranking = store
            .ranked_range_descending(&ctx.keys.user_similarity("u1"), 0, 10)
            .await
            .unwrap();
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].0, "u2");
        assert!((ranking[0].1 - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_user_without_likes_is_noop() {
        let (ctx, store) = memory_context("movies");
        like_all(&ctx, "u2", &["i1"]).await;

        let engine = SimilarityEngine::new(ctx.clone());
        assert_eq!(engine.update_user_similarity("u1").await.unwrap(), 0);
        assert!(!store
            .exists(&ctx.keys.user_similarity("u1"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_self_only_candidate_writes_nothing() {
        let (ctx, store) = memory_context("movies");
        like_all(&ctx, "u1", &["i1"]).await;

        let engine = SimilarityEngine::new(ctx.clone());
        assert_eq!(engine.update_user_similarity("u1").await.unwrap(), 0);
        assert_eq!(engine.update_item_similarity("i1").await.unwrap(), 0);
        assert!(!store.exists(&ctx.keys.user_similarity("u1")).await.unwrap());
        assert!(!store.exists(&ctx.keys.item_similarity("i1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_item_similarity_scores_co_liked_items() {
        let (ctx, store) = memory_context("movies");
        like_all(&ctx, "u1", &["i1"]).await;
        like_all(&ctx, "u2", &["i1", "i2"]).await;
        like_all(&ctx, "u3", &["i2"]).await;

        let engine = SimilarityEngine::new(ctx.clone());
        assert_eq!(engine.update_item_similarity("i1").await.unwrap(), 1);

        let score = store
            .ranked_score(&ctx.keys.item_similarity("i1"), "i2")
            .await
            .unwrap()
            .unwrap();
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            store
                .ranked_score(&ctx.keys.item_similarity("i1"), "i1")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_stale_neighbors_are_kept() {
        let (ctx, store) = memory_context("movies");
        like_all(&ctx, "u1", &["i1"]).await;
        let ranking_key = ctx.keys.user_similarity("u1");
        store.ranked_insert(&ranking_key, 0.4, "ghost").await.unwrap();

        like_all(&ctx, "u2", &["i1"]).await;
        let engine = SimilarityEngine::new(ctx.clone());
        engine.update_user_similarity("u1").await.unwrap();

        assert_eq!(store.ranked_score(&ranking_key, "ghost").await.unwrap(), Some(0.4));
        assert_eq!(store.ranked_score(&ranking_key, "u2").await.unwrap(), Some(1.0));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut mock = MockSetStore::new();
        mock.expect_members()
            .returning(|_| Err(StoreError::Backend("connection reset".to_string())));

        let engine = SimilarityEngine::new(mock_context("movies", mock));
        let err = engine.update_user_similarity("u1").await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(StoreError::Backend(_))));
    }
}
