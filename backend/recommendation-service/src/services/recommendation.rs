use tracing::{debug, info, instrument, warn};

use super::CollectionContext;
use crate::error::{AppError, Result};

/// Scores items liked by a user's nearest neighbors.
pub struct RecommendationEngine {
    ctx: CollectionContext,
}

impl RecommendationEngine {
    pub fn new(ctx: CollectionContext) -> Self {
        Self { ctx }
    }

    /// Rebuilds the recommendation ranking of `user_id` from its top neighbors.
    ///
    /// Candidates are the items liked by the `max_neighbors` most similar users
    /// minus the items the user already likes. The per-user scratch set used
    /// for the union is deleted before returning, whether or not the pass
    /// succeeded.
    ///
    /// Returns the number of candidates scored.
    #[instrument(skip(self), fields(collection = %self.ctx.keys.collection()))]
    pub async fn update_recommendation_for(&self, user_id: &str) -> Result<usize> {
        let keys = &self.ctx.keys;
        let store = &self.ctx.store;

        let neighbors = store
            .ranked_range_descending(&keys.user_similarity(user_id), 0, self.ctx.max_neighbors)
            .await?;
        if neighbors.is_empty() {
            debug!(user_id = %user_id, "No neighbors, skipping recommendations");
            return Ok(0);
        }

        let scratch_key = keys.user_temp(user_id);
        let pass = self.score_candidates(user_id, &scratch_key, &neighbors).await;
        let cleanup = store.delete(&scratch_key).await;

        match (pass, cleanup) {
            (Ok(scored), Ok(())) => {
                info!(
                    user_id = %user_id,
                    neighbors = neighbors.len(),
                    scored = scored,
                    "Recommendations updated"
                );
                Ok(scored)
            }
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup_err)) => {
                warn!(
                    user_id = %user_id,
                    error = %cleanup_err,
                    "Failed to delete scratch set after failed recommendation pass"
                );
                Err(err)
            }
        }
    }

    async fn score_candidates(
        &self,
        user_id: &str,
        scratch_key: &str,
        neighbors: &[(String, f64)],
    ) -> Result<usize> {
        let keys = &self.ctx.keys;
        let store = &self.ctx.store;

        let neighbor_sets: Vec<String> = neighbors
            .iter()
            .map(|(neighbor_id, _)| keys.user_liked(neighbor_id))
            .collect();
        store.union_store_into(scratch_key, neighbor_sets).await?;

        let liked_key = keys.user_liked(user_id);
        let candidates = store.difference(scratch_key, &liked_key).await?;

        let ranking_key = keys.recommended_item(user_id);
        for item_id in &candidates {
            let score = self.predict_for(user_id, item_id).await?;
            store.ranked_insert(&ranking_key, score, item_id).await?;
        }

        // Items liked since an earlier pass must not stay recommended.
        let liked = store.members(&liked_key).await?;
        store.ranked_remove(&ranking_key, liked).await?;

        Ok(candidates.len())
    }

    /// Similarity-weighted share of the item's likers that resemble `user_id`.
    ///
    /// Sums the user's similarity to each liker of the item (unknown likers
    /// count as 0) and divides by the number of likers.
    pub async fn predict_for(&self, user_id: &str, item_id: &str) -> Result<f64> {
        let keys = &self.ctx.keys;
        let store = &self.ctx.store;

        let likers = store.members(&keys.item_liked(item_id)).await?;
        if likers.is_empty() {
            return Err(AppError::UndefinedSimilarity(format!(
                "item {} has no likes to predict from",
                item_id
            )));
        }

        let similarity_key = keys.user_similarity(user_id);
        let mut similarity_sum = 0.0;
        for liker in &likers {
            if let Some(score) = store.ranked_score(&similarity_key, liker).await? {
                similarity_sum += score;
            }
        }

        Ok(similarity_sum / likers.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::similarity::SimilarityEngine;
    use crate::services::test_support::{like_all, memory_context, mock_context};
    use crate::store::{MockSetStore, SetStore, StoreError};

    #[tokio::test]
    async fn test_recommends_items_liked_by_neighbors() {
        let (ctx, store) = memory_context("movies");
        like_all(&ctx, "u1", &["i1", "i2"]).await;
        like_all(&ctx, "u2", &["i1", "i2", "i3"]).await;
        like_all(&ctx, "u3", &["i2", "i4"]).await;

        SimilarityEngine::new(ctx.clone())
            .update_user_similarity("u1")
            .await
            .unwrap();
        let engine = RecommendationEngine::new(ctx.clone());
        assert_eq!(engine.update_recommendation_for("u1").await.unwrap(), 2);

        let ranking = store
            .ranked_range_descending(&ctx.keys.recommended_item("u1"), 0, 10)
            .await
            .unwrap();
        let ids: Vec<&str> = ranking.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["i3", "i4"]);

        // i3: liked by u2 only, sim(u1,u2) = 2/3
        assert!((ranking[0].1 - 2.0 / 3.0).abs() < 1e-9);
        // i4: liked by u3 only, sim(u1,u3) = 1/3
        assert!((ranking[1].1 - 1.0 / 3.0).abs() < 1e-9);

        assert!(!store.exists(&ctx.keys.user_temp("u1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_no_neighbors_is_noop() {
        let (ctx, store) = memory_context("movies");
        like_all(&ctx, "u1", &["i1"]).await;

        let engine = RecommendationEngine::new(ctx.clone());
        assert_eq!(engine.update_recommendation_for("u1").await.unwrap(), 0);
        assert!(!store
            .exists(&ctx.keys.recommended_item("u1"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_liked_items_are_pruned_from_ranking() {
        let (ctx, store) = memory_context("movies");
        like_all(&ctx, "u1", &["i1"]).await;
        like_all(&ctx, "u2", &["i1", "i2"]).await;

        let similarity = SimilarityEngine::new(ctx.clone());
        let engine = RecommendationEngine::new(ctx.clone());
        similarity.update_user_similarity("u1").await.unwrap();
        engine.update_recommendation_for("u1").await.unwrap();

        let ranking_key = ctx.keys.recommended_item("u1");
        assert!(store.ranked_score(&ranking_key, "i2").await.unwrap().is_some());

        like_all(&ctx, "u1", &["i2"]).await;
        similarity.update_user_similarity("u1").await.unwrap();
        engine.update_recommendation_for("u1").await.unwrap();

        assert_eq!(store.ranked_score(&ranking_key, "i2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_predict_for_averages_over_likers() {
        let (ctx, store) = memory_context("movies");
        like_all(&ctx, "u2", &["i1"]).await;
        like_all(&ctx, "u3", &["i1"]).await;
        like_all(&ctx, "u4", &["i1"]).await;
        let similarity_key = ctx.keys.user_similarity("u1");
        store.ranked_insert(&similarity_key, 0.5, "u2").await.unwrap();
        store.ranked_insert(&similarity_key, 0.25, "u3").await.unwrap();

        let engine = RecommendationEngine::new(ctx);
        let score = engine.predict_for("u1", "i1").await.unwrap();
        assert!((score - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_predict_for_item_without_likes_is_undefined() {
        let (ctx, _store) = memory_context("movies");
        let engine = RecommendationEngine::new(ctx);
        assert!(matches!(
            engine.predict_for("u1", "i1").await,
            Err(AppError::UndefinedSimilarity(_))
        ));
    }

    #[tokio::test]
    async fn test_scratch_set_deleted_when_pass_fails() {
        let mut mock = MockSetStore::new();
        mock.expect_ranked_range_descending()
            .times(1)
            .returning(|_, _, _| Ok(vec![("u2".to_string(), 0.5)]));
        mock.expect_union_store_into()
            .times(1)
            .returning(|_, _| Err(StoreError::Timeout));
        mock.expect_delete()
            .withf(|key| key.ends_with(":user_temp:u1"))
            .times(1)
            .returning(|_| Ok(()));

        let engine = RecommendationEngine::new(mock_context("movies", mock));
        let err = engine.update_recommendation_for("u1").await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(StoreError::Timeout)));
    }

    #[tokio::test]
    async fn test_cleanup_failure_after_success_is_reported() {
        let mut mock = MockSetStore::new();
        mock.expect_ranked_range_descending()
            .returning(|_, _, _| Ok(vec![("u2".to_string(), 0.5)]));
        mock.expect_union_store_into().returning(|_, _| Ok(()));
        mock.expect_difference().returning(|_, _| Ok(Vec::new()));
        mock.expect_members().returning(|_| Ok(vec!["i1".to_string()]));
        mock.expect_ranked_remove().returning(|_, _| Ok(()));
        mock.expect_delete()
            .times(1)
            .returning(|_| Err(StoreError::Backend("READONLY".to_string())));

        let engine = RecommendationEngine::new(mock_context("movies", mock));
        let err = engine.update_recommendation_for("u1").await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(StoreError::Backend(_))));
    }
}
