//! Recompute pipeline: user similarity, then recommendations, then the
//! similarity and Wilson score of the items the user touched.
//!
//! The first two stages are hard gates. Item refreshes are best-effort when
//! they run over every item a user likes, and a hard gate when a single item
//! is named.

use tracing::{info, instrument, warn};

use super::popularity::PopularityRanker;
use super::recommendation::RecommendationEngine;
use super::similarity::SimilarityEngine;
use super::CollectionContext;
use crate::error::{AppError, Result, Stage};
use crate::models::{ItemSimilarityOutcome, UserUpdateReport};

pub struct UpdateOrchestrator {
    ctx: CollectionContext,
    similarity: SimilarityEngine,
    recommendation: RecommendationEngine,
    popularity: PopularityRanker,
}

impl UpdateOrchestrator {
    pub fn new(ctx: CollectionContext) -> Self {
        Self {
            similarity: SimilarityEngine::new(ctx.clone()),
            recommendation: RecommendationEngine::new(ctx.clone()),
            popularity: PopularityRanker::new(ctx.clone()),
            ctx,
        }
    }

    /// Recomputes everything derived from `user_id`'s preferences.
    ///
    /// With `item_id`, only that item is refreshed after the user stages;
    /// without it, every item the user likes is refreshed and per-item
    /// failures are reported instead of aborting.
    #[instrument(skip(self), fields(collection = %self.ctx.keys.collection()))]
    pub async fn update_data(&self, user_id: &str, item_id: Option<&str>) -> Result<UserUpdateReport> {
        if user_id.is_empty() {
            return Err(AppError::InvalidInput("user_id must not be empty".to_string()));
        }

        let neighbors_scored = self
            .similarity
            .update_user_similarity(user_id)
            .await
            .map_err(|err| err.at_stage(Stage::Similarity))?;

        let candidates_scored = self
            .recommendation
            .update_recommendation_for(user_id)
            .await
            .map_err(|err| err.at_stage(Stage::Recommendation))?;

        let item_outcomes = match item_id {
            Some(item_id) => vec![self.update_item(item_id).await?],
            None => self.refresh_liked_items(user_id).await?,
        };

        let report = UserUpdateReport {
            user_id: user_id.to_string(),
            neighbors_scored,
            candidates_scored,
            item_outcomes,
        };

        info!(
            user_id = %user_id,
            neighbors = report.neighbors_scored,
            candidates = report.candidates_scored,
            failed_items = report.failed_items().count(),
            "User data updated"
        );

        Ok(report)
    }

    /// Runs [`update_data`](Self::update_data) for every known user, stopping at
    /// the first user that fails.
    #[instrument(skip(self), fields(collection = %self.ctx.keys.collection()))]
    pub async fn update_all_data(&self) -> Result<Vec<UserUpdateReport>> {
        let users = self.ctx.store.members(&self.ctx.keys.all_users()).await?;

        let mut reports = Vec::with_capacity(users.len());
        for user_id in &users {
            reports.push(self.update_data(user_id, None).await?);
        }

        info!(users = reports.len(), "All user data updated");
        Ok(reports)
    }

    /// Refreshes one item's similarity ranking, then its Wilson score.
    pub async fn update_item(&self, item_id: &str) -> Result<ItemSimilarityOutcome> {
        if item_id.is_empty() {
            return Err(AppError::InvalidInput("item_id must not be empty".to_string())
                .at_stage(Stage::ItemSimilarity));
        }

        let neighbors = self
            .similarity
            .update_item_similarity(item_id)
            .await
            .map_err(|err| err.at_stage(Stage::ItemSimilarity))?;
        let wilson_score = self
            .popularity
            .update_wilson_score(item_id)
            .await
            .map_err(|err| err.at_stage(Stage::WilsonScore))?;

        Ok(ItemSimilarityOutcome::updated(item_id, neighbors, wilson_score))
    }

    async fn refresh_liked_items(&self, user_id: &str) -> Result<Vec<ItemSimilarityOutcome>> {
        let liked = self
            .ctx
            .store
            .members(&self.ctx.keys.user_liked(user_id))
            .await
            .map_err(|err| AppError::from(err).at_stage(Stage::ItemSimilarity))?;

        let mut outcomes = Vec::with_capacity(liked.len());
        for item_id in &liked {
            match self.update_item(item_id).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    warn!(
                        user_id = %user_id,
                        item_id = %item_id,
                        error = %err,
                        "Item similarity update failed, continuing"
                    );
                    outcomes.push(ItemSimilarityOutcome::failed(item_id, err.to_string()));
                }
            }
        }

        Ok(outcomes)
    }
}
