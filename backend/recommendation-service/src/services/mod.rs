//! Collaborative-filtering engine.
//!
//! Every call builds a [`CollectionContext`] (store handle, key namespace,
//! neighbor limit) and hands it to the component that does the work. No
//! component holds global state.

pub mod namespace;
pub mod orchestrator;
pub mod popularity;
pub mod preference;
pub mod recommendation;
pub mod similarity;

pub use namespace::{CollectionNamespace, EntityKind, DEFAULT_KEY_PREFIX};
pub use orchestrator::UpdateOrchestrator;
pub use popularity::{wilson_lower_bound, PopularityRanker};
pub use preference::PreferenceRecorder;
pub use recommendation::RecommendationEngine;
pub use similarity::{jaccard_coefficient, SimilarityEngine};

use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::models::{PreferenceInput, PreferenceKind, RankedEntry, RecomputeOutcome};
use crate::store::SetStore;

pub const DEFAULT_MAX_NEIGHBORS: usize = 10;

/// Engine tuning shared by every collection.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub key_prefix: String,
    pub max_neighbors: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            max_neighbors: DEFAULT_MAX_NEIGHBORS,
        }
    }
}

/// Everything one operation needs to touch a single collection.
#[derive(Clone)]
pub struct CollectionContext {
    pub store: Arc<dyn SetStore>,
    pub keys: CollectionNamespace,
    pub max_neighbors: usize,
}

impl CollectionContext {
    pub fn new(store: Arc<dyn SetStore>, keys: CollectionNamespace, max_neighbors: usize) -> Self {
        Self {
            store,
            keys,
            max_neighbors,
        }
    }
}

/// Caller-facing entry point: ingestion, recompute and ranking reads.
#[derive(Clone)]
pub struct RecommenderService {
    store: Arc<dyn SetStore>,
    settings: EngineSettings,
}

impl RecommenderService {
    pub fn new(store: Arc<dyn SetStore>, settings: EngineSettings) -> Self {
        Self { store, settings }
    }

    pub fn context(&self, collection: &str) -> Result<CollectionContext> {
        let keys = CollectionNamespace::new(&self.settings.key_prefix, collection)?;
        Ok(CollectionContext::new(
            Arc::clone(&self.store),
            keys,
            self.settings.max_neighbors,
        ))
    }

    pub async fn record_preference(
        &self,
        collection: &str,
        user_id: &str,
        item_id: &str,
        kind: PreferenceKind,
    ) -> Result<()> {
        let ctx = self.context(collection)?;
        PreferenceRecorder::new(ctx)
            .record(user_id, item_id, kind)
            .await?;
        Ok(())
    }

    /// Records a rated input; positive rates are likes.
    pub async fn import(&self, input: &PreferenceInput) -> Result<()> {
        self.record_preference(&input.collection, &input.user_id, &input.item_id, input.kind())
            .await
    }

    /// Recomputes derived rankings.
    ///
    /// With a user, runs the full user pipeline (optionally narrowed to one
    /// item). With only an item, refreshes that item's similarity ranking and
    /// Wilson score.
    /// With neither, recomputes every known user. Empty ids count as absent.
    #[instrument(skip(self))]
    pub async fn recompute(
        &self,
        collection: &str,
        user_id: Option<&str>,
        item_id: Option<&str>,
    ) -> Result<RecomputeOutcome> {
        let ctx = self.context(collection)?;
        let orchestrator = UpdateOrchestrator::new(ctx);

        let user_id = user_id.filter(|id| !id.is_empty());
        let item_id = item_id.filter(|id| !id.is_empty());

        let outcome = match (user_id, item_id) {
            (Some(user_id), item_id) => RecomputeOutcome::User {
                report: orchestrator.update_data(user_id, item_id).await?,
            },
            (None, Some(item_id)) => RecomputeOutcome::Item {
                outcome: orchestrator.update_item(item_id).await?,
            },
            (None, None) => RecomputeOutcome::All {
                reports: orchestrator.update_all_data().await?,
            },
        };

        info!(collection = %collection, "Recompute finished");
        Ok(outcome)
    }

    pub async fn recommendations(
        &self,
        collection: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<RankedEntry>> {
        let ctx = self.context(collection)?;
        let key = ctx.keys.recommended_item(require_id("user_id", user_id)?);
        self.top(&key, limit).await
    }

    pub async fn similar_users(
        &self,
        collection: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<RankedEntry>> {
        let ctx = self.context(collection)?;
        let key = ctx.keys.user_similarity(require_id("user_id", user_id)?);
        self.top(&key, limit).await
    }

    pub async fn similar_items(
        &self,
        collection: &str,
        item_id: &str,
        limit: usize,
    ) -> Result<Vec<RankedEntry>> {
        let ctx = self.context(collection)?;
        let key = ctx.keys.item_similarity(require_id("item_id", item_id)?);
        self.top(&key, limit).await
    }

    pub async fn most_liked(&self, collection: &str, limit: usize) -> Result<Vec<RankedEntry>> {
        let ctx = self.context(collection)?;
        self.top(&ctx.keys.most_liked(), limit).await
    }

    pub async fn most_disliked(&self, collection: &str, limit: usize) -> Result<Vec<RankedEntry>> {
        let ctx = self.context(collection)?;
        self.top(&ctx.keys.most_disliked(), limit).await
    }

    /// Items ordered by the Wilson lower bound of their like ratio.
    pub async fn top_rated(&self, collection: &str, limit: usize) -> Result<Vec<RankedEntry>> {
        let ctx = self.context(collection)?;
        self.top(&ctx.keys.wilson_score(), limit).await
    }

    async fn top(&self, key: &str, limit: usize) -> Result<Vec<RankedEntry>> {
        let entries = self.store.ranked_range_descending(key, 0, limit).await?;
        Ok(entries.into_iter().map(RankedEntry::from).collect())
    }
}

fn require_id<'a>(field: &str, id: &'a str) -> Result<&'a str> {
    if id.is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(id)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::store::{MemorySetStore, MockSetStore};

    pub fn memory_context(collection: &str) -> (CollectionContext, Arc<MemorySetStore>) {
        let store = Arc::new(MemorySetStore::new());
        let keys = CollectionNamespace::new(DEFAULT_KEY_PREFIX, collection).unwrap();
        let ctx = CollectionContext::new(store.clone(), keys, DEFAULT_MAX_NEIGHBORS);
        (ctx, store)
    }

    pub fn mock_context(collection: &str, mock: MockSetStore) -> CollectionContext {
        let keys = CollectionNamespace::new(DEFAULT_KEY_PREFIX, collection).unwrap();
        CollectionContext::new(Arc::new(mock), keys, DEFAULT_MAX_NEIGHBORS)
    }

    pub async fn like_all(ctx: &CollectionContext, user_id: &str, items: &[&str]) {
        let recorder = PreferenceRecorder::new(ctx.clone());
        for item_id in items {
            recorder
                .record(user_id, item_id, PreferenceKind::Like)
                .await
                .unwrap();
        }
    }
}
