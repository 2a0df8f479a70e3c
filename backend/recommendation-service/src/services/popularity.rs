//! Like/dislike confidence ranking of items.

use tracing::{debug, instrument};

use super::CollectionContext;
use crate::error::Result;

/// z for a 95% confidence interval.
const Z_95: f64 = 1.96;

/// Lower bound of the Wilson score interval for `likes` positive votes out of
/// `likes + dislikes`. `None` when the item has no votes.
pub fn wilson_lower_bound(likes: usize, dislikes: usize) -> Option<f64> {
    let n = (likes + dislikes) as f64;
    if n == 0.0 {
        return None;
    }

    let p = likes as f64 / n;
    let z2 = Z_95 * Z_95;
    let centre = p + z2 / (2.0 * n);
    let margin = Z_95 * ((p * (1.0 - p) + z2 / (4.0 * n)) / n).sqrt();

    Some(((centre - margin) / (1.0 + z2 / n)).max(0.0))
}

/// Maintains the collection's Wilson score ranking from the per-item liked and
/// disliked sets.
pub struct PopularityRanker {
    ctx: CollectionContext,
}

impl PopularityRanker {
    pub fn new(ctx: CollectionContext) -> Self {
        Self { ctx }
    }

    /// Rescores one item. Items nobody rated are left out of the ranking.
    #[instrument(skip(self), fields(collection = %self.ctx.keys.collection()))]
    pub async fn update_wilson_score(&self, item_id: &str) -> Result<Option<f64>> {
        let keys = &self.ctx.keys;
        let store = &self.ctx.store;

        let likes = store.cardinality(&keys.item_liked(item_id)).await?;
        let dislikes = store.cardinality(&keys.item_disliked(item_id)).await?;

        let Some(score) = wilson_lower_bound(likes, dislikes) else {
            debug!(item_id = %item_id, "No votes, skipping Wilson score");
            return Ok(None);
        };

        store
            .ranked_insert(&keys.wilson_score(), score, item_id)
            .await?;
        debug!(
            item_id = %item_id,
            likes = likes,
            dislikes = dislikes,
            score = score,
            "Wilson score updated"
        );

        Ok(Some(score))
    }
}
