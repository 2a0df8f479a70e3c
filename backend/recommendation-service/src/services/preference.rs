use tracing::{debug, instrument};

use super::CollectionContext;
use crate::error::{AppError, Result};
use crate::models::PreferenceKind;

/// Writes like/dislike events into the dual user↔item index.
pub struct PreferenceRecorder {
    ctx: CollectionContext,
}

impl PreferenceRecorder {
    pub fn new(ctx: CollectionContext) -> Self {
        Self { ctx }
    }

    /// Records one preference event.
    ///
    /// The popularity ranking counts distinct raters: it is only incremented
    /// when the user is not yet in the item's rated-by set. Membership writes
    /// always run; they are idempotent. Writes are not transactional, so a
    /// store failure can leave earlier writes in place.
    ///
    /// Returns `true` when the user rated this item (on this side) for the
    /// first time.
    #[instrument(skip(self), fields(collection = %self.ctx.keys.collection()))]
    pub async fn record(&self, user_id: &str, item_id: &str, kind: PreferenceKind) -> Result<bool> {
        if user_id.is_empty() {
            return Err(AppError::InvalidInput("user_id must not be empty".to_string()));
        }
        if item_id.is_empty() {
            return Err(AppError::InvalidInput("item_id must not be empty".to_string()));
        }

        let keys = &self.ctx.keys;
        let (user_set, item_set, popularity) = match kind {
            PreferenceKind::Like => (
                keys.user_liked(user_id),
                keys.item_liked(item_id),
                keys.most_liked(),
            ),
            PreferenceKind::Dislike => (
                keys.user_disliked(user_id),
                keys.item_disliked(item_id),
                keys.most_disliked(),
            ),
        };

        let store = &self.ctx.store;
        let first_rating = !store.is_member(&item_set, user_id).await?;
        if first_rating {
            let count = store.ranked_increment(&popularity, 1.0, item_id).await?;
            debug!(item_id = %item_id, count = count, "Popularity incremented");
        }

        store.add_member(&user_set, item_id).await?;
        store.add_member(&item_set, user_id).await?;
        store.add_member(&keys.all_users(), user_id).await?;

        debug!(
            user_id = %user_id,
            item_id = %item_id,
            kind = kind.as_str(),
            first_rating = first_rating,
            "Preference recorded"
        );

        Ok(first_rating)
    }
}
