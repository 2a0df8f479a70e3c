use crate::error::{AppError, Result};

pub const DEFAULT_KEY_PREFIX: &str = "recommender";

const SEPARATOR: char = ':';

/// Side of the user/item adjacency an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Item,
}

impl EntityKind {
    pub fn counterpart(self) -> Self {
        match self {
            EntityKind::User => EntityKind::Item,
            EntityKind::Item => EntityKind::User,
        }
    }
}

/// Key layout of one collection.
///
/// Per-entity keys are `{prefix}:{collection}:{kind}:{id}`, collection-wide
/// keys are `{prefix}:{collection}:{kind}`. Prefix and collection never contain
/// the separator, so the id is always the trailing segment and keys of
/// different kinds or collections cannot collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNamespace {
    collection: String,
    base: String,
}

impl CollectionNamespace {
    pub fn new(prefix: &str, collection: &str) -> Result<Self> {
        if collection.is_empty() {
            return Err(AppError::InvalidInput(
                "collection name must not be empty".to_string(),
            ));
        }
        if collection.contains(SEPARATOR) {
            return Err(AppError::InvalidInput(format!(
                "collection name '{}' must not contain '{}'",
                collection, SEPARATOR
            )));
        }
        if prefix.is_empty() || prefix.contains(SEPARATOR) {
            return Err(AppError::Configuration(format!(
                "invalid key prefix '{}'",
                prefix
            )));
        }

        Ok(Self {
            collection: collection.to_string(),
            base: format!("{}{}{}", prefix, SEPARATOR, collection),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn entity_key(&self, kind: &str, id: &str) -> String {
        format!("{}{sep}{}{sep}{}", self.base, kind, id, sep = SEPARATOR)
    }

    fn collection_key(&self, kind: &str) -> String {
        format!("{}{}{}", self.base, SEPARATOR, kind)
    }

    pub fn user_liked(&self, user_id: &str) -> String {
        self.entity_key("user_liked", user_id)
    }

    pub fn user_disliked(&self, user_id: &str) -> String {
        self.entity_key("user_disliked", user_id)
    }

    pub fn item_liked(&self, item_id: &str) -> String {
        self.entity_key("item_liked", item_id)
    }

    pub fn item_disliked(&self, item_id: &str) -> String {
        self.entity_key("item_disliked", item_id)
    }

    pub fn user_similarity(&self, user_id: &str) -> String {
        self.entity_key("user_similarity", user_id)
    }

    pub fn item_similarity(&self, item_id: &str) -> String {
        self.entity_key("item_similarity", item_id)
    }

    /// Scratch set used while recomputing a user's recommendations.
    pub fn user_temp(&self, user_id: &str) -> String {
        self.entity_key("user_temp", user_id)
    }

    pub fn recommended_item(&self, user_id: &str) -> String {
        self.entity_key("recommended_item", user_id)
    }

    pub fn most_liked(&self) -> String {
        self.collection_key("most_liked")
    }

    pub fn most_disliked(&self) -> String {
        self.collection_key("most_disliked")
    }

    pub fn all_users(&self) -> String {
        self.collection_key("all_users")
    }

    /// Items ranked by the Wilson lower bound of their like ratio.
    pub fn wilson_score(&self) -> String {
        self.collection_key("wilson_score")
    }

    /// Liked set of a user (items) or of an item (users).
    pub fn liked_set(&self, kind: EntityKind, id: &str) -> String {
        match kind {
            EntityKind::User => self.user_liked(id),
            EntityKind::Item => self.item_liked(id),
        }
    }

    pub fn similarity(&self, kind: EntityKind, id: &str) -> String {
        match kind {
            EntityKind::User => self.user_similarity(id),
            EntityKind::Item => self.item_similarity(id),
        }
    }
}
