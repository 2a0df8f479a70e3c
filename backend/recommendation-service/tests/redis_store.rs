use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use recommendation_service::models::PreferenceKind;
use recommendation_service::{EngineSettings, RecommenderService, RedisSetStore, SetStore};
use redis_utils::RedisPool;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_redis_store_end_to_end() {
    let pool = RedisPool::connect(&redis_url()).await.unwrap();
    let store = Arc::new(RedisSetStore::new(pool.manager(), Duration::from_secs(3)));

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let settings = EngineSettings {
        key_prefix: format!("rectest{}", nanos),
        max_neighbors: 10,
    };
    let service = RecommenderService::new(store.clone(), settings);

    for (user, item) in [("u1", "i1"), ("u1", "i2"), ("u2", "i1"), ("u2", "i3")] {
        service
            .record_preference("movies", user, item, PreferenceKind::Like)
            .await
            .unwrap();
    }
    service.recompute("movies", Some("u1"), None).await.unwrap();

    let recommended = service.recommendations("movies", "u1", 10).await.unwrap();
    assert_eq!(recommended.len(), 1);
    assert_eq!(recommended[0].id, "i3");

    let keys = service.context("movies").unwrap().keys;
    assert!(!store.exists(&keys.user_temp("u1")).await.unwrap());

    let mut created = vec![
        keys.most_liked(),
        keys.all_users(),
        keys.user_similarity("u1"),
        keys.recommended_item("u1"),
    ];
    for user in ["u1", "u2"] {
        created.push(keys.user_liked(user));
    }
    for item in ["i1", "i2", "i3"] {
        created.push(keys.item_liked(item));
        created.push(keys.item_similarity(item));
    }
    for key in created {
        store.delete(&key).await.unwrap();
    }
}
