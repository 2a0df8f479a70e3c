//! HTTP endpoints over [`RecommenderService`](crate::services::RecommenderService).

pub mod preferences;
pub mod rankings;

pub use preferences::{record_preference, recompute, PreferenceRequest, RecomputeRequest};
pub use rankings::{
    most_disliked, most_liked, recommendations, similar_items, similar_users, top_rated,
    LimitQuery,
};

use actix_web::{web, HttpResponse};

/// Registers every collection route under `/api/v1/collections/{collection}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health)).service(
        web::scope("/api/v1/collections/{collection}")
            .route("/preferences", web::post().to(record_preference))
            .route("/recompute", web::post().to(recompute))
            .route(
                "/users/{user_id}/recommendations",
                web::get().to(recommendations),
            )
            .route("/users/{user_id}/similar", web::get().to(similar_users))
            .route("/items/{item_id}/similar", web::get().to(similar_items))
            .route("/rankings/most-liked", web::get().to(most_liked))
            .route("/rankings/most-disliked", web::get().to(most_disliked))
            .route("/rankings/top-rated", web::get().to(top_rated)),
    );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}
