use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::services::RecommenderService;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    pub fn resolve(&self) -> Result<usize> {
        match self.limit {
            None => Ok(DEFAULT_LIMIT),
            Some(limit) if (1..=MAX_LIMIT).contains(&limit) => Ok(limit),
            Some(limit) => Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, limit
            ))),
        }
    }
}

pub async fn recommendations(
    service: web::Data<RecommenderService>,
    path: web::Path<(String, String)>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    let (collection, user_id) = path.into_inner();
    let entries = service
        .recommendations(&collection, &user_id, query.resolve()?)
        .await?;
    Ok(HttpResponse::Ok().json(entries))
}

pub async fn similar_users(
    service: web::Data<RecommenderService>,
    path: web::Path<(String, String)>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    let (collection, user_id) = path.into_inner();
    let entries = service
        .similar_users(&collection, &user_id, query.resolve()?)
        .await?;
    Ok(HttpResponse::Ok().json(entries))
}

pub async fn similar_items(
    service: web::Data<RecommenderService>,
    path: web::Path<(String, String)>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    let (collection, item_id) = path.into_inner();
    let entries = service
        .similar_items(&collection, &item_id, query.resolve()?)
        .await?;
    Ok(HttpResponse::Ok().json(entries))
}

pub async fn most_liked(
    service: web::Data<RecommenderService>,
    collection: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    let entries = service.most_liked(&collection, query.resolve()?).await?;
    Ok(HttpResponse::Ok().json(entries))
}

pub async fn most_disliked(
    service: web::Data<RecommenderService>,
    collection: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    let entries = service.most_disliked(&collection, query.resolve()?).await?;
    Ok(HttpResponse::Ok().json(entries))
}

pub async fn top_rated(
    service: web::Data<RecommenderService>,
    collection: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    let entries = service.top_rated(&collection, query.resolve()?).await?;
    Ok(HttpResponse::Ok().json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_and_bounds() {
        assert_eq!(LimitQuery { limit: None }.resolve().unwrap(), DEFAULT_LIMIT);
        assert_eq!(LimitQuery { limit: Some(1) }.resolve().unwrap(), 1);
        assert_eq!(LimitQuery { limit: Some(100) }.resolve().unwrap(), 100);
        assert!(LimitQuery { limit: Some(0) }.resolve().is_err());
        assert!(LimitQuery { limit: Some(101) }.resolve().is_err());
    }
}
