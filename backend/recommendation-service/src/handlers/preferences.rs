use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::PreferenceInput;
use crate::services::RecommenderService;

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Deserialize)]
pub struct PreferenceRequest {
    pub user_id: String,
    pub item_id: String,
    pub rate: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecomputeRequest {
    pub user_id: Option<String>,
    pub item_id: Option<String>,
}

impl RecomputeRequest {
    /// Parses a recompute body. Only an empty body means "whole collection";
    /// anything else must be a JSON object with known fields.
    pub fn from_body(req: &HttpRequest, body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        if req.content_type() != JSON_CONTENT_TYPE {
            return Err(AppError::InvalidInput(format!(
                "recompute body must be application/json, got '{}'",
                req.content_type()
            )));
        }

        serde_json::from_slice(body)
            .map_err(|e| AppError::InvalidInput(format!("invalid recompute body: {}", e)))
    }
}

/// Record one rating; positive rates are likes.
pub async fn record_preference(
    service: web::Data<RecommenderService>,
    collection: web::Path<String>,
    payload: web::Json<PreferenceRequest>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    let input = PreferenceInput {
        collection: collection.into_inner(),
        user_id: payload.user_id,
        item_id: payload.item_id,
        rate: payload.rate,
    };

    service.import(&input).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Recompute derived rankings for a user, an item, or the whole collection
pub async fn recompute(
    req: HttpRequest,
    service: web::Data<RecommenderService>,
    collection: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let payload = RecomputeRequest::from_body(&req, &body)?;
    let outcome = service
        .recompute(
            &collection,
            payload.user_id.as_deref(),
            payload.item_id.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}
