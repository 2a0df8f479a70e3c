use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Recompute stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Similarity,
    Recommendation,
    ItemSimilarity,
    WilsonScore,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Similarity => "similarity",
            Stage::Recommendation => "recommendation",
            Stage::ItemSimilarity => "item_similarity",
            Stage::WilsonScore => "wilson_score",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Undefined similarity: {0}")]
    UndefinedSimilarity(String),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<AppError>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AppError {
    /// Attributes an error to a recompute stage. Already-staged errors keep
    /// their original stage.
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            staged @ AppError::Stage { .. } => staged,
            other => AppError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            AppError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The error with any stage wrapper removed.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_store_failure(&self) -> bool {
        matches!(self.root(), AppError::StoreUnavailable(_))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        HttpResponse::build(code).json(ErrorResponse {
            error: self.to_string(),
            code: code.as_u16(),
            stage: self.stage(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self.root() {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_stage_keeps_first_stage() {
        let err = AppError::InvalidInput("x".to_string())
            .at_stage(Stage::Similarity)
            .at_stage(Stage::ItemSimilarity);

        assert_eq!(err.stage(), Some(Stage::Similarity));
        assert!(matches!(err.root(), AppError::InvalidInput(_)));
    }

    #[test]
    fn test_status_codes_follow_root_cause() {
        let store = AppError::from(StoreError::Backend("down".to_string()))
            .at_stage(Stage::Recommendation);
        assert_eq!(store.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(store.is_store_failure());

        let invalid = AppError::InvalidInput("empty collection".to_string());
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let undefined = AppError::UndefinedSimilarity("empty union".to_string());
        assert_eq!(undefined.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_stage_display() {
        let err = AppError::from(StoreError::Timeout).at_stage(Stage::ItemSimilarity);
        assert!(err.to_string().starts_with("item_similarity stage failed"));
    }
}
