//! Save/load endpoints over the in-memory sheet store.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::reply::{self, ContentReply, STATUS_SUCCESS};
use crate::config::AppState;
use crate::http::{self, HttpResponse};
use crate::logger;

pub const SAVED_MESSAGE: &str = "Data saved successfully";
pub const NOT_FOUND_MESSAGE: &str = "Data not found";

/// Body of `POST /save`; unknown extra fields are ignored
#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub id: String,
    pub content: Value,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("failed to read request body: {0}")]
    Body(String),
    #[error("invalid save request: {0}")]
    Json(#[from] serde_json::Error),
}

impl SaveError {
    fn into_response(self) -> HttpResponse {
        match self {
            Self::TooLarge { .. } => http::build_413_response(),
            other => reply::error(StatusCode::BAD_REQUEST, &other.to_string()),
        }
    }
}

/// Read at most `limit` bytes of `body` and decode it as a `SaveRequest`
pub async fn parse_save_request<B>(body: B, limit: u64) -> Result<SaveRequest, SaveError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let max = usize::try_from(limit).unwrap_or(usize::MAX);
    let bytes = match Limited::new(body, max).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(SaveError::TooLarge { limit });
        }
        Err(e) => return Err(SaveError::Body(e.to_string())),
    };

    Ok(serde_json::from_slice(&bytes)?)
}

/// `POST /save`
pub async fn save<B>(body: B, state: &AppState) -> HttpResponse
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let request = match parse_save_request(body, state.config.http.max_body_size).await {
        Ok(r) => r,
        Err(e) => {
            logger::log_warning(&format!("Rejected save: {e}"));
            return e.into_response();
        }
    };

    let replaced = state.store.save(request.id.clone(), request.content).await;
    logger::log_sheet_saved(&request.id, replaced.is_some());
    reply::success(SAVED_MESSAGE)
}

/// `GET /load/{sheetId}`
pub async fn load(sheet_id: &str, state: &AppState) -> HttpResponse {
    match state.store.load(sheet_id).await {
        Some(content) => http::build_json_response(
            StatusCode::OK,
            &ContentReply {
                status: STATUS_SUCCESS,
                content: &content,
            },
        ),
        None => reply::error(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
    }
}
