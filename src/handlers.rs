//! Route handlers.

use crate::app::App;
use crate::error::ApiError;
use crate::models::{SubmissionRecord, SubmitResponse};
use crate::upload::SubmissionForm;
use axum::extract::State;
use axum::Json;
use tracing::info;

pub const SUBMIT_OK: &str = "Data submitted successfully";
pub const SUBMIT_FAILED: &str = "Error saving data";
pub const FETCH_FAILED: &str = "Error fetching data";

/// POST /submit-data
pub async fn submit_data(
    State(app): State<App>,
    SubmissionForm(submission): SubmissionForm,
) -> Result<Json<SubmitResponse>, ApiError> {
    let record = app
        .store
        .insert(submission)
        .await
        .map_err(|e| ApiError::new(SUBMIT_FAILED, e))?;

    info!("Saved submission {}", record.id);

    Ok(Json(SubmitResponse {
        message: SUBMIT_OK.to_string(),
        data: record,
    }))
}

/// GET /fetch-data
pub async fn fetch_data(State(app): State<App>) -> Result<Json<Vec<SubmissionRecord>>, ApiError> {
    let records = app
        .store
        .list()
        .await
        .map_err(|e| ApiError::new(FETCH_FAILED, e))?;

    Ok(Json(records))
}
