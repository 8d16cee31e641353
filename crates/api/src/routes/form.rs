//! HTML Form Routes

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::Html,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::render::{render_page, PageOutcome};
use crate::service::{PredictError, TRY_AGAIN_MESSAGE};
use crate::AppState;

/// Blank form
pub async fn show_form() -> Html<String> {
    Html(render_page(&HashMap::new(), &PageOutcome::Empty))
}

/// Form submission; re-renders the form with the result or every error
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> (StatusCode, Html<String>) {
    let (status, outcome) = match state.service.predict(&fields).await {
        Ok(outcome) => (StatusCode::OK, PageOutcome::Prediction(outcome.category)),
        Err(PredictError::Validation(e)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            PageOutcome::Invalid(e.errors().to_vec()),
        ),
        Err(PredictError::PredictorUnavailable(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            PageOutcome::Failed(TRY_AGAIN_MESSAGE),
        ),
        Err(PredictError::Unexpected(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            PageOutcome::Failed(TRY_AGAIN_MESSAGE),
        ),
    };

    (status, Html(render_page(&fields, &outcome)))
}
