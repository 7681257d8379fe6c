use std::sync::Arc;

use axum::{extract::Path, response::IntoResponse, routing::post, Extension, Json, Router};
use uuid::Uuid;

use crate::{
    dtos::surveydtos::PublishedSurveyDto, error::HttpError, middleware::JWTAuthMiddeware,
    AppState,
};

pub fn surveys_handler() -> Router {
    Router::new().route("/:id/publish", post(publish_survey))
}

pub async fn publish_survey(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(survey_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let (survey, pool) = app_state
        .response_service
        .publish_survey(auth.user.id, survey_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Survey published",
        "data": PublishedSurveyDto::new(&survey, &pool)
    })))
}
