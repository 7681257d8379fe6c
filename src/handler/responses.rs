use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::responsedtos::{
        AnswerDto, CompleteSurveyDto, ListResponsesQuery, StartSurveyDto, SubmitAnswerDto,
        SubmitAnswersDto, UpdateAnswerDto,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn responses_handler() -> Router {
    Router::new()
        .route("/", get(list_responses))
        .route("/start", post(start_response))
        .route("/complete", post(complete_response))
        .route("/:id", get(get_response))
        .route("/:id/progress", get(get_progress))
        .route("/:id/answers", post(submit_answers))
        .route("/:id/questions/:question_id", put(update_answer))
        .route("/:id/abandon", post(abandon_response))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// First hop of `x-forwarded-for`, else `x-real-ip`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"))
}

fn validate_answers<'a>(
    answers: impl IntoIterator<Item = &'a SubmitAnswerDto>,
) -> Result<(), HttpError> {
    for answer in answers {
        answer
            .validate()
            .map_err(|e| HttpError::bad_request(e.to_string()))?;
    }
    Ok(())
}

pub async fn start_response(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    headers: HeaderMap,
    Json(body): Json<StartSurveyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let meta = body.client_meta(
        client_ip(&headers),
        header_value(&headers, header::USER_AGENT.as_str()),
    );

    let started = app_state
        .response_service
        .start_response(Some(auth.user.id), body.survey_id, meta)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "message": "Survey started",
            "data": started
        })),
    ))
}

pub async fn submit_answers(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(response_id): Path<Uuid>,
    Json(body): Json<SubmitAnswersDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    validate_answers(&body.answers)?;

    let response = app_state
        .response_service
        .submit_answers(Some(auth.user.id), response_id, body.answers)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Answers submitted",
        "data": {
            "response_id": response.id,
            "questions_answered": response.answered_count()
        }
    })))
}

pub async fn update_answer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path((response_id, question_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateAnswerDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let response = app_state
        .response_service
        .update_answer(Some(auth.user.id), response_id, question_id, body)
        .await?;

    let answer = response.answers.get(&question_id).map(AnswerDto::from_answer);

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Answer updated",
        "data": {
            "answer": answer
        }
    })))
}

pub async fn complete_response(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CompleteSurveyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    validate_answers(&body.answers)?;

    let completion = app_state
        .response_service
        .complete_response(Some(auth.user.id), body)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": completion.message.clone(),
        "data": completion
    })))
}

pub async fn abandon_response(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(response_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_state
        .response_service
        .abandon_response(Some(auth.user.id), response_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Survey abandoned",
        "data": {
            "response_id": response.id,
            "status": response.status,
            "duration": response.duration
        }
    })))
}

pub async fn get_progress(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(response_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let progress = app_state
        .response_service
        .get_progress(Some(auth.user.id), response_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": progress
    })))
}

pub async fn get_response(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(response_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_state
        .response_service
        .get_response(Some(auth.user.id), response_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}

pub async fn list_responses(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<ListResponsesQuery>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let list = app_state
        .response_service
        .list_responses(auth.user.id, query)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": list
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers).as_deref(), Some("198.51.100.2"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
