mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::*;
use serde_json::{json, Value};
use survey2earn::{
    db::{MemoryStore, Store},
    models::usermodel::User,
    routes::create_router,
    utils::token::create_token,
    AppState,
};
use tower::ServiceExt;

fn app(store: &Arc<MemoryStore>) -> Router {
    let db_client: Arc<dyn Store> = store.clone();
    create_router(Arc::new(AppState::new(test_config(), db_client)))
}

fn bearer(user: &User) -> String {
    let token = create_token(&user.id.to_string(), JWT_SECRET.as_bytes(), 60).unwrap();
    format!("Bearer {}", token)
}

fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_is_public() {
    let store = Arc::new(MemoryStore::new());

    let response = app(&store)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "ok");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let store = Arc::new(MemoryStore::new());

    let response = app(&store)
        .oneshot(
            Request::builder()
                .uri("/api/responses")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["status"], "fail");
}

#[tokio::test]
async fn token_for_unknown_user_is_unauthorized() {
    let store = Arc::new(MemoryStore::new());
    let ghost = User::new("0x00000000000000000000000000000000000000aa");

    let response = app(&store)
        .oneshot(
            Request::builder()
                .uri("/api/responses")
                .header(header::AUTHORIZATION, bearer(&ghost))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn start_then_complete_over_http() {
    let store = Arc::new(MemoryStore::new());
    let creator = seed_user(&store).await;
    let user = seed_user(&store).await;
    let (survey, _) = seed_survey(&store, creator.id, SurveySpec::default()).await;
    let auth = bearer(&user);

    let response = app(&store)
        .oneshot(json_request(
            "POST",
            "/api/responses/start",
            Some(auth.as_str()),
            json!({ "survey_id": survey.id, "language": "fr" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["time_left"], 180);
    let response_id = body["data"]["response_id"].as_str().unwrap().to_string();

    let answers: Vec<Value> = survey
        .questions
        .iter()
        .map(|q| {
            json!({
                "question_id": q.id,
                "answer": { "type": "text", "value": "A long walk" },
                "time_spent": 30
            })
        })
        .collect();

    let response = app(&store)
        .oneshot(json_request(
            "POST",
            "/api/responses/complete",
            Some(auth.as_str()),
            json!({ "response_id": response_id, "answers": answers, "duration": 180 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["reward_earned"], 50.0);
    assert_eq!(body["data"]["xp_earned"], 30);

    let response = app(&store)
        .oneshot(
            Request::builder()
                .uri(format!("/api/responses/{}/progress", response_id))
                .header(header::AUTHORIZATION, auth.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["data"]["progress"], 100.0);
}

#[tokio::test]
async fn negative_duration_is_a_bad_request() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store).await;

    let response = app(&store)
        .oneshot(json_request(
            "POST",
            "/api/responses/complete",
            Some(bearer(&user).as_str()),
            json!({ "response_id": uuid::Uuid::new_v4(), "duration": -5 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn another_users_response_is_forbidden() {
    let store = Arc::new(MemoryStore::new());
    let creator = seed_user(&store).await;
    let owner = seed_user(&store).await;
    let intruder = seed_user(&store).await;
    let (survey, _) = seed_survey(&store, creator.id, SurveySpec::default()).await;

    let response = app(&store)
        .oneshot(json_request(
            "POST",
            "/api/responses/start",
            Some(bearer(&owner).as_str()),
            json!({ "survey_id": survey.id }),
        ))
        .await
        .unwrap();
    let body = read_json(response).await;
    let response_id = body["data"]["response_id"].as_str().unwrap().to_string();

    let response = app(&store)
        .oneshot(
            Request::builder()
                .uri(format!("/api/responses/{}", response_id))
                .header(header::AUTHORIZATION, bearer(&intruder))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn publishing_someone_elses_survey_is_forbidden() {
    let store = Arc::new(MemoryStore::new());
    let creator = seed_user(&store).await;
    let stranger = seed_user(&store).await;
    let spec = SurveySpec {
        status: survey2earn::models::surveymodel::SurveyStatus::Draft,
        ..SurveySpec::default()
    };
    let draft = store.insert_survey(spec.build(creator.id)).await;

    let response = app(&store)
        .oneshot(json_request(
            "POST",
            &format!("/api/surveys/{}/publish", draft.id),
            Some(bearer(&stranger).as_str()),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app(&store)
        .oneshot(json_request(
            "POST",
            &format!("/api/surveys/{}/publish", draft.id),
            Some(bearer(&creator).as_str()),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["status"], "published");
    assert_eq!(body["data"]["reward_pool"]["total_amount"], 5000.0);
}
