#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use sqlx::types::Json;
use survey2earn::{
    config::Config,
    db::MemoryStore,
    dtos::responsedtos::SubmitAnswerDto,
    models::{
        responsemodel::AnswerValue,
        rewardmodel::RewardPool,
        surveymodel::{Question, QuestionType, Survey, SurveyStatus},
        usermodel::User,
    },
    service::response_service::ResponseService,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_maxage: 60,
        port: 0,
        db_max_connections: 1,
        allowed_origins: vec!["http://localhost:3000".to_string()],
    }
}

pub fn setup() -> (Arc<MemoryStore>, ResponseService<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = ResponseService::new(Arc::clone(&store));
    (store, service)
}

pub async fn seed_user(store: &MemoryStore) -> User {
    let wallet = format!("0x{}", Uuid::new_v4().simple());
    store.insert_user(User::new(wallet)).await
}

pub fn question(survey_id: Uuid, question_type: QuestionType, required: bool, position: i32) -> Question {
    Question {
        id: Uuid::new_v4(),
        survey_id,
        question_type,
        text: format!("Question {}", position),
        required,
        position,
        min_length: None,
        max_length: None,
        min_value: None,
        max_value: None,
        options: Json(Vec::new()),
    }
}

/// Survey builder with `n` required text questions, published and open.
pub struct SurveySpec {
    pub questions: usize,
    pub reward_per_response: f64,
    pub max_responses: i32,
    pub estimated_minutes: i32,
    pub require_login: bool,
    pub allow_multiple: bool,
    pub status: SurveyStatus,
}

impl Default for SurveySpec {
    fn default() -> Self {
        SurveySpec {
            questions: 3,
            reward_per_response: 50.0,
            max_responses: 100,
            estimated_minutes: 3,
            require_login: true,
            allow_multiple: false,
            status: SurveyStatus::Published,
        }
    }
}

impl SurveySpec {
    pub fn build(&self, creator_id: Uuid) -> Survey {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Survey {
            id,
            creator_id,
            title: "Morning routines".to_string(),
            status: self.status,
            reward_per_response: self.reward_per_response,
            max_responses: self.max_responses,
            response_count: 0,
            estimated_duration: self.estimated_minutes,
            start_date: None,
            end_date: None,
            require_login: self.require_login,
            allow_multiple: self.allow_multiple,
            created_at: now,
            updated_at: now,
            questions: (1..=self.questions)
                .map(|i| question(id, QuestionType::Text, true, i as i32))
                .collect(),
        }
    }
}

/// Insert the survey and a pool funded for every allowed response.
pub async fn seed_survey(store: &MemoryStore, creator_id: Uuid, spec: SurveySpec) -> (Survey, RewardPool) {
    let survey = store.insert_survey(spec.build(creator_id)).await;
    let pool = RewardPool::new(
        survey.id,
        survey.total_reward_pool(),
        survey.reward_per_response,
        survey.max_responses,
        Utc::now(),
    );
    let pool = store.insert_pool(pool).await;
    (survey, pool)
}

/// Insert the survey with a pool holding only `total` funds.
pub async fn seed_survey_with_pool(
    store: &MemoryStore,
    creator_id: Uuid,
    spec: SurveySpec,
    total: f64,
) -> (Survey, RewardPool) {
    let survey = store.insert_survey(spec.build(creator_id)).await;
    let pool = RewardPool::new(
        survey.id,
        total,
        survey.reward_per_response,
        survey.max_responses,
        Utc::now(),
    );
    let pool = store.insert_pool(pool).await;
    (survey, pool)
}

pub fn text_answer(question_id: Uuid, text: &str) -> SubmitAnswerDto {
    SubmitAnswerDto {
        question_id,
        answer: Some(AnswerValue::Text(text.to_string())),
        time_spent: 20,
        is_skipped: false,
    }
}

pub fn skipped_answer(question_id: Uuid) -> SubmitAnswerDto {
    SubmitAnswerDto {
        question_id,
        answer: None,
        time_spent: 1,
        is_skipped: true,
    }
}

pub fn answer_all(survey: &Survey) -> Vec<SubmitAnswerDto> {
    survey
        .questions
        .iter()
        .map(|q| text_answer(q.id, "Usually a walk and coffee"))
        .collect()
}
