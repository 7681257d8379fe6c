use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::responsemodel::{Answer, AnswerValue, ClientMeta, Response, ResponseStatus};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct StartSurveyDto {
    pub survey_id: Uuid,

    #[validate(length(max = 64, message = "Timezone is too long"))]
    pub timezone: Option<String>,

    #[validate(length(min = 2, max = 16, message = "Language must be a locale code"))]
    pub language: Option<String>,
}

impl StartSurveyDto {
    pub fn client_meta(&self, ip_address: Option<String>, user_agent: Option<String>) -> ClientMeta {
        ClientMeta {
            ip_address,
            user_agent,
            timezone: self.timezone.clone(),
            language: self.language.clone(),
        }
    }
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerDto {
    pub question_id: Uuid,

    pub answer: Option<AnswerValue>,

    #[validate(range(min = 0, message = "Time spent cannot be negative"))]
    #[serde(default)]
    pub time_spent: i32,

    #[serde(default)]
    pub is_skipped: bool,
}

impl SubmitAnswerDto {
    pub fn into_answer(self, response_id: Uuid, now: DateTime<Utc>) -> Answer {
        Answer::new(
            response_id,
            self.question_id,
            self.answer,
            self.time_spent,
            self.is_skipped,
            now,
        )
    }
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswersDto {
    #[validate(length(min = 1, message = "At least one answer is required"))]
    pub answers: Vec<SubmitAnswerDto>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAnswerDto {
    pub answer: Option<AnswerValue>,

    #[validate(range(min = 0, message = "Time spent cannot be negative"))]
    #[serde(default)]
    pub time_spent: i32,

    #[serde(default)]
    pub is_skipped: bool,
}

impl UpdateAnswerDto {
    pub fn for_question(self, question_id: Uuid) -> SubmitAnswerDto {
        SubmitAnswerDto {
            question_id,
            answer: self.answer,
            time_spent: self.time_spent,
            is_skipped: self.is_skipped,
        }
    }
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CompleteSurveyDto {
    pub response_id: Uuid,

    #[serde(default)]
    pub answers: Vec<SubmitAnswerDto>,

    /// Client-reported elapsed seconds.
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration: i32,
}

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResponsesQuery {
    pub status: Option<ResponseStatus>,
    pub survey_id: Option<Uuid>,

    #[validate(range(min = 1))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponseDto {
    pub response_id: Uuid,
    pub survey_id: Uuid,
    pub status: ResponseStatus,
    pub started_at: DateTime<Utc>,
    pub time_left: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionDto {
    pub response_id: Uuid,
    pub status: ResponseStatus,
    pub completed_at: DateTime<Utc>,
    pub duration: i32,
    pub quality_score: f64,
    pub reward_earned: f64,
    pub xp_earned: i32,
    pub nft_certificate: Option<String>,
    pub transaction_hash: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressDto {
    pub response_id: Uuid,
    pub survey_id: Uuid,
    pub status: ResponseStatus,
    pub progress: f64,
    pub questions_total: usize,
    pub questions_answered: usize,
    pub time_spent: i64,
    pub time_left: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub last_answered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerDto {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer: Option<AnswerValue>,
    pub answer_text: String,
    pub time_spent: i32,
    pub is_skipped: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnswerDto {
    pub fn from_answer(answer: &Answer) -> Self {
        AnswerDto {
            id: answer.id,
            question_id: answer.question_id,
            answer: answer.value().cloned(),
            answer_text: answer.answer_text.clone(),
            time_spent: answer.time_spent,
            is_skipped: answer.is_skipped,
            created_at: answer.created_at,
            updated_at: answer.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDetailDto {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: ResponseStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration: i32,
    pub quality_score: f64,
    pub is_valid: bool,
    pub answers: Vec<AnswerDto>,
    pub reward_earned: f64,
    pub xp_earned: i32,
    pub nft_certificate: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseItemDto {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub survey_title: String,
    pub status: ResponseStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration: i32,
    pub reward_earned: f64,
    pub xp_earned: i32,
    pub quality_score: f64,
    pub progress: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseListDto {
    pub responses: Vec<ResponseItemDto>,
    pub total: i64,
    pub page: u32,
    pub limit: usize,
    pub total_pages: i64,
}

/// Percentage of questions answered, 0 when the survey has no questions.
pub fn progress_percent(response: &Response, total_questions: usize) -> f64 {
    if total_questions == 0 {
        return 0.0;
    }
    response.answered_count() as f64 / total_questions as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_dto_rejects_negative_duration() {
        let dto = CompleteSurveyDto {
            response_id: Uuid::new_v4(),
            answers: Vec::new(),
            duration: -1,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn submit_answer_parses_tagged_value() {
        let question_id = Uuid::new_v4();
        let json = serde_json::json!({
            "question_id": question_id,
            "answer": {"type": "choice", "value": ["red", "green"]},
            "time_spent": 12
        });

        let dto: SubmitAnswerDto = serde_json::from_value(json).unwrap();
        assert_eq!(dto.question_id, question_id);
        assert!(!dto.is_skipped);
        assert_eq!(
            dto.answer,
            Some(AnswerValue::Choice(vec!["red".to_string(), "green".to_string()]))
        );
    }

    #[test]
    fn empty_batch_is_rejected() {
        let dto = SubmitAnswersDto { answers: Vec::new() };
        assert!(dto.validate().is_err());
    }
}
