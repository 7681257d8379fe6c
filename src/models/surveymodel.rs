use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::responsemodel::AnswerValue;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "survey_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SurveyStatus {
    Draft,
    Published,
    Paused,
    Completed,
    Cancelled,
}

impl SurveyStatus {
    pub fn to_str(&self) -> &str {
        match self {
            SurveyStatus::Draft => "draft",
            SurveyStatus::Published => "published",
            SurveyStatus::Paused => "paused",
            SurveyStatus::Completed => "completed",
            SurveyStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    SingleChoice,
    MultipleChoice,
    Rating,
    Scale,
    Date,
}

impl QuestionType {
    pub fn is_text(&self) -> bool {
        matches!(self, QuestionType::Text)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, QuestionType::Rating | QuestionType::Scale)
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultipleChoice)
    }

    /// Whether `value` is the kind of answer this question takes.
    pub fn accepts(&self, value: &AnswerValue) -> bool {
        match value {
            AnswerValue::Text(_) => self.is_text(),
            AnswerValue::Choice(_) => self.is_choice(),
            AnswerValue::Rating(_) | AnswerValue::Scale(_) => self.is_numeric(),
            AnswerValue::Date(_) => matches!(self, QuestionType::Date),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuestionOption {
    pub id: String,
    pub label: String,
    pub value: String,
    pub order: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Question {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub question_type: QuestionType,
    pub text: String,
    pub required: bool,
    pub position: i32,
    pub min_length: Option<i32>,
    pub max_length: Option<i32>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub options: Json<Vec<QuestionOption>>,
}

/// A survey together with its ordered questions.
///
/// Once the status leaves `draft` the survey and its questions are frozen;
/// see [`Survey::can_be_edited`].
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Survey {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub status: SurveyStatus,
    pub reward_per_response: f64,
    pub max_responses: i32,
    pub response_count: i32,
    pub estimated_duration: i32, // minutes
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub require_login: bool,
    pub allow_multiple: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[sqlx(skip)]
    pub questions: Vec<Question>,
}

impl Survey {
    /// Published and inside the optional start/end window.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        if self.status != SurveyStatus::Published {
            return false;
        }

        if let Some(start) = self.start_date {
            if now < start {
                return false;
            }
        }

        if let Some(end) = self.end_date {
            if now > end {
                return false;
            }
        }

        true
    }

    pub fn has_capacity(&self) -> bool {
        self.response_count < self.max_responses
    }

    pub fn can_be_edited(&self) -> bool {
        self.status == SurveyStatus::Draft
    }

    pub fn question(&self, question_id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Pool size needed to pay every allowed response at the nominal rate.
    pub fn total_reward_pool(&self) -> f64 {
        self.max_responses as f64 * self.reward_per_response
    }

    /// Estimated duration in seconds, `None` when the creator gave no estimate.
    pub fn estimated_seconds(&self) -> Option<i64> {
        if self.estimated_duration > 0 {
            Some(self.estimated_duration as i64 * 60)
        } else {
            None
        }
    }
}
