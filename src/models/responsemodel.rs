use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "response_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Started,
    Completed,
    Abandoned,
}

impl ResponseStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ResponseStatus::Started => "started",
            ResponseStatus::Completed => "completed",
            ResponseStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResponseStatus::Started)
    }
}

/// Typed answer payload, tagged on the wire as `{"type": ..., "value": ...}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    Choice(Vec<String>),
    Rating(i32),
    Scale(i32),
    Date(NaiveDate),
}

impl AnswerValue {
    /// Flat text form used for length checks and the `answer_text` column.
    pub fn extract_text(&self) -> String {
        match self {
            AnswerValue::Text(text) => text.clone(),
            AnswerValue::Choice(options) => options.join(", "),
            AnswerValue::Rating(value) | AnswerValue::Scale(value) => value.to_string(),
            AnswerValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn numeric(&self) -> Option<f64> {
        match self {
            AnswerValue::Rating(value) | AnswerValue::Scale(value) => Some(*value as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Answer {
    pub id: Uuid,
    pub response_id: Uuid,
    pub question_id: Uuid,
    pub answer_text: String,
    pub value: Option<Json<AnswerValue>>,
    pub time_spent: i32, // seconds
    pub is_skipped: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(
        response_id: Uuid,
        question_id: Uuid,
        value: Option<AnswerValue>,
        time_spent: i32,
        is_skipped: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let answer_text = value
            .as_ref()
            .map(AnswerValue::extract_text)
            .unwrap_or_default();

        Answer {
            id: Uuid::new_v4(),
            response_id,
            question_id,
            answer_text,
            value: value.map(Json),
            time_spent,
            is_skipped,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn value(&self) -> Option<&AnswerValue> {
        self.value.as_ref().map(|json| &json.0)
    }

    pub fn has_content(&self) -> bool {
        !self.answer_text.trim().is_empty()
    }
}

/// One respondent attempt at a survey.
///
/// Answers are keyed by question id: a later answer for the same question
/// replaces the earlier one.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Response {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: ResponseStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration: i32, // seconds
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timezone: Option<String>,
    pub language: Option<String>,
    pub quality_score: f64,
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[sqlx(skip)]
    pub answers: BTreeMap<Uuid, Answer>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timezone: Option<String>,
    pub language: Option<String>,
}

impl Response {
    pub fn start(survey_id: Uuid, user_id: Option<Uuid>, meta: ClientMeta, now: DateTime<Utc>) -> Self {
        Response {
            id: Uuid::new_v4(),
            survey_id,
            user_id,
            status: ResponseStatus::Started,
            started_at: now,
            completed_at: None,
            duration: 0,
            ip_address: meta.ip_address,
            user_agent: meta.user_agent,
            timezone: meta.timezone,
            language: Some(meta.language.unwrap_or_else(|| "en".to_string())),
            quality_score: 0.0,
            is_valid: true,
            created_at: now,
            updated_at: now,
            answers: BTreeMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_completed(&self) -> bool {
        self.status == ResponseStatus::Completed && self.completed_at.is_some()
    }

    pub fn is_owned_by(&self, user_id: Option<Uuid>) -> bool {
        self.user_id == user_id
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Insert or replace the answer for its question, keeping the original
    /// creation time when replacing.
    pub fn upsert_answer(&mut self, mut answer: Answer) {
        if let Some(existing) = self.answers.get(&answer.question_id) {
            answer.id = existing.id;
            answer.created_at = existing.created_at;
        }
        self.answers.insert(answer.question_id, answer);
    }

    pub fn last_answered_at(&self) -> Option<DateTime<Utc>> {
        self.answers.values().map(|a| a.updated_at).max()
    }

    /// Server-observed seconds between start and completion (or `now`).
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let end = self.completed_at.unwrap_or(now);
        (end - self.started_at).num_seconds().max(0)
    }

    /// Seconds reported by progress: the server clock while running,
    /// the recorded duration once abandoned.
    pub fn time_spent(&self, now: DateTime<Utc>) -> i64 {
        match self.status {
            ResponseStatus::Abandoned => self.duration as i64,
            _ => self.elapsed_seconds(now),
        }
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>, duration: i32, quality_score: f64) {
        self.status = ResponseStatus::Completed;
        self.completed_at = Some(now);
        self.duration = duration;
        self.quality_score = quality_score;
        self.updated_at = now;
    }

    pub fn mark_abandoned(&mut self, now: DateTime<Utc>) {
        self.duration = self.elapsed_seconds(now) as i32;
        self.status = ResponseStatus::Abandoned;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn resubmitting_an_answer_replaces_it() {
        let now = Utc::now();
        let mut response = Response::start(Uuid::new_v4(), Some(Uuid::new_v4()), ClientMeta::default(), now);
        let question_id = Uuid::new_v4();

        let first = Answer::new(response.id, question_id, Some(AnswerValue::Text("tea".into())), 4, false, now);
        let first_id = first.id;
        response.upsert_answer(first);

        let later = now + Duration::seconds(10);
        response.upsert_answer(Answer::new(
            response.id,
            question_id,
            Some(AnswerValue::Text("coffee".into())),
            6,
            false,
            later,
        ));

        assert_eq!(response.answered_count(), 1);
        let stored = &response.answers[&question_id];
        assert_eq!(stored.answer_text, "coffee");
        assert_eq!(stored.id, first_id);
        assert_eq!(stored.created_at, now);
        assert_eq!(response.last_answered_at(), Some(later));
    }

    #[test]
    fn extract_text_per_variant() {
        assert_eq!(AnswerValue::Choice(vec!["a".into(), "b".into()]).extract_text(), "a, b");
        assert_eq!(AnswerValue::Rating(4).extract_text(), "4");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(AnswerValue::Date(date).extract_text(), "2024-03-09");
    }

    #[test]
    fn abandon_uses_server_clock() {
        let start = Utc::now();
        let mut response = Response::start(Uuid::new_v4(), None, ClientMeta::default(), start);
        response.mark_abandoned(start + Duration::seconds(42));
        assert_eq!(response.status, ResponseStatus::Abandoned);
        assert_eq!(response.duration, 42);
        assert!(response.completed_at.is_none());
        assert_eq!(response.time_spent(start + Duration::hours(1)), 42);
    }

    #[test]
    fn answer_value_wire_format() {
        let json = serde_json::to_value(AnswerValue::Rating(3)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "rating", "value": 3}));
    }
}
