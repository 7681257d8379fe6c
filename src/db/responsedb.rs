use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::DBClient;
use crate::models::responsemodel::{Answer, Response, ResponseStatus};

/// Result of a write that is only legal while a response is `started`.
#[derive(Debug)]
pub enum ResponseWrite {
    Applied(Response),
    NotFound,
    NotActive(ResponseStatus),
}

#[derive(Debug, Clone, Default)]
pub struct ResponseFilter {
    pub status: Option<ResponseStatus>,
    pub survey_id: Option<Uuid>,
}

#[async_trait]
pub trait ResponseExt {
    async fn create_response(&self, response: &Response) -> Result<Response, sqlx::Error>;

    /// Response with its answers loaded.
    async fn get_response(&self, response_id: Uuid) -> Result<Option<Response>, sqlx::Error>;

    async fn has_user_responded(&self, user_id: Uuid, survey_id: Uuid) -> Result<bool, sqlx::Error>;

    /// Upsert a batch of answers atomically, provided the response is still started.
    async fn save_answers(
        &self,
        response_id: Uuid,
        answers: Vec<Answer>,
    ) -> Result<ResponseWrite, sqlx::Error>;

    async fn abandon_response(
        &self,
        response_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ResponseWrite, sqlx::Error>;

    async fn get_user_responses(
        &self,
        user_id: Uuid,
        filter: &ResponseFilter,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Response>, sqlx::Error>;

    async fn get_user_response_count(
        &self,
        user_id: Uuid,
        filter: &ResponseFilter,
    ) -> Result<i64, sqlx::Error>;
}

pub(crate) const RESPONSE_COLUMNS: &str = r#"
    id, survey_id, user_id, status, started_at, completed_at, duration,
    ip_address, user_agent, timezone, language, quality_score, is_valid,
    created_at, updated_at
"#;

const ANSWER_COLUMNS: &str = r#"
    id, response_id, question_id, answer_text, value, time_spent,
    is_skipped, created_at, updated_at
"#;

pub(crate) async fn lock_response(
    conn: &mut PgConnection,
    response_id: Uuid,
) -> Result<Option<Response>, sqlx::Error> {
    sqlx::query_as::<_, Response>(&format!(
        "SELECT {} FROM responses WHERE id = $1 FOR UPDATE",
        RESPONSE_COLUMNS
    ))
    .bind(response_id)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn load_answers(conn: &mut PgConnection, response: &mut Response) -> Result<(), sqlx::Error> {
    let answers = sqlx::query_as::<_, Answer>(&format!(
        "SELECT {} FROM answers WHERE response_id = $1",
        ANSWER_COLUMNS
    ))
    .bind(response.id)
    .fetch_all(conn)
    .await?;

    response.answers = answers.into_iter().map(|a| (a.question_id, a)).collect();
    Ok(())
}

/// Insert or replace by `(response_id, question_id)`; the stored id and
/// `created_at` survive a replacement.
pub(crate) async fn upsert_answer(conn: &mut PgConnection, answer: &Answer) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO answers
        (id, response_id, question_id, answer_text, value, time_spent, is_skipped, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (response_id, question_id) DO UPDATE
        SET answer_text = EXCLUDED.answer_text,
            value = EXCLUDED.value,
            time_spent = EXCLUDED.time_spent,
            is_skipped = EXCLUDED.is_skipped,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(answer.id)
    .bind(answer.response_id)
    .bind(answer.question_id)
    .bind(&answer.answer_text)
    .bind(&answer.value)
    .bind(answer.time_spent)
    .bind(answer.is_skipped)
    .bind(answer.created_at)
    .bind(answer.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

#[async_trait]
impl ResponseExt for DBClient {
    async fn create_response(&self, response: &Response) -> Result<Response, sqlx::Error> {
        sqlx::query_as::<_, Response>(&format!(
            r#"
            INSERT INTO responses
            (id, survey_id, user_id, status, started_at, completed_at, duration,
             ip_address, user_agent, timezone, language, quality_score, is_valid,
             created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {}
            "#,
            RESPONSE_COLUMNS
        ))
        .bind(response.id)
        .bind(response.survey_id)
        .bind(response.user_id)
        .bind(response.status)
        .bind(response.started_at)
        .bind(response.completed_at)
        .bind(response.duration)
        .bind(&response.ip_address)
        .bind(&response.user_agent)
        .bind(&response.timezone)
        .bind(&response.language)
        .bind(response.quality_score)
        .bind(response.is_valid)
        .bind(response.created_at)
        .bind(response.updated_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_response(&self, response_id: Uuid) -> Result<Option<Response>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;

        let response = sqlx::query_as::<_, Response>(&format!(
            "SELECT {} FROM responses WHERE id = $1",
            RESPONSE_COLUMNS
        ))
        .bind(response_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(mut response) = response else {
            return Ok(None);
        };

        load_answers(&mut conn, &mut response).await?;
        Ok(Some(response))
    }

    async fn has_user_responded(&self, user_id: Uuid, survey_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM responses WHERE user_id = $1 AND survey_id = $2)",
        )
        .bind(user_id)
        .bind(survey_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn save_answers(
        &self,
        response_id: Uuid,
        answers: Vec<Answer>,
    ) -> Result<ResponseWrite, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let Some(mut response) = lock_response(&mut tx, response_id).await? else {
            return Ok(ResponseWrite::NotFound);
        };

        if !response.is_active() {
            return Ok(ResponseWrite::NotActive(response.status));
        }

        for answer in &answers {
            upsert_answer(&mut tx, answer).await?;
        }

        let now = answers.iter().map(|a| a.updated_at).max().unwrap_or_else(Utc::now);
        sqlx::query("UPDATE responses SET updated_at = $2 WHERE id = $1")
            .bind(response_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        load_answers(&mut tx, &mut response).await?;
        response.updated_at = now;

        tx.commit().await?;

        Ok(ResponseWrite::Applied(response))
    }

    async fn abandon_response(
        &self,
        response_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ResponseWrite, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;

        // Compare-and-set on status: only a started response can move.
        let abandoned = sqlx::query_as::<_, Response>(&format!(
            r#"
            UPDATE responses
            SET status = 'abandoned',
                duration = GREATEST(0, EXTRACT(EPOCH FROM ($2 - started_at)))::INTEGER,
                updated_at = $2
            WHERE id = $1 AND status = 'started'
            RETURNING {}
            "#,
            RESPONSE_COLUMNS
        ))
        .bind(response_id)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(mut response) = abandoned {
            load_answers(&mut conn, &mut response).await?;
            return Ok(ResponseWrite::Applied(response));
        }

        let status = sqlx::query_scalar::<_, ResponseStatus>("SELECT status FROM responses WHERE id = $1")
            .bind(response_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(match status {
            Some(status) => ResponseWrite::NotActive(status),
            None => ResponseWrite::NotFound,
        })
    }

    async fn get_user_responses(
        &self,
        user_id: Uuid,
        filter: &ResponseFilter,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Response>, sqlx::Error> {
        let offset = (page.max(1) - 1) as i64 * limit as i64;
        let mut conn = self.pool.acquire().await?;

        let mut responses = sqlx::query_as::<_, Response>(&format!(
            r#"
            SELECT {}
            FROM responses
            WHERE user_id = $1
              AND ($2::response_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR survey_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            RESPONSE_COLUMNS
        ))
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.survey_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

        if responses.is_empty() {
            return Ok(responses);
        }

        let ids: Vec<Uuid> = responses.iter().map(|r| r.id).collect();
        let answers = sqlx::query_as::<_, Answer>(&format!(
            "SELECT {} FROM answers WHERE response_id = ANY($1)",
            ANSWER_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut by_response: HashMap<Uuid, Vec<Answer>> = HashMap::new();
        for answer in answers {
            by_response.entry(answer.response_id).or_default().push(answer);
        }

        for response in &mut responses {
            if let Some(answers) = by_response.remove(&response.id) {
                response.answers = answers.into_iter().map(|a| (a.question_id, a)).collect();
            }
        }

        Ok(responses)
    }

    async fn get_user_response_count(
        &self,
        user_id: Uuid,
        filter: &ResponseFilter,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM responses
            WHERE user_id = $1
              AND ($2::response_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR survey_id = $3)
            "#,
        )
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.survey_id)
        .fetch_one(&self.pool)
        .await
    }
}
