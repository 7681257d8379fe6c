use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::DBClient;
use crate::models::{
    rewardmodel::RewardPool,
    surveymodel::{Question, Survey, SurveyStatus},
};

#[derive(Debug)]
pub enum PublishOutcome {
    Published { survey: Survey, pool: RewardPool },
    NotFound,
    NotEditable(SurveyStatus),
    NoQuestions,
}

#[async_trait]
pub trait SurveyExt {
    async fn get_survey_with_questions(&self, survey_id: Uuid) -> Result<Option<Survey>, sqlx::Error>;

    /// Move a draft survey to `published` and open its reward pool.
    async fn publish_survey(
        &self,
        survey_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PublishOutcome, sqlx::Error>;
}

const SURVEY_COLUMNS: &str = r#"
    id, creator_id, title, status, reward_per_response, max_responses,
    response_count, estimated_duration, start_date, end_date,
    require_login, allow_multiple, created_at, updated_at
"#;

async fn load_questions(conn: &mut PgConnection, survey_id: Uuid) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, survey_id, question_type, text, required, position,
               min_length, max_length, min_value, max_value, options
        FROM questions
        WHERE survey_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(survey_id)
    .fetch_all(conn)
    .await
}

#[async_trait]
impl SurveyExt for DBClient {
    async fn get_survey_with_questions(&self, survey_id: Uuid) -> Result<Option<Survey>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;

        let survey = sqlx::query_as::<_, Survey>(&format!(
            "SELECT {} FROM surveys WHERE id = $1",
            SURVEY_COLUMNS
        ))
        .bind(survey_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(mut survey) = survey else {
            return Ok(None);
        };

        survey.questions = load_questions(&mut conn, survey_id).await?;
        Ok(Some(survey))
    }

    async fn publish_survey(
        &self,
        survey_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PublishOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let survey = sqlx::query_as::<_, Survey>(&format!(
            "SELECT {} FROM surveys WHERE id = $1 FOR UPDATE",
            SURVEY_COLUMNS
        ))
        .bind(survey_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut survey) = survey else {
            return Ok(PublishOutcome::NotFound);
        };

        if !survey.can_be_edited() {
            return Ok(PublishOutcome::NotEditable(survey.status));
        }

        survey.questions = load_questions(&mut tx, survey_id).await?;
        if survey.questions.is_empty() {
            return Ok(PublishOutcome::NoQuestions);
        }

        sqlx::query("UPDATE surveys SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(survey_id)
            .bind(SurveyStatus::Published)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        survey.status = SurveyStatus::Published;
        survey.updated_at = now;

        let pool = RewardPool::new(
            survey.id,
            survey.total_reward_pool(),
            survey.reward_per_response,
            survey.max_responses,
            now,
        );

        let pool = sqlx::query_as::<_, RewardPool>(
            r#"
            INSERT INTO reward_pools
            (id, survey_id, total_amount, reward_per_response, max_responses,
             current_responses, paid_out, remaining_amount, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, survey_id, total_amount, reward_per_response, max_responses,
                      current_responses, paid_out, remaining_amount, is_active, created_at, updated_at
            "#,
        )
        .bind(pool.id)
        .bind(pool.survey_id)
        .bind(pool.total_amount)
        .bind(pool.reward_per_response)
        .bind(pool.max_responses)
        .bind(pool.current_responses)
        .bind(pool.paid_out)
        .bind(pool.remaining_amount)
        .bind(pool.is_active)
        .bind(pool.created_at)
        .bind(pool.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PublishOutcome::Published { survey, pool })
    }
}
