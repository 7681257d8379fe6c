use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::{
    responsedb::{load_answers, lock_response, upsert_answer},
    userdb::credit_user,
    DBClient,
};
use crate::{
    models::{
        responsemodel::{Answer, Response, ResponseStatus},
        rewardmodel::{InsufficientPool, RewardPool, RewardTransaction},
        surveymodel::Survey,
    },
    service::{
        quality_scorer,
        reward_settlement::{self, Settlement},
    },
};

#[derive(Debug)]
pub enum CompletionOutcome {
    /// Response is now completed. `settlement` is `None` for anonymous responses.
    Completed {
        response: Response,
        settlement: Option<Settlement>,
    },
    NotFound,
    NotActive(ResponseStatus),
    PoolMissing,
    InsufficientPool(InsufficientPool),
}

#[async_trait]
pub trait RewardExt {
    async fn get_reward_pool(&self, survey_id: Uuid) -> Result<Option<RewardPool>, sqlx::Error>;

    async fn get_response_transaction(
        &self,
        response_id: Uuid,
    ) -> Result<Option<RewardTransaction>, sqlx::Error>;

    /// Apply the final answers, score, settle and mark the response completed
    /// as one unit of work. Nothing persists unless the outcome is `Completed`.
    async fn complete_response(
        &self,
        survey: &Survey,
        response_id: Uuid,
        final_answers: Vec<Answer>,
        duration: i32,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, sqlx::Error>;
}

const POOL_COLUMNS: &str = r#"
    id, survey_id, total_amount, reward_per_response, max_responses,
    current_responses, paid_out, remaining_amount, is_active, created_at, updated_at
"#;

const TRANSACTION_COLUMNS: &str = r#"
    id, user_id, survey_id, response_id, pool_id, transaction_type, amount, xp,
    status, tx_hash, retry_count, created_at, updated_at
"#;

async fn save_pool(conn: &mut PgConnection, pool: &RewardPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE reward_pools
        SET current_responses = $2,
            paid_out = $3,
            remaining_amount = $4,
            is_active = $5,
            updated_at = $6
        WHERE id = $1
        "#,
    )
    .bind(pool.id)
    .bind(pool.current_responses)
    .bind(pool.paid_out)
    .bind(pool.remaining_amount)
    .bind(pool.is_active)
    .bind(pool.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

async fn insert_transaction(conn: &mut PgConnection, transaction: &RewardTransaction) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO reward_transactions
        (id, user_id, survey_id, response_id, pool_id, transaction_type, amount, xp,
         status, tx_hash, retry_count, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(transaction.id)
    .bind(transaction.user_id)
    .bind(transaction.survey_id)
    .bind(transaction.response_id)
    .bind(transaction.pool_id)
    .bind(transaction.transaction_type)
    .bind(transaction.amount)
    .bind(transaction.xp)
    .bind(transaction.status)
    .bind(&transaction.tx_hash)
    .bind(transaction.retry_count)
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

#[async_trait]
impl RewardExt for DBClient {
    async fn get_reward_pool(&self, survey_id: Uuid) -> Result<Option<RewardPool>, sqlx::Error> {
        sqlx::query_as::<_, RewardPool>(&format!(
            "SELECT {} FROM reward_pools WHERE survey_id = $1",
            POOL_COLUMNS
        ))
        .bind(survey_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_response_transaction(
        &self,
        response_id: Uuid,
    ) -> Result<Option<RewardTransaction>, sqlx::Error> {
        sqlx::query_as::<_, RewardTransaction>(&format!(
            "SELECT {} FROM reward_transactions WHERE response_id = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(response_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn complete_response(
        &self,
        survey: &Survey,
        response_id: Uuid,
        final_answers: Vec<Answer>,
        duration: i32,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // The row lock serialises concurrent completions of one response.
        let Some(mut response) = lock_response(&mut tx, response_id).await? else {
            return Ok(CompletionOutcome::NotFound);
        };

        if !response.is_active() {
            return Ok(CompletionOutcome::NotActive(response.status));
        }

        load_answers(&mut tx, &mut response).await?;
        for answer in final_answers {
            upsert_answer(&mut tx, &answer).await?;
            response.upsert_answer(answer);
        }

        response.duration = duration;
        let quality_score = quality_scorer::score(&response, survey);
        response.mark_completed(now, duration, quality_score);

        let settlement = match response.user_id {
            Some(user_id) => {
                let pool = sqlx::query_as::<_, RewardPool>(&format!(
                    "SELECT {} FROM reward_pools WHERE survey_id = $1 FOR UPDATE",
                    POOL_COLUMNS
                ))
                .bind(survey.id)
                .fetch_optional(&mut *tx)
                .await?;

                let Some(mut pool) = pool else {
                    return Ok(CompletionOutcome::PoolMissing);
                };

                let settlement = match reward_settlement::settle(&mut pool, user_id, &response, survey, now) {
                    Ok(settlement) => settlement,
                    Err(e) => return Ok(CompletionOutcome::InsufficientPool(e)),
                };

                save_pool(&mut tx, &pool).await?;
                insert_transaction(&mut tx, &settlement.transaction).await?;
                credit_user(&mut tx, user_id, settlement.amount, settlement.xp as i64).await?;

                Some(settlement)
            }
            None => None,
        };

        sqlx::query(
            r#"
            UPDATE responses
            SET status = $2, completed_at = $3, duration = $4, quality_score = $5, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(response.id)
        .bind(response.status)
        .bind(response.completed_at)
        .bind(response.duration)
        .bind(response.quality_score)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE surveys SET response_count = response_count + 1, updated_at = $2 WHERE id = $1")
            .bind(survey.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CompletionOutcome::Completed { response, settlement })
    }
}
