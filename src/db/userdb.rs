use async_trait::async_trait;
use sqlx::PgConnection;
use uuid::Uuid;

use super::DBClient;
use crate::models::usermodel::User;

#[async_trait]
pub trait UserExt {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;

    async fn credit_balance(
        &self,
        user_id: Uuid,
        earned: f64,
        xp: i64,
    ) -> Result<User, sqlx::Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, wallet_address, username, is_active,
                   total_earned, xp, total_responses, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn credit_balance(
        &self,
        user_id: Uuid,
        earned: f64,
        xp: i64,
    ) -> Result<User, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        credit_user(&mut conn, user_id, earned, xp).await
    }
}

/// Ledger credit usable inside a caller's transaction.
pub(crate) async fn credit_user(
    conn: &mut PgConnection,
    user_id: Uuid,
    earned: f64,
    xp: i64,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET total_earned = total_earned + $2,
            xp = xp + $3,
            total_responses = total_responses + 1,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, wallet_address, username, is_active,
                  total_earned, xp, total_responses, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(earned)
    .bind(xp)
    .fetch_one(conn)
    .await
}
