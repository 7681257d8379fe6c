use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "reward_transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "reward_transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Reward,
    Withdrawal,
    Refund,
    Fee,
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("reward pool {pool_id} cannot pay {required}: {remaining} remaining, active={active}")]
pub struct InsufficientPool {
    pub pool_id: Uuid,
    pub required: f64,
    pub remaining: f64,
    pub active: bool,
}

/// Funds escrowed for one published survey.
///
/// `remaining_amount` always equals `total_amount - paid_out`.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct RewardPool {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub total_amount: f64,
    pub reward_per_response: f64,
    pub max_responses: i32,
    pub current_responses: i32,
    pub paid_out: f64,
    pub remaining_amount: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewardPool {
    pub fn new(
        survey_id: Uuid,
        total_amount: f64,
        reward_per_response: f64,
        max_responses: i32,
        now: DateTime<Utc>,
    ) -> Self {
        RewardPool {
            id: Uuid::new_v4(),
            survey_id,
            total_amount,
            reward_per_response,
            max_responses,
            current_responses: 0,
            paid_out: 0.0,
            remaining_amount: total_amount,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_available(&self) -> bool {
        self.is_active && self.remaining_amount > 0.0 && self.current_responses < self.max_responses
    }

    pub fn can_process_reward(&self) -> bool {
        self.is_available() && self.remaining_amount >= self.reward_per_response
    }

    /// Debit one nominal reward. The caller must hold exclusive access to the
    /// pool for the check and the debit to be meaningful.
    pub fn process_reward(&mut self, now: DateTime<Utc>) -> Result<(), InsufficientPool> {
        if !self.can_process_reward() {
            return Err(InsufficientPool {
                pool_id: self.id,
                required: self.reward_per_response,
                remaining: self.remaining_amount,
                active: self.is_active,
            });
        }

        self.current_responses += 1;
        self.paid_out += self.reward_per_response;
        self.remaining_amount = self.total_amount - self.paid_out;

        if self.current_responses >= self.max_responses
            || self.remaining_amount < self.reward_per_response
        {
            self.is_active = false;
        }

        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct RewardTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub survey_id: Uuid,
    pub response_id: Option<Uuid>,
    pub pool_id: Option<Uuid>,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub xp: i32,
    pub status: TransactionStatus,
    pub tx_hash: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewardTransaction {
    pub fn pending_reward(
        user_id: Uuid,
        survey_id: Uuid,
        response_id: Uuid,
        pool_id: Uuid,
        amount: f64,
        xp: i32,
        now: DateTime<Utc>,
    ) -> Self {
        RewardTransaction {
            id: Uuid::new_v4(),
            user_id,
            survey_id,
            response_id: Some(response_id),
            pool_id: Some(pool_id),
            transaction_type: TransactionType::Reward,
            amount,
            xp,
            status: TransactionStatus::Pending,
            tx_hash: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_keeps_remaining_in_sync() {
        let mut pool = RewardPool::new(Uuid::new_v4(), 150.0, 50.0, 100, Utc::now());
        pool.process_reward(Utc::now()).unwrap();

        assert_eq!(pool.current_responses, 1);
        assert_eq!(pool.paid_out, 50.0);
        assert_eq!(pool.remaining_amount, pool.total_amount - pool.paid_out);
        assert!(pool.is_active);
    }

    #[test]
    fn pool_deactivates_when_funds_run_out() {
        let mut pool = RewardPool::new(Uuid::new_v4(), 120.0, 50.0, 100, Utc::now());
        pool.process_reward(Utc::now()).unwrap();
        pool.process_reward(Utc::now()).unwrap();

        assert_eq!(pool.remaining_amount, 20.0);
        assert!(!pool.is_active);
        let err = pool.process_reward(Utc::now()).unwrap_err();
        assert_eq!(err.required, 50.0);
        assert_eq!(pool.paid_out, 100.0);
    }

    #[test]
    fn pool_deactivates_at_capacity() {
        let mut pool = RewardPool::new(Uuid::new_v4(), 1_000.0, 10.0, 2, Utc::now());
        pool.process_reward(Utc::now()).unwrap();
        pool.process_reward(Utc::now()).unwrap();

        assert!(!pool.is_active);
        assert!(!pool.can_process_reward());
        assert!(pool.process_reward(Utc::now()).is_err());
        assert_eq!(pool.current_responses, 2);
    }

    #[test]
    fn underfunded_pool_refuses_debit() {
        let mut pool = RewardPool::new(Uuid::new_v4(), 30.0, 50.0, 100, Utc::now());
        assert!(pool.process_reward(Utc::now()).is_err());
        assert_eq!(pool.paid_out, 0.0);
        assert_eq!(pool.remaining_amount, 30.0);
    }
}
