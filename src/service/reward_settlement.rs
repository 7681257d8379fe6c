use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    models::{
        responsemodel::Response,
        rewardmodel::{InsufficientPool, RewardPool, RewardTransaction},
        surveymodel::Survey,
    },
    service::quality_scorer::MAX_QUALITY_SCORE,
};

const XP_PER_MINUTE: f64 = 10.0;

/// Reward owed for one response at a given quality score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardQuote {
    pub multiplier: f64,
    pub amount: f64,
    pub xp: i32,
}

pub fn quote(quality_score: f64, survey: &Survey) -> RewardQuote {
    let multiplier = quality_score.clamp(0.0, MAX_QUALITY_SCORE) / MAX_QUALITY_SCORE;

    RewardQuote {
        multiplier,
        amount: survey.reward_per_response * multiplier,
        xp: (survey.estimated_duration.max(0) as f64 * XP_PER_MINUTE * multiplier).floor() as i32,
    }
}

/// Result of a successful settlement, ready to be persisted.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub amount: f64,
    pub xp: i32,
    pub transaction: RewardTransaction,
}

/// Debit `pool` by the nominal per-response reward and build the pending
/// transaction for the quality-scaled amount.
///
/// The pool must already be held exclusively by the caller (row lock or
/// store mutex); the availability check happens here, after that lock.
/// The user credit is left to the caller so it lands in the same unit of
/// work as the debit.
pub fn settle(
    pool: &mut RewardPool,
    user_id: Uuid,
    response: &Response,
    survey: &Survey,
    now: DateTime<Utc>,
) -> Result<Settlement, InsufficientPool> {
    pool.process_reward(now)?;

    let RewardQuote { amount, xp, .. } = quote(response.quality_score, survey);
    let transaction = RewardTransaction::pending_reward(
        user_id,
        survey.id,
        response.id,
        pool.id,
        amount,
        xp,
        now,
    );

    tracing::info!(
        "settled response {} for user {}: amount={} xp={} pool_remaining={}",
        response.id,
        user_id,
        amount,
        xp,
        pool.remaining_amount
    );

    Ok(Settlement {
        amount,
        xp,
        transaction,
    })
}
