use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    CompletionOutcome, PublishOutcome, ResponseExt, ResponseFilter, ResponseWrite, RewardExt,
    SurveyExt, UserExt,
};
use crate::{
    models::{
        responsemodel::{Answer, Response},
        rewardmodel::{RewardPool, RewardTransaction},
        surveymodel::{Survey, SurveyStatus},
        usermodel::User,
    },
    service::{quality_scorer, reward_settlement},
};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    surveys: HashMap<Uuid, Survey>,
    responses: HashMap<Uuid, Response>,
    // keyed by survey id
    pools: HashMap<Uuid, RewardPool>,
    // keyed by response id
    transactions: HashMap<Uuid, RewardTransaction>,
}

/// In-process store with the same semantics as the Postgres client.
///
/// A single async mutex stands in for row locks: every operation that checks
/// a status and then writes does both while holding it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) -> User {
        self.state.lock().await.users.insert(user.id, user.clone());
        user
    }

    pub async fn insert_survey(&self, survey: Survey) -> Survey {
        self.state.lock().await.surveys.insert(survey.id, survey.clone());
        survey
    }

    pub async fn insert_pool(&self, pool: RewardPool) -> RewardPool {
        self.state.lock().await.pools.insert(pool.survey_id, pool.clone());
        pool
    }

    pub async fn reward_transactions(&self) -> Vec<RewardTransaction> {
        self.state.lock().await.transactions.values().cloned().collect()
    }
}

fn matches_filter(response: &Response, user_id: Uuid, filter: &ResponseFilter) -> bool {
    response.user_id == Some(user_id)
        && filter.status.map_or(true, |s| response.status == s)
        && filter.survey_id.map_or(true, |id| response.survey_id == id)
}

#[async_trait]
impl UserExt for MemoryStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn credit_balance(
        &self,
        user_id: Uuid,
        earned: f64,
        xp: i64,
    ) -> Result<User, sqlx::Error> {
        let mut state = self.state.lock().await;
        let user = state.users.get_mut(&user_id).ok_or(sqlx::Error::RowNotFound)?;
        user.credit(earned, xp);
        Ok(user.clone())
    }
}

#[async_trait]
impl SurveyExt for MemoryStore {
    async fn get_survey_with_questions(&self, survey_id: Uuid) -> Result<Option<Survey>, sqlx::Error> {
        let state = self.state.lock().await;
        Ok(state.surveys.get(&survey_id).map(|survey| {
            let mut survey = survey.clone();
            survey.questions.sort_by_key(|q| q.position);
            survey
        }))
    }

    async fn publish_survey(
        &self,
        survey_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PublishOutcome, sqlx::Error> {
        let mut state = self.state.lock().await;

        let Some(survey) = state.surveys.get(&survey_id) else {
            return Ok(PublishOutcome::NotFound);
        };
        if !survey.can_be_edited() {
            return Ok(PublishOutcome::NotEditable(survey.status));
        }
        if survey.questions.is_empty() {
            return Ok(PublishOutcome::NoQuestions);
        }

        let mut survey = survey.clone();
        survey.status = SurveyStatus::Published;
        survey.updated_at = now;

        let pool = RewardPool::new(
            survey.id,
            survey.total_reward_pool(),
            survey.reward_per_response,
            survey.max_responses,
            now,
        );

        state.surveys.insert(survey.id, survey.clone());
        state.pools.insert(survey.id, pool.clone());

        Ok(PublishOutcome::Published { survey, pool })
    }
}

#[async_trait]
impl ResponseExt for MemoryStore {
    async fn create_response(&self, response: &Response) -> Result<Response, sqlx::Error> {
        let mut state = self.state.lock().await;
        state.responses.insert(response.id, response.clone());
        Ok(response.clone())
    }

    async fn get_response(&self, response_id: Uuid) -> Result<Option<Response>, sqlx::Error> {
        Ok(self.state.lock().await.responses.get(&response_id).cloned())
    }

    async fn has_user_responded(&self, user_id: Uuid, survey_id: Uuid) -> Result<bool, sqlx::Error> {
        let state = self.state.lock().await;
        Ok(state
            .responses
            .values()
            .any(|r| r.user_id == Some(user_id) && r.survey_id == survey_id))
    }

    async fn save_answers(
        &self,
        response_id: Uuid,
        answers: Vec<Answer>,
    ) -> Result<ResponseWrite, sqlx::Error> {
        let mut state = self.state.lock().await;

        let Some(response) = state.responses.get_mut(&response_id) else {
            return Ok(ResponseWrite::NotFound);
        };
        if !response.is_active() {
            return Ok(ResponseWrite::NotActive(response.status));
        }

        for answer in answers {
            response.updated_at = response.updated_at.max(answer.updated_at);
            response.upsert_answer(answer);
        }

        Ok(ResponseWrite::Applied(response.clone()))
    }

    async fn abandon_response(
        &self,
        response_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ResponseWrite, sqlx::Error> {
        let mut state = self.state.lock().await;

        let Some(response) = state.responses.get_mut(&response_id) else {
            return Ok(ResponseWrite::NotFound);
        };
        if !response.is_active() {
            return Ok(ResponseWrite::NotActive(response.status));
        }

        response.mark_abandoned(now);
        Ok(ResponseWrite::Applied(response.clone()))
    }

    async fn get_user_responses(
        &self,
        user_id: Uuid,
        filter: &ResponseFilter,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Response>, sqlx::Error> {
        let state = self.state.lock().await;

        let mut responses: Vec<Response> = state
            .responses
            .values()
            .filter(|r| matches_filter(r, user_id, filter))
            .cloned()
            .collect();
        responses.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = (page.max(1) as usize - 1) * limit;
        Ok(responses.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_user_response_count(
        &self,
        user_id: Uuid,
        filter: &ResponseFilter,
    ) -> Result<i64, sqlx::Error> {
        let state = self.state.lock().await;
        Ok(state
            .responses
            .values()
            .filter(|r| matches_filter(r, user_id, filter))
            .count() as i64)
    }
}

#[async_trait]
impl RewardExt for MemoryStore {
    async fn get_reward_pool(&self, survey_id: Uuid) -> Result<Option<RewardPool>, sqlx::Error> {
        Ok(self.state.lock().await.pools.get(&survey_id).cloned())
    }

    async fn get_response_transaction(
        &self,
        response_id: Uuid,
    ) -> Result<Option<RewardTransaction>, sqlx::Error> {
        Ok(self.state.lock().await.transactions.get(&response_id).cloned())
    }

    async fn complete_response(
        &self,
        survey: &Survey,
        response_id: Uuid,
        final_answers: Vec<Answer>,
        duration: i32,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, sqlx::Error> {
        let mut state = self.state.lock().await;

        // Work on copies; nothing is written back unless every step succeeds.
        let Some(mut response) = state.responses.get(&response_id).cloned() else {
            return Ok(CompletionOutcome::NotFound);
        };
        if !response.is_active() {
            return Ok(CompletionOutcome::NotActive(response.status));
        }

        for answer in final_answers {
            response.upsert_answer(answer);
        }

        response.duration = duration;
        let quality_score = quality_scorer::score(&response, survey);
        response.mark_completed(now, duration, quality_score);

        let settlement = match response.user_id {
            Some(user_id) => {
                let Some(mut pool) = state.pools.get(&survey.id).cloned() else {
                    return Ok(CompletionOutcome::PoolMissing);
                };
                let Some(mut user) = state.users.get(&user_id).cloned() else {
                    return Err(sqlx::Error::RowNotFound);
                };

                let settlement = match reward_settlement::settle(&mut pool, user_id, &response, survey, now) {
                    Ok(settlement) => settlement,
                    Err(e) => return Ok(CompletionOutcome::InsufficientPool(e)),
                };
                user.credit(settlement.amount, settlement.xp as i64);

                state.pools.insert(survey.id, pool);
                state.users.insert(user_id, user);
                state
                    .transactions
                    .insert(response.id, settlement.transaction.clone());

                Some(settlement)
            }
            None => None,
        };

        if let Some(stored) = state.surveys.get_mut(&survey.id) {
            stored.response_count += 1;
            stored.updated_at = now;
        }
        state.responses.insert(response.id, response.clone());

        Ok(CompletionOutcome::Completed { response, settlement })
    }
}
