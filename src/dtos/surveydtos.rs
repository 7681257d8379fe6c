use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    rewardmodel::RewardPool,
    surveymodel::{Survey, SurveyStatus},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardPoolDto {
    pub id: Uuid,
    pub total_amount: f64,
    pub reward_per_response: f64,
    pub max_responses: i32,
    pub current_responses: i32,
    pub remaining_amount: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedSurveyDto {
    pub survey_id: Uuid,
    pub title: String,
    pub status: SurveyStatus,
    pub total_questions: usize,
    pub reward_pool: RewardPoolDto,
    pub published_at: DateTime<Utc>,
}

impl PublishedSurveyDto {
    pub fn new(survey: &Survey, pool: &RewardPool) -> Self {
        PublishedSurveyDto {
            survey_id: survey.id,
            title: survey.title.clone(),
            status: survey.status,
            total_questions: survey.total_questions(),
            reward_pool: RewardPoolDto {
                id: pool.id,
                total_amount: pool.total_amount,
                reward_per_response: pool.reward_per_response,
                max_responses: pool.max_responses,
                current_responses: pool.current_responses,
                remaining_amount: pool.remaining_amount,
                is_active: pool.is_active,
            },
            published_at: survey.updated_at,
        }
    }
}
