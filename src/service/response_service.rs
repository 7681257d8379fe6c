use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::{CompletionOutcome, PublishOutcome, ResponseFilter, ResponseWrite, Store},
    dtos::responsedtos::{
        progress_percent, AnswerDto, CompleteSurveyDto, CompletionDto, ListResponsesQuery,
        ProgressDto, ResponseDetailDto, ResponseItemDto, ResponseListDto, StartResponseDto,
        SubmitAnswerDto, UpdateAnswerDto,
    },
    models::{
        responsemodel::{Answer, ClientMeta, Response},
        rewardmodel::RewardPool,
        surveymodel::Survey,
    },
    service::{answer_validator, certificate, error::ServiceError},
};

const DEFAULT_PAGE_SIZE: usize = 10;

const REWARDED_MESSAGE: &str = "Survey completed successfully! Your rewards will be processed shortly.";
const UNREWARDED_MESSAGE: &str = "Survey completed successfully!";

/// Respondent-facing operations over any [`Store`].
///
/// Every write that depends on a response still being `started` is
/// re-checked by the store inside its own unit of work, so the pre-checks
/// here only shape the error a caller sees first.
pub struct ResponseService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for ResponseService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store + ?Sized> ResponseService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn load_survey(&self, survey_id: Uuid) -> Result<Survey, ServiceError> {
        self.store
            .get_survey_with_questions(survey_id)
            .await?
            .ok_or(ServiceError::SurveyNotFound(survey_id))
    }

    /// Load a response the caller owns.
    async fn load_owned(&self, user_id: Option<Uuid>, response_id: Uuid) -> Result<Response, ServiceError> {
        let response = self
            .store
            .get_response(response_id)
            .await?
            .ok_or(ServiceError::ResponseNotFound(response_id))?;

        if !response.is_owned_by(user_id) {
            tracing::warn!("rejected access to response {} by {:?}", response_id, user_id);
            return Err(ServiceError::Unauthorized(response_id));
        }

        Ok(response)
    }

    fn ensure_active(response: &Response) -> Result<(), ServiceError> {
        if response.is_active() {
            Ok(())
        } else {
            Err(ServiceError::ResponseNotActive(response.id, response.status))
        }
    }

    /// Turn submitted answers into validated answers for `response`.
    ///
    /// Answers to questions the survey does not have are dropped. The first
    /// validation failure rejects the whole batch.
    fn prepare_answers(
        response: &Response,
        survey: &Survey,
        submitted: Vec<SubmitAnswerDto>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Answer>, ServiceError> {
        let mut answers = Vec::with_capacity(submitted.len());

        for dto in submitted {
            let Some(question) = survey.question(dto.question_id) else {
                tracing::debug!(
                    "ignoring answer for unknown question {} on response {}",
                    dto.question_id,
                    response.id
                );
                continue;
            };

            let answer = dto.into_answer(response.id, now);
            answer_validator::validate(&answer, question)?;
            answers.push(answer);
        }

        Ok(answers)
    }

    fn write_result(response_id: Uuid, write: ResponseWrite) -> Result<Response, ServiceError> {
        match write {
            ResponseWrite::Applied(response) => Ok(response),
            ResponseWrite::NotFound => Err(ServiceError::ResponseNotFound(response_id)),
            ResponseWrite::NotActive(status) => Err(ServiceError::ResponseNotActive(response_id, status)),
        }
    }

    pub async fn start_response(
        &self,
        user_id: Option<Uuid>,
        survey_id: Uuid,
        meta: ClientMeta,
    ) -> Result<StartResponseDto, ServiceError> {
        let now = Utc::now();
        let survey = self.load_survey(survey_id).await?;

        if !survey.is_open(now) {
            return Err(ServiceError::SurveyNotActive(survey_id));
        }

        if survey.require_login && user_id.is_none() {
            return Err(ServiceError::LoginRequired(survey_id));
        }

        if let Some(user_id) = user_id {
            if self.store.get_user(user_id).await?.is_none() {
                return Err(ServiceError::UserNotFound(user_id));
            }

            if !survey.allow_multiple && self.store.has_user_responded(user_id, survey_id).await? {
                return Err(ServiceError::AlreadyResponded(survey_id));
            }
        }

        if !survey.has_capacity() {
            return Err(ServiceError::CapacityReached(survey_id));
        }

        let response = self
            .store
            .create_response(&Response::start(survey_id, user_id, meta, now))
            .await?;

        tracing::info!(
            "response {} started on survey {} by {:?}",
            response.id,
            survey_id,
            user_id
        );

        Ok(StartResponseDto {
            response_id: response.id,
            survey_id,
            status: response.status,
            started_at: response.started_at,
            time_left: survey.estimated_seconds(),
        })
    }

    pub async fn submit_answers(
        &self,
        user_id: Option<Uuid>,
        response_id: Uuid,
        submitted: Vec<SubmitAnswerDto>,
    ) -> Result<Response, ServiceError> {
        let response = self.load_owned(user_id, response_id).await?;
        Self::ensure_active(&response)?;

        let survey = self.load_survey(response.survey_id).await?;
        let answers = Self::prepare_answers(&response, &survey, submitted, Utc::now())?;

        if answers.is_empty() {
            return Ok(response);
        }

        let count = answers.len();
        let write = self.store.save_answers(response_id, answers).await?;
        let response = Self::write_result(response_id, write)?;

        tracing::debug!("saved {} answers on response {}", count, response_id);
        Ok(response)
    }

    pub async fn update_answer(
        &self,
        user_id: Option<Uuid>,
        response_id: Uuid,
        question_id: Uuid,
        body: UpdateAnswerDto,
    ) -> Result<Response, ServiceError> {
        self.submit_answers(user_id, response_id, vec![body.for_question(question_id)])
            .await
    }

    pub async fn complete_response(
        &self,
        user_id: Option<Uuid>,
        body: CompleteSurveyDto,
    ) -> Result<CompletionDto, ServiceError> {
        let now = Utc::now();
        let response = self.load_owned(user_id, body.response_id).await?;
        Self::ensure_active(&response)?;

        let survey = self.load_survey(response.survey_id).await?;
        let final_answers = Self::prepare_answers(&response, &survey, body.answers, now)?;

        let outcome = self
            .store
            .complete_response(&survey, response.id, final_answers, body.duration, now)
            .await?;

        let (response, settlement) = match outcome {
            CompletionOutcome::Completed { response, settlement } => (response, settlement),
            CompletionOutcome::NotFound => return Err(ServiceError::ResponseNotFound(body.response_id)),
            CompletionOutcome::NotActive(status) => {
                tracing::warn!("response {} was no longer started at completion", body.response_id);
                return Err(ServiceError::ResponseNotActive(body.response_id, status));
            }
            CompletionOutcome::PoolMissing => return Err(ServiceError::PoolNotFound(survey.id)),
            CompletionOutcome::InsufficientPool(e) => {
                tracing::warn!("completion of response {} refused: {}", body.response_id, e);
                return Err(ServiceError::InsufficientPool {
                    survey_id: survey.id,
                    required: e.required,
                    remaining: e.remaining,
                });
            }
        };

        let (reward_earned, xp_earned, message) = match &settlement {
            Some(s) => (s.amount, s.xp, REWARDED_MESSAGE),
            None => (0.0, 0, UNREWARDED_MESSAGE),
        };

        tracing::info!(
            "response {} completed: quality={:.2} reward={} xp={}",
            response.id,
            response.quality_score,
            reward_earned,
            xp_earned
        );

        Ok(CompletionDto {
            response_id: response.id,
            status: response.status,
            completed_at: response.completed_at.unwrap_or(now),
            duration: response.duration,
            quality_score: response.quality_score,
            reward_earned,
            xp_earned,
            nft_certificate: certificate::for_response(&response),
            transaction_hash: None,
            message: message.to_string(),
        })
    }

    pub async fn abandon_response(&self, user_id: Option<Uuid>, response_id: Uuid) -> Result<Response, ServiceError> {
        let response = self.load_owned(user_id, response_id).await?;
        Self::ensure_active(&response)?;

        let write = self.store.abandon_response(response_id, Utc::now()).await?;
        let response = Self::write_result(response_id, write)?;

        tracing::info!("response {} abandoned after {}s", response_id, response.duration);
        Ok(response)
    }

    pub async fn get_progress(&self, user_id: Option<Uuid>, response_id: Uuid) -> Result<ProgressDto, ServiceError> {
        let now = Utc::now();
        let response = self.load_owned(user_id, response_id).await?;
        let survey = self.load_survey(response.survey_id).await?;

        let time_spent = response.time_spent(now);
        let time_left = survey
            .estimated_seconds()
            .map(|estimate| estimate - time_spent)
            .filter(|remaining| *remaining > 0);

        Ok(ProgressDto {
            response_id: response.id,
            survey_id: response.survey_id,
            status: response.status,
            progress: progress_percent(&response, survey.total_questions()),
            questions_total: survey.total_questions(),
            questions_answered: response.answered_count(),
            time_spent,
            time_left,
            started_at: response.started_at,
            last_answered_at: response.last_answered_at(),
        })
    }

    async fn earned_for(&self, response: &Response) -> Result<(f64, i32), ServiceError> {
        Ok(self
            .store
            .get_response_transaction(response.id)
            .await?
            .map(|tx| (tx.amount, tx.xp))
            .unwrap_or((0.0, 0)))
    }

    pub async fn get_response(
        &self,
        user_id: Option<Uuid>,
        response_id: Uuid,
    ) -> Result<ResponseDetailDto, ServiceError> {
        let response = self.load_owned(user_id, response_id).await?;
        let (reward_earned, xp_earned) = self.earned_for(&response).await?;

        Ok(ResponseDetailDto {
            id: response.id,
            survey_id: response.survey_id,
            user_id: response.user_id,
            status: response.status,
            started_at: response.started_at,
            completed_at: response.completed_at,
            duration: response.duration,
            quality_score: response.quality_score,
            is_valid: response.is_valid,
            answers: response.answers.values().map(AnswerDto::from_answer).collect(),
            reward_earned,
            xp_earned,
            nft_certificate: certificate::for_response(&response),
        })
    }

    pub async fn list_responses(
        &self,
        user_id: Uuid,
        query: ListResponsesQuery,
    ) -> Result<ResponseListDto, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let filter = ResponseFilter {
            status: query.status,
            survey_id: query.survey_id,
        };

        let responses = self.store.get_user_responses(user_id, &filter, page, limit).await?;
        let total = self.store.get_user_response_count(user_id, &filter).await?;

        let mut surveys: HashMap<Uuid, Option<Survey>> = HashMap::new();
        let mut items = Vec::with_capacity(responses.len());

        for response in responses {
            if !surveys.contains_key(&response.survey_id) {
                let survey = self.store.get_survey_with_questions(response.survey_id).await?;
                surveys.insert(response.survey_id, survey);
            }
            let survey = surveys.get(&response.survey_id).and_then(Option::as_ref);
            let (reward_earned, xp_earned) = self.earned_for(&response).await?;

            items.push(ResponseItemDto {
                id: response.id,
                survey_id: response.survey_id,
                survey_title: survey.map(|s| s.title.clone()).unwrap_or_default(),
                status: response.status,
                started_at: response.started_at,
                completed_at: response.completed_at,
                duration: response.duration,
                reward_earned,
                xp_earned,
                quality_score: response.quality_score,
                progress: progress_percent(&response, survey.map_or(0, Survey::total_questions)),
            });
        }

        let limit_i64 = limit as i64;
        Ok(ResponseListDto {
            responses: items,
            total,
            page,
            limit,
            total_pages: (total + limit_i64 - 1) / limit_i64,
        })
    }

    /// Freeze a draft survey and open its reward pool. Owner only.
    pub async fn publish_survey(&self, user_id: Uuid, survey_id: Uuid) -> Result<(Survey, RewardPool), ServiceError> {
        let survey = self.load_survey(survey_id).await?;
        if survey.creator_id != user_id {
            return Err(ServiceError::NotSurveyOwner(survey_id));
        }

        match self.store.publish_survey(survey_id, Utc::now()).await? {
            PublishOutcome::Published { survey, pool } => {
                tracing::info!(
                    "survey {} published with a reward pool of {}",
                    survey.id,
                    pool.total_amount
                );
                Ok((survey, pool))
            }
            PublishOutcome::NotFound => Err(ServiceError::SurveyNotFound(survey_id)),
            PublishOutcome::NotEditable(status) => {
                tracing::warn!(
                    "survey {} cannot be published from status {}",
                    survey_id,
                    status.to_str()
                );
                Err(ServiceError::SurveyNotEditable(survey_id))
            }
            PublishOutcome::NoQuestions => Err(ServiceError::EmptySurvey(survey_id)),
        }
    }
}
