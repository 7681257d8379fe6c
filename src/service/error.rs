use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::{ErrorMessage, HttpError},
    models::{responsemodel::ResponseStatus, surveymodel::QuestionType},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("answer to question {0} is required")]
    RequiredMissing(Uuid),

    #[error("answer to question {question_id} is too short: {length} < {min}")]
    TooShort { question_id: Uuid, length: usize, min: i32 },

    #[error("answer to question {question_id} is too long: {length} > {max}")]
    TooLong { question_id: Uuid, length: usize, max: i32 },

    #[error("answer to question {question_id} does not match its {expected:?} type")]
    WrongType {
        question_id: Uuid,
        expected: QuestionType,
    },

    #[error("answer to question {question_id} is out of range: {value} not in [{min:?}, {max:?}]")]
    OutOfRange {
        question_id: Uuid,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("You are not allowed to act on response {0}")]
    Unauthorized(Uuid),

    #[error("Only the survey owner can change survey {0}")]
    NotSurveyOwner(Uuid),

    #[error("Survey {0} not found")]
    SurveyNotFound(Uuid),

    #[error("Response {0} not found")]
    ResponseNotFound(Uuid),

    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Response {0} is not active (status {})", .1.to_str())]
    ResponseNotActive(Uuid, ResponseStatus),

    #[error("Validation error: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("Survey {0} is not accepting responses")]
    SurveyNotActive(Uuid),

    #[error("Survey {0} requires login to participate")]
    LoginRequired(Uuid),

    #[error("User has already responded to survey {0}")]
    AlreadyResponded(Uuid),

    #[error("Survey {0} has reached its maximum number of responses")]
    CapacityReached(Uuid),

    #[error("No reward pool exists for survey {0}")]
    PoolNotFound(Uuid),

    #[error("Insufficient reward pool for survey {survey_id}: required {required}, remaining {remaining}")]
    InsufficientPool {
        survey_id: Uuid,
        required: f64,
        remaining: f64,
    },

    #[error("Survey {0} can no longer be edited")]
    SurveyNotEditable(Uuid),

    #[error("Survey {0} has no questions")]
    EmptySurvey(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::SurveyNotFound(_)
            | ServiceError::ResponseNotFound(_)
            | ServiceError::UserNotFound(_)
            | ServiceError::PoolNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Unauthorized(_) | ServiceError::NotSurveyOwner(_) => StatusCode::FORBIDDEN,

            ServiceError::LoginRequired(_) => StatusCode::UNAUTHORIZED,

            ServiceError::ResponseNotActive(_, _)
            | ServiceError::ValidationFailed(_)
            | ServiceError::SurveyNotActive(_)
            | ServiceError::SurveyNotEditable(_)
            | ServiceError::EmptySurvey(_) => StatusCode::BAD_REQUEST,

            ServiceError::AlreadyResponded(_) | ServiceError::CapacityReached(_) => StatusCode::CONFLICT,

            ServiceError::InsufficientPool { .. } => StatusCode::PAYMENT_REQUIRED,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        match error {
            // Database details stay in the logs.
            ServiceError::Database(ref e) => {
                tracing::error!("database error: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
            _ => HttpError::new(error.to_string(), status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_status() {
        let id = Uuid::new_v4();
        assert_eq!(ServiceError::ResponseNotFound(id).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::Unauthorized(id).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServiceError::ResponseNotActive(id, ResponseStatus::Completed).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServiceError::CapacityReached(id).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::InsufficientPool { survey_id: id, required: 50.0, remaining: 30.0 }.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn database_errors_are_not_leaked() {
        let http: HttpError = ServiceError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(http.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(http.message, ErrorMessage::ServerError.to_string());
    }

    #[test]
    fn validation_message_reaches_client() {
        let id = Uuid::new_v4();
        let http: HttpError = ServiceError::from(ValidationError::RequiredMissing(id)).into();
        assert_eq!(http.status, StatusCode::BAD_REQUEST);
        assert!(http.message.contains("is required"));
    }
}
