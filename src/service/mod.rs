pub mod answer_validator;
pub mod certificate;
pub mod error;
pub mod quality_scorer;
pub mod response_service;
pub mod reward_settlement;
