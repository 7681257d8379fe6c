pub mod memory;
pub mod responsedb;
pub mod rewarddb;
pub mod surveydb;
pub mod userdb;

use sqlx::{Pool, Postgres};

pub use memory::MemoryStore;
pub use responsedb::{ResponseExt, ResponseFilter, ResponseWrite};
pub use rewarddb::{CompletionOutcome, RewardExt};
pub use surveydb::{PublishOutcome, SurveyExt};
pub use userdb::UserExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

/// Everything the response service needs from persistence.
pub trait Store: UserExt + SurveyExt + ResponseExt + RewardExt + Send + Sync + 'static {}

impl<T> Store for T where T: UserExt + SurveyExt + ResponseExt + RewardExt + Send + Sync + 'static {}
