use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: uuid::Uuid,
    pub wallet_address: String,
    pub username: Option<String>,
    pub is_active: bool,
    pub total_earned: f64,
    pub xp: i64,
    pub total_responses: i32,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(wallet_address: impl Into<String>) -> Self {
        let now = Utc::now();
        User {
            id: uuid::Uuid::new_v4(),
            wallet_address: wallet_address.into().to_lowercase(),
            username: None,
            is_active: true,
            total_earned: 0.0,
            xp: 0,
            total_responses: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a settlement credit to the earned/XP ledger.
    pub fn credit(&mut self, earned: f64, xp: i64) {
        self.total_earned += earned;
        self.xp += xp;
        self.total_responses += 1;
        self.updated_at = Utc::now();
    }
}
