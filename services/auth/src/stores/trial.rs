//! Postgres-backed trial code store

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::TrialCode;
use crate::stores::{StoreError, TrialCodeStore};

/// Trial code store backed by the `trial_codes` table
#[derive(Clone)]
pub struct PgTrialCodeStore {
    pool: PgPool,
}

impl PgTrialCodeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrialCodeStore for PgTrialCodeStore {
    async fn find(&self, code: &str) -> Result<Option<TrialCode>, StoreError> {
        let record =
            sqlx::query_as::<_, TrialCode>("SELECT code, used, expires_at FROM trial_codes WHERE code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        Ok(record)
    }

    async fn consume(&self, code: &str) -> Result<bool, StoreError> {
        // Guarded by `used = FALSE` so concurrent activations of the same
        // code produce exactly one winner.
        let result = sqlx::query("UPDATE trial_codes SET used = TRUE WHERE code = $1 AND used = FALSE")
            .bind(code)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
