//! Dispatch configuration rows.

use async_trait::async_trait;

use brigade_common::{BrigadeError, ConfigEntry, ConfigSource};

use crate::store::{db_err, Store};

impl Store {
    pub async fn list_config_entries(&self) -> Result<Vec<ConfigEntry>, BrigadeError> {
        sqlx::query_as::<_, ConfigEntry>(
            "SELECT key, value, min_value, max_value FROM dispatch_config ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Write one value. Bounds are re-validated when the snapshot is
    /// rebuilt, so a bad row can update here but never reaches the scorer.
    pub async fn update_config_value(&self, key: &str, value: f64) -> Result<(), BrigadeError> {
        let updated = sqlx::query(
            "UPDATE dispatch_config SET value = $2, updated_at = now() WHERE key = $1",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            return Err(BrigadeError::NotFound(format!("config key {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigSource for Store {
    async fn config_entries(&self) -> Result<Vec<ConfigEntry>, BrigadeError> {
        self.list_config_entries().await
    }
}
