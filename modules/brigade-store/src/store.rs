use sqlx::PgPool;

use brigade_common::BrigadeError;

/// Handle on the spatial store. Cheap to clone; all methods go through the
/// shared pool.
#[derive(Clone)]
pub struct Store {
    pub(crate) pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, BrigadeError> {
        let pool = PgPool::connect(database_url).await.map_err(db_err)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub(crate) fn db_err(e: sqlx::Error) -> BrigadeError {
    BrigadeError::Database(e.to_string())
}
