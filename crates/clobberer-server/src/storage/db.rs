//! Database connection and initialization.

pub use clobberer_core::db::DatabaseError;

clobberer_core::define_database!(ClobberDatabase, "Clobberer database migrations complete");

impl ClobberDatabase {
    /// Cheap round-trip used by the health endpoint.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }

    /// Total number of clobber time rows.
    pub async fn count_clobber_times(&self) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM clobber_times")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    /// Total number of build rows.
    pub async fn count_builds(&self) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM builds")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
