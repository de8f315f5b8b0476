//! Schema bootstrap

use sqlx::PgPool;
use tracing::info;

const ENGAGEMENT_SCHEMA: &str = include_str!("../../migrations/0001_engagement.sql");

/// Create the engagement tables if they do not exist yet
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(ENGAGEMENT_SCHEMA).execute(pool).await?;
    info!("Engagement schema ready");
    Ok(())
}
