use async_trait::async_trait;
use sqlx::Row;

use super::{AdminRepository, DbResult, PgStore};
use crate::models::PlatformStats;

#[async_trait]
impl AdminRepository for PgStore {
    async fn platform_stats(&self) -> DbResult<PlatformStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM community_posts) AS posts,
                (SELECT COUNT(*) FROM post_comments) AS comments,
                (SELECT COUNT(*) FROM post_reports) AS reports
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformStats {
            users: row.try_get("users")?,
            posts: row.try_get("posts")?,
            comments: row.try_get("comments")?,
            reports: row.try_get("reports")?,
        })
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
