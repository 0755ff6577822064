use async_trait::async_trait;

use super::{DbResult, PgStore, ReportRepository};
use crate::models::{PostReport, ReportSummary};

#[async_trait]
impl ReportRepository for PgStore {
    async fn has_user_reported(&self, post_id: i32, user_id: i32) -> DbResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM post_reports WHERE post_id = $1 AND user_id = $2)",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_report(
        &self,
        post_id: i32,
        user_id: i32,
        reason: Option<&str>,
    ) -> DbResult<Option<PostReport>> {
        // The unique (post_id, user_id) index turns a concurrent duplicate into no row.
        sqlx::query_as::<_, PostReport>(
            r#"
            INSERT INTO post_reports (post_id, user_id, reason)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id, user_id) DO NOTHING
            RETURNING id, post_id, user_id, reason, created_at
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    async fn increment_report_count(&self, post_id: i32) -> DbResult<Option<i32>> {
        sqlx::query_scalar(
            "UPDATE community_posts SET reports = reports + 1 WHERE id = $1 RETURNING reports",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_reports(&self, limit: i64) -> DbResult<Vec<ReportSummary>> {
        sqlx::query_as::<_, ReportSummary>(
            r#"
            SELECT r.id, r.post_id, r.user_id, r.reason, r.created_at,
                   p.title AS post_title, p.reports AS post_reports
            FROM post_reports r
            JOIN community_posts p ON p.id = r.post_id
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
