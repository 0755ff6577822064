use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{DbResult, PgStore, SessionRepository};
use crate::models::User;

#[async_trait]
impl SessionRepository for PgStore {
    async fn create_session(
        &self,
        token_hash: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session_user(&self, token_hash: &str) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.password, u.email, u.is_admin, u.is_guest,
                   u.points, u.level, u.last_login, u.created_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = $1 AND s.expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_session(&self, token_hash: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired_sessions(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
