use async_trait::async_trait;

use super::{DbResult, PgStore, UserRepository, USER_COLUMNS};
use crate::models::{NewUser, User};

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user_by_id(&self, id: i32) -> DbResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_user(&self, user: NewUser) -> DbResult<Option<User>> {
        let query = format!(
            r#"
            INSERT INTO users (username, password, email, is_admin, is_guest)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (username) DO NOTHING
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.email)
            .bind(user.is_admin)
            .bind(user.is_guest)
            .fetch_optional(&self.pool)
            .await
    }

    async fn ensure_user_with_id(&self, id: i32, user: NewUser) -> DbResult<User> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, username, password, email, is_admin, is_guest)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(user.is_admin)
        .bind(user.is_guest)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted > 0 {
            // An explicit id bypasses the sequence; move it past the new row.
            sqlx::query(
                "SELECT setval(pg_get_serial_sequence('users', 'id'), \
                 GREATEST((SELECT MAX(id) FROM users), 1))",
            )
            .execute(&mut *tx)
            .await?;
        }

        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn record_login(&self, id: i32) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> DbResult<Vec<User>> {
        let query = format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }
}
