use async_trait::async_trait;

use super::{DbResult, LikeState, PgStore, PostRepository, POST_COLUMNS};
use crate::models::{
    CommunityPost, NewComment, NewPost, PostComment, PostOrder, PostUpdate,
};

#[async_trait]
impl PostRepository for PgStore {
    async fn list_posts(
        &self,
        order: PostOrder,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<CommunityPost>> {
        let order_by = match order {
            PostOrder::Recent => "created_at DESC, id DESC",
            PostOrder::Trending => {
                "(likes + comments * 2 + shares * 3) DESC, created_at DESC, id DESC"
            }
        };
        let query = format!(
            "SELECT {} FROM community_posts ORDER BY {} LIMIT $1 OFFSET $2",
            POST_COLUMNS, order_by
        );

        sqlx::query_as::<_, CommunityPost>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    async fn find_post(&self, id: i32) -> DbResult<Option<CommunityPost>> {
        let query = format!("SELECT {} FROM community_posts WHERE id = $1", POST_COLUMNS);
        sqlx::query_as::<_, CommunityPost>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_post(&self, post: NewPost) -> DbResult<CommunityPost> {
        let query = format!(
            r#"
            INSERT INTO community_posts (user_id, title, content, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            POST_COLUMNS
        );
        sqlx::query_as::<_, CommunityPost>(&query)
            .bind(post.user_id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.image_url)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_post(&self, id: i32, update: PostUpdate) -> DbResult<Option<CommunityPost>> {
        let query = format!(
            r#"
            UPDATE community_posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                image_url = CASE WHEN $5 THEN NULL ELSE COALESCE($4, image_url) END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        );
        sqlx::query_as::<_, CommunityPost>(&query)
            .bind(id)
            .bind(&update.title)
            .bind(&update.content)
            .bind(update.image_url.clone().flatten())
            .bind(matches!(update.image_url, Some(None)))
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_post(&self, id: i32) -> DbResult<bool> {
        // Comments, likes, saves and reports go with the post via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM community_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_like(&self, post_id: i32, user_id: i32) -> DbResult<LikeState> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        let delta = if removed {
            -1
        } else {
            sqlx::query(
                "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            1
        };

        let likes: i32 = sqlx::query_scalar(
            "UPDATE community_posts SET likes = GREATEST(likes + $2, 0) WHERE id = $1 RETURNING likes",
        )
        .bind(post_id)
        .bind(delta)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(LikeState {
            liked: !removed,
            likes,
        })
    }

    async fn increment_shares(&self, post_id: i32) -> DbResult<Option<i32>> {
        sqlx::query_scalar(
            "UPDATE community_posts SET shares = shares + 1 WHERE id = $1 RETURNING shares",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_comments(&self, post_id: i32) -> DbResult<Vec<PostComment>> {
        sqlx::query_as::<_, PostComment>(
            r#"
            SELECT id, post_id, user_id, content, created_at
            FROM post_comments
            WHERE post_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_comment(&self, comment: NewComment) -> DbResult<PostComment> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PostComment>(
            r#"
            INSERT INTO post_comments (post_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, user_id, content, created_at
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE community_posts SET comments = comments + 1 WHERE id = $1")
            .bind(comment.post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn find_comment(&self, id: i32) -> DbResult<Option<PostComment>> {
        sqlx::query_as::<_, PostComment>(
            "SELECT id, post_id, user_id, content, created_at FROM post_comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_comment(&self, id: i32) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let post_id: Option<i32> =
            sqlx::query_scalar("DELETE FROM post_comments WHERE id = $1 RETURNING post_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(post_id) = post_id else {
            return Ok(false);
        };

        sqlx::query(
            "UPDATE community_posts SET comments = GREATEST(comments - 1, 0) WHERE id = $1",
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn save_post(&self, user_id: i32, post_id: i32) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO saved_posts (user_id, post_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unsave_post(&self, user_id: i32, post_id: i32) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM saved_posts WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_saved_posts(&self, user_id: i32) -> DbResult<Vec<CommunityPost>> {
        sqlx::query_as::<_, CommunityPost>(
            r#"
            SELECT p.id, p.user_id, p.title, p.content, p.image_url, p.likes, p.comments,
                   p.shares, p.reports, p.created_at, p.updated_at
            FROM saved_posts s
            JOIN community_posts p ON p.id = s.post_id
            WHERE s.user_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
