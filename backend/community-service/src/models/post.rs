use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Community post with its denormalized counters
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPost {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub likes: i32,
    pub comments: i32,
    pub shares: i32,
    pub reports: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommunityPost {
    /// Engagement score used for the trending feed
    pub fn trending_score(&self) -> i64 {
        i64::from(self.likes) + i64::from(self.comments) * 2 + i64::from(self.shares) * 3
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i32,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    /// `Some(None)` removes the image
    pub image_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrder {
    Recent,
    Trending,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PostComment {
    pub id: i32,
    pub post_id: i32,
    pub user_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i32,
    pub user_id: i32,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PostReport {
    pub id: i32,
    pub post_id: i32,
    pub user_id: i32,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Report joined with the reported post, for the admin queue
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: i32,
    pub post_id: i32,
    pub user_id: i32,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub post_title: String,
    pub post_reports: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trending_score_weights() {
        let now = Utc::now();
        let post = CommunityPost {
            id: 1,
            user_id: 1,
            title: "t".into(),
            content: "c".into(),
            image_url: None,
            likes: 5,
            comments: 2,
            shares: 1,
            reports: 0,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(post.trending_score(), 5 + 4 + 3);
    }
}
