//! Persistence layer
//!
//! Repositories are expressed as async traits so handlers and services can run
//! against PostgreSQL ([`PgStore`]) or the in-process [`MemoryStore`]. Both
//! implementations report failures as `sqlx::Error`.

mod admin;
pub mod memory;
mod posts;
mod recipes;
mod reports;
mod sessions;
mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{
    CommunityPost, NewComment, NewPost, NewSavedRecipe, NewUser, PlatformStats, PostComment,
    PostOrder, PostReport, PostUpdate, RecipeCache, ReportSummary, SavedRecipe, User,
};

pub use memory::MemoryStore;

pub type DbResult<T> = Result<T, sqlx::Error>;

/// Like state after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub likes: i32,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_id(&self, id: i32) -> DbResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> DbResult<Option<User>>;

    /// Returns `None` when the username is already taken.
    async fn create_user(&self, user: NewUser) -> DbResult<Option<User>>;

    /// Make sure a user with this exact id exists, creating it from `user`
    /// when absent. Used for the fallback reporter account.
    async fn ensure_user_with_id(&self, id: i32, user: NewUser) -> DbResult<User>;

    async fn record_login(&self, id: i32) -> DbResult<()>;

    async fn list_users(&self, limit: i64, offset: i64) -> DbResult<Vec<User>>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create_session(
        &self,
        token_hash: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()>;

    /// Resolve a session to its user, ignoring expired sessions.
    async fn find_session_user(&self, token_hash: &str) -> DbResult<Option<User>>;

    async fn delete_session(&self, token_hash: &str) -> DbResult<()>;

    async fn purge_expired_sessions(&self) -> DbResult<u64>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn list_posts(&self, order: PostOrder, limit: i64, offset: i64)
        -> DbResult<Vec<CommunityPost>>;

    async fn find_post(&self, id: i32) -> DbResult<Option<CommunityPost>>;

    async fn create_post(&self, post: NewPost) -> DbResult<CommunityPost>;

    async fn update_post(&self, id: i32, update: PostUpdate) -> DbResult<Option<CommunityPost>>;

    /// Deletes the post together with its comments, likes, saves and reports.
    /// Returns `false` when the post was already gone.
    async fn delete_post(&self, id: i32) -> DbResult<bool>;

    async fn toggle_like(&self, post_id: i32, user_id: i32) -> DbResult<LikeState>;

    async fn increment_shares(&self, post_id: i32) -> DbResult<Option<i32>>;

    async fn list_comments(&self, post_id: i32) -> DbResult<Vec<PostComment>>;

    /// Inserts the comment and bumps the post's comment counter.
    async fn create_comment(&self, comment: NewComment) -> DbResult<PostComment>;

    async fn find_comment(&self, id: i32) -> DbResult<Option<PostComment>>;

    async fn delete_comment(&self, id: i32) -> DbResult<bool>;

    async fn save_post(&self, user_id: i32, post_id: i32) -> DbResult<()>;

    async fn unsave_post(&self, user_id: i32, post_id: i32) -> DbResult<bool>;

    async fn list_saved_posts(&self, user_id: i32) -> DbResult<Vec<CommunityPost>>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn has_user_reported(&self, post_id: i32, user_id: i32) -> DbResult<bool>;

    /// Returns `None` when this user already reported the post.
    async fn create_report(
        &self,
        post_id: i32,
        user_id: i32,
        reason: Option<&str>,
    ) -> DbResult<Option<PostReport>>;

    /// Atomically bumps the report counter and returns the new value,
    /// or `None` when the post no longer exists.
    async fn increment_report_count(&self, post_id: i32) -> DbResult<Option<i32>>;

    async fn list_reports(&self, limit: i64) -> DbResult<Vec<ReportSummary>>;
}

#[async_trait]
pub trait RecipeRepository: Send + Sync {
    async fn find_cached_recipe(&self, key: &str) -> DbResult<Option<RecipeCache>>;

    async fn store_cached_recipe(&self, key: &str, result: &str) -> DbResult<()>;

    async fn list_saved_recipes(&self, user_id: i32) -> DbResult<Vec<SavedRecipe>>;

    async fn create_saved_recipe(&self, recipe: NewSavedRecipe) -> DbResult<SavedRecipe>;

    async fn delete_saved_recipe(&self, id: i32, user_id: i32) -> DbResult<bool>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn platform_stats(&self) -> DbResult<PlatformStats>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> DbResult<()>;
}

/// Every repository the service needs, behind a single trait object
pub trait Store:
    UserRepository
    + SessionRepository
    + PostRepository
    + ReportRepository
    + RecipeRepository
    + AdminRepository
    + Send
    + Sync
{
}

impl<T> Store for T where
    T: UserRepository
        + SessionRepository
        + PostRepository
        + ReportRepository
        + RecipeRepository
        + AdminRepository
        + Send
        + Sync
{
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const POST_COLUMNS: &str = "id, user_id, title, content, image_url, likes, comments, shares, \
                            reports, created_at, updated_at";

const USER_COLUMNS: &str = "id, username, password, email, is_admin, is_guest, points, level, \
                            last_login, created_at";
