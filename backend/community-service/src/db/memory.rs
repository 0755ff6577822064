//! In-process store
//!
//! Mirrors the PostgreSQL schema closely enough for local development without a
//! database and for the HTTP test suites: ids are sequential, usernames and
//! `(post_id, user_id)` report pairs are unique, and deleting a post removes
//! its comments, likes, saves and reports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{
    AdminRepository, DbResult, LikeState, PostRepository, RecipeRepository, ReportRepository,
    SessionRepository, UserRepository,
};
use crate::models::{
    CommunityPost, NewComment, NewPost, NewSavedRecipe, NewUser, PlatformStats, PostComment,
    PostOrder, PostReport, PostUpdate, RecipeCache, ReportSummary, SavedRecipe, User,
};

#[derive(Default)]
struct Inner {
    users: BTreeMap<i32, User>,
    sessions: HashMap<String, (i32, DateTime<Utc>)>,
    posts: BTreeMap<i32, CommunityPost>,
    comments: BTreeMap<i32, PostComment>,
    likes: HashSet<(i32, i32)>,
    reports: BTreeMap<i32, PostReport>,
    saved_posts: Vec<(i32, i32, DateTime<Utc>)>,
    recipe_cache: HashMap<String, RecipeCache>,
    saved_recipes: BTreeMap<i32, SavedRecipe>,
    next_user_id: i32,
    next_post_id: i32,
    next_comment_id: i32,
    next_report_id: i32,
    next_cache_id: i32,
    next_saved_recipe_id: i32,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic in another request must not take the whole store down.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn build_user(id: i32, user: NewUser) -> User {
    User {
        id,
        username: user.username,
        password: user.password_hash,
        email: user.email,
        is_admin: user.is_admin,
        is_guest: user.is_guest,
        points: 0,
        level: 1,
        last_login: None,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user_by_id(&self, id: i32) -> DbResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> DbResult<Option<User>> {
        let mut inner = self.lock();
        if inner.users.values().any(|u| u.username == user.username) {
            return Ok(None);
        }
        let id = next_id(&mut inner.next_user_id);
        let row = build_user(id, user);
        inner.users.insert(id, row.clone());
        Ok(Some(row))
    }

    async fn ensure_user_with_id(&self, id: i32, user: NewUser) -> DbResult<User> {
        let mut inner = self.lock();
        if let Some(existing) = inner.users.get(&id) {
            return Ok(existing.clone());
        }
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(sqlx::Error::RowNotFound);
        }
        let row = build_user(id, user);
        inner.users.insert(id, row.clone());
        inner.next_user_id = inner.next_user_id.max(id);
        Ok(row)
    }

    async fn record_login(&self, id: i32) -> DbResult<()> {
        if let Some(user) = self.lock().users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> DbResult<Vec<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create_session(
        &self,
        token_hash: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        self.lock()
            .sessions
            .insert(token_hash.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn find_session_user(&self, token_hash: &str) -> DbResult<Option<User>> {
        let inner = self.lock();
        let user = inner
            .sessions
            .get(token_hash)
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .and_then(|(user_id, _)| inner.users.get(user_id))
            .cloned();
        Ok(user)
    }

    async fn delete_session(&self, token_hash: &str) -> DbResult<()> {
        self.lock().sessions.remove(token_hash);
        Ok(())
    }

    async fn purge_expired_sessions(&self) -> DbResult<u64> {
        let mut inner = self.lock();
        let now = Utc::now();
        let before = inner.sessions.len();
        inner.sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - inner.sessions.len()) as u64)
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn list_posts(
        &self,
        order: PostOrder,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<CommunityPost>> {
        let inner = self.lock();
        let mut posts: Vec<CommunityPost> = inner.posts.values().cloned().collect();
        match order {
            PostOrder::Recent => {
                posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            PostOrder::Trending => posts.sort_by(|a, b| {
                b.trending_score()
                    .cmp(&a.trending_score())
                    .then(b.created_at.cmp(&a.created_at))
                    .then(b.id.cmp(&a.id))
            }),
        }
        Ok(posts
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_post(&self, id: i32) -> DbResult<Option<CommunityPost>> {
        Ok(self.lock().posts.get(&id).cloned())
    }

    async fn create_post(&self, post: NewPost) -> DbResult<CommunityPost> {
        let mut inner = self.lock();
        let id = next_id(&mut inner.next_post_id);
        let now = Utc::now();
        let row = CommunityPost {
            id,
            user_id: post.user_id,
            title: post.title,
            content: post.content,
            image_url: post.image_url,
            likes: 0,
            comments: 0,
            shares: 0,
            reports: 0,
            created_at: now,
            updated_at: now,
        };
        inner.posts.insert(id, row.clone());
        Ok(row)
    }

    async fn update_post(&self, id: i32, update: PostUpdate) -> DbResult<Option<CommunityPost>> {
        let mut inner = self.lock();
        let Some(post) = inner.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            post.title = title;
        }
        if let Some(content) = update.content {
            post.content = content;
        }
        if let Some(image_url) = update.image_url {
            post.image_url = image_url;
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: i32) -> DbResult<bool> {
        let mut inner = self.lock();
        if inner.posts.remove(&id).is_none() {
            return Ok(false);
        }
        inner.comments.retain(|_, c| c.post_id != id);
        inner.likes.retain(|(post_id, _)| *post_id != id);
        inner.reports.retain(|_, r| r.post_id != id);
        inner.saved_posts.retain(|(_, post_id, _)| *post_id != id);
        Ok(true)
    }

    async fn toggle_like(&self, post_id: i32, user_id: i32) -> DbResult<LikeState> {
        let mut inner = self.lock();
        if !inner.posts.contains_key(&post_id) {
            return Err(sqlx::Error::RowNotFound);
        }
        let liked = if inner.likes.remove(&(post_id, user_id)) {
            false
        } else {
            inner.likes.insert((post_id, user_id));
            true
        };
        let post = inner.posts.get_mut(&post_id).ok_or(sqlx::Error::RowNotFound)?;
        post.likes = if liked { post.likes + 1 } else { (post.likes - 1).max(0) };
        Ok(LikeState {
            liked,
            likes: post.likes,
        })
    }

    async fn increment_shares(&self, post_id: i32) -> DbResult<Option<i32>> {
        let mut inner = self.lock();
        Ok(inner.posts.get_mut(&post_id).map(|post| {
            post.shares += 1;
            post.shares
        }))
    }

    async fn list_comments(&self, post_id: i32) -> DbResult<Vec<PostComment>> {
        Ok(self
            .lock()
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn create_comment(&self, comment: NewComment) -> DbResult<PostComment> {
        let mut inner = self.lock();
        let post = inner
            .posts
            .get_mut(&comment.post_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        post.comments += 1;

        let id = next_id(&mut inner.next_comment_id);
        let row = PostComment {
            id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            content: comment.content,
            created_at: Utc::now(),
        };
        inner.comments.insert(id, row.clone());
        Ok(row)
    }

    async fn find_comment(&self, id: i32) -> DbResult<Option<PostComment>> {
        Ok(self.lock().comments.get(&id).cloned())
    }

    async fn delete_comment(&self, id: i32) -> DbResult<bool> {
        let mut inner = self.lock();
        let Some(comment) = inner.comments.remove(&id) else {
            return Ok(false);
        };
        if let Some(post) = inner.posts.get_mut(&comment.post_id) {
            post.comments = (post.comments - 1).max(0);
        }
        Ok(true)
    }

    async fn save_post(&self, user_id: i32, post_id: i32) -> DbResult<()> {
        let mut inner = self.lock();
        if !inner.posts.contains_key(&post_id) {
            return Err(sqlx::Error::RowNotFound);
        }
        if !inner
            .saved_posts
            .iter()
            .any(|(u, p, _)| *u == user_id && *p == post_id)
        {
            inner.saved_posts.push((user_id, post_id, Utc::now()));
        }
        Ok(())
    }

    async fn unsave_post(&self, user_id: i32, post_id: i32) -> DbResult<bool> {
        let mut inner = self.lock();
        let before = inner.saved_posts.len();
        inner
            .saved_posts
            .retain(|(u, p, _)| !(*u == user_id && *p == post_id));
        Ok(inner.saved_posts.len() < before)
    }

    async fn list_saved_posts(&self, user_id: i32) -> DbResult<Vec<CommunityPost>> {
        let inner = self.lock();
        Ok(inner
            .saved_posts
            .iter()
            .rev()
            .filter(|(u, _, _)| *u == user_id)
            .filter_map(|(_, post_id, _)| inner.posts.get(post_id).cloned())
            .collect())
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn has_user_reported(&self, post_id: i32, user_id: i32) -> DbResult<bool> {
        Ok(self
            .lock()
            .reports
            .values()
            .any(|r| r.post_id == post_id && r.user_id == user_id))
    }

    async fn create_report(
        &self,
        post_id: i32,
        user_id: i32,
        reason: Option<&str>,
    ) -> DbResult<Option<PostReport>> {
        let mut inner = self.lock();
        if !inner.posts.contains_key(&post_id) {
            return Err(sqlx::Error::RowNotFound);
        }
        if inner
            .reports
            .values()
            .any(|r| r.post_id == post_id && r.user_id == user_id)
        {
            return Ok(None);
        }
        let id = next_id(&mut inner.next_report_id);
        let row = PostReport {
            id,
            post_id,
            user_id,
            reason: reason.map(str::to_string),
            created_at: Utc::now(),
        };
        inner.reports.insert(id, row.clone());
        Ok(Some(row))
    }

    async fn increment_report_count(&self, post_id: i32) -> DbResult<Option<i32>> {
        let mut inner = self.lock();
        Ok(inner.posts.get_mut(&post_id).map(|post| {
            post.reports += 1;
            post.reports
        }))
    }

    async fn list_reports(&self, limit: i64) -> DbResult<Vec<ReportSummary>> {
        let inner = self.lock();
        Ok(inner
            .reports
            .values()
            .rev()
            .filter_map(|r| {
                inner.posts.get(&r.post_id).map(|post| ReportSummary {
                    id: r.id,
                    post_id: r.post_id,
                    user_id: r.user_id,
                    reason: r.reason.clone(),
                    created_at: r.created_at,
                    post_title: post.title.clone(),
                    post_reports: post.reports,
                })
            })
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl RecipeRepository for MemoryStore {
    async fn find_cached_recipe(&self, key: &str) -> DbResult<Option<RecipeCache>> {
        Ok(self.lock().recipe_cache.get(key).cloned())
    }

    async fn store_cached_recipe(&self, key: &str, result: &str) -> DbResult<()> {
        let mut inner = self.lock();
        let id = match inner.recipe_cache.get(key) {
            Some(existing) => existing.id,
            None => next_id(&mut inner.next_cache_id),
        };
        inner.recipe_cache.insert(
            key.to_string(),
            RecipeCache {
                id,
                ingredients: key.to_string(),
                result: result.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn list_saved_recipes(&self, user_id: i32) -> DbResult<Vec<SavedRecipe>> {
        Ok(self
            .lock()
            .saved_recipes
            .values()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_saved_recipe(&self, recipe: NewSavedRecipe) -> DbResult<SavedRecipe> {
        let mut inner = self.lock();
        let id = next_id(&mut inner.next_saved_recipe_id);
        let row = SavedRecipe {
            id,
            user_id: recipe.user_id,
            title: recipe.title,
            description: recipe.description,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            created_at: Utc::now(),
        };
        inner.saved_recipes.insert(id, row.clone());
        Ok(row)
    }

    async fn delete_saved_recipe(&self, id: i32, user_id: i32) -> DbResult<bool> {
        let mut inner = self.lock();
        match inner.saved_recipes.get(&id) {
            Some(recipe) if recipe.user_id == user_id => {
                inner.saved_recipes.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl AdminRepository for MemoryStore {
    async fn platform_stats(&self) -> DbResult<PlatformStats> {
        let inner = self.lock();
        Ok(PlatformStats {
            users: inner.users.len() as i64,
            posts: inner.posts.len() as i64,
            comments: inner.comments.len() as i64,
            reports: inner.reports.len() as i64,
        })
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "hash".to_string(),
            email: None,
            is_admin: false,
            is_guest: false,
        }
    }

    async fn seed_post(store: &MemoryStore, user_id: i32) -> CommunityPost {
        store
            .create_post(NewPost {
                user_id,
                title: "Koshari".into(),
                content: "Rice, lentils and pasta".into(),
                image_url: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_usernames_are_unique() {
        let store = MemoryStore::new();
        assert!(store.create_user(new_user("mona")).await.unwrap().is_some());
        assert!(store.create_user(new_user("mona")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ensure_user_with_id_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.ensure_user_with_id(1, new_user("default_user")).await.unwrap();
        let second = store.ensure_user_with_id(1, new_user("default_user")).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 1);

        let next = store.create_user(new_user("after")).await.unwrap().unwrap();
        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn test_delete_post_cascades() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("ali")).await.unwrap().unwrap();
        let post = seed_post(&store, user.id).await;

        store
            .create_comment(NewComment {
                post_id: post.id,
                user_id: user.id,
                content: "Yum".into(),
            })
            .await
            .unwrap();
        store.toggle_like(post.id, user.id).await.unwrap();
        store.save_post(user.id, post.id).await.unwrap();
        store.create_report(post.id, user.id, None).await.unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(!store.delete_post(post.id).await.unwrap());

        let stats = store.platform_stats().await.unwrap();
        assert_eq!(stats.posts, 0);
        assert_eq!(stats.comments, 0);
        assert_eq!(stats.reports, 0);
        assert!(store.list_saved_posts(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_like_round_trip() {
        let store = MemoryStore::new();
        let post = seed_post(&store, 1).await;

        let liked = store.toggle_like(post.id, 9).await.unwrap();
        assert_eq!(liked, LikeState { liked: true, likes: 1 });

        let unliked = store.toggle_like(post.id, 9).await.unwrap();
        assert_eq!(unliked, LikeState { liked: false, likes: 0 });
    }

    #[tokio::test]
    async fn test_like_on_missing_post_leaves_no_row() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.toggle_like(404, 9).await,
            Err(sqlx::Error::RowNotFound)
        ));
        assert!(store.lock().likes.is_empty());
    }

    #[tokio::test]
    async fn test_update_can_replace_and_clear_image() {
        let store = MemoryStore::new();
        let post = seed_post(&store, 1).await;

        let updated = store
            .update_post(
                post.id,
                PostUpdate {
                    image_url: Some(Some("https://cdn.example.com/koshari.jpg".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            updated.image_url.as_deref(),
            Some("https://cdn.example.com/koshari.jpg")
        );
        assert_eq!(updated.title, "Koshari");

        let kept = store
            .update_post(post.id, PostUpdate::default())
            .await
            .unwrap()
            .unwrap();
        assert!(kept.image_url.is_some());

        let cleared = store
            .update_post(
                post.id,
                PostUpdate {
                    image_url: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(cleared.image_url.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_report_returns_none() {
        let store = MemoryStore::new();
        let post = seed_post(&store, 1).await;

        assert!(store.create_report(post.id, 2, Some("spam")).await.unwrap().is_some());
        assert!(store.create_report(post.id, 2, Some("spam")).await.unwrap().is_none());
        assert_eq!(store.increment_report_count(post.id).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_trending_order() {
        let store = MemoryStore::new();
        let quiet = seed_post(&store, 1).await;
        let busy = seed_post(&store, 1).await;
        store.increment_shares(quiet.id).await.unwrap();
        store.toggle_like(busy.id, 2).await.unwrap();
        store.toggle_like(busy.id, 3).await.unwrap();
        store.toggle_like(busy.id, 4).await.unwrap();
        store.toggle_like(busy.id, 5).await.unwrap();

        let trending = store.list_posts(PostOrder::Trending, 10, 0).await.unwrap();
        assert_eq!(trending[0].id, busy.id);
        assert_eq!(trending[1].id, quiet.id);
    }
}
