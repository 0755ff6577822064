use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use super::Pagination;
use crate::db::PostRepository;
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::{CommunityPost, NewPost, PostOrder, PostUpdate, User};
use crate::AppState;

// ============================================
// Request Structs
// ============================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    /// http(s) URL or `data:` URI
    #[validate(length(max = 7_000_000))]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 10000))]
    pub content: Option<String>,
    /// An empty string removes the image
    #[validate(length(max = 7_000_000))]
    pub image_url: Option<String>,
}

// ============================================
// Helpers
// ============================================

pub(crate) fn post_not_found() -> AppError {
    AppError::NotFound("المنشور غير موجود".to_string())
}

pub(crate) async fn load_post(state: &AppState, post_id: i32) -> Result<CommunityPost> {
    state
        .store
        .find_post(post_id)
        .await?
        .ok_or_else(post_not_found)
}

fn ensure_can_modify(user: &User, owner_id: i32) -> Result<()> {
    if user.id == owner_id || user.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("غير مصرح بالوصول".to_string()))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Image column change for an update. An unchanged URL is left alone so it
/// is not moderated twice.
fn image_change(requested: Option<String>, current: Option<&str>) -> Option<Option<String>> {
    let url = requested?.trim().to_string();
    if url.is_empty() {
        Some(None)
    } else if current == Some(url.as_str()) {
        None
    } else {
        Some(Some(url))
    }
}

// ============================================
// Feed
// ============================================

/// GET /api/community-posts
pub async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<Pagination>,
) -> Result<HttpResponse> {
    let posts = state
        .store
        .list_posts(PostOrder::Recent, query.limit(), query.offset())
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// GET /api/community-posts/trending
pub async fn trending_posts(
    state: web::Data<AppState>,
    query: web::Query<Pagination>,
) -> Result<HttpResponse> {
    let posts = state
        .store
        .list_posts(PostOrder::Trending, query.limit(), query.offset())
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// GET /api/community-posts/recent
pub async fn recent_posts(
    state: web::Data<AppState>,
    query: web::Query<Pagination>,
) -> Result<HttpResponse> {
    list_posts(state, query).await
}

/// GET /api/community-posts/{id}
pub async fn get_post(state: web::Data<AppState>, path: web::Path<i32>) -> Result<HttpResponse> {
    let post = load_post(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

// ============================================
// Authoring (moderation-gated)
// ============================================

/// POST /api/community-posts
pub async fn create_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;
    let payload = payload.into_inner();
    let image_url = non_blank(payload.image_url);

    let verdict = state
        .moderator
        .moderate_post(&payload.title, &payload.content, image_url.as_deref())
        .await;
    if !verdict.is_appropriate {
        info!(user_id = user.id, "Post rejected by moderation");
        return Err(AppError::ContentRejected {
            reason: verdict.rejection_reason(),
        });
    }

    let post = state
        .store
        .create_post(NewPost {
            user_id: user.id,
            title: payload.title,
            content: verdict.moderated_content.unwrap_or(payload.content),
            image_url,
        })
        .await?;

    info!(post_id = post.id, user_id = user.id, "Post created");
    Ok(HttpResponse::Created().json(post))
}

/// PUT /api/community-posts/{id}
///
/// The merged title and body are moderated again; the image only when it
/// changes. An empty `imageUrl` removes the image.
pub async fn update_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
    payload: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;
    let post_id = path.into_inner();
    let payload = payload.into_inner();

    let existing = load_post(&state, post_id).await?;
    ensure_can_modify(&user, existing.user_id)?;

    let title = payload.title.unwrap_or_else(|| existing.title.clone());
    let content = payload.content.unwrap_or_else(|| existing.content.clone());
    let image_url = image_change(payload.image_url, existing.image_url.as_deref());
    let new_image = image_url.clone().flatten();

    let verdict = state
        .moderator
        .moderate_post(&title, &content, new_image.as_deref())
        .await;
    if !verdict.is_appropriate {
        info!(post_id, user_id = user.id, "Post update rejected by moderation");
        return Err(AppError::ContentRejected {
            reason: verdict.rejection_reason(),
        });
    }

    let post = state
        .store
        .update_post(
            post_id,
            PostUpdate {
                title: Some(title),
                content: Some(verdict.moderated_content.unwrap_or(content)),
                image_url,
            },
        )
        .await?
        .ok_or_else(post_not_found)?;

    Ok(HttpResponse::Ok().json(post))
}

/// DELETE /api/community-posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    let post = load_post(&state, post_id).await?;
    ensure_can_modify(&user, post.user_id)?;

    if !state.store.delete_post(post_id).await? {
        return Err(post_not_found());
    }
    info!(post_id, user_id = user.id, "Post deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "تم حذف المنشور بنجاح" })))
}

// ============================================
// Engagement
// ============================================

/// POST /api/community-posts/{id}/like
pub async fn toggle_like(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    load_post(&state, post_id).await?;

    let like = state.store.toggle_like(post_id, user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "liked": like.liked, "likes": like.likes })))
}

/// POST /api/community-posts/{id}/share
pub async fn share_post(state: web::Data<AppState>, path: web::Path<i32>) -> Result<HttpResponse> {
    let shares = state
        .store
        .increment_shares(path.into_inner())
        .await?
        .ok_or_else(post_not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "shares": shares })))
}

/// POST /api/community-posts/{id}/save
pub async fn save_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    load_post(&state, post_id).await?;

    state.store.save_post(user.id, post_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "saved": true })))
}

/// DELETE /api/community-posts/{id}/save
pub async fn unsave_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    state.store.unsave_post(user.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "saved": false })))
}

/// GET /api/saved-posts
pub async fn list_saved_posts(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let posts = state.store.list_saved_posts(user.id).await?;
    Ok(HttpResponse::Ok().json(posts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i32, is_admin: bool) -> User {
        User {
            id,
            username: format!("user{}", id),
            password: String::new(),
            email: None,
            is_admin,
            is_guest: false,
            points: 0,
            level: 1,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_owner_or_admin_can_modify() {
        assert!(ensure_can_modify(&user(1, false), 1).is_ok());
        assert!(ensure_can_modify(&user(2, true), 1).is_ok());
        assert!(matches!(
            ensure_can_modify(&user(2, false), 1),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_create_request_validation() {
        let empty_title = CreatePostRequest {
            title: String::new(),
            content: "body".into(),
            image_url: None,
        };
        assert!(empty_title.validate().is_err());

        let ok = CreatePostRequest {
            title: "كشري".into(),
            content: "عدس وأرز ومكرونة".into(),
            image_url: None,
        };
        assert!(ok.validate().is_ok());

        let oversized_image = CreatePostRequest {
            title: "كشري".into(),
            content: "عدس وأرز".into(),
            image_url: Some(format!("data:image/png;base64,{}", "A".repeat(7_000_000))),
        };
        assert!(oversized_image.validate().is_err());
    }

    #[test]
    fn test_image_change() {
        let current = Some("https://cdn.example.com/a.jpg");
        assert_eq!(image_change(None, current), None);
        assert_eq!(image_change(Some("  ".into()), current), Some(None));
        assert_eq!(
            image_change(Some("https://cdn.example.com/a.jpg".into()), current),
            None
        );
        assert_eq!(
            image_change(Some("https://cdn.example.com/b.jpg".into()), current),
            Some(Some("https://cdn.example.com/b.jpg".to_string()))
        );
        assert_eq!(image_change(Some(String::new()), None), Some(None));
    }
}
