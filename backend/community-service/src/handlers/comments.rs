use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use super::posts::load_post;
use crate::db::PostRepository;
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::NewComment;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

/// GET /api/community-posts/{id}/comments
pub async fn list_comments(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    load_post(&state, post_id).await?;

    let comments = state.store.list_comments(post_id).await?;
    Ok(HttpResponse::Ok().json(comments))
}

/// POST /api/community-posts/{id}/comments
pub async fn create_comment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
    payload: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;
    let post_id = path.into_inner();
    load_post(&state, post_id).await?;

    let content = payload.into_inner().content;
    let verdict = state.moderator.moderate_comment(&content).await;
    if !verdict.is_appropriate {
        info!(post_id, user_id = user.id, "Comment rejected by moderation");
        return Err(AppError::ContentRejected {
            reason: verdict.rejection_reason(),
        });
    }

    let comment = state
        .store
        .create_comment(NewComment {
            post_id,
            user_id: user.id,
            content: verdict.moderated_content.unwrap_or(content),
        })
        .await?;

    Ok(HttpResponse::Created().json(comment))
}

/// DELETE /api/comments/{id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let comment_id = path.into_inner();
    let comment = state
        .store
        .find_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("التعليق غير موجود".to_string()))?;

    if comment.user_id != user.id && !user.is_admin {
        return Err(AppError::Forbidden("غير مصرح بالوصول".to_string()));
    }

    state.store.delete_comment(comment_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "تم حذف التعليق بنجاح" })))
}
