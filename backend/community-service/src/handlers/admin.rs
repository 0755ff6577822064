/// Administration endpoints; every handler requires an admin session
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::info;

use super::posts::post_not_found;
use super::Pagination;
use crate::db::{AdminRepository, PostRepository, ReportRepository, UserRepository};
use crate::error::Result;
use crate::middleware::AdminUser;
use crate::models::PublicUser;
use crate::AppState;

const REPORT_QUEUE_LIMIT: i64 = 200;

/// GET /api/admin/reports
pub async fn list_reports(state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse> {
    let reports = state.store.list_reports(REPORT_QUEUE_LIMIT).await?;
    Ok(HttpResponse::Ok().json(reports))
}

/// DELETE /api/admin/community-posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    if !state.store.delete_post(post_id).await? {
        return Err(post_not_found());
    }
    info!(post_id, admin_id = admin.id, "Post removed by admin");
    Ok(HttpResponse::Ok().json(json!({ "message": "تم حذف المنشور بنجاح" })))
}

/// GET /api/admin/users
pub async fn list_users(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<Pagination>,
) -> Result<HttpResponse> {
    let users: Vec<PublicUser> = state
        .store
        .list_users(query.limit(), query.offset())
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/admin/stats
pub async fn stats(state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse> {
    let stats = state.store.platform_stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}
