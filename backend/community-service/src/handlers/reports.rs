use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::error::Result;
use crate::middleware::OptionalUser;
use crate::services::reports::ReporterIdentity;
use crate::AppState;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    /// Honoured only for anonymous requests
    pub user_id: Option<i32>,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

/// POST /api/community-posts/{id}/report
///
/// The session user wins over `userId` in the body. A missing or malformed
/// body is treated as an anonymous report without a reason.
pub async fn report_post(
    state: web::Data<AppState>,
    user: OptionalUser,
    path: web::Path<i32>,
    payload: Option<web::Json<ReportRequest>>,
) -> Result<HttpResponse> {
    let payload = payload.map(web::Json::into_inner).unwrap_or_default();
    payload.validate()?;

    let reporter = match user.0 {
        Some(user) => ReporterIdentity::Session(user),
        None => ReporterIdentity::Requested(payload.user_id),
    };

    let outcome = state
        .reports
        .report_post(path.into_inner(), reporter, payload.reason)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}
