//! Session-cookie authentication extractors
//!
//! Handlers declare what they need in their signature:
//! [`AuthenticatedUser`] rejects anonymous requests with 401, [`AdminUser`]
//! additionally requires the admin flag (403), and [`OptionalUser`] never
//! rejects.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use std::ops::Deref;

use crate::error::AppError;
use crate::models::User;
use crate::security::SESSION_COOKIE;
use crate::AppState;

async fn session_user(req: HttpRequest) -> Result<Option<User>, AppError> {
    let Some(cookie) = req.cookie(SESSION_COOKIE) else {
        return Ok(None);
    };
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state is not configured".to_string()))?;
    state.sessions.resolve(cookie.value()).await
}

/// Logged-in user; 401 otherwise
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl Deref for AuthenticatedUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            session_user(req)
                .await?
                .map(AuthenticatedUser)
                .ok_or_else(|| AppError::Unauthorized("يجب تسجيل الدخول أولاً".to_string()))
        })
    }
}

/// Logged-in administrator; 401 when anonymous, 403 when not an admin
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl Deref for AdminUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let user = session_user(req)
                .await?
                .ok_or_else(|| AppError::Unauthorized("يجب تسجيل الدخول أولاً".to_string()))?;
            if !user.is_admin {
                return Err(AppError::Forbidden("غير مصرح بالوصول".to_string()));
            }
            Ok(AdminUser(user))
        })
    }
}

/// Session user when present
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<User>);

impl FromRequest for OptionalUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { Ok(OptionalUser(session_user(req).await?)) })
    }
}
