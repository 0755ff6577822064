/// Authentication handlers
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalUser;
use crate::models::{NewUser, PublicUser, User};
use crate::security::{password, SESSION_COOKIE};
use crate::services::notifications::{Notification, UserRef};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Verify credentials, returning the message to show on failure.
async fn authenticate(
    state: &AppState,
    payload: &LoginRequest,
) -> Result<std::result::Result<User, &'static str>> {
    let Some(user) = state.store.find_user_by_username(&payload.username).await? else {
        return Ok(Err("اسم المستخدم غير موجود"));
    };
    if !password::verify_password(&payload.password, &user.password) {
        return Ok(Err("كلمة المرور غير صحيحة"));
    }
    Ok(Ok(user))
}

/// Open a session and answer with the public user plus the cookie.
async fn start_session(state: &AppState, mut user: User) -> Result<HttpResponse> {
    match state.store.record_login(user.id).await {
        Ok(()) => user.last_login = Some(Utc::now()),
        Err(e) => warn!(user_id = user.id, error = %e, "Failed to record last login"),
    }
    let cookie = state.sessions.create(user.id).await?;

    state.notifier.dispatch(Notification::Login {
        user: UserRef::from(&user),
        is_admin: user.is_admin,
        is_guest: user.is_guest,
    });

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(PublicUser::from(user)))
}

/// POST /api/register
pub async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;
    let payload = payload.into_inner();

    if state
        .store
        .find_user_by_username(&payload.username)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest("اسم المستخدم مستخدم بالفعل".to_string()));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let user = state
        .store
        .create_user(NewUser {
            username: payload.username,
            password_hash,
            email: payload.email.filter(|e| !e.trim().is_empty()),
            is_admin: false,
            is_guest: false,
        })
        .await?
        .ok_or_else(|| AppError::BadRequest("اسم المستخدم مستخدم بالفعل".to_string()))?;

    info!(user_id = user.id, "User registered");
    let cookie = state.sessions.create(user.id).await?;
    Ok(HttpResponse::Created()
        .cookie(cookie)
        .json(PublicUser::from(user)))
}

/// POST /api/login
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    if payload.validate().is_err() {
        return Err(AppError::Unauthorized("فشل تسجيل الدخول".to_string()));
    }

    let user = authenticate(&state, &payload)
        .await?
        .map_err(|message| AppError::Unauthorized(message.to_string()))?;

    info!(user_id = user.id, "User logged in");
    start_session(&state, user).await
}

/// POST /api/admin/login
///
/// Same credentials check as `/api/login`, but only administrators get a
/// session. Every failure carries the same message.
pub async fn admin_login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let denied = || AppError::Unauthorized("بيانات اعتماد غير صحيحة للمشرف".to_string());
    if payload.validate().is_err() {
        return Err(denied());
    }

    let user = match authenticate(&state, &payload).await? {
        Ok(user) if user.is_admin => user,
        Ok(user) => {
            warn!(user_id = user.id, "Non-admin attempted admin login");
            return Err(denied());
        }
        Err(_) => return Err(denied()),
    };

    info!(user_id = user.id, "Admin logged in");
    start_session(&state, user).await
}

/// POST /api/guest/login
///
/// Creates a throwaway `guest_<millis>` account with a random password.
pub async fn guest_login(state: web::Data<AppState>) -> Result<HttpResponse> {
    let username = format!("guest_{}", Utc::now().timestamp_millis());
    let password_hash = password::hash_password(&password::random_secret())?;

    let user = state
        .store
        .create_user(NewUser {
            username,
            password_hash,
            email: None,
            is_admin: false,
            is_guest: true,
        })
        .await?
        .ok_or_else(|| AppError::Internal("guest username collision".to_string()))?;

    info!(user_id = user.id, username = %user.username, "Guest account created");
    start_session(&state, user).await
}

/// POST /api/logout
pub async fn logout(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await?;
    }

    Ok(HttpResponse::Ok()
        .cookie(state.sessions.removal_cookie())
        .json(json!({ "message": "تم تسجيل الخروج بنجاح" })))
}

/// GET /api/user
pub async fn current_user(user: OptionalUser) -> Result<HttpResponse> {
    let user = user
        .0
        .ok_or_else(|| AppError::Unauthorized("المستخدم غير مسجل الدخول".to_string()))?;
    Ok(HttpResponse::Ok().json(PublicUser::from(user)))
}
