//! Server-side sessions referenced by a signed cookie
//!
//! The cookie carries `token.signature`, where the token is 32 random bytes
//! (hex) and the signature is HMAC-SHA256 over the token keyed with
//! `SESSION_SECRET`. Only the SHA-256 of the token is stored.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

use crate::config::SessionConfig;
use crate::db::{SessionRepository, Store};
use crate::error::Result;
use crate::models::User;
use crate::security::password::random_secret;

pub const SESSION_COOKIE: &str = "qr_session";

type HmacSha256 = Hmac<Sha256>;

pub struct SessionManager {
    store: Arc<dyn Store>,
    secret: Vec<u8>,
    ttl_days: i64,
    secure: bool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn Store>, config: &SessionConfig) -> Self {
        Self {
            store,
            secret: config.secret.as_bytes().to_vec(),
            ttl_days: config.ttl_days,
            secure: config.secure_cookie,
        }
    }

    /// Start a session for `user_id` and return the cookie to set.
    pub async fn create(&self, user_id: i32) -> Result<Cookie<'static>> {
        let token = random_secret();
        let expires_at = Utc::now() + Duration::days(self.ttl_days);
        self.store
            .create_session(&hash_token(&token), user_id, expires_at)
            .await?;

        debug!(user_id, "Session created");
        Ok(self.build_cookie(self.sign(&token)))
    }

    /// Resolve a cookie value to its user. Bad signatures, unknown tokens
    /// and expired sessions all resolve to `None`.
    pub async fn resolve(&self, cookie_value: &str) -> Result<Option<User>> {
        let Some(token) = self.verify(cookie_value) else {
            return Ok(None);
        };
        Ok(self.store.find_session_user(&hash_token(token)).await?)
    }

    pub async fn destroy(&self, cookie_value: &str) -> Result<()> {
        if let Some(token) = self.verify(cookie_value) {
            self.store.delete_session(&hash_token(token)).await?;
        }
        Ok(())
    }

    /// Cookie that clears the session in the browser
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.build_cookie(String::new());
        cookie.make_removal();
        cookie
    }

    fn build_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, value)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(CookieDuration::days(self.ttl_days))
            .finish()
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.secret).expect("HMAC accepts any key length")
    }

    fn sign(&self, token: &str) -> String {
        let mut mac = self.mac();
        mac.update(token.as_bytes());
        format!("{}.{}", token, hex::encode(mac.finalize().into_bytes()))
    }

    fn verify<'a>(&self, cookie_value: &'a str) -> Option<&'a str> {
        let (token, signature) = cookie_value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(token.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(token)
    }
}

/// SHA-256 of the raw token, hex encoded
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
