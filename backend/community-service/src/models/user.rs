use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// User row as stored, including the password hash
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_guest: bool,
    pub points: i32,
    pub level: i32,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// User as returned by the API; never carries the password hash
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_guest: bool,
    pub points: i32,
    pub level: i32,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
            is_guest: user.is_guest,
            points: user.points,
            level: user.level,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    /// Already hashed
    pub password_hash: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_guest: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_user_omits_password() {
        let user = User {
            id: 7,
            username: "chef".to_string(),
            password: "$argon2id$v=19$secret".to_string(),
            email: None,
            is_admin: false,
            is_guest: false,
            points: 0,
            level: 1,
            last_login: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["isAdmin"], false);
        assert_eq!(json["username"], "chef");
    }
}
