/// Configuration management for the community service
///
/// Everything is read from environment variables (optionally seeded from a
/// `.env` file by `main`). Production deployments must provide a real
/// `SESSION_SECRET` and an explicit CORS origin list.
use db_pool::{non_empty_env, parse_env_with_default};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DEV_SESSION_SECRET: &str = "quick-recipe-local-dev-secret";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Storage configuration
    pub database: DatabaseConfig,
    /// Session cookie configuration
    pub session: SessionConfig,
    /// AI provider configuration
    pub ai: AiConfig,
    /// Discord webhook configuration
    pub notifications: NotificationConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// Public base URL used for links in notifications
    pub public_url: String,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or `*`
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown STORAGE_BACKEND '{}'", other)),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    /// Database URL; required for the postgres backend
    #[serde(skip_serializing)]
    pub url: Option<String>,
}

/// Session configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HMAC key for signing session cookies
    #[serde(skip_serializing)]
    pub secret: String,
    pub ttl_days: i64,
    /// Set the `Secure` attribute on the session cookie
    pub secure_cookie: bool,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl_days", &self.ttl_days)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeProvider {
    Gemini,
    OpenAi,
    DeepSeek,
}

impl FromStr for RecipeProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(RecipeProvider::Gemini),
            "openai" => Ok(RecipeProvider::OpenAi),
            "deepseek" => Ok(RecipeProvider::DeepSeek),
            other => Err(format!("unknown RECIPE_PROVIDER '{}'", other)),
        }
    }
}

/// AI provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub deepseek_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_vision_model: String,
    pub openai_model: String,
    pub deepseek_model: String,
    pub recipe_provider: RecipeProvider,
    pub request_timeout_secs: u64,
    /// Upper bound for images fetched for moderation
    pub max_image_bytes: usize,
}

impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("deepseek_api_key", &self.deepseek_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_vision_model", &self.gemini_vision_model)
            .field("recipe_provider", &self.recipe_provider)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Discord webhook configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(skip_serializing)]
    pub report_webhook_url: Option<String>,
    #[serde(skip_serializing)]
    pub login_webhook_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let is_production = app_env.eq_ignore_ascii_case("production");

        let port = parse_env_with_default("PORT", 5000u16);
        let allowed_origins =
            std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production && allowed_origins.trim() == "*" {
            return Err(
                "CORS_ALLOWED_ORIGINS must list explicit origins in production".to_string(),
            );
        }

        let secret = match non_empty_env("SESSION_SECRET") {
            Some(secret) => secret,
            None if is_production => {
                return Err("SESSION_SECRET must be set in production".to_string())
            }
            None => DEV_SESSION_SECRET.to_string(),
        };

        let backend = match non_empty_env("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::Postgres,
        };
        let database_url = non_empty_env("DATABASE_URL");
        if backend == StorageBackend::Postgres && database_url.is_none() {
            return Err("DATABASE_URL environment variable not set".to_string());
        }

        let recipe_provider = match non_empty_env("RECIPE_PROVIDER") {
            Some(value) => value.parse()?,
            None => RecipeProvider::Gemini,
        };

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
                public_url: non_empty_env("APP_URL")
                    .unwrap_or_else(|| format!("http://localhost:{}", port)),
            },
            cors: CorsConfig { allowed_origins },
            database: DatabaseConfig {
                backend,
                url: database_url,
            },
            session: SessionConfig {
                secret,
                ttl_days: parse_env_with_default("SESSION_TTL_DAYS", 30),
                secure_cookie: is_production,
            },
            ai: AiConfig {
                gemini_api_key: non_empty_env("GEMINI_API_KEY"),
                openai_api_key: non_empty_env("OPENAI_API_KEY"),
                deepseek_api_key: non_empty_env("DEEPSEEK_API_KEY"),
                gemini_model: non_empty_env("GEMINI_MODEL")
                    .unwrap_or_else(|| "gemini-1.5-flash".to_string()),
                gemini_vision_model: non_empty_env("GEMINI_VISION_MODEL")
                    .unwrap_or_else(|| "gemini-1.5-flash".to_string()),
                openai_model: non_empty_env("OPENAI_MODEL")
                    .unwrap_or_else(|| "gpt-4o".to_string()),
                deepseek_model: non_empty_env("DEEPSEEK_MODEL")
                    .unwrap_or_else(|| "deepseek-chat".to_string()),
                recipe_provider,
                request_timeout_secs: parse_env_with_default("AI_REQUEST_TIMEOUT_SECS", 30),
                max_image_bytes: parse_env_with_default("MODERATION_MAX_IMAGE_BYTES", 5 * 1024 * 1024),
            },
            notifications: NotificationConfig {
                report_webhook_url: non_empty_env("DISCORD_WEBHOOK_URL"),
                login_webhook_url: non_empty_env("LOGIN_DISCORD_WEBHOOK_URL"),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }

    /// Origins for the CORS middleware; empty means any origin.
    pub fn cors_origins(&self) -> Vec<String> {
        let raw = self.cors.allowed_origins.trim();
        if raw == "*" {
            return Vec::new();
        }
        raw.split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}

impl Default for Config {
    /// Development defaults: in-memory storage, no AI keys, no webhooks.
    fn default() -> Self {
        Config {
            app: AppConfig {
                env: "development".to_string(),
                host: "127.0.0.1".to_string(),
                port: 5000,
                public_url: "http://localhost:5000".to_string(),
            },
            cors: CorsConfig {
                allowed_origins: "*".to_string(),
            },
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                url: None,
            },
            session: SessionConfig {
                secret: DEV_SESSION_SECRET.to_string(),
                ttl_days: 30,
                secure_cookie: false,
            },
            ai: AiConfig {
                gemini_api_key: None,
                openai_api_key: None,
                deepseek_api_key: None,
                gemini_model: "gemini-1.5-flash".to_string(),
                gemini_vision_model: "gemini-1.5-flash".to_string(),
                openai_model: "gpt-4o".to_string(),
                deepseek_model: "deepseek-chat".to_string(),
                recipe_provider: RecipeProvider::Gemini,
                request_timeout_secs: 30,
                max_image_bytes: 5 * 1024 * 1024,
            },
            notifications: NotificationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "PORT",
        "CORS_ALLOWED_ORIGINS",
        "SESSION_SECRET",
        "STORAGE_BACKEND",
        "DATABASE_URL",
        "RECIPE_PROVIDER",
        "APP_URL",
    ];

    fn reset_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_development_defaults() {
        reset_env();
        std::env::set_var("STORAGE_BACKEND", "memory");

        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 5000);
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert_eq!(config.session.secret, DEV_SESSION_SECRET);
        assert_eq!(config.ai.recipe_provider, RecipeProvider::Gemini);
        assert!(!config.session.secure_cookie);
        assert!(config.cors_origins().is_empty());

        reset_env();
    }

    #[test]
    #[serial]
    fn test_postgres_requires_database_url() {
        reset_env();
        assert!(Config::from_env().is_err());

        std::env::set_var("DATABASE_URL", "postgres://localhost/quick_recipe");
        assert!(Config::from_env().is_ok());

        reset_env();
    }

    #[test]
    #[serial]
    fn test_production_guards() {
        reset_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("STORAGE_BACKEND", "memory");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://quickrecipe.app");
        assert!(Config::from_env().is_err(), "missing secret must fail");

        std::env::set_var("SESSION_SECRET", "prod-secret");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "*");
        assert!(Config::from_env().is_err(), "wildcard CORS must fail");

        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://quickrecipe.app, https://admin.quickrecipe.app");
        let config = Config::from_env().unwrap();
        assert!(config.session.secure_cookie);
        assert_eq!(config.cors_origins().len(), 2);

        reset_env();
    }

    #[test]
    #[serial]
    fn test_unknown_provider_rejected() {
        reset_env();
        std::env::set_var("STORAGE_BACKEND", "memory");
        std::env::set_var("RECIPE_PROVIDER", "llama");
        assert!(Config::from_env().is_err());

        std::env::set_var("RECIPE_PROVIDER", "DeepSeek");
        assert_eq!(
            Config::from_env().unwrap().ai.recipe_provider,
            RecipeProvider::DeepSeek
        );

        reset_env();
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = Config::default();
        config.ai.gemini_api_key = Some("sk-very-secret".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-very-secret"));
        assert!(!rendered.contains(DEV_SESSION_SECRET));
    }
}
