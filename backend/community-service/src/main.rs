use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use community_service::config::{Config, StorageBackend};
use community_service::db::{MemoryStore, PgStore, SessionRepository, Store};
use community_service::services::llm::{build_http_client, LlmProvider};
use community_service::{handlers, metrics, AiProviders, AppState};
use db_pool::{create_pool, DbConfig};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "community_service=info,actix_web=info,sqlx=warn".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.database.backend {
        StorageBackend::Postgres => {
            let url = config
                .database
                .url
                .clone()
                .ok_or_else(|| anyhow!("DATABASE_URL environment variable not set"))?;
            let db_config = DbConfig::new("community-service", url);
            db_config.log_config();

            let pool = create_pool(db_config)
                .await
                .context("Failed to connect to PostgreSQL")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            info!("Database migrations completed");

            Ok(Arc::new(PgStore::new(pool)))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; all data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Periodically drop expired sessions
fn spawn_session_purge(store: Arc<dyn Store>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match store.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Expired sessions removed"),
                Err(e) => warn!(error = %e, "Failed to purge expired sessions"),
            }
        }
    });
}

fn build_cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials()
        .max_age(3600);

    if origins.is_empty() {
        cors.allow_any_origin()
    } else {
        origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin))
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()
        .map_err(|e| anyhow!(e))
        .context("Failed to load configuration")?;

    info!("Starting community-service v{}", env!("CARGO_PKG_VERSION"));
    info!(env = %config.app.env, storage = ?config.database.backend, "Configuration loaded");

    if config.ai.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; moderation allows all content");
    }

    let store = open_store(&config).await?;
    spawn_session_purge(store.clone());

    let http = build_http_client(config.ai.request_timeout_secs)
        .context("Failed to build HTTP client")?;
    let providers = AiProviders::from_config(&http, &config.ai);
    info!(
        recipe_provider = providers.recipes.name(),
        "AI providers configured"
    );

    let bind_addr = (config.app.host.clone(), config.app.port);
    let origins = config.cors_origins();
    let state = web::Data::new(AppState::new(config, store, providers, http));

    info!("Listening on {}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&origins))
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
            .route("/metrics", web::get().to(metrics::serve_metrics))
    })
    .bind(bind_addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")?;

    Ok(())
}
