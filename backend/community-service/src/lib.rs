// Community Service Library
//
// Quick Recipe backend: AI recipe generation, ingredient substitutions,
// the community feed with its moderation gate, and report handling.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;

use reqwest::Client as HttpClient;
use std::sync::Arc;

use config::{AiConfig, Config, RecipeProvider};
use db::Store;
use security::SessionManager;
use services::llm::{GeminiProvider, LlmProvider, OpenAiCompatibleProvider};
use services::{ContentModerator, Notifier, RecipeService, ReportService};

pub use error::{AppError, Result};

/// Generative models used by the service
#[derive(Clone)]
pub struct AiProviders {
    /// Text moderation
    pub text: Arc<dyn LlmProvider>,
    /// Image moderation
    pub vision: Arc<dyn LlmProvider>,
    /// Recipe generation, chosen by `RECIPE_PROVIDER`
    pub recipes: Arc<dyn LlmProvider>,
}

impl AiProviders {
    pub fn from_config(client: &HttpClient, ai: &AiConfig) -> Self {
        let text: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(
            client.clone(),
            ai.gemini_api_key.clone(),
            &ai.gemini_model,
        ));
        let vision: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(
            client.clone(),
            ai.gemini_api_key.clone(),
            &ai.gemini_vision_model,
        ));
        let recipes: Arc<dyn LlmProvider> = match ai.recipe_provider {
            RecipeProvider::Gemini => text.clone(),
            RecipeProvider::OpenAi => Arc::new(OpenAiCompatibleProvider::openai(
                client.clone(),
                ai.openai_api_key.clone(),
                &ai.openai_model,
            )),
            RecipeProvider::DeepSeek => Arc::new(OpenAiCompatibleProvider::deepseek(
                client.clone(),
                ai.deepseek_api_key.clone(),
                &ai.deepseek_model,
            )),
        };

        Self {
            text,
            vision,
            recipes,
        }
    }
}

/// Shared application state handed to every handler through `web::Data`
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub moderator: Arc<ContentModerator>,
    pub recipes: Arc<RecipeService>,
    pub reports: Arc<ReportService>,
    pub notifier: Arc<Notifier>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        providers: AiProviders,
        http: HttpClient,
    ) -> Self {
        let notifier = Arc::new(Notifier::new(
            http.clone(),
            &config.notifications,
            &config.app.public_url,
        ));
        let moderator = Arc::new(ContentModerator::new(
            providers.text,
            providers.vision,
            http,
            config.ai.max_image_bytes,
        ));
        let recipes = Arc::new(RecipeService::new(store.clone(), providers.recipes));
        let reports = Arc::new(ReportService::new(store.clone(), notifier.clone()));
        let sessions = Arc::new(SessionManager::new(store.clone(), &config.session));

        Self {
            config: Arc::new(config),
            store,
            moderator,
            recipes,
            reports,
            notifier,
            sessions,
        }
    }
}
