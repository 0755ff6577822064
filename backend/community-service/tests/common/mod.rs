#![allow(dead_code)]

use actix_web::cookie::Cookie;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use community_service::config::Config;
use community_service::db::{MemoryStore, PostRepository, UserRepository};
use community_service::models::{CommunityPost, NewPost, NewUser, User};
use community_service::services::llm::{CompletionRequest, LlmError, LlmProvider, LlmResult};
use community_service::{AiProviders, AppState};

type Script = dyn Fn(&CompletionRequest) -> LlmResult<String> + Send + Sync;

/// Provider whose replies are decided by a closure; counts its calls.
pub struct ScriptedProvider {
    script: Box<Script>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(
        script: impl Fn(&CompletionRequest) -> LlmResult<String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn replying(reply: &str) -> Arc<Self> {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub fn failing() -> Arc<Self> {
        Self::new(|_| {
            Err(LlmError::Http {
                status: 503,
                body: "upstream unavailable".to_string(),
            })
        })
    }

    /// Accepts everything
    pub fn approving() -> Arc<Self> {
        Self::replying(r#"{"isAppropriate": true, "confidence": 0.99}"#)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> LlmResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(&request)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

/// State over a fresh in-memory store; the vision model always approves.
pub fn context(moderation: Arc<ScriptedProvider>, recipes: Arc<ScriptedProvider>) -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let providers = AiProviders {
        text: moderation,
        vision: ScriptedProvider::approving(),
        recipes,
    };
    let state = AppState::new(
        Config::default(),
        store.clone(),
        providers,
        reqwest::Client::new(),
    );
    TestContext { state, store }
}

pub fn default_context() -> TestContext {
    context(ScriptedProvider::approving(), ScriptedProvider::failing())
}

impl TestContext {
    /// Create a user directly in the store and open a session for it.
    pub async fn login_as(&self, username: &str, is_admin: bool) -> (User, Cookie<'static>) {
        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: "unused".to_string(),
                email: None,
                is_admin,
                is_guest: false,
            })
            .await
            .unwrap()
            .expect("username is free");
        let cookie = self.state.sessions.create(user.id).await.unwrap();
        (user, cookie)
    }

    pub async fn seed_post(&self, user_id: i32, title: &str) -> CommunityPost {
        self.store
            .create_post(NewPost {
                user_id,
                title: title.to_string(),
                content: format!("{} content", title),
                image_url: None,
            })
            .await
            .unwrap()
    }
}

/// Build the service under test from a [`TestContext`].
#[macro_export]
macro_rules! init_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.state.clone()))
                .configure(community_service::handlers::configure),
        )
        .await
    };
}
