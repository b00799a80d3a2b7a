use axum::{Router, http::Method, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::warn;

use crate::diagnosis::KnowledgeBase;
use crate::server::config::ServerConfig;
use crate::server::session::SessionStore;
use crate::services::dialogflow_service::IntentDetector;
use crate::services::translate_service::Translator;

pub mod error;
pub mod fulfillment;
pub mod models;
pub mod routes;

pub struct AppState {
    pub knowledge: Arc<KnowledgeBase>,
    pub sessions: Arc<SessionStore>,
    pub translator: Arc<dyn Translator>,
    pub nlu: Arc<dyn IntentDetector>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Translates a response into the user's language. Translation failures
    /// never fail the request; the English text is served instead.
    pub async fn localize(&self, text: &str, lang: &str) -> String {
        if lang == "en" {
            return text.to_string();
        }
        match self.translator.translate(text, lang).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!(target_lang = %lang, error = %e, "translation failed, serving untranslated text");
                text.to_string()
            }
        }
    }

    /// Brings user input into English for symptom matching.
    pub async fn to_english(&self, text: &str, lang: &str) -> String {
        if lang == "en" {
            return text.to_string();
        }
        match self.translator.translate(text, "en").await {
            Ok(translated) => translated,
            Err(e) => {
                warn!(source_lang = %lang, error = %e, "translation to English failed, matching raw text");
                text.to_string()
            }
        }
    }

    pub async fn detect_language(&self, text: &str) -> String {
        match self.translator.detect(text).await {
            Ok(lang) => lang,
            Err(e) => {
                warn!(error = %e, "language detection failed, defaulting to English");
                "en".to_string()
            }
        }
    }
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let timeout = TimeoutLayer::new(Duration::from_secs(app_state.config.request_timeout_secs));

    Router::new()
        .route("/api/health", get(health_check_handler))
        .merge(routes::webhook_routes::create_router())
        .merge(routes::chat_routes::create_router())
        .with_state(app_state)
        .layer(timeout)
        .layer(cors)
}

#[cfg(test)]
pub(crate) fn test_state() -> Arc<AppState> {
    use crate::services::dialogflow_service::KeywordIntentDetector;
    use crate::services::translate_service::NoopTranslator;

    Arc::new(AppState {
        knowledge: Arc::new(crate::diagnosis::dataset::tests::fixture()),
        sessions: Arc::new(SessionStore::new(60)),
        translator: Arc::new(NoopTranslator),
        nlu: Arc::new(KeywordIntentDetector),
        config: Arc::new(ServerConfig::load(None).unwrap()),
    })
}
