use axum::{Json, Router, extract::State, routing::post};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::web::AppState;
use crate::web::error::AppError;
use crate::web::fulfillment::{self, EMERGENCY_GUIDANCE};
use crate::web::models::{ChatRequest, ChatResponse};

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(handle_chat))
}

/// Direct chat endpoint, bypassing the Dialogflow webhook round trip. The
/// conversation runs in English. When no Dialogflow credentials are
/// configured the keyword detector stands in, so the endpoint works offline.
async fn handle_chat(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(AppError::InvalidInput("message must not be empty".to_string()));
    }

    let session_id = payload
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let detected = app_state.nlu.detect_intent(&session_id, message, "en").await?;

    info!(session = %session_id, intent = %detected.intent, "chat turn");

    let response = match detected.intent.as_str() {
        "Emergency" => EMERGENCY_GUIDANCE.to_string(),
        "No More Symptoms" => {
            let accumulated = app_state.sessions.symptoms(&session_id);
            fulfillment::respond_for_symptoms(&app_state, &session_id, &accumulated, "en", true)
                .await
        }
        _ => {
            let found = app_state.knowledge.extract_symptoms(&detected.query_text);
            if found.is_empty() && app_state.sessions.is_awaiting_confirmation(&session_id) {
                // A reply to a follow-up question with no new symptoms means
                // "no more symptoms": answer from what we have.
                let accumulated = app_state.sessions.symptoms(&session_id);
                fulfillment::respond_for_symptoms(&app_state, &session_id, &accumulated, "en", true)
                    .await
            } else {
                let accumulated = app_state.sessions.add_symptoms(&session_id, found);
                fulfillment::respond_for_symptoms(&app_state, &session_id, &accumulated, "en", false)
                    .await
            }
        }
    };

    Ok(Json(ChatResponse {
        response,
        session_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_state;

    #[tokio::test]
    async fn chat_accumulates_symptoms_across_turns() {
        let state = test_state();

        let first = handle_chat(
            State(state.clone()),
            Json(ChatRequest {
                message: "I feel really tired and fatigue all day".to_string(),
                session_id: Some("chat-1".to_string()),
            }),
        )
        .await
        .unwrap();
        assert!(first.0.response.starts_with("Do you also have any of these symptoms:"));
        assert_eq!(first.0.session_id, "chat-1");

        let second = handle_chat(
            State(state),
            Json(ChatRequest {
                message: "I also keep sneezing".to_string(),
                session_id: Some("chat-1".to_string()),
            }),
        )
        .await
        .unwrap();
        assert!(second.0.response.contains("You might have Common Cold"));
    }

    #[tokio::test]
    async fn denying_further_symptoms_ends_with_candidates() {
        let state = test_state();

        let first = handle_chat(
            State(state.clone()),
            Json(ChatRequest {
                message: "constant fatigue".to_string(),
                session_id: Some("chat-2".to_string()),
            }),
        )
        .await
        .unwrap();
        assert!(first.0.response.starts_with("Do you also have any of these symptoms:"));

        let second = handle_chat(
            State(state),
            Json(ChatRequest {
                message: "no, nothing else".to_string(),
                session_id: Some("chat-2".to_string()),
            }),
        )
        .await
        .unwrap();
        assert!(second.0.response.contains("possible conditions include: Common Cold, Migraine"));
    }

    #[tokio::test]
    async fn missing_session_id_gets_generated() {
        let state = test_state();
        let reply = handle_chat(
            State(state),
            Json(ChatRequest {
                message: "I have a headache".to_string(),
                session_id: None,
            }),
        )
        .await
        .unwrap();
        assert!(!reply.0.session_id.is_empty());
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let state = test_state();
        let result = handle_chat(
            State(state),
            Json(ChatRequest {
                message: "   ".to_string(),
                session_id: None,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
