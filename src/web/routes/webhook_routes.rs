use axum::{Json, Router, extract::State, routing::post};
use uuid::Uuid;
use std::sync::Arc;
use tracing::{error, info};

use crate::server::session::session_id_from_path;
use crate::services::translate_service::{base_language, is_supported_language};
use crate::web::AppState;
use crate::web::error::AppError;
use crate::web::fulfillment::{
    self, APOLOGY, EMERGENCY_GUIDANCE, PROMPT_FALLBACK,
};
use crate::web::models::dialogflow_models::{WebhookRequest, WebhookResponse};

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", post(handle_webhook))
}

/// Dialogflow fulfillment endpoint. Per the fulfillment contract this never
/// returns a non-200: any processing error is mapped to an apology message
/// so the agent can still answer the user.
async fn handle_webhook(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<WebhookRequest>,
) -> Json<WebhookResponse> {
    match fulfill(&app_state, &request).await {
        Ok(message) => Json(WebhookResponse::text(message)),
        Err(e) => {
            error!(session = %request.session, error = %e, "webhook fulfillment failed");
            Json(WebhookResponse::text(APOLOGY))
        }
    }
}

async fn fulfill(state: &AppState, request: &WebhookRequest) -> Result<String, AppError> {
    let query = &request.query_result;

    if query.query_text.is_empty() && query.parameters.is_empty() && query.intent.is_none() {
        return Err(AppError::InvalidInput(
            "fulfillment request carries no query result".to_string(),
        ));
    }

    let mut lang = match query.language_code.as_deref() {
        Some(code) if !code.is_empty() => base_language(code).to_string(),
        _ => state.detect_language(&query.query_text).await,
    };
    if !is_supported_language(&lang) {
        lang = "en".to_string();
    }

    // A request without a session path still gets isolated state: sharing
    // one fallback id would mix symptoms from unrelated callers.
    let session_id = match session_id_from_path(&request.session) {
        "" => Uuid::new_v4().to_string(),
        id => id.to_string(),
    };
    let intent = query
        .intent
        .as_ref()
        .map(|i| i.display_name.as_str())
        .unwrap_or_default();

    info!(
        session = %session_id,
        intent = %intent,
        lang = %lang,
        query = %query.query_text,
        "incoming fulfillment request"
    );

    let found = fulfillment::symptoms_from_query(state, query, &lang).await;

    let message = match intent {
        "General Symptoms" | "Multiple Symptoms" | "Follow-up Symptoms" => {
            let accumulated = state.sessions.add_symptoms(&session_id, found);
            fulfillment::respond_for_symptoms(state, &session_id, &accumulated, &lang, false).await
        }
        "No More Symptoms" => {
            let accumulated = state.sessions.add_symptoms(&session_id, found);
            fulfillment::respond_for_symptoms(state, &session_id, &accumulated, &lang, true).await
        }
        "Emergency" => state.localize(EMERGENCY_GUIDANCE, &lang).await,
        _ => state.localize(PROMPT_FALLBACK, &lang).await,
    };

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_state;

    fn request(body: &str) -> WebhookRequest {
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn symptom_intent_with_single_match_diagnoses() {
        let state = test_state();
        let req = request(
            r#"{
                "queryResult": {
                    "queryText": "I have chest pain",
                    "languageCode": "en",
                    "parameters": {"symptom": ["chest pain"]},
                    "intent": {"displayName": "General Symptoms"}
                },
                "session": "projects/p/agent/sessions/s-diag"
            }"#,
        );

        let response = handle_webhook(State(state), Json(req)).await;
        assert!(response.0.fulfillment_text.contains("Heart attack"));
        assert!(response.0.fulfillment_text.starts_with("EMERGENCY"));
    }

    #[tokio::test]
    async fn follow_up_narrows_across_turns() {
        let state = test_state();

        let first = request(
            r#"{
                "queryResult": {
                    "queryText": "I feel tired",
                    "languageCode": "en",
                    "parameters": {"symptom": ["fatigue"]},
                    "intent": {"displayName": "General Symptoms"}
                },
                "session": "projects/p/agent/sessions/s-follow"
            }"#,
        );
        let response = handle_webhook(State(state.clone()), Json(first)).await;
        assert!(
            response
                .0
                .fulfillment_text
                .starts_with("Do you also have any of these symptoms:")
        );

        let second = request(
            r#"{
                "queryResult": {
                    "queryText": "yes I also have a headache",
                    "languageCode": "en",
                    "parameters": {"followup_symptom": "headache"},
                    "intent": {"displayName": "Follow-up Symptoms"}
                },
                "session": "projects/p/agent/sessions/s-follow"
            }"#,
        );
        let response = handle_webhook(State(state), Json(second)).await;
        assert!(response.0.fulfillment_text.contains("You might have Migraine"));
    }

    #[tokio::test]
    async fn sessionless_requests_do_not_share_state() {
        let state = test_state();

        let first = request(
            r#"{
                "queryResult": {
                    "queryText": "I feel tired",
                    "languageCode": "en",
                    "parameters": {"symptom": ["fatigue"]},
                    "intent": {"displayName": "General Symptoms"}
                },
                "session": ""
            }"#,
        );
        let response = handle_webhook(State(state.clone()), Json(first)).await;
        assert!(
            response
                .0
                .fulfillment_text
                .starts_with("Do you also have any of these symptoms:")
        );

        // If both requests landed in one shared session the accumulated set
        // [fatigue, chest pain] would match no disease at all.
        let second = request(
            r#"{
                "queryResult": {
                    "queryText": "I have chest pain",
                    "languageCode": "en",
                    "parameters": {"symptom": ["chest pain"]},
                    "intent": {"displayName": "General Symptoms"}
                },
                "session": ""
            }"#,
        );
        let response = handle_webhook(State(state), Json(second)).await;
        assert!(response.0.fulfillment_text.contains("Heart attack"));
        assert!(response.0.fulfillment_text.starts_with("EMERGENCY"));
    }

    #[tokio::test]
    async fn unknown_intent_returns_fallback_prompt() {
        let state = test_state();
        let req = request(
            r#"{
                "queryResult": {
                    "queryText": "what is the weather",
                    "languageCode": "en",
                    "intent": {"displayName": "Default Fallback Intent"}
                },
                "session": "projects/p/agent/sessions/s-fb"
            }"#,
        );
        let response = handle_webhook(State(state), Json(req)).await;
        assert_eq!(response.0.fulfillment_text, PROMPT_FALLBACK);
    }

    #[tokio::test]
    async fn emergency_intent_is_immediate() {
        let state = test_state();
        let req = request(
            r#"{
                "queryResult": {
                    "queryText": "I can't breathe",
                    "languageCode": "en",
                    "intent": {"displayName": "Emergency"}
                },
                "session": "projects/p/agent/sessions/s-em"
            }"#,
        );
        let response = handle_webhook(State(state), Json(req)).await;
        assert_eq!(response.0.fulfillment_text, EMERGENCY_GUIDANCE);
    }

    #[tokio::test]
    async fn empty_request_gets_an_apology_not_an_error() {
        let state = test_state();
        let response = handle_webhook(State(state), Json(WebhookRequest::default())).await;
        assert_eq!(response.0.fulfillment_text, APOLOGY);
    }

    #[tokio::test]
    async fn unsupported_language_degrades_to_english() {
        let state = test_state();
        let req = request(
            r#"{
                "queryResult": {
                    "queryText": "bonjour",
                    "languageCode": "fr",
                    "intent": {"displayName": "Default Welcome Intent"}
                },
                "session": "projects/p/agent/sessions/s-fr"
            }"#,
        );
        // With the no-op translator the reply text is the English prompt;
        // the point is that an unsupported code does not error.
        let response = handle_webhook(State(state), Json(req)).await;
        assert_eq!(response.0.fulfillment_text, PROMPT_FALLBACK);
    }
}
