use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// The slice of a Dialogflow query result the chat flow cares about.
#[derive(Debug, Clone, Default)]
pub struct DetectedIntent {
    pub query_text: String,
    pub intent: String,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum NluError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Dialogflow returned status {0}: {1}")]
    Status(reqwest::StatusCode, String),
    #[error("unexpected Dialogflow response: {0}")]
    Malformed(String),
}

/// Intent detection for the direct chat API. The webhook path never calls
/// this: there Dialogflow has already run detection and sends us the result.
#[async_trait]
pub trait IntentDetector: Send + Sync {
    async fn detect_intent(
        &self,
        session_id: &str,
        text: &str,
        language: &str,
    ) -> Result<DetectedIntent, NluError>;
}

pub struct DialogflowClient {
    client: Client,
    project_id: String,
    token: String,
}

impl DialogflowClient {
    pub fn new(project_id: String, token: String) -> Self {
        Self {
            client: Client::new(),
            project_id,
            token,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    query_result: Option<RemoteQueryResult>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RemoteQueryResult {
    #[serde(default)]
    query_text: String,
    #[serde(default)]
    parameters: serde_json::Map<String, serde_json::Value>,
    intent: Option<RemoteIntent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteIntent {
    #[serde(default)]
    display_name: String,
}

#[async_trait]
impl IntentDetector for DialogflowClient {
    async fn detect_intent(
        &self,
        session_id: &str,
        text: &str,
        language: &str,
    ) -> Result<DetectedIntent, NluError> {
        let url = format!(
            "https://dialogflow.googleapis.com/v2/projects/{}/agent/sessions/{}:detectIntent",
            self.project_id, session_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({
                "queryInput": {
                    "text": { "text": text, "languageCode": language }
                }
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NluError::Status(status, body));
        }

        let body: DetectIntentResponse = response.json().await?;
        let result = body
            .query_result
            .ok_or_else(|| NluError::Malformed("missing queryResult".to_string()))?;
        Ok(DetectedIntent {
            query_text: result.query_text,
            intent: result
                .intent
                .map(|i| i.display_name)
                .unwrap_or_default(),
            parameters: result.parameters,
        })
    }
}

/// Offline fallback when no Dialogflow credentials are configured. Every
/// utterance is treated as a symptom report, which the extraction step in
/// the chat flow handles on its own.
pub struct KeywordIntentDetector;

#[async_trait]
impl IntentDetector for KeywordIntentDetector {
    async fn detect_intent(
        &self,
        _session_id: &str,
        text: &str,
        _language: &str,
    ) -> Result<DetectedIntent, NluError> {
        Ok(DetectedIntent {
            query_text: text.to_string(),
            intent: "General Symptoms".to_string(),
            parameters: serde_json::Map::new(),
        })
    }
}
