//! Wire models for the Dialogflow v2 fulfillment protocol.

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub query_result: QueryResult,
    /// Full session resource path, `projects/<p>/agent/sessions/<id>`.
    #[serde(default)]
    pub session: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub query_text: String,
    pub language_code: Option<String>,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub intent: Option<IntentRef>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_text: String,
    pub payload: ResponsePayload,
}

#[derive(Serialize, Debug)]
pub struct ResponsePayload {
    pub google: GooglePayload,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GooglePayload {
    pub expect_user_response: bool,
    pub rich_response: RichResponse,
}

#[derive(Serialize, Debug)]
pub struct RichResponse {
    pub items: Vec<RichResponseItem>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RichResponseItem {
    pub simple_response: SimpleResponse,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SimpleResponse {
    pub text_to_speech: String,
    pub display_text: String,
}

impl WebhookResponse {
    /// A fulfillment response that speaks and displays the same text.
    pub fn text(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            fulfillment_text: message.clone(),
            payload: ResponsePayload {
                google: GooglePayload {
                    expect_user_response: true,
                    rich_response: RichResponse {
                        items: vec![RichResponseItem {
                            simple_response: SimpleResponse {
                                text_to_speech: message.clone(),
                                display_text: message,
                            },
                        }],
                    },
                },
            },
        }
    }
}
