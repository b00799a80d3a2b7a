use serde::{Deserialize, Serialize};

pub mod dialogflow_models;

#[derive(Deserialize, Debug)]
pub struct ChatRequest {
    pub message: String,
    /// Omitted on the first turn; the server then assigns one.
    pub session_id: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}
