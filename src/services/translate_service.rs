use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Languages the assistant speaks: English plus nine Indian languages.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("hi", "Hindi"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("kn", "Kannada"),
    ("ml", "Malayalam"),
    ("bn", "Bengali"),
    ("mr", "Marathi"),
    ("gu", "Gujarati"),
    ("pa", "Punjabi"),
];

pub fn is_supported_language(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code)
}

/// Dialogflow sends BCP-47 codes like `hi-IN`; the datasets and the
/// translate API work on the bare language part.
pub fn base_language(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("translate API returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected translate API response: {0}")]
    Malformed(String),
}

/// A text translation backend. The HTTP implementation talks to the Google
/// Translate v2 REST API; the no-op implementation stands in when no API key
/// is configured and in tests.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Detects the language of `text`, returning a bare language code.
    async fn detect(&self, text: &str) -> Result<String, TranslateError>;

    /// Translates `text` into `target`. Implementations may assume the
    /// caller already short-circuited the `target == "en"` identity case.
    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError>;
}

const TRANSLATE_URL: &str = "https://translation.googleapis.com/language/translate/v2";
const DETECT_URL: &str = "https://translation.googleapis.com/language/translate/v2/detect";

pub struct GoogleTranslator {
    client: Client,
    api_key: String,
}

impl GoogleTranslator {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<Translation>,
    #[serde(default)]
    detections: Vec<Vec<Detection>>,
}

#[derive(Deserialize)]
struct Translation {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Deserialize)]
struct Detection {
    language: String,
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn detect(&self, text: &str) -> Result<String, TranslateError> {
        let response = self
            .client
            .post(DETECT_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "q": text }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status));
        }
        let body: TranslateResponse = response.json().await?;
        body.data
            .detections
            .first()
            .and_then(|d| d.first())
            .map(|d| d.language.clone())
            .ok_or_else(|| TranslateError::Malformed("no detections in response".to_string()))
    }

    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError> {
        let response = self
            .client
            .post(TRANSLATE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "q": text, "target": target, "format": "text" }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status));
        }
        let body: TranslateResponse = response.json().await?;
        body.data
            .translations
            .first()
            .map(|t| t.translated_text.clone())
            .ok_or_else(|| TranslateError::Malformed("no translations in response".to_string()))
    }
}

/// Passes text through unchanged and reports everything as English.
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn detect(&self, _text: &str) -> Result<String, TranslateError> {
        Ok("en".to_string())
    }

    async fn translate(&self, text: &str, _target: &str) -> Result<String, TranslateError> {
        Ok(text.to_string())
    }
}
