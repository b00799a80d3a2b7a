//! Conversation logic shared by the Dialogflow webhook and the direct chat
//! API: symptom gathering, disease narrowing and response phrasing.

use serde_json::Value;

use crate::web::AppState;
use crate::web::models::dialogflow_models::QueryResult;

pub const PROMPT_DESCRIBE: &str = "Could you describe your symptoms in more detail?";
pub const PROMPT_FALLBACK: &str = "I didn't understand that. Could you describe your symptoms?";
pub const PROMPT_NO_MATCH: &str =
    "I couldn't identify any matching diseases. Please consult a doctor.";
pub const EMERGENCY_WARNING: &str = "EMERGENCY: Please seek immediate medical attention!";
pub const EMERGENCY_GUIDANCE: &str =
    "Please call emergency services immediately! This seems serious.";
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// Pulls symptoms out of a Dialogflow query result. Any parameter whose name
/// mentions "symptom" is considered; list values are normalized entry by
/// entry, string values are scanned as free text. When the parameters yield
/// nothing the raw utterance is scanned as a last resort.
pub async fn symptoms_from_query(state: &AppState, query: &QueryResult, lang: &str) -> Vec<String> {
    let mut symptoms: Vec<String> = Vec::new();
    let mut push = |symptom: String| {
        if !symptoms.contains(&symptom) {
            symptoms.push(symptom);
        }
    };

    for (name, value) in &query.parameters {
        if !name.to_lowercase().contains("symptom") {
            continue;
        }
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = item.as_str() {
                        let english = state.to_english(text, lang).await;
                        if let Some(canonical) = state.knowledge.normalize_symptom(&english) {
                            push(canonical);
                        }
                    }
                }
            }
            Value::String(text) => {
                let english = state.to_english(text, lang).await;
                for canonical in state.knowledge.extract_symptoms(&english) {
                    push(canonical);
                }
            }
            _ => {}
        }
    }

    if symptoms.is_empty() && !query.query_text.is_empty() {
        let english = state.to_english(&query.query_text, lang).await;
        symptoms = state.knowledge.extract_symptoms(&english);
    }
    symptoms
}

/// Runs the narrowing logic over the accumulated symptom set and phrases the
/// reply. `final_turn` is set when the user said there are no more symptoms:
/// instead of asking another follow-up question the remaining candidates are
/// reported as-is.
pub async fn respond_for_symptoms(
    state: &AppState,
    session_id: &str,
    symptoms: &[String],
    lang: &str,
    final_turn: bool,
) -> String {
    if symptoms.is_empty() {
        let prompt = if final_turn { PROMPT_NO_MATCH } else { PROMPT_DESCRIBE };
        state.sessions.clear(session_id);
        return state.localize(prompt, lang).await;
    }

    let candidates = state.knowledge.identify_diseases(symptoms);
    match candidates.len() {
        0 => {
            state.sessions.clear(session_id);
            state.localize(PROMPT_NO_MATCH, lang).await
        }
        1 => {
            state.sessions.clear(session_id);
            diagnosis_message(state, &candidates[0], symptoms, lang).await
        }
        _ if final_turn => {
            state.sessions.clear(session_id);
            let message = format!(
                "Based on your symptoms, possible conditions include: {}. \
                 Please consult a doctor for a confirmed diagnosis.",
                candidates.join(", ")
            );
            state.localize(&message, lang).await
        }
        _ => {
            let next = state.knowledge.next_symptoms(&candidates, symptoms);
            state.sessions.set_awaiting_confirmation(session_id, true);
            let question = format!(
                "Do you also have any of these symptoms: {}?",
                next.join(", ")
            );
            state.localize(&question, lang).await
        }
    }
}

async fn diagnosis_message(
    state: &AppState,
    disease: &str,
    symptoms: &[String],
    lang: &str,
) -> String {
    let (description, precautions) = state.knowledge.disease_info(disease);
    let diagnosis = format!("You might have {disease}. {description}. Precautions: {precautions}");
    let message = if state.knowledge.is_emergency(symptoms) {
        format!("{EMERGENCY_WARNING} {diagnosis}")
    } else {
        diagnosis
    };
    state.localize(&message, lang).await
}
