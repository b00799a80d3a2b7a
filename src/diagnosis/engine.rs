use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};

use super::dataset::{EMERGENCY_SEVERITY, KnowledgeBase, canonicalize};

/// Colloquial phrasings mapped to their canonical symptom.
static SYMPTOM_SYNONYMS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        (
            "fever",
            &["feverish", "high temperature", "hot"] as &[&str],
        ),
        ("headache", &["head pain", "migraine"] as &[&str]),
        ("nausea", &["sick", "queasy"] as &[&str]),
    ])
});

impl KnowledgeBase {
    /// Maps free-form symptom text (already in English) to its canonical
    /// name, first against the severity list, then the synonym table. Input
    /// goes through the same canonicalization as the severity file, so the
    /// underscored dataset forms (`chest_pain`) that Dialogflow entities are
    /// provisioned from resolve too.
    pub fn normalize_symptom(&self, text: &str) -> Option<String> {
        let needle = canonicalize(text);
        if needle.is_empty() {
            return None;
        }
        if self.symptoms().iter().any(|s| *s == needle) {
            return Some(needle);
        }
        for (canonical, synonyms) in SYMPTOM_SYNONYMS.iter() {
            if needle == *canonical || synonyms.contains(&needle.as_str()) {
                return Some((*canonical).to_string());
            }
        }
        None
    }

    /// Scans an utterance (already in English) for every canonical symptom
    /// and every synonym-table hit. Deduplicated, in canonical-list order.
    pub fn extract_symptoms(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        let mut found: Vec<String> = self
            .symptoms()
            .iter()
            .filter(|s| haystack.contains(s.as_str()))
            .cloned()
            .collect();

        for (canonical, synonyms) in SYMPTOM_SYNONYMS.iter() {
            if synonyms.iter().any(|syn| haystack.contains(syn))
                && !found.iter().any(|f| f == canonical)
            {
                found.push((*canonical).to_string());
            }
        }

        // "fever" also matches inside "high fever"; keep only the most
        // specific hit when one symptom is contained in another.
        let shadowed: Vec<String> = found
            .iter()
            .filter(|s| {
                found
                    .iter()
                    .any(|other| other.len() > s.len() && other.contains(s.as_str()))
            })
            .cloned()
            .collect();
        found.retain(|s| !shadowed.contains(s));
        found
    }

    /// Diseases whose symptom set contains every given symptom. Sorted by
    /// disease name so responses are deterministic.
    pub fn identify_diseases(&self, symptoms: &[String]) -> Vec<String> {
        self.diseases()
            .iter()
            .filter(|(_, disease_symptoms)| {
                symptoms.iter().all(|s| disease_symptoms.contains(s))
            })
            .map(|(disease, _)| disease.clone())
            .collect()
    }

    /// Union of symptoms across the candidate diseases, minus the ones the
    /// user already reported. Used to phrase the follow-up question.
    pub fn next_symptoms(&self, candidates: &[String], known: &[String]) -> Vec<String> {
        let mut next = BTreeSet::new();
        for disease in candidates {
            if let Some(symptoms) = self.diseases().get(disease) {
                for symptom in symptoms {
                    if !known.contains(symptom) {
                        next.insert(symptom.clone());
                    }
                }
            }
        }
        next.into_iter().collect()
    }

    /// Description and comma-joined precautions for a disease. Gaps in the
    /// datasets degrade to placeholder text instead of failing the request.
    pub fn disease_info(&self, disease: &str) -> (String, String) {
        let description = self
            .description(disease)
            .unwrap_or("No description available")
            .to_string();
        let precaution_text = match self.precautions(disease) {
            Some(steps) if !steps.is_empty() => steps.join(", "),
            _ => "No precautions available".to_string(),
        };
        (description, precaution_text)
    }

    /// True when any reported symptom carries the maximum severity grade.
    pub fn is_emergency(&self, symptoms: &[String]) -> bool {
        symptoms
            .iter()
            .any(|s| self.severity(s) == Some(EMERGENCY_SEVERITY))
    }
}
