use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

pub const DISEASE_FILE: &str = "disease.csv";
pub const DESCRIPTION_FILE: &str = "symptom_Description.csv";
pub const PRECAUTION_FILE: &str = "symptom_precaution.csv";
pub const SEVERITY_FILE: &str = "Symptom-severity.csv";

/// Severity value that marks a symptom as a medical emergency.
pub const EMERGENCY_SEVERITY: u8 = 7;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("dataset file {0} contains no usable rows")]
    Empty(String),
}

#[derive(Debug, Deserialize)]
struct DescriptionRow {
    #[serde(rename = "Disease")]
    disease: String,
    #[serde(rename = "Description")]
    description: String,
}

#[derive(Debug, Deserialize)]
struct SeverityRow {
    #[serde(rename = "Symptom")]
    symptom: String,
    #[serde(rename = "Severity")]
    severity: u8,
}

/// The in-memory symptom/disease knowledge base, loaded once at startup
/// from the four dataset CSV files.
///
/// Canonical symptom names are the entries of the severity file, normalized
/// to lowercase with underscores replaced by spaces so they can be matched
/// against natural-language utterances. If the severity file repeats a
/// symptom, the first row wins and later rows are logged and ignored.
#[derive(Debug)]
pub struct KnowledgeBase {
    /// Disease -> deduplicated symptom list (symptoms in canonical form).
    diseases: BTreeMap<String, Vec<String>>,
    descriptions: HashMap<String, String>,
    precautions: HashMap<String, Vec<String>>,
    severity: HashMap<String, u8>,
    /// Canonical symptoms in file order, for deterministic scanning.
    symptoms: Vec<String>,
}

pub(crate) fn canonicalize(raw: &str) -> String {
    raw.trim().to_lowercase().replace('_', " ")
}

impl KnowledgeBase {
    /// Loads all four dataset files from `dir`. Any missing or malformed
    /// file aborts the load; the caller is expected to treat this as fatal.
    pub fn load(dir: &Path) -> Result<Self, DatasetError> {
        let open = |name: &str| -> Result<File, DatasetError> {
            let path = dir.join(name);
            File::open(&path).map_err(|source| DatasetError::Io {
                path: path.display().to_string(),
                source,
            })
        };

        Self::from_readers(
            open(DISEASE_FILE)?,
            open(DESCRIPTION_FILE)?,
            open(PRECAUTION_FILE)?,
            open(SEVERITY_FILE)?,
        )
    }

    /// Builds the knowledge base from already-open readers. Used by `load`
    /// and directly by tests with in-memory CSV fixtures.
    pub fn from_readers<R: Read>(
        disease: R,
        description: R,
        precaution: R,
        severity: R,
    ) -> Result<Self, DatasetError> {
        let severity_rows = parse_severity(severity)?;
        let mut severity_map = HashMap::new();
        let mut symptoms = Vec::new();
        for row in severity_rows {
            let canonical = canonicalize(&row.symptom);
            if canonical.is_empty() {
                continue;
            }
            // Duplicate rows keep the first severity seen.
            if severity_map.contains_key(&canonical) {
                warn!(symptom = %canonical, "duplicate severity entry ignored");
                continue;
            }
            severity_map.insert(canonical.clone(), row.severity);
            symptoms.push(canonical);
        }
        if symptoms.is_empty() {
            return Err(DatasetError::Empty(SEVERITY_FILE.to_string()));
        }

        let diseases = parse_diseases(disease)?;
        if diseases.is_empty() {
            return Err(DatasetError::Empty(DISEASE_FILE.to_string()));
        }

        let descriptions = parse_descriptions(description)?;
        let precautions = parse_precautions(precaution)?;

        // Diseases without a description still get served, but the gap is
        // worth flagging at startup (mirrors the agent provisioning scripts).
        for disease_name in diseases.keys() {
            if !descriptions.contains_key(disease_name) {
                warn!(disease = %disease_name, "disease has no description entry");
            }
        }

        Ok(Self {
            diseases,
            descriptions,
            precautions,
            severity: severity_map,
            symptoms,
        })
    }

    pub fn disease_count(&self) -> usize {
        self.diseases.len()
    }

    pub fn symptom_count(&self) -> usize {
        self.symptoms.len()
    }

    pub(crate) fn diseases(&self) -> &BTreeMap<String, Vec<String>> {
        &self.diseases
    }

    pub(crate) fn symptoms(&self) -> &[String] {
        &self.symptoms
    }

    pub(crate) fn description(&self, disease: &str) -> Option<&str> {
        self.descriptions.get(disease).map(String::as_str)
    }

    pub(crate) fn precautions(&self, disease: &str) -> Option<&[String]> {
        self.precautions.get(disease).map(Vec::as_slice)
    }

    pub fn severity(&self, symptom: &str) -> Option<u8> {
        self.severity.get(symptom).copied()
    }
}

fn parse_severity<R: Read>(reader: R) -> Result<Vec<SeverityRow>, DatasetError> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize()
        .collect::<Result<Vec<SeverityRow>, csv::Error>>()
        .map_err(|source| DatasetError::Csv {
            path: SEVERITY_FILE.to_string(),
            source,
        })
}

/// disease.csv is sparse: one disease per row, a variable number of symptom
/// columns, and typically many rows per disease. Rows for the same disease
/// are merged into one deduplicated symptom list.
fn parse_diseases<R: Read>(reader: R) -> Result<BTreeMap<String, Vec<String>>, DatasetError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut diseases: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in rdr.records() {
        let record = record.map_err(|source| DatasetError::Csv {
            path: DISEASE_FILE.to_string(),
            source,
        })?;
        let Some(disease) = record.get(0).map(str::trim).filter(|d| !d.is_empty()) else {
            continue;
        };
        let entry = diseases.entry(disease.to_string()).or_default();
        for field in record.iter().skip(1) {
            let symptom = canonicalize(field);
            if !symptom.is_empty() && !entry.contains(&symptom) {
                entry.push(symptom);
            }
        }
    }
    Ok(diseases)
}

fn parse_descriptions<R: Read>(reader: R) -> Result<HashMap<String, String>, DatasetError> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut descriptions = HashMap::new();
    for row in rdr.deserialize() {
        let row: DescriptionRow = row.map_err(|source| DatasetError::Csv {
            path: DESCRIPTION_FILE.to_string(),
            source,
        })?;
        descriptions.insert(row.disease, row.description);
    }
    Ok(descriptions)
}

/// symptom_precaution.csv has a disease column followed by up to four
/// `Precaution_N` columns, some of them blank.
fn parse_precautions<R: Read>(reader: R) -> Result<HashMap<String, Vec<String>>, DatasetError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut precautions = HashMap::new();
    for record in rdr.records() {
        let record = record.map_err(|source| DatasetError::Csv {
            path: PRECAUTION_FILE.to_string(),
            source,
        })?;
        let Some(disease) = record.get(0).map(str::trim).filter(|d| !d.is_empty()) else {
            continue;
        };
        let steps: Vec<String> = record
            .iter()
            .skip(1)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        precautions.insert(disease.to_string(), steps);
    }
    Ok(precautions)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const DISEASE_CSV: &str = "\
Disease,Symptom_1,Symptom_2,Symptom_3
Common Cold,runny nose,sneezing,sore throat
Common Cold,cough,sneezing,fatigue
Migraine,headache,nausea,blurred vision
Migraine,fatigue,headache,
Heart attack,chest pain,breathlessness,sweating
";

    pub(crate) const DESCRIPTION_CSV: &str = "\
Disease,Description
Common Cold,A viral infection of the upper respiratory tract.
Migraine,A neurological condition causing intense headaches.
Heart attack,Blockage of blood flow to the heart muscle.
";

    pub(crate) const PRECAUTION_CSV: &str = "\
Disease,Precaution_1,Precaution_2,Precaution_3,Precaution_4
Common Cold,rest,drink warm fluids,,
Migraine,rest in a dark room,avoid triggers,stay hydrated,
Heart attack,call emergency services,chew aspirin,,
";

    pub(crate) const SEVERITY_CSV: &str = "\
Symptom,Severity
runny_nose,1
sneezing,1
sore_throat,2
cough,2
headache,3
nausea,4
blurred_vision,4
chest_pain,7
breathlessness,6
sweating,3
fatigue,3
fever,4
high_fever,5
";

    pub(crate) fn fixture() -> KnowledgeBase {
        KnowledgeBase::from_readers(
            DISEASE_CSV.as_bytes(),
            DESCRIPTION_CSV.as_bytes(),
            PRECAUTION_CSV.as_bytes(),
            SEVERITY_CSV.as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn loads_and_merges_duplicate_disease_rows() {
        let kb = fixture();
        assert_eq!(kb.disease_count(), 3);
        let cold = &kb.diseases()["Common Cold"];
        assert_eq!(
            cold,
            &vec![
                "runny nose".to_string(),
                "sneezing".to_string(),
                "sore throat".to_string(),
                "cough".to_string(),
                "fatigue".to_string(),
            ]
        );
    }

    #[test]
    fn canonicalizes_underscored_severity_symptoms() {
        let kb = fixture();
        assert_eq!(kb.severity("chest pain"), Some(7));
        assert_eq!(kb.severity("runny nose"), Some(1));
        assert_eq!(kb.severity("chest_pain"), None);
    }

    #[test]
    fn duplicate_severity_rows_keep_the_first_value() {
        let severity = "Symptom,Severity\ncough,2\ncough,6\nheadache,3\n";
        let kb = KnowledgeBase::from_readers(
            DISEASE_CSV.as_bytes(),
            DESCRIPTION_CSV.as_bytes(),
            PRECAUTION_CSV.as_bytes(),
            severity.as_bytes(),
        )
        .unwrap();
        assert_eq!(kb.severity("cough"), Some(2));
        assert_eq!(kb.symptom_count(), 2);
    }

    #[test]
    fn empty_severity_file_is_an_error() {
        let result = KnowledgeBase::from_readers(
            DISEASE_CSV.as_bytes(),
            DESCRIPTION_CSV.as_bytes(),
            PRECAUTION_CSV.as_bytes(),
            "Symptom,Severity\n".as_bytes(),
        );
        assert!(matches!(result, Err(DatasetError::Empty(_))));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DISEASE_FILE), DISEASE_CSV).unwrap();
        std::fs::write(dir.path().join(DESCRIPTION_FILE), DESCRIPTION_CSV).unwrap();
        std::fs::write(dir.path().join(PRECAUTION_FILE), PRECAUTION_CSV).unwrap();
        std::fs::write(dir.path().join(SEVERITY_FILE), SEVERITY_CSV).unwrap();

        let kb = KnowledgeBase::load(dir.path()).unwrap();
        assert_eq!(kb.disease_count(), 3);
        assert_eq!(kb.symptom_count(), 13);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = KnowledgeBase::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains(DISEASE_FILE));
    }
}
