use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_dataset_dir")]
    pub dataset_dir: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Google Cloud project that owns the Dialogflow agent. Only needed by
    /// the /chat flow; the webhook flow works without it.
    pub project_id: Option<String>,

    /// API key for the Google Translate v2 API. Absent means responses are
    /// served untranslated.
    pub translate_api_key: Option<String>,

    /// OAuth bearer token for the Dialogflow detectIntent API.
    pub dialogflow_token: Option<String>,

    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    port: Option<u16>,
    dataset_dir: Option<String>,
    log_dir: Option<String>,
    project_id: Option<String>,
    translate_api_key: Option<String>,
    dialogflow_token: Option<String>,
    session_ttl_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

fn default_port() -> u16 {
    8080
}

fn default_dataset_dir() -> String {
    "data".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_session_ttl_secs() -> u64 {
    30 * 60
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialServerConfig::default()
            }
        } else {
            PartialServerConfig::default()
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        Ok(ServerConfig {
            port: env_config.port.or(file_config.port).unwrap_or_else(default_port),
            dataset_dir: env_config
                .dataset_dir
                .or(file_config.dataset_dir)
                .unwrap_or_else(default_dataset_dir),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            project_id: env_config.project_id.or(file_config.project_id),
            translate_api_key: env_config
                .translate_api_key
                .or(file_config.translate_api_key),
            dialogflow_token: env_config
                .dialogflow_token
                .or(file_config.dialogflow_token),
            session_ttl_secs: env_config
                .session_ttl_secs
                .or(file_config.session_ttl_secs)
                .unwrap_or_else(default_session_ttl_secs),
            request_timeout_secs: env_config
                .request_timeout_secs
                .or(file_config.request_timeout_secs)
                .unwrap_or_else(default_request_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_contract() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.dataset_dir, "data");
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.session_ttl_secs, 1800);
        assert!(config.project_id.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            port = 9090
            dataset_dir = "/srv/datasets"
            project_id = "my-health-project"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.dataset_dir, "/srv/datasets");
        assert_eq!(config.project_id.as_deref(), Some("my-health-project"));
        // untouched keys keep their defaults
        assert_eq!(config.session_ttl_secs, 1800);
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 8888\n").unwrap();

        let config = ServerConfig::load(path.to_str()).unwrap();
        assert_eq!(config.port, 8888);
    }
}
