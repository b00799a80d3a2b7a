pub mod diagnosis;
pub mod server;
pub mod services;
pub mod version;
pub mod web;

use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{debug, error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::diagnosis::KnowledgeBase;
use crate::server::config::ServerConfig;
use crate::server::session::SessionStore;
use crate::services::dialogflow_service::{DialogflowClient, IntentDetector, KeywordIntentDetector};
use crate::services::translate_service::{GoogleTranslator, NoopTranslator, Translator};
use crate::version::VERSION;
use crate::web::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "webhook.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` if RUST_LOG is not set.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

const SESSION_PRUNE_INTERVAL_SECONDS: u64 = 60;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Manually check for --version before full parsing to keep the output simple.
    if std::env::args().any(|arg| arg == "--version") {
        println!("Webhook version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    dotenv().ok();

    // --- Server Config Setup ---
    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!("Starting health assistant webhook, version: {}", VERSION);

    // --- Knowledge Base Setup ---
    // Missing or malformed datasets are fatal, like a failed image build.
    let knowledge = match KnowledgeBase::load(Path::new(&config.dataset_dir)) {
        Ok(kb) => {
            info!(
                diseases = kb.disease_count(),
                symptoms = kb.symptom_count(),
                dir = %config.dataset_dir,
                "Knowledge base loaded."
            );
            Arc::new(kb)
        }
        Err(e) => {
            error!(error = %e, "Failed to load datasets.");
            return Err(e.into());
        }
    };

    // --- Translation Client Setup ---
    let translator: Arc<dyn Translator> = match config.translate_api_key.clone() {
        Some(api_key) => {
            info!("Google Translate client enabled.");
            Arc::new(GoogleTranslator::new(api_key))
        }
        None => {
            info!("No translate API key configured, responses will be served in English.");
            Arc::new(NoopTranslator)
        }
    };

    // --- Intent Detection Client Setup ---
    let nlu: Arc<dyn IntentDetector> =
        match (config.project_id.clone(), config.dialogflow_token.clone()) {
            (Some(project_id), Some(token)) => {
                info!(project_id = %project_id, "Dialogflow intent detection enabled for /chat.");
                Arc::new(DialogflowClient::new(project_id, token))
            }
            _ => {
                info!("Dialogflow credentials not configured, /chat uses keyword extraction only.");
                Arc::new(KeywordIntentDetector)
            }
        };

    // --- Session Store and Pruning Task ---
    let sessions = Arc::new(SessionStore::new(config.session_ttl_secs));
    let sessions_for_prune = sessions.clone();
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(SESSION_PRUNE_INTERVAL_SECONDS));
        info!("Session pruning task started.");
        loop {
            interval.tick().await;
            let removed = sessions_for_prune.prune_idle();
            if removed > 0 {
                info!(
                    removed = removed,
                    active = sessions_for_prune.len(),
                    "Pruned idle conversation sessions."
                );
            } else {
                debug!(active = sessions_for_prune.len(), "No idle sessions to prune.");
            }
        }
    });

    // --- Axum HTTP Server Setup ---
    let app_state = Arc::new(AppState {
        knowledge,
        sessions,
        translator,
        nlu,
        config: config.clone(),
    });
    let app = web::create_axum_router(app_state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()?
    } else {
        tokio::net::TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.set_keepalive(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(1024)?;
    info!(address = %addr, "Webhook server listening");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(Box::new)?;

    Ok(())
}
