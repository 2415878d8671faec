use std::path::Path;
use std::sync::Arc;

use quotelens::config::{AppState, Config};
use quotelens::logger;
use quotelens::model::Models;
use quotelens::server;

/// Config file used when no path is given (`config.toml`, optional)
const DEFAULT_CONFIG: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config_path = config_path.strip_suffix(".toml").unwrap_or(&config_path);
    let cfg = Config::load_from(config_path)?;

    logger::init(&cfg)?;

    // Worker threads from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let vectorizer_path = Path::new(&cfg.model.vectorizer_path);
    let classifier_path = Path::new(&cfg.model.classifier_path);
    let models = Models::load(vectorizer_path, classifier_path).inspect_err(|e| {
        logger::log_error(&format!("Failed to load model artifacts: {e}"));
    })?;
    logger::log_models_loaded(
        vectorizer_path,
        classifier_path,
        models.classifier().kind(),
        models.vectorizer().dim(),
        models.classifier().classes().len(),
    );

    let listener = server::create_reusable_listener(addr).inspect_err(|e| {
        logger::log_error(&format!("Failed to bind {addr}: {e}"));
    })?;

    logger::log_server_start(&addr, &cfg);
    let state = Arc::new(AppState::new(cfg, models));

    let shutdown = Arc::new(server::ShutdownSignal::new());
    server::start_signal_handler(Arc::clone(&shutdown));

    server::start_server_loop(listener, state, shutdown).await;
    Ok(())
}
