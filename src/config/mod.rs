// Configuration module entry point
// Layered settings (file -> environment -> defaults) and shared runtime state

mod state;
mod types;

use std::net::SocketAddr;
use std::path::PathBuf;

pub use state::AppState;
pub use types::{
    AssetsConfig, Config, HealthConfig, HttpConfig, LoggingConfig, ModelConfig,
    PerformanceConfig, ServerConfig,
};

/// Prefix for environment overrides, e.g. `QUOTELENS_SERVER__PORT=8080`
const ENV_PREFIX: &str = "QUOTELENS";

impl Config {
    /// Load configuration from the given file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "quotelens")?
            .set_default("http.enable_cors", true)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("assets.template_dir", "templates")?
            .set_default("assets.static_dir", "static")?
            .set_default("assets.json_dir", "static/json")?
            .set_default("model.vectorizer_path", "models/tfidf.json")?
            .set_default("model.classifier_path", "models/classifier.json")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Full path of the page template
    pub fn index_template_path(&self) -> PathBuf {
        PathBuf::from(&self.assets.template_dir).join("index.html")
    }
}
