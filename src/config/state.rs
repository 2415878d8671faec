// Application state module
// Immutable configuration and model artifacts shared by every connection

use std::path::PathBuf;

use super::types::Config;
use crate::logger::LogFormat;
use crate::model::Models;

/// Application state
pub struct AppState {
    pub config: Config,
    pub models: Models,

    // Derived from config once at startup
    pub access_log_format: LogFormat,
    pub static_dir: PathBuf,
    pub json_dir: PathBuf,
}

impl AppState {
    pub fn new(config: Config, models: Models) -> Self {
        let access_log_format = LogFormat::parse(&config.logging.access_log_format);
        let static_dir = PathBuf::from(&config.assets.static_dir);
        let json_dir = PathBuf::from(&config.assets.json_dir);

        Self {
            config,
            models,
            access_log_format,
            static_dir,
            json_dir,
        }
    }

    /// Display label for a predicted class position
    ///
    /// Falls back to the class value itself when no label is configured.
    pub fn label_for(&self, class_index: usize, class: &serde_json::Value) -> String {
        self.config.model.labels.get(class_index).cloned().unwrap_or_else(|| {
            match class {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;
    use serde_json::json;

    #[test]
    fn test_label_for() {
        let mut cfg = Config::load_from("does-not-exist/quotelens").unwrap();
        cfg.model.labels = vec!["Fabricated".into()];
        let state = AppState::new(cfg, fixtures::models());
        assert_eq!(state.label_for(0, &json!(0)), "Fabricated");
        assert_eq!(state.label_for(1, &json!(1)), "1");
        assert_eq!(state.label_for(2, &json!("maybe")), "maybe");
    }
}
