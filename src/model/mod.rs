//! Model inference module
//!
//! Evaluates the exported TF-IDF vectorizer and classifier artifacts.
//! Both are loaded once at startup and shared read-only between requests.
//!
//! - `vectorizer`: text to sparse TF-IDF row
//! - `forest`: random forest classifier
//! - `linear`: linear decision-function classifier
//! - `loader`: artifact files, cross-artifact validation, prediction entry points

mod forest;
mod linear;
mod loader;
mod vectorizer;

pub use forest::{ForestArtifact, RandomForest, TreeArtifact};
pub use linear::{LinearArtifact, LinearModel};
pub use loader::{ClassifierArtifact, Models};
pub use vectorizer::{Norm, SparseRow, TfidfVectorizer, VectorizerArtifact};

use serde_json::Value;
use thiserror::Error;

/// Errors raised while loading artifacts
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read artifact '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse artifact '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid artifact: {0}")]
    Invalid(String),
}

/// Errors caused by prediction input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PredictError {
    #[error("feature payload must be a JSON object")]
    NotAnObject,
    #[error("feature '{key}' is not numeric")]
    NotNumeric { key: String },
    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
}

/// A feature row as seen by a classifier
#[derive(Debug, Clone, Copy)]
pub enum FeatureRow<'a> {
    Dense(&'a [f64]),
    Sparse(&'a SparseRow),
}

impl FeatureRow<'_> {
    pub fn get(&self, column: usize) -> f64 {
        match self {
            Self::Dense(values) => values.get(column).copied().unwrap_or(0.0),
            Self::Sparse(row) => row.get(column),
        }
    }

    pub fn dot(&self, weights: &[f64]) -> f64 {
        match self {
            Self::Dense(values) => values.iter().zip(weights).map(|(x, w)| x * w).sum(),
            Self::Sparse(row) => row.dot(weights),
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Self::Dense(values) => values.len(),
            Self::Sparse(row) => row.dim,
        }
    }
}

/// A fitted classifier consumed only through prediction
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Short artifact kind, used in logs
    fn kind(&self) -> &'static str;
    /// Class labels in training order
    fn classes(&self) -> &[Value];
    /// Expected feature row width
    fn n_features(&self) -> usize;
    /// Position in `classes()` of the predicted class
    fn predict_index(&self, row: &FeatureRow<'_>) -> usize;
}

/// Outcome of a single prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    pub class: Value,
}

/// Index of the first maximum
fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate().skip(1) {
        if *s > scores[best] {
            best = i;
        }
    }
    best
}

/// Build a dense feature row from a JSON object, keeping key order
///
/// Numbers are taken as-is, booleans become 1/0 and numeric strings are parsed.
/// `NaN` and infinities are rejected.
pub fn dense_row_from_json(payload: &Value) -> Result<Vec<f64>, PredictError> {
    let Value::Object(map) = payload else {
        return Err(PredictError::NotAnObject);
    };

    map.iter()
        .map(|(key, value)| {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .filter(|v| v.is_finite());
            parsed.ok_or_else(|| PredictError::NotNumeric { key: key.clone() })
        })
        .collect()
}

#[cfg(test)]
pub mod fixtures {
    //! Small artifacts shared by model and handler tests.
    //!
    //! Vocabulary `fake`/`quote`/`real`; the single tree predicts class `0`
    //! ("False") when the `fake` column exceeds 0.5 and class `1` otherwise.

    use super::*;
    use serde_json::json;

    pub fn vectorizer_json() -> Value {
        json!({
            "vocabulary": {"fake": 0, "quote": 1, "real": 2},
            "idf": [1.0, 1.0, 1.0]
        })
    }

    pub fn classifier_json() -> Value {
        json!({
            "kind": "random_forest",
            "classes": [0, 1],
            "n_features": 3,
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [0, -2, -2],
                "threshold": [0.5, -2.0, -2.0],
                "value": [[5.0, 3.0], [1.0, 3.0], [4.0, 0.0]]
            }]
        })
    }

    pub fn models() -> Models {
        let vectorizer = TfidfVectorizer::from_artifact(
            serde_json::from_value(vectorizer_json()).unwrap(),
        )
        .unwrap();
        let classifier = serde_json::from_value::<ClassifierArtifact>(classifier_json())
            .unwrap()
            .into_classifier()
            .unwrap();
        Models::new(vectorizer, classifier).unwrap()
    }
}
