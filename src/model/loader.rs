//! Artifact loading and prediction entry points

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

use super::forest::{ForestArtifact, RandomForest};
use super::linear::{LinearArtifact, LinearModel};
use super::vectorizer::{TfidfVectorizer, VectorizerArtifact};
use super::{Classifier, FeatureRow, ModelError, PredictError, Prediction};

/// On-disk classifier, tagged by `kind`
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    RandomForest(ForestArtifact),
    Linear(LinearArtifact),
}

impl ClassifierArtifact {
    pub fn into_classifier(self) -> Result<Box<dyn Classifier>, ModelError> {
        Ok(match self {
            Self::RandomForest(a) => Box::new(RandomForest::from_artifact(a)?),
            Self::Linear(a) => Box::new(LinearModel::from_artifact(a)?),
        })
    }
}

/// The vectorizer/classifier pair held for the process lifetime
#[derive(Debug)]
pub struct Models {
    vectorizer: TfidfVectorizer,
    classifier: Box<dyn Classifier>,
}

impl Models {
    /// Pair a vectorizer with a classifier of the same width
    pub fn new(
        vectorizer: TfidfVectorizer,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self, ModelError> {
        if vectorizer.dim() != classifier.n_features() {
            return Err(ModelError::Invalid(format!(
                "vectorizer produces {} features but classifier expects {}",
                vectorizer.dim(),
                classifier.n_features()
            )));
        }
        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    /// Load and validate both artifacts from disk
    pub fn load(vectorizer_path: &Path, classifier_path: &Path) -> Result<Self, ModelError> {
        let vectorizer: VectorizerArtifact = read_artifact(vectorizer_path)?;
        let vectorizer = TfidfVectorizer::from_artifact(vectorizer)?;
        let classifier: ClassifierArtifact = read_artifact(classifier_path)?;
        Self::new(vectorizer, classifier.into_classifier()?)
    }

    pub const fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Vectorize a single text and classify it
    pub fn predict_text(&self, text: &str) -> Prediction {
        let row = self.vectorizer.transform(text);
        self.predict_row(&FeatureRow::Sparse(&row))
    }

    /// Classify a dense feature row
    pub fn predict_features(&self, features: &[f64]) -> Result<Prediction, PredictError> {
        let expected = self.classifier.n_features();
        if features.len() != expected {
            return Err(PredictError::FeatureCount {
                expected,
                actual: features.len(),
            });
        }
        Ok(self.predict_row(&FeatureRow::Dense(features)))
    }

    fn predict_row(&self, row: &FeatureRow<'_>) -> Prediction {
        let class_index = self.classifier.predict_index(row);
        Prediction {
            class_index,
            class: self.classifier.classes()[class_index].clone(),
        }
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ModelError::Parse {
        path: display,
        source,
    })
}
