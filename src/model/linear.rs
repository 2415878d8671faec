//! Linear classifier (logistic regression, linear SVM)

use serde::Deserialize;
use serde_json::Value;

use super::{argmax, Classifier, FeatureRow, ModelError};

/// On-disk form of a fitted linear model
///
/// Binary models carry a single `coef` row; multiclass models one row per class.
#[derive(Debug, Deserialize)]
pub struct LinearArtifact {
    pub classes: Vec<Value>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

#[derive(Debug)]
pub struct LinearModel {
    classes: Vec<Value>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    n_features: usize,
}

impl LinearModel {
    pub fn from_artifact(artifact: LinearArtifact) -> Result<Self, ModelError> {
        let n_classes = artifact.classes.len();
        if n_classes < 2 {
            return Err(ModelError::Invalid(format!(
                "linear model needs at least two classes, got {n_classes}"
            )));
        }

        let rows = if n_classes == 2 { 1 } else { n_classes };
        if artifact.coef.len() != rows || artifact.intercept.len() != rows {
            return Err(ModelError::Invalid(format!(
                "expected {rows} coef rows and intercepts for {n_classes} classes, got {} and {}",
                artifact.coef.len(),
                artifact.intercept.len()
            )));
        }

        let n_features = artifact.coef[0].len();
        if n_features == 0 || artifact.coef.iter().any(|row| row.len() != n_features) {
            return Err(ModelError::Invalid("coef rows are empty or ragged".into()));
        }
        if artifact
            .coef
            .iter()
            .flatten()
            .chain(&artifact.intercept)
            .any(|v| !v.is_finite())
        {
            return Err(ModelError::Invalid("coef contains non-finite values".into()));
        }

        Ok(Self {
            classes: artifact.classes,
            coef: artifact.coef,
            intercept: artifact.intercept,
            n_features,
        })
    }

    /// Signed distance to each decision boundary
    pub fn decision_function(&self, row: &FeatureRow<'_>) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(weights, b)| row.dot(weights) + b)
            .collect()
    }
}

impl Classifier for LinearModel {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn classes(&self) -> &[Value] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_index(&self, row: &FeatureRow<'_>) -> usize {
        let scores = self.decision_function(row);
        if self.classes.len() == 2 {
            usize::from(scores[0] > 0.0)
        } else {
            argmax(&scores)
        }
    }
}
