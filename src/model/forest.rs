//! Random forest classifier
//!
//! Trees are exported as parallel node arrays. Node `0` is the root, a node
//! is a leaf when its left child is negative, and a sample goes left when
//! `x[feature] <= threshold`.

use serde::Deserialize;
use serde_json::Value;

use super::{argmax, Classifier, FeatureRow, ModelError};

/// On-disk form of one decision tree
#[derive(Debug, Deserialize)]
pub struct TreeArtifact {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (sample counts or fractions)
    pub value: Vec<Vec<f64>>,
}

/// On-disk form of a fitted forest
#[derive(Debug, Deserialize)]
pub struct ForestArtifact {
    pub classes: Vec<Value>,
    pub n_features: usize,
    pub trees: Vec<TreeArtifact>,
}

#[derive(Debug)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class distribution, normalised to sum to one
    Leaf(Vec<f64>),
}

#[derive(Debug)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn from_artifact(
        tree: TreeArtifact,
        n_features: usize,
        n_classes: usize,
    ) -> Result<Self, String> {
        let n = tree.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        if [
            tree.children_right.len(),
            tree.feature.len(),
            tree.threshold.len(),
            tree.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("tree node arrays have different lengths".into());
        }

        let mut nodes = Vec::with_capacity(n);
        for (id, dist) in tree.value.into_iter().enumerate() {
            let Ok(left) = usize::try_from(tree.children_left[id]) else {
                if dist.len() != n_classes {
                    return Err(format!(
                        "leaf {id} has {} class weights, expected {n_classes}",
                        dist.len()
                    ));
                }
                if dist.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(format!("leaf {id} has negative or non-finite weights"));
                }
                let total: f64 = dist.iter().sum();
                if total <= 0.0 {
                    return Err(format!("leaf {id} has no weight"));
                }
                nodes.push(Node::Leaf(dist.into_iter().map(|w| w / total).collect()));
                continue;
            };

            let right = usize::try_from(tree.children_right[id])
                .map_err(|_| format!("split node {id} has no right child"))?;
            // Children always come after their parent, which rules out cycles
            if left <= id || right <= id || left >= n || right >= n {
                return Err(format!("split node {id} has invalid children ({left}, {right})"));
            }
            let feature = usize::try_from(tree.feature[id])
                .ok()
                .filter(|f| *f < n_features)
                .ok_or_else(|| {
                    format!(
                        "split node {id} uses feature {} outside 0..{n_features}",
                        tree.feature[id]
                    )
                })?;
            let threshold = tree.threshold[id];
            if threshold.is_nan() {
                return Err(format!("split node {id} has a NaN threshold"));
            }
            nodes.push(Node::Split {
                feature,
                threshold,
                left,
                right,
            });
        }

        Ok(Self { nodes })
    }

    /// Class distribution of the leaf reached by `row`
    fn leaf_distribution(&self, row: &FeatureRow<'_>) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf(dist) => return dist,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row.get(*feature) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Ensemble of decision trees voting with their leaf distributions
#[derive(Debug)]
pub struct RandomForest {
    classes: Vec<Value>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn from_artifact(artifact: ForestArtifact) -> Result<Self, ModelError> {
        let n_classes = artifact.classes.len();
        if n_classes < 2 {
            return Err(ModelError::Invalid(format!(
                "forest needs at least two classes, got {n_classes}"
            )));
        }
        if artifact.n_features == 0 {
            return Err(ModelError::Invalid("forest has zero features".into()));
        }
        if artifact.trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".into()));
        }

        let trees = artifact
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, tree)| {
                DecisionTree::from_artifact(tree, artifact.n_features, n_classes)
                    .map_err(|e| ModelError::Invalid(format!("tree {i}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            classes: artifact.classes,
            n_features: artifact.n_features,
            trees,
        })
    }

    /// Mean of the per-tree class distributions
    pub fn predict_proba(&self, row: &FeatureRow<'_>) -> Vec<f64> {
        let mut acc = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.leaf_distribution(row)) {
                *a += p;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.trees.len() as f64;
        for a in &mut acc {
            *a /= count;
        }
        acc
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn classes(&self) -> &[Value] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_index(&self, row: &FeatureRow<'_>) -> usize {
        argmax(&self.predict_proba(row))
    }
}
