//! TF-IDF text vectorizer
//!
//! Evaluates a vectorizer fitted offline and exported as JSON. The transform
//! mirrors the classic pipeline: lowercase, regex tokenization, stop word
//! removal, word n-grams, term counting over the fitted vocabulary, optional
//! binary/sublinear tf, idf weighting and row normalisation.

use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::ModelError;

const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Row normalisation applied after idf weighting
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// On-disk form of a fitted vectorizer
#[derive(Debug, Deserialize)]
pub struct VectorizerArtifact {
    pub vocabulary: HashMap<String, usize>,
    #[serde(default)]
    pub idf: Option<Vec<f64>>,
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub stop_words: Option<Vec<String>>,
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_lowercase() -> bool {
    true
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

#[allow(clippy::unnecessary_wraps, clippy::missing_const_for_fn)]
fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// Sparse feature row produced by the vectorizer
///
/// `indices` are strictly increasing; `values` is parallel to `indices`.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseRow {
    pub dim: usize,
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseRow {
    /// Value at a column, zero when the column is not stored
    pub fn get(&self, column: usize) -> f64 {
        self.indices
            .binary_search(&column)
            .map_or(0.0, |pos| self.values[pos])
    }

    /// Dot product against a dense weight vector
    pub fn dot(&self, weights: &[f64]) -> f64 {
        self.indices
            .iter()
            .zip(&self.values)
            .map(|(&idx, &v)| weights.get(idx).map_or(0.0, |w| w * v))
            .sum()
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }
}

/// Fitted TF-IDF vectorizer, validated and ready for inference
#[derive(Debug)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Option<Vec<f64>>,
    lowercase: bool,
    token_pattern: Regex,
    ngram_range: (usize, usize),
    stop_words: HashSet<String>,
    binary: bool,
    sublinear_tf: bool,
    norm: Option<Norm>,
}

impl TfidfVectorizer {
    /// Validate an artifact and compile its token pattern
    pub fn from_artifact(artifact: VectorizerArtifact) -> Result<Self, ModelError> {
        let size = artifact.vocabulary.len();
        if size == 0 {
            return Err(ModelError::Invalid("vectorizer vocabulary is empty".into()));
        }

        // Indices must cover 0..size exactly once
        let mut seen = vec![false; size];
        for (term, &idx) in &artifact.vocabulary {
            match seen.get_mut(idx) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(ModelError::Invalid(format!(
                        "vocabulary index {idx} is assigned twice (term '{term}')"
                    )))
                }
                None => {
                    return Err(ModelError::Invalid(format!(
                        "vocabulary index {idx} for term '{term}' is out of range (size {size})"
                    )))
                }
            }
        }

        if let Some(idf) = &artifact.idf {
            if idf.len() != size {
                return Err(ModelError::Invalid(format!(
                    "idf has {} entries, vocabulary has {size}",
                    idf.len()
                )));
            }
            if idf.iter().any(|v| !v.is_finite()) {
                return Err(ModelError::Invalid("idf contains non-finite values".into()));
            }
        }

        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ModelError::Invalid(format!(
                "invalid ngram_range ({min_n}, {max_n})"
            )));
        }

        let token_pattern = Regex::new(&artifact.token_pattern).map_err(|e| {
            ModelError::Invalid(format!(
                "token_pattern '{}' does not compile: {e}",
                artifact.token_pattern
            ))
        })?;
        // captures_len counts the implicit whole-match group
        if token_pattern.captures_len() > 2 {
            return Err(ModelError::Invalid(
                "token_pattern may contain at most one capture group".into(),
            ));
        }

        Ok(Self {
            vocabulary: artifact.vocabulary,
            idf: artifact.idf,
            lowercase: artifact.lowercase,
            token_pattern,
            ngram_range: artifact.ngram_range,
            stop_words: artifact.stop_words.unwrap_or_default().into_iter().collect(),
            binary: artifact.binary,
            sublinear_tf: artifact.sublinear_tf,
            norm: artifact.norm,
        })
    }

    /// Number of output columns
    pub fn dim(&self) -> usize {
        self.vocabulary.len()
    }

    /// Split text into the terms the vocabulary was fitted on
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let tokens: Vec<&str> = if self.token_pattern.captures_len() == 2 {
            self.token_pattern
                .captures_iter(&text)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str())
                .collect()
        } else {
            self.token_pattern
                .find_iter(&text)
                .map(|m| m.as_str())
                .collect()
        };

        let tokens: Vec<&str> = tokens
            .into_iter()
            .filter(|t| !self.stop_words.contains(*t))
            .collect();

        word_ngrams(&tokens, self.ngram_range)
    }

    /// Transform one document into a sparse TF-IDF row
    pub fn transform(&self, text: &str) -> SparseRow {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.analyze(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let (indices, mut values): (Vec<usize>, Vec<f64>) = counts.into_iter().unzip();

        for v in &mut values {
            if self.binary {
                *v = 1.0;
            }
            if self.sublinear_tf {
                *v = 1.0 + v.ln();
            }
        }

        if let Some(idf) = &self.idf {
            for (v, &idx) in values.iter_mut().zip(&indices) {
                *v *= idf[idx];
            }
        }

        if let Some(norm) = self.norm {
            let length = match norm {
                Norm::L1 => values.iter().map(|v| v.abs()).sum::<f64>(),
                Norm::L2 => values.iter().map(|v| v * v).sum::<f64>().sqrt(),
            };
            if length > 0.0 {
                for v in &mut values {
                    *v /= length;
                }
            }
        }

        SparseRow {
            dim: self.dim(),
            indices,
            values,
        }
    }
}

/// Word n-grams over a token list, unigrams first
fn word_ngrams(tokens: &[&str], (min_n, max_n): (usize, usize)) -> Vec<String> {
    if max_n == 1 {
        return tokens.iter().map(|t| (*t).to_string()).collect();
    }

    let mut out = Vec::new();
    let mut start_n = min_n;
    if min_n == 1 {
        out.extend(tokens.iter().map(|t| (*t).to_string()));
        start_n = 2;
    }

    for n in start_n..=max_n.min(tokens.len()) {
        for window in tokens.windows(n) {
            out.push(window.join(" "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vectorizer(value: serde_json::Value) -> TfidfVectorizer {
        let artifact: VectorizerArtifact = serde_json::from_value(value).unwrap();
        TfidfVectorizer::from_artifact(artifact).unwrap()
    }

    #[test]
    fn test_default_tokenizer_drops_single_chars() {
        let v = vectorizer(json!({"vocabulary": {"hello": 0}}));
        assert_eq!(v.analyze("A Hello, world! x"), vec!["hello", "world"]);
    }

    #[test]
    fn test_ngrams_and_stop_words() {
        let v = vectorizer(json!({
            "vocabulary": {"to": 0},
            "ngram_range": [1, 2],
            "stop_words": ["the"]
        }));
        assert_eq!(
            v.analyze("to the moon"),
            vec!["to", "moon", "to moon"]
        );
    }

    #[test]
    fn test_bigrams_only() {
        let v = vectorizer(json!({"vocabulary": {"ab": 0}, "ngram_range": [2, 2]}));
        assert_eq!(v.analyze("aa bb cc"), vec!["aa bb", "bb cc"]);
        assert!(v.analyze("single").is_empty());
    }

    #[test]
    fn test_capture_group_pattern() {
        let v = vectorizer(json!({
            "vocabulary": {"x": 0},
            "token_pattern": r"#(\w+)"
        }));
        assert_eq!(v.analyze("#rust and #serde"), vec!["rust", "serde"]);
    }

    #[test]
    fn test_transform_l2_normalised() {
        let v = vectorizer(json!({
            "vocabulary": {"fake": 0, "quote": 1, "real": 2},
            "idf": [2.0, 1.0, 1.0]
        }));
        let row = v.transform("Fake quote, fake!");
        assert_eq!(row.indices, vec![0, 1]);
        // counts [2, 1] * idf [2, 1] = [4, 1], |.| = sqrt(17)
        let norm = 17f64.sqrt();
        assert!((row.values[0] - 4.0 / norm).abs() < 1e-12);
        assert!((row.values[1] - 1.0 / norm).abs() < 1e-12);
        assert_eq!(row.dim, 3);
    }

    #[test]
    fn test_transform_unknown_and_empty() {
        let v = vectorizer(json!({"vocabulary": {"known": 0}}));
        let row = v.transform("nothing matches here");
        assert_eq!(row.nnz(), 0);
        assert_eq!(row.get(0), 0.0);
        assert_eq!(v.transform("").nnz(), 0);
    }

    #[test]
    fn test_sublinear_binary_and_l1() {
        let v = vectorizer(json!({
            "vocabulary": {"aa": 0, "bb": 1},
            "sublinear_tf": true,
            "norm": null
        }));
        let row = v.transform("aa aa aa bb");
        assert!((row.get(0) - (1.0 + 3f64.ln())).abs() < 1e-12);
        assert!((row.get(1) - 1.0).abs() < 1e-12);

        let v = vectorizer(json!({
            "vocabulary": {"aa": 0, "bb": 1},
            "binary": true,
            "norm": "l1"
        }));
        let row = v.transform("aa aa aa bb");
        assert!((row.get(0) - 0.5).abs() < 1e-12);
        assert!((row.get(1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_case_sensitive_when_lowercase_disabled() {
        let v = vectorizer(json!({"vocabulary": {"Rust": 0}, "lowercase": false}));
        assert_eq!(v.transform("Rust").nnz(), 1);
        assert_eq!(v.transform("rust").nnz(), 0);
    }

    #[test]
    fn test_sparse_row_dot() {
        let row = SparseRow {
            dim: 4,
            indices: vec![1, 3],
            values: vec![0.5, 2.0],
        };
        assert!((row.dot(&[9.0, 2.0, 9.0, 1.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_invalid_artifacts() {
        let bad = [
            json!({"vocabulary": {}}),
            json!({"vocabulary": {"a": 0, "b": 0}}),
            json!({"vocabulary": {"a": 1}}),
            json!({"vocabulary": {"a": 0}, "idf": [1.0, 2.0]}),
            json!({"vocabulary": {"a": 0}, "ngram_range": [2, 1]}),
            json!({"vocabulary": {"a": 0}, "token_pattern": "("}),
            json!({"vocabulary": {"a": 0}, "token_pattern": r"(\w)(\w)"}),
        ];
        for value in bad {
            let artifact: VectorizerArtifact = serde_json::from_value(value.clone()).unwrap();
            assert!(
                matches!(
                    TfidfVectorizer::from_artifact(artifact),
                    Err(ModelError::Invalid(_))
                ),
                "expected rejection for {value}"
            );
        }
    }
}
