//! Wire schema of the plagiarism backend (`POST /api/compare`).

use serde::{Deserialize, Serialize};

pub const DEFAULT_ANALYZER: &str = "word";
pub const DEFAULT_NGRAM_RANGE: (i64, i64) = (1, 2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub text_a: String,
    pub text_b: String,
    pub analyzer: String,
    /// Inclusive `(min, max)`; serialized as a two element array.
    pub ngram_range: (i64, i64),
}

/// Parsed backend answer.
///
/// `similarity` and `is_plagiarism` are mandatory; the list fields fall back
/// to empty and `analyzer`/`ngram_range` are whatever the backend echoed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub similarity: f64,
    pub is_plagiarism: bool,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub analyzer: Option<String>,
    #[serde(default)]
    pub ngram_range: Option<(i64, i64)>,
    #[serde(default)]
    pub passages: Vec<Passage>,
    #[serde(default)]
    pub explanations: Vec<Explanation>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub method: Option<String>,
}

/// A common run of tokens (or characters) found in both texts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Match {
    pub a_start: u64,
    pub b_start: u64,
    pub length: u64,
    pub a_snippet: String,
    pub b_snippet: String,
}

/// A pair of similar sentences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Passage {
    pub a_sentence: String,
    pub b_sentence: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Explanation {
    Text(String),
    Feature(FeatureContribution),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureContribution {
    pub feature: String,
    pub weight_a: f64,
    pub weight_b: f64,
    pub contribution: f64,
}
