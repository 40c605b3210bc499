use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::{char::canonical_combining_class, UnicodeNormalization};

use crate::error::{AppError, AppResult};

/// Default scikit-learn token pattern: runs of two or more word characters
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Sparse row vector stored as `(column, weight)` pairs sorted by column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Builds a vector from entries; they are sorted by column
    pub fn new(mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|&(col, _)| col);
        Self { entries }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|&(_, w)| w == 0.0)
    }

    pub fn l2_norm(&self) -> f64 {
        self.entries.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt()
    }

    fn l1_norm(&self) -> f64 {
        self.entries.iter().map(|&(_, w)| w.abs()).sum()
    }

    /// Dot product via a merge over both sorted entry lists
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j, mut sum) = (0, 0, 0.0);
        while i < self.entries.len() && j < other.entries.len() {
            let (a_col, a_w) = self.entries[i];
            let (b_col, b_w) = other.entries[j];
            match a_col.cmp(&b_col) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    fn scaled(mut self, norm: Option<Norm>) -> Self {
        let divisor = match norm {
            Some(Norm::L2) => self.l2_norm(),
            Some(Norm::L1) => self.l1_norm(),
            None => return self,
        };
        if divisor > 0.0 {
            for (_, w) in self.entries.iter_mut() {
                *w /= divisor;
            }
        }
        self
    }
}

/// Converts free text into sparse numeric vectors
///
/// Implementations must be deterministic: the same texts always produce the
/// same vectors. Loaded once and shared read-only across requests.
pub trait TextVectorizer: Send + Sync {
    /// Vectorizes a batch of texts, one row per input
    fn transform(&self, texts: &[&str]) -> Vec<SparseVector>;

    /// Vectorizes a single text
    fn vectorize(&self, text: &str) -> SparseVector {
        self.transform(&[text]).pop().unwrap_or_default()
    }
}

/// Cosine similarity of `base` against every row.
///
/// A zero vector (no known vocabulary) on either side scores 0.0 rather
/// than NaN.
pub fn cosine_similarity(base: &SparseVector, rows: &[SparseVector]) -> Vec<f64> {
    let base_norm = base.l2_norm();
    rows.iter()
        .map(|row| {
            let denominator = base_norm * row.l2_norm();
            if denominator == 0.0 {
                0.0
            } else {
                (base.dot(row) / denominator).clamp(-1.0, 1.0)
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripAccents {
    /// Decompose and drop combining marks
    Unicode,
    /// Decompose and drop every non-ASCII character
    Ascii,
}

impl StripAccents {
    fn apply(self, text: &str) -> String {
        match self {
            StripAccents::Unicode => text
                .nfkd()
                .filter(|&c| canonical_combining_class(c) == 0)
                .collect(),
            StripAccents::Ascii => text.nfkd().filter(char::is_ascii).collect(),
        }
    }
}

/// On-disk form of a fitted TF-IDF vectorizer
///
/// Unknown settings are rejected: a field this loader does not understand
/// would silently change the vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VectorizerArtifact {
    /// Term to column index
    pub vocabulary: HashMap<String, usize>,
    /// Inverse document frequency per column; may be empty when `use_idf` is off
    #[serde(default)]
    pub idf: Vec<f64>,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default)]
    pub strip_accents: Option<StripAccents>,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub stop_words: Vec<String>,
    /// Count every present term once
    #[serde(default)]
    pub binary: bool,
    #[serde(default = "default_true")]
    pub use_idf: bool,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
}

fn default_true() -> bool {
    true
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// TF-IDF vectorizer compatible with scikit-learn's `TfidfVectorizer.transform`
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    lowercase: bool,
    strip_accents: Option<StripAccents>,
    token_pattern: Regex,
    ngram_range: (usize, usize),
    stop_words: HashSet<String>,
    binary: bool,
    use_idf: bool,
    sublinear_tf: bool,
    norm: Option<Norm>,
}

impl TfidfVectorizer {
    /// Loads a serialized vectorizer from disk
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::VectorizerLoad(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let vectorizer = Self::from_json(&json)?;

        tracing::info!(
            path = %path.display(),
            vocabulary_size = vectorizer.vocabulary_size(),
            "Vectorizer loaded"
        );

        Ok(vectorizer)
    }

    pub fn from_json(json: &str) -> AppResult<Self> {
        let artifact: VectorizerArtifact = serde_json::from_str(json)
            .map_err(|e| AppError::VectorizerLoad(format!("Invalid artifact: {}", e)))?;
        Self::from_artifact(artifact)
    }

    /// Validates an artifact and compiles its tokenizer
    pub fn from_artifact(artifact: VectorizerArtifact) -> AppResult<Self> {
        if artifact.vocabulary.is_empty() {
            return Err(AppError::VectorizerLoad("Empty vocabulary".to_string()));
        }
        if artifact.use_idf && artifact.idf.len() != artifact.vocabulary.len() {
            return Err(AppError::VectorizerLoad(format!(
                "IDF length {} does not match vocabulary size {}",
                artifact.idf.len(),
                artifact.vocabulary.len()
            )));
        }
        if let Some((term, &col)) = artifact
            .vocabulary
            .iter()
            .find(|(_, &col)| col >= artifact.vocabulary.len())
        {
            return Err(AppError::VectorizerLoad(format!(
                "Term {:?} maps to out-of-range column {}",
                term, col
            )));
        }
        if artifact.idf.iter().any(|w| !w.is_finite()) {
            return Err(AppError::VectorizerLoad("Non-finite IDF weight".to_string()));
        }
        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(AppError::VectorizerLoad(format!(
                "Invalid ngram range ({}, {})",
                min_n, max_n
            )));
        }
        let token_pattern = Regex::new(&artifact.token_pattern)
            .map_err(|e| AppError::VectorizerLoad(format!("Invalid token pattern: {}", e)))?;

        Ok(Self {
            vocabulary: artifact.vocabulary,
            idf: artifact.idf,
            lowercase: artifact.lowercase,
            strip_accents: artifact.strip_accents,
            token_pattern,
            ngram_range: artifact.ngram_range,
            stop_words: artifact.stop_words.into_iter().collect(),
            binary: artifact.binary,
            use_idf: artifact.use_idf,
            sublinear_tf: artifact.sublinear_tf,
            norm: artifact.norm,
        })
    }

    /// Fits a vectorizer with default settings on a corpus.
    ///
    /// Columns follow sorted term order and IDF is smoothed:
    /// `ln((1 + n) / (1 + df)) + 1`.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> AppResult<Self> {
        let mut artifact = VectorizerArtifact {
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            lowercase: true,
            strip_accents: None,
            token_pattern: default_token_pattern(),
            ngram_range: default_ngram_range(),
            stop_words: Vec::new(),
            binary: false,
            use_idf: true,
            sublinear_tf: false,
            norm: default_norm(),
        };
        let token_pattern = Regex::new(&artifact.token_pattern)
            .map_err(|e| AppError::Internal(format!("Invalid token pattern: {}", e)))?;

        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            let terms: HashSet<String> = token_pattern
                .find_iter(&doc.as_ref().to_lowercase())
                .map(|m| m.as_str().to_string())
                .collect();
            for term in terms {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        for (col, (term, df)) in doc_freq.into_iter().enumerate() {
            artifact.vocabulary.insert(term, col);
            artifact.idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
        }

        Self::from_artifact(artifact)
    }

    /// Serializable form of this vectorizer
    pub fn to_artifact(&self) -> VectorizerArtifact {
        VectorizerArtifact {
            vocabulary: self.vocabulary.clone(),
            idf: self.idf.clone(),
            lowercase: self.lowercase,
            strip_accents: self.strip_accents,
            token_pattern: self.token_pattern.as_str().to_string(),
            ngram_range: self.ngram_range,
            stop_words: self.stop_words.iter().cloned().collect(),
            binary: self.binary,
            use_idf: self.use_idf,
            sublinear_tf: self.sublinear_tf,
            norm: self.norm,
        }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Splits text into the terms looked up in the vocabulary
    fn analyze(&self, text: &str) -> Vec<String> {
        let mut text = if self.lowercase {
            Cow::Owned(text.to_lowercase())
        } else {
            Cow::Borrowed(text)
        };
        if let Some(mode) = self.strip_accents {
            text = Cow::Owned(mode.apply(&text));
        }

        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.contains(*token))
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n.min(tokens.len()) {
            terms.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
        terms
    }

    fn transform_one(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.analyze(text) {
            if let Some(&col) = self.vocabulary.get(&term) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let entries = counts
            .into_iter()
            .map(|(col, count)| {
                let tf = if self.binary { 1.0 } else { count };
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                let weight = if self.use_idf { tf * self.idf[col] } else { tf };
                (col, weight)
            })
            .collect();

        SparseVector::new(entries).scaled(self.norm)
    }
}

impl TextVectorizer for TfidfVectorizer {
    fn transform(&self, texts: &[&str]) -> Vec<SparseVector> {
        texts.iter().map(|text| self.transform_one(text)).collect()
    }
}
