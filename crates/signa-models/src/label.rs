//! Sign labels and the label catalog.
//!
//! The catalog is the enumerable set of labels a practice session can
//! assign as a target. It mirrors the `labels.json` file shipped next to
//! the gesture model (`{"labels": ["A", "B", ...]}`).

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised while loading a label catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Label catalog is empty")]
    Empty,
}

/// A sign label as reported by the classifier (e.g. `"A"`, `"Ñ"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Label(pub String);

impl Label {
    /// Create a label from any string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the label is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Letters of the Peruvian sign language alphabet with a practice image.
const LSP_ALPHABET: &[&str] = &[
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "Ñ", "O", "P", "Q",
    "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
];

/// On-disk catalog format.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    labels: Vec<String>,
}

/// Ordered, de-duplicated set of valid target labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LabelCatalog {
    labels: Vec<Label>,
}

impl LabelCatalog {
    /// Build a catalog, dropping blank labels and repeated entries.
    ///
    /// The first occurrence of a label keeps its position.
    pub fn from_labels<I, L>(labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        let mut seen = HashSet::new();
        let labels = labels
            .into_iter()
            .map(Into::into)
            .filter(|label: &Label| !label.is_blank())
            .filter(|label| seen.insert(label.clone()))
            .collect();
        Self { labels }
    }

    /// The default catalog: A–Z plus Ñ.
    pub fn lsp_alphabet() -> Self {
        Self::from_labels(LSP_ALPHABET.iter().copied())
    }

    /// Parse a `{"labels": [...]}` document.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let catalog = Self::from_labels(file.labels);
        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(catalog)
    }

    /// Load a catalog from a `labels.json` file.
    pub fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// Position of a label in catalog order.
    pub fn position(&self, label: &Label) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn get(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self::lsp_alphabet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lsp_alphabet_has_27_letters() {
        let catalog = LabelCatalog::lsp_alphabet();
        assert_eq!(catalog.len(), 27);
        assert!(catalog.contains(&Label::from("Ñ")));
        assert_eq!(catalog.position(&Label::from("O")), Some(15));
    }

    #[test]
    fn test_from_labels_drops_blank_and_duplicates() {
        let catalog = LabelCatalog::from_labels(["A", "", "B", "A", "  ", "C"]);
        let labels: Vec<&str> = catalog.labels().iter().map(Label::as_str).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_from_json() {
        let catalog = LabelCatalog::from_json(r#"{"labels": ["A", "B", "C"]}"#).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get(1), Some(&Label::from("B")));
    }

    #[test]
    fn test_from_json_rejects_empty_catalog() {
        let err = LabelCatalog::from_json(r#"{"labels": ["", " "]}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Empty));
    }

    #[test]
    fn test_from_json_rejects_malformed_document() {
        let err = LabelCatalog::from_json(r#"["A", "B"]"#).unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)));
    }

    #[test]
    fn test_label_blank() {
        assert!(Label::from("").is_blank());
        assert!(Label::from(" \t").is_blank());
        assert!(!Label::from("A").is_blank());
    }
}
