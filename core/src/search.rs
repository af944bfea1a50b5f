use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::index::{LocalId, SearchIndex, FIELDS};
use crate::tokenizer::tokenize;

/// Scores strictly above this classify as an exact match.
pub const EXACT_SCORE_THRESHOLD: f32 = 5.0;

const EXACT_MULTIPLIER: f32 = 3.0;
const SUBSTRING_MULTIPLIER: f32 = 2.0;
const PARTIAL_MULTIPLIER: f32 = 1.0;

/// Presentation label for a scored result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchKind {
    #[serde(rename = "Exact Match")]
    Exact,
    #[serde(rename = "Partial Match")]
    Partial,
}

impl MatchKind {
    /// Classify a combined score. The threshold is strict, so a score of
    /// exactly 5.0 is still a partial match.
    pub fn from_score(score: f32) -> Self {
        if score > EXACT_SCORE_THRESHOLD {
            MatchKind::Exact
        } else {
            MatchKind::Partial
        }
    }

    pub fn is_exact(self) -> bool {
        matches!(self, MatchKind::Exact)
    }
}

impl SearchIndex {
    /// Rank every document in this generation against `query`.
    ///
    /// Each of the four weighted fields contributes through at most one of
    /// three strengths: the whole query equal to one of the field's tokens
    /// (weight x 3), the query a substring of the full field value
    /// (weight x 2), or the query a substring of a single token
    /// (weight x 1). Stronger strengths shadow weaker ones within a field;
    /// the per-strength tallies are then merged by plain summation.
    ///
    /// Only documents with a nonzero score are returned, ordered by
    /// descending score with ties broken by ascending local id. The query
    /// is lowercased here; callers are expected to trim it. An empty query
    /// matches nothing.
    pub fn search(&self, query: &str) -> Vec<(LocalId, f32)> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut exact: HashMap<LocalId, f32> = HashMap::new();
        let mut substring: HashMap<LocalId, f32> = HashMap::new();
        let mut partial: HashMap<LocalId, f32> = HashMap::new();

        for (local_id, doc) in self.documents.iter().enumerate() {
            let local_id = local_id as LocalId;
            for field in FIELDS {
                let value = doc.field(field).to_lowercase();
                let tokens = tokenize(&value);
                let weight = field.weight();

                if tokens.iter().any(|t| *t == query) {
                    *exact.entry(local_id).or_default() += weight * EXACT_MULTIPLIER;
                } else if value.contains(query.as_str()) {
                    *substring.entry(local_id).or_default() += weight * SUBSTRING_MULTIPLIER;
                } else if tokens.iter().any(|t| t.contains(query.as_str())) {
                    *partial.entry(local_id).or_default() += weight * PARTIAL_MULTIPLIER;
                }
            }
        }

        let mut combined: HashMap<LocalId, f32> = HashMap::new();
        for tally in [exact, substring, partial] {
            for (local_id, score) in tally {
                *combined.entry(local_id).or_default() += score;
            }
        }

        let mut results: Vec<(LocalId, f32)> = combined.into_iter().collect();
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strict() {
        assert_eq!(MatchKind::from_score(5.0), MatchKind::Partial);
        assert_eq!(MatchKind::from_score(5.1), MatchKind::Exact);
        assert_eq!(MatchKind::from_score(0.0), MatchKind::Partial);
    }

    #[test]
    fn match_kind_serializes_to_its_label() {
        let exact = serde_json::to_string(&MatchKind::Exact).unwrap();
        assert_eq!(exact, "\"Exact Match\"");
        let partial = serde_json::to_string(&MatchKind::Partial).unwrap();
        assert_eq!(partial, "\"Partial Match\"");
    }

    #[test]
    fn empty_query_matches_nothing() {
        let mut index = SearchIndex::new();
        index.add_document(&crate::model::Subcategory {
            id: 1,
            name: "Invoices".to_string(),
            document_type: "Financial".to_string(),
            identification_rules: "Contains invoice number".to_string(),
            supporting_information: "Keep two years".to_string(),
            category_id: 1,
        });
        assert!(index.search("").is_empty());
    }
}
