use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;

use crate::acronym_store::{AcronymStore, NewAcronym, StoreError};

/// Similarity strictly above this counts as a fuzzy match.
pub const FUZZY_RATIO_THRESHOLD: u32 = 80;

/// Indel similarity between two strings on a 0..=100 scale: the fraction
/// of characters preserved when turning one string into the other using
/// only insertions and deletions, so identical strings score 100 and
/// disjoint ones 0. Fractional results round down.
pub fn fuzzy_ratio(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }

    // Two-row longest-common-subsequence table; the indel distance is
    // total - 2 * lcs.
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            curr[j] = if a[i - 1] == b[j - 1] {
                prev[j - 1] + 1
            } else {
                prev[j].max(curr[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b.len()];
    (200 * lcs / total) as u32
}

/// One glossary hit returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcronymMatch {
    pub acronym: String,
    pub expansion: String,
    pub context: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AcronymError {
    /// A concurrent suggestion claimed the same acronym first.
    #[error("acronym already exists")]
    Conflict,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fuzzy matcher over the approved glossary, plus the suggestion and
/// approval actions. Store faults surface as [`AcronymError`]; nothing in
/// here panics on a bad store.
pub struct AcronymMatcher {
    store: Arc<dyn AcronymStore>,
}

impl AcronymMatcher {
    pub fn new(store: Arc<dyn AcronymStore>) -> Self {
        Self { store }
    }

    /// Approved entries whose acronym is fuzzily close to `query` (ratio
    /// strictly above [`FUZZY_RATIO_THRESHOLD`]) or literally contains it.
    /// The query is uppercased first; keys are stored uppercase.
    pub fn find_matches(&self, query: &str) -> Result<Vec<AcronymMatch>, AcronymError> {
        let query = query.to_uppercase();
        let approved = self.store.all_approved()?;
        tracing::debug!(candidates = approved.len(), %query, "scanning approved acronyms");

        let mut matches = Vec::new();
        for record in approved {
            let ratio = fuzzy_ratio(&query, &record.acronym);
            if ratio > FUZZY_RATIO_THRESHOLD || record.acronym.contains(query.as_str()) {
                matches.push(AcronymMatch {
                    acronym: record.acronym,
                    expansion: record.expansion,
                    context: record.context,
                });
            }
        }
        Ok(matches)
    }

    /// Record a suggestion, upserting by uppercased acronym. An existing
    /// entry has its expansion and context replaced; a new entry is
    /// inserted. Either way the result is approved immediately. A losing
    /// race against a concurrent insert of the same key reports
    /// [`AcronymError::Conflict`] and writes nothing.
    pub fn suggest(
        &self,
        acronym: &str,
        expansion: &str,
        context: Option<&str>,
    ) -> Result<&'static str, AcronymError> {
        let key = acronym.to_uppercase();
        match self.store.find(&key)? {
            Some(mut record) => {
                record.expansion = expansion.to_string();
                record.context = context.map(str::to_string);
                record.approved = true;
                record.updated_at = OffsetDateTime::now_utc();
                self.store.update(record)?;
                tracing::info!(acronym = %key, "existing acronym updated");
            }
            None => match self.store.insert(NewAcronym {
                acronym: key.clone(),
                expansion: expansion.to_string(),
                context: context.map(str::to_string),
                approved: true,
            }) {
                Ok(_) => tracing::info!(acronym = %key, "new acronym added"),
                Err(StoreError::Conflict) => {
                    tracing::error!(acronym = %key, "conflicting insert, nothing written");
                    return Err(AcronymError::Conflict);
                }
                Err(err) => {
                    tracing::error!(acronym = %key, error = %err, "acronym insert failed");
                    return Err(AcronymError::Store(err));
                }
            },
        }
        Ok("Acronym successfully added or updated")
    }

    /// Mark an existing suggestion approved. An unknown id is logged and
    /// ignored rather than surfaced as an error.
    pub fn approve(&self, id: u64) -> Result<(), AcronymError> {
        match self.store.set_approved(id)? {
            Some(acronym) => tracing::info!(%acronym, "acronym approved"),
            None => tracing::warn!(id, "acronym id not found"),
        }
        Ok(())
    }
}
