//! In-memory search index and acronym glossary for the document guide.
//!
//! The index side covers tokenization, the prefix trie, weighted query
//! scoring, and atomic rebuilds behind a shared handle. The acronym side
//! covers fuzzy glossary lookups over a pluggable store.

pub mod acronym;
pub mod acronym_store;
pub mod index;
pub mod model;
pub mod reload;
pub mod search;
pub mod tokenizer;
pub mod trie;

pub use acronym::{fuzzy_ratio, AcronymError, AcronymMatch, AcronymMatcher, FUZZY_RATIO_THRESHOLD};
pub use acronym_store::{
    AcronymRecord, AcronymStore, MemoryAcronymStore, NewAcronym, SledAcronymStore, StoreError,
};
pub use index::{Field, LocalId, SearchIndex, StoredDoc};
pub use model::{Category, RecordId, Subcategory, Update};
pub use reload::{ChangeSignal, SharedIndex};
pub use search::{MatchKind, EXACT_SCORE_THRESHOLD};
pub use tokenizer::tokenize;
pub use trie::Trie;
