use std::collections::{HashMap, HashSet};

use crate::model::{RecordId, Subcategory};
use crate::tokenizer::tokenize;
use crate::trie::Trie;

/// Index-local document id: sequential from zero in insertion order, valid
/// only within the index generation that assigned it.
pub type LocalId = u32;

/// The four searchable fields of a guide entry, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    DocumentType,
    IdentificationRules,
    Name,
    SupportingInformation,
}

pub const FIELDS: [Field; 4] = [
    Field::DocumentType,
    Field::IdentificationRules,
    Field::Name,
    Field::SupportingInformation,
];

impl Field {
    /// Relative importance of a hit in this field.
    pub fn weight(self) -> f32 {
        match self {
            Field::DocumentType | Field::IdentificationRules => 3.0,
            Field::Name => 1.5,
            Field::SupportingInformation => 1.0,
        }
    }
}

/// Flattened copy of a guide entry held inside one index generation.
/// Presentation code re-fetches the authoritative record by `id`; this
/// snapshot only has to be good enough to score against.
#[derive(Debug, Clone)]
pub struct StoredDoc {
    pub id: RecordId,
    pub name: String,
    pub document_type: String,
    pub identification_rules: String,
    pub supporting_information: String,
    pub category_id: RecordId,
}

impl StoredDoc {
    pub(crate) fn field(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::DocumentType => &self.document_type,
            Field::IdentificationRules => &self.identification_rules,
            Field::SupportingInformation => &self.supporting_information,
        }
    }
}

/// One generation of the in-memory index: document snapshots, the token
/// postings map, and the prefix trie, always mutually consistent because
/// every mutation goes through [`SearchIndex::add_document`] or
/// [`SearchIndex::clear`].
#[derive(Default)]
pub struct SearchIndex {
    pub(crate) documents: Vec<StoredDoc>,
    pub(crate) inverted: HashMap<String, Vec<(LocalId, Field)>>,
    pub(crate) trie: Trie,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot a record into this generation and index every token of its
    /// four searchable fields. The record keeps its authoritative id; the
    /// local id is whatever slot comes next.
    pub fn add_document(&mut self, record: &Subcategory) {
        let local_id = self.documents.len() as LocalId;
        let stored = StoredDoc {
            id: record.id,
            name: record.name.clone(),
            document_type: record.document_type.clone(),
            identification_rules: record.identification_rules.clone(),
            supporting_information: record.supporting_information.clone(),
            category_id: record.category_id,
        };
        for field in FIELDS {
            for token in tokenize(stored.field(field)) {
                self.trie.insert(&token, local_id);
                self.inverted.entry(token).or_default().push((local_id, field));
            }
        }
        self.documents.push(stored);
    }

    /// Drop every document, posting, and trie node. Local ids restart from
    /// zero on the next insert.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.inverted.clear();
        self.trie = Trie::new();
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The snapshot stored under a local id, if the id belongs to this
    /// generation.
    pub fn resolve(&self, local_id: LocalId) -> Option<&StoredDoc> {
        self.documents.get(local_id as usize)
    }

    /// Postings for one exact token: which documents contain it and in
    /// which field, one entry per occurrence.
    pub fn postings(&self, token: &str) -> Option<&[(LocalId, Field)]> {
        self.inverted.get(token).map(Vec::as_slice)
    }

    /// Ids of documents containing a token starting with `prefix`.
    pub fn prefix_matches(&self, prefix: &str) -> HashSet<LocalId> {
        self.trie.search_prefix(prefix)
    }
}
