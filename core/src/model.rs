use serde::{Deserialize, Serialize};
use time::Date;

/// Identifier assigned by the authoritative catalog. Distinct from the
/// generation-scoped [`crate::index::LocalId`] the search index hands out.
pub type RecordId = i64;

/// A main folder of the guide. Subcategories reference it by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: RecordId,
    pub name: String,
}

/// One guide entry: a sub-folder with the descriptive fields the search
/// index covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: RecordId,
    pub name: String,
    pub document_type: String,
    pub identification_rules: String,
    pub supporting_information: String,
    pub category_id: RecordId,
}

/// A dated change notice shown on the updates feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub id: RecordId,
    pub reference: String,
    pub date: Date,
    pub main_folder: String,
    pub category: String,
    pub description: String,
}
