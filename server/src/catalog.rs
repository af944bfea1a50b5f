use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use guidex_core::model::{Category, RecordId, Subcategory, Update};

/// Authoritative in-memory dataset, replaced wholesale on every load of
/// the guide file. Lookups clone records out so callers never hold the
/// lock across response shaping.
#[derive(Default)]
pub struct Catalog {
    inner: RwLock<CatalogData>,
}

#[derive(Default)]
struct CatalogData {
    categories: Vec<Category>,
    subcategories: Vec<Subcategory>,
    updates: Vec<Update>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(
        &self,
        categories: Vec<Category>,
        subcategories: Vec<Subcategory>,
        updates: Vec<Update>,
    ) {
        let mut data = self.inner.write();
        data.categories = categories;
        data.subcategories = subcategories;
        data.updates = updates;
    }

    /// Fetch the requested records in one pass, keyed by id. Ids no longer
    /// present (the data was reloaded since they were resolved) are simply
    /// absent from the map.
    pub fn subcategories_by_ids(&self, ids: &[RecordId]) -> HashMap<RecordId, Subcategory> {
        let wanted: HashSet<RecordId> = ids.iter().copied().collect();
        self.inner
            .read()
            .subcategories
            .iter()
            .filter(|s| wanted.contains(&s.id))
            .map(|s| (s.id, s.clone()))
            .collect()
    }

    pub fn category_name(&self, id: RecordId) -> Option<String> {
        self.inner
            .read()
            .categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
    }

    /// The most recent updates, newest date first, ids descending within a
    /// date, truncated to `limit`.
    pub fn recent_updates(&self, limit: usize) -> Vec<Update> {
        let mut updates = self.inner.read().updates.clone();
        updates.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        updates.truncate(limit);
        updates
    }
}
