use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::index::SearchIndex;
use crate::model::Subcategory;

/// Shared handle to the live index generation.
///
/// Readers take a read guard for the duration of one query. A rebuild
/// constructs the next generation entirely off-lock and swaps it in under
/// a short write lock, so readers see either the old generation or the new
/// one, never a half-populated index.
#[derive(Clone, Default)]
pub struct SharedIndex {
    inner: Arc<RwLock<SearchIndex>>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SearchIndex> {
        self.inner.read()
    }

    /// Replace the live generation with one built from `records`, in the
    /// order given. After this returns, the index reflects exactly that
    /// record set.
    pub fn rebuild(&self, records: &[Subcategory]) {
        let mut next = SearchIndex::new();
        for record in records {
            next.add_document(record);
        }
        let count = next.len();
        *self.inner.write() = next;
        tracing::info!(documents = count, "search index rebuilt");
    }
}

/// Latched change flag connecting the data-file watcher to the request
/// path. The watcher calls [`ChangeSignal::mark_changed`]; request
/// handling calls [`ChangeSignal::take`] before serving and rebuilds when
/// it comes back true. Multiple notifications before the next request
/// collapse into a single reload.
#[derive(Default)]
pub struct ChangeSignal {
    changed: AtomicBool,
}

impl ChangeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_changed(&self) {
        self.changed.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    /// Read and clear the flag in one step, so exactly one caller observes
    /// any given notification.
    pub fn take(&self) -> bool {
        self.changed.swap(false, Ordering::SeqCst)
    }
}
