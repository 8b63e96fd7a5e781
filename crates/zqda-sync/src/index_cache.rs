//! Memoized derived indexes
//!
//! One slot per index kind per library. Any completed sync clears every slot
//! at once; a generation counter keeps a computation that started before the
//! clear from writing its stale result back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::TryStreamExt;
use tracing::debug;

use zqda_core::domain::index::{
    ChildrenIndexBuilder, CollectionIndexBuilder, IndexBuilder, TagIndexBuilder,
};
use zqda_core::domain::{ChildrenIndex, CollectionIndex, LibraryId, TagIndex};
use zqda_core::ports::IRecordStore;

struct Slots<T> {
    entries: Mutex<HashMap<LibraryId, Arc<T>>>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Slots<T> {
    fn get(&self, library: LibraryId) -> Option<Arc<T>> {
        self.lock().get(&library).cloned()
    }

    fn insert_if(&self, library: LibraryId, value: Arc<T>, current: impl FnOnce() -> bool) {
        let mut entries = self.lock();
        if current() {
            entries.insert(library, value);
        }
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<LibraryId, Arc<T>>> {
        // A panic while holding the lock leaves a plain map behind; keep using it.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Per-library cache of the tags, children and collections indexes
#[derive(Default)]
pub struct IndexCache {
    generation: AtomicU64,
    tags: Slots<TagIndex>,
    children: Slots<ChildrenIndex>,
    collections: Slots<CollectionIndex>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of invalidations so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Drop every cached index
    pub fn invalidate(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.tags.clear();
        self.children.clear();
        self.collections.clear();
        debug!(generation, "Index cache invalidated");
    }

    pub async fn tags(
        &self,
        library: LibraryId,
        store: &dyn IRecordStore,
    ) -> anyhow::Result<Arc<TagIndex>> {
        self.get_or_build::<TagIndexBuilder>(&self.tags, library, store)
            .await
    }

    pub async fn children(
        &self,
        library: LibraryId,
        store: &dyn IRecordStore,
    ) -> anyhow::Result<Arc<ChildrenIndex>> {
        self.get_or_build::<ChildrenIndexBuilder>(&self.children, library, store)
            .await
    }

    pub async fn collections(
        &self,
        library: LibraryId,
        store: &dyn IRecordStore,
    ) -> anyhow::Result<Arc<CollectionIndex>> {
        self.get_or_build::<CollectionIndexBuilder>(&self.collections, library, store)
            .await
    }

    async fn get_or_build<B>(
        &self,
        slots: &Slots<B::Output>,
        library: LibraryId,
        store: &dyn IRecordStore,
    ) -> anyhow::Result<Arc<B::Output>>
    where
        B: IndexBuilder + Send,
        B::Output: Send + Sync,
    {
        if let Some(hit) = slots.get(library) {
            return Ok(hit);
        }

        let started = self.generation();
        let mut builder = B::default();
        let mut records = store.scan(library).await?;
        while let Some(record) = records.try_next().await? {
            builder.add(&record);
        }
        let index = Arc::new(builder.finish());

        slots.insert_if(library, Arc::clone(&index), || self.generation() == started);
        Ok(index)
    }
}
