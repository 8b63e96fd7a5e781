//! Derived indexes over the mirrored records
//!
//! Every index is recomputed from a full scan of a library's store. The
//! builders consume records one at a time so the caller can feed them straight
//! from a lazy stream without materializing the library.
//!
//! Keys inside each bucket keep scan order, and the maps are `BTreeMap`s, so
//! two computations over the same store contents produce equal values.

use std::collections::BTreeMap;

use super::newtypes::RecordKey;
use super::record::Record;

/// Synthetic bucket holding the top-level collections
pub const TOP_BUCKET: &str = "top";

/// Tag → keys of the records carrying it
pub type TagIndex = BTreeMap<String, Vec<RecordKey>>;

/// Parent item key → keys of its attachments, notes and annotations
pub type ChildrenIndex = BTreeMap<RecordKey, Vec<RecordKey>>;

/// Collection key (or [`TOP_BUCKET`]) → member keys
pub type CollectionIndex = BTreeMap<String, Vec<RecordKey>>;

/// Single-pass index construction
pub trait IndexBuilder: Default {
    type Output;

    fn add(&mut self, record: &Record);

    fn finish(self) -> Self::Output;

    /// Build the index from an iterator of records
    fn build<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self::Output {
        let mut builder = Self::default();
        for record in records {
            builder.add(record);
        }
        builder.finish()
    }
}

/// Builds [`TagIndex`]
///
/// Records filed nowhere (no collections, no parent item) are left out.
#[derive(Debug, Default)]
pub struct TagIndexBuilder {
    index: TagIndex,
}

impl IndexBuilder for TagIndexBuilder {
    type Output = TagIndex;

    fn add(&mut self, record: &Record) {
        if !record.is_filed() {
            return;
        }
        for tag in record.tags() {
            self.index
                .entry(tag.clone())
                .or_default()
                .push(record.key().clone());
        }
    }

    fn finish(self) -> TagIndex {
        self.index
    }
}

/// Builds [`ChildrenIndex`]
#[derive(Debug, Default)]
pub struct ChildrenIndexBuilder {
    index: ChildrenIndex,
}

impl IndexBuilder for ChildrenIndexBuilder {
    type Output = ChildrenIndex;

    fn add(&mut self, record: &Record) {
        if let Some(parent) = record.parent_item() {
            self.index
                .entry(parent.clone())
                .or_default()
                .push(record.key().clone());
        }
    }

    fn finish(self) -> ChildrenIndex {
        self.index
    }
}

/// Builds [`CollectionIndex`]
///
/// Items land in the bucket of every collection they list. Collections land
/// in their parent's bucket, or in [`TOP_BUCKET`] when they have no parent.
/// Root items are never put in `top`.
#[derive(Debug, Default)]
pub struct CollectionIndexBuilder {
    index: CollectionIndex,
}

impl CollectionIndexBuilder {
    fn push(&mut self, bucket: &str, key: &RecordKey) {
        self.index
            .entry(bucket.to_string())
            .or_default()
            .push(key.clone());
    }
}

impl IndexBuilder for CollectionIndexBuilder {
    type Output = CollectionIndex;

    fn add(&mut self, record: &Record) {
        let key = record.key();
        for collection in record.collections() {
            self.push(collection.as_str(), key);
        }
        if let Some(parent) = record.parent_collection() {
            self.push(parent.as_str(), key);
        }
        if record.is_collection()
            && record.parent_collection().is_none()
            && record.collections().is_empty()
        {
            self.push(TOP_BUCKET, key);
        }
    }

    fn finish(self) -> CollectionIndex {
        self.index
    }
}

/// Tag → record keys over `records`
pub fn tags_index<'a>(records: impl IntoIterator<Item = &'a Record>) -> TagIndex {
    TagIndexBuilder::build(records)
}

/// Parent → child keys over `records`
pub fn children_index<'a>(records: impl IntoIterator<Item = &'a Record>) -> ChildrenIndex {
    ChildrenIndexBuilder::build(records)
}

/// Collection → member keys over `records`
pub fn collections_index<'a>(records: impl IntoIterator<Item = &'a Record>) -> CollectionIndex {
    CollectionIndexBuilder::build(records)
}
