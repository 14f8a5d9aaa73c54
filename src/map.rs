// MIT License
//
// Copyright (c) 2020 Gregory Meyer
//
// Permission is hereby granted, free of charge, to any person
// obtaining a copy of this software and associated documentation files
// (the "Software"), to deal in the Software without restriction,
// including without limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of the Software,
// and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS
// BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN
// ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! A fixed-capacity concurrent hash table striped with one lock per bucket.

pub(crate) mod bucket;


use bucket::{Bucket, Entry};

use crate::hash::{self, BernsteinState};

use std::{
    fmt,
    hash::BuildHasher,
    str::FromStr,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Number of buckets in every [`HashTable`].
pub const CAPACITY: usize = 4096;

/// Default hasher for `HashTable`.
///
/// This is Bernstein's djb2, applied to the raw bytes of each key. It is
/// neither DoS resistant nor particularly well distributed, but it is
/// deterministic across runs and processes, which keeps bucket assignment
/// reproducible between benchmark runs.
pub type DefaultHashBuilder = BernsteinState;

/// How [`HashTable::add_entry`] links a key that was not found on the first
/// scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InsertMode {
    /// Link the new entry without scanning the chain again.
    ///
    /// Two threads inserting the same new key at the same time may both link
    /// an entry, leaving a duplicate that shadows the older one until the
    /// table is dropped.
    #[default]
    TwoPhase,
    /// Scan the chain again after reacquiring the lock, updating the existing
    /// entry instead of linking a duplicate.
    Recheck,
}

impl fmt::Display for InsertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertMode::TwoPhase => f.write_str("two-phase"),
            InsertMode::Recheck => f.write_str("recheck"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown insert mode {0:?}, expected \"two-phase\" or \"recheck\"")]
pub struct ParseInsertModeError(String);

impl FromStr for InsertMode {
    type Err = ParseInsertModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two-phase" => Ok(InsertMode::TwoPhase),
            "recheck" => Ok(InsertMode::Recheck),
            _ => Err(ParseInsertModeError(s.to_string())),
        }
    }
}

/// A concurrent hash table from borrowed string keys to `u32` values.
///
/// The table has exactly [`CAPACITY`] buckets for its entire lifetime; it
/// never grows or rehashes. Each bucket owns a collision chain and a lock that
/// serializes writers to that chain. Operations on keys in different buckets
/// never contend with each other, and there is no table-wide lock.
///
/// Lookups ([`contains`], [`get`], [`get_value`]) do not take the bucket lock.
/// They may run concurrently with an insertion into the same bucket, in which
/// case they observe the chain either before or after the new entry is linked.
/// Value updates are likewise visible to readers at some unspecified point
/// during the update.
///
/// Keys are not copied. The table borrows each key for `'k`, so key storage
/// must outlive the table. Entries cannot be removed; all of them are freed
/// when the table is dropped.
///
/// [`contains`]: #method.contains
/// [`get`]: #method.get
/// [`get_value`]: #method.get_value
pub struct HashTable<'k, S = DefaultHashBuilder> {
    buckets: Box<[Bucket<'k>]>,
    build_hasher: S,
    insert_mode: InsertMode,
    len: AtomicUsize,
}

impl<'k> HashTable<'k, DefaultHashBuilder> {
    /// Creates an empty `HashTable` using [`InsertMode::TwoPhase`].
    pub fn new() -> Self {
        Self::with_insert_mode_and_hasher(InsertMode::default(), DefaultHashBuilder::default())
    }

    /// Creates an empty `HashTable` that links new keys according to
    /// `insert_mode`.
    pub fn with_insert_mode(insert_mode: InsertMode) -> Self {
        Self::with_insert_mode_and_hasher(insert_mode, DefaultHashBuilder::default())
    }
}

impl Default for HashTable<'_, DefaultHashBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'k, S> HashTable<'k, S> {
    /// Creates an empty `HashTable` that will use `build_hasher` to select
    /// buckets.
    pub fn with_hasher(build_hasher: S) -> Self {
        Self::with_insert_mode_and_hasher(InsertMode::default(), build_hasher)
    }

    /// Creates an empty `HashTable` that uses `build_hasher` to select
    /// buckets and links new keys according to `insert_mode`.
    ///
    /// All [`CAPACITY`] buckets and their locks are allocated up front.
    pub fn with_insert_mode_and_hasher(insert_mode: InsertMode, build_hasher: S) -> Self {
        let buckets: Box<[Bucket<'k>]> = (0..CAPACITY).map(|_| Bucket::new()).collect();

        log::debug!(
            "created table with {} buckets, insert mode {}",
            buckets.len(),
            insert_mode
        );

        Self {
            buckets,
            build_hasher,
            insert_mode,
            len: AtomicUsize::new(0),
        }
    }

    /// Returns the number of entries linked into this table.
    ///
    /// Duplicate entries for the same key left behind by
    /// [`InsertMode::TwoPhase`] are each counted. In-progress insertions are
    /// not counted.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Returns true if no entries have been linked into this table.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of buckets, which is always [`CAPACITY`].
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn insert_mode(&self) -> InsertMode {
        self.insert_mode
    }

    /// Destroys every bucket lock and frees every entry, returning how many
    /// entries were freed. Aborts the process if any bucket lock is held.
    pub(crate) fn free_chains(&mut self) -> usize {
        let freed = self
            .buckets
            .iter_mut()
            .enumerate()
            .map(|(index, bucket)| bucket.destroy(index))
            .sum();

        self.len.store(0, Ordering::Relaxed);

        freed
    }
}

impl<'k, S: BuildHasher> HashTable<'k, S> {
    /// Returns the index of the bucket that `key` belongs to.
    ///
    /// This is a pure function of the key bytes and the hasher.
    pub fn bucket_index(&self, key: &str) -> usize {
        hash::hash(&self.build_hasher, key) as usize % self.buckets.len()
    }

    /// Returns true if an entry for `key` is linked into this table.
    ///
    /// Does not take the bucket lock.
    pub fn contains(&self, key: &str) -> bool {
        let guard = &crossbeam_epoch::pin();

        self.bucket(key).find(key, guard).is_some()
    }

    /// Returns the value associated with `key`, or `None` if there is none.
    ///
    /// Does not take the bucket lock.
    pub fn get(&self, key: &str) -> Option<u32> {
        let guard = &crossbeam_epoch::pin();

        self.bucket(key).find(key, guard).map(Entry::value)
    }

    /// Returns the value associated with `key`.
    ///
    /// Does not take the bucket lock.
    ///
    /// # Panics
    ///
    /// Panics if `key` has not been added to this table. Use [`get`] if the
    /// key may be absent.
    ///
    /// [`get`]: #method.get
    pub fn get_value(&self, key: &str) -> u32 {
        match self.get(key) {
            Some(value) => value,
            None => panic!("get_value: no entry for key {:?}", key),
        }
    }

    /// Returns how many entries for `key` are linked into this table.
    ///
    /// This is at most one unless concurrent [`InsertMode::TwoPhase`]
    /// insertions of the same key raced. Does not take the bucket lock.
    pub fn entry_count(&self, key: &str) -> usize {
        let guard = &crossbeam_epoch::pin();

        self.bucket(key).count(key, guard)
    }

    /// Associates `value` with `key`, overwriting the value of an existing
    /// entry or linking a new one.
    ///
    /// The bucket lock is held while scanning for `key` and updating it, then
    /// released while the new entry is allocated, then taken again to link
    /// the entry at the head of the chain. What happens if another thread
    /// links the same key in between depends on the table's [`InsertMode`].
    pub fn add_entry(&self, key: &'k str, value: u32) {
        let index = self.bucket_index(key);
        let bucket = &self.buckets[index];
        let guard = &crossbeam_epoch::pin();

        {
            let held = bucket.lock(index);

            if let Some(entry) = bucket.find(key, guard) {
                entry.set_value(value, &held);
                log::trace!("bucket {}: updated {:?}", index, key);

                return;
            }
        }

        let new_entry = Entry::new(key, value);

        let held = bucket.lock(index);

        if self.insert_mode == InsertMode::Recheck {
            if let Some(entry) = bucket.find(key, guard) {
                entry.set_value(value, &held);
                log::warn!(
                    "bucket {}: {:?} was linked by another thread, updating instead",
                    index,
                    key
                );

                return;
            }
        }

        bucket.push_front(new_entry, &held, guard);
        self.len.fetch_add(1, Ordering::Relaxed);

        log::trace!("bucket {}: linked {:?}", index, key);
    }

    fn bucket(&self, key: &str) -> &Bucket<'k> {
        &self.buckets[self.bucket_index(key)]
    }
}

impl<S> fmt::Debug for HashTable<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("insert_mode", &self.insert_mode)
            .finish()
    }
}

impl<S> Drop for HashTable<'_, S> {
    fn drop(&mut self) {
        let freed = self.free_chains();

        log::debug!("dropped table, freed {} entries", freed);
    }
}
