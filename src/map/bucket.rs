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

use crate::{
    error::fatal,
    lock::{BucketGuard, BucketLock},
};

use std::{
    mem,
    sync::atomic::{AtomicU32, Ordering},
};

use crossbeam_epoch::{Atomic, Guard, Owned, Shared};

/// One node of a collision chain.
///
/// The key is borrowed from the caller; the table only ever frees the node
/// that wraps it.
#[derive(Debug)]
pub(crate) struct Entry<'k> {
    pub(crate) key: &'k str,
    value: AtomicU32,
    next: Atomic<Entry<'k>>,
}

impl<'k> Entry<'k> {
    pub(crate) fn new(key: &'k str, value: u32) -> Owned<Self> {
        Owned::new(Self {
            key,
            value: AtomicU32::new(value),
            next: Atomic::null(),
        })
    }

    pub(crate) fn value(&self) -> u32 {
        self.value.load(Ordering::Relaxed)
    }

    pub(crate) fn set_value(&self, value: u32, _held: &BucketGuard<'_>) {
        self.value.store(value, Ordering::Relaxed);
    }
}

/// A lock and the chain it guards.
///
/// Writers link new entries at the head while holding `lock`. Readers walk the
/// chain without it: links are published with release stores, so a reader
/// sees either the old head or a fully initialized new entry. Entries are
/// never unlinked while the table is shared, which keeps every pointer a
/// reader can reach valid until [`Bucket::destroy`].
#[derive(Debug)]
pub(crate) struct Bucket<'k> {
    lock: BucketLock,
    head: Atomic<Entry<'k>>,
}

impl<'k> Bucket<'k> {
    pub(crate) fn new() -> Self {
        Self {
            lock: BucketLock::new(),
            head: Atomic::null(),
        }
    }

    pub(crate) fn lock(&self, index: usize) -> BucketGuard<'_> {
        self.lock.lock(index)
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Returns the first entry for `key`, which is the most recently linked
    /// one if the chain holds duplicates.
    pub(crate) fn find<'g>(&self, key: &str, guard: &'g Guard) -> Option<&'g Entry<'k>>
    where
        'k: 'g,
    {
        self.iter(guard).find(|entry| entry.key == key)
    }

    pub(crate) fn count<'g>(&self, key: &str, guard: &'g Guard) -> usize
    where
        'k: 'g,
    {
        self.iter(guard).filter(|entry| entry.key == key).count()
    }

    /// Links `entry` at the head of the chain.
    pub(crate) fn push_front(
        &self,
        entry: Owned<Entry<'k>>,
        _held: &BucketGuard<'_>,
        guard: &Guard,
    ) {
        // the lock serializes writers, so the current head cannot move under us
        let head = self.head.load(Ordering::Relaxed, guard);
        entry.next.store(head, Ordering::Relaxed);

        self.head.store(entry, Ordering::Release);
    }

    fn iter<'g>(&self, guard: &'g Guard) -> Chain<'g, 'k>
    where
        'k: 'g,
    {
        Chain {
            current: self.head.load(Ordering::Acquire, guard),
            guard,
        }
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> Vec<&'k str> {
        let guard = &crossbeam_epoch::pin();

        self.iter(guard).map(|entry| entry.key).collect()
    }

    /// Tears down the lock and frees every entry, returning how many were
    /// freed. Aborts if the lock is still held.
    pub(crate) fn destroy(&mut self, index: usize) -> usize {
        if let Err(e) = self.lock.destroy(index) {
            fatal(e);
        }

        // exclusive access; nothing else can be reading the chain
        let guard = unsafe { crossbeam_epoch::unprotected() };

        let mut current = self.head.swap(Shared::null(), Ordering::Relaxed, guard);
        let mut freed = 0;

        while !current.is_null() {
            let next = unsafe { current.deref() }
                .next
                .load(Ordering::Relaxed, guard);

            mem::drop(unsafe { current.into_owned() });

            current = next;
            freed += 1;
        }

        freed
    }

    #[cfg(test)]
    pub(crate) fn try_destroy(&mut self, index: usize) -> Result<usize, crate::LockError> {
        self.lock.destroy(index)?;

        Ok(self.destroy(index))
    }
}

struct Chain<'g, 'k: 'g> {
    current: Shared<'g, Entry<'k>>,
    guard: &'g Guard,
}

impl<'g, 'k: 'g> Iterator for Chain<'g, 'k> {
    type Item = &'g Entry<'k>;

    fn next(&mut self) -> Option<Self::Item> {
        // entries reachable from a shared bucket are only freed by `destroy`,
        // which requires exclusive access
        let entry = unsafe { self.current.as_ref() }?;
        self.current = entry.next.load(Ordering::Acquire, self.guard);

        Some(entry)
    }
}
