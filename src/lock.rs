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

//! Error-checking bucket locks.
//!
//! A [`BucketLock`] is a blocking mutex that remembers which thread holds it.
//! Relocking from the owning thread is reported as [`LockError::Deadlock`]
//! instead of hanging forever. Unlocking is only possible by dropping the
//! [`BucketGuard`], so unlock-by-non-owner and double unlock cannot be
//! expressed at all.

use crate::error::{fatal, LockError};

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};

const UNOWNED: usize = 0;

thread_local! {
    static THREAD_TOKEN: u8 = 0;
}

// the address of a thread local is unique among live threads and never zero
fn current_thread_token() -> usize {
    THREAD_TOKEN.with(|token| token as *const u8 as usize)
}

#[derive(Debug)]
pub(crate) struct BucketLock {
    mutex: Mutex<()>,
    owner: AtomicUsize,
}

impl BucketLock {
    pub(crate) fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            owner: AtomicUsize::new(UNOWNED),
        }
    }

    /// Blocks until the lock is acquired. Aborts the process if the calling
    /// thread already holds it.
    pub(crate) fn lock(&self, bucket: usize) -> BucketGuard<'_> {
        self.acquire(bucket).unwrap_or_else(|e| fatal(e))
    }

    pub(crate) fn acquire(&self, bucket: usize) -> Result<BucketGuard<'_>, LockError> {
        let me = current_thread_token();

        // only this thread can have stored `me`, so a relaxed load suffices
        if self.owner.load(Ordering::Relaxed) == me {
            return Err(LockError::Deadlock { bucket });
        }

        let guard = self.mutex.lock();
        self.owner.store(me, Ordering::Relaxed);

        Ok(BucketGuard {
            owner: &self.owner,
            _guard: guard,
        })
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }

    /// Checks that the lock can be torn down.
    pub(crate) fn destroy(&mut self, bucket: usize) -> Result<(), LockError> {
        if self.is_locked() {
            Err(LockError::Busy { bucket })
        } else {
            Ok(())
        }
    }
}

/// Proof that a bucket lock is held. Releases the lock when dropped.
#[must_use]
pub(crate) struct BucketGuard<'a> {
    owner: &'a AtomicUsize,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for BucketGuard<'_> {
    fn drop(&mut self) {
        // runs before `_guard` unlocks the mutex
        self.owner.store(UNOWNED, Ordering::Relaxed);
    }
}
