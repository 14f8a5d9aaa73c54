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

//! Bernstein's "djb2" string hash.
//!
//! Bucket selection only ever sees the raw key bytes: [`BernsteinHasher`]
//! implements [`Hasher::write`] directly and the table never routes keys
//! through [`Hash::hash`], so no length prefix or `0xff` terminator is mixed
//! into the digest. The same key therefore always lands in the same bucket
//! regardless of which build of the table inserted it.
//!
//! [`Hash::hash`]: https://doc.rust-lang.org/std/hash/trait.Hash.html#tymethod.hash

use std::hash::{BuildHasher, Hasher};

const INITIAL_STATE: u32 = 5381;

/// Hashes `key` with djb2, returning the full 32-bit digest.
pub fn bernstein_hash(key: &str) -> u32 {
    let mut hasher = BernsteinHasher::default();
    hasher.write(key.as_bytes());

    hasher.state
}

/// Streaming djb2: `h = h * 33 + byte`, wrapping on overflow.
#[derive(Clone, Copy, Debug)]
pub struct BernsteinHasher {
    state: u32,
}

impl Default for BernsteinHasher {
    fn default() -> Self {
        Self {
            state: INITIAL_STATE,
        }
    }
}

impl Hasher for BernsteinHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state = (self.state << 5)
                .wrapping_add(self.state)
                .wrapping_add(u32::from(byte));
        }
    }

    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}

/// [`BuildHasher`] producing [`BernsteinHasher`]s. This is the default hash
/// builder for [`HashTable`](crate::HashTable).
#[derive(Clone, Copy, Debug, Default)]
pub struct BernsteinState;

impl BuildHasher for BernsteinState {
    type Hasher = BernsteinHasher;

    fn build_hasher(&self) -> BernsteinHasher {
        BernsteinHasher::default()
    }
}

/// Hashes the bytes of `key` with a hasher from `build_hasher`, truncating the
/// digest to 32 bits.
pub(crate) fn hash<S: BuildHasher>(build_hasher: &S, key: &str) -> u32 {
    let mut hasher = build_hasher.build_hasher();
    hasher.write(key.as_bytes());

    hasher.finish() as u32
}
