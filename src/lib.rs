// MIT License
//
// Copyright (c) 2019 Gregory Meyer
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

//! A fixed-capacity concurrent hash table from string keys to `u32` values,
//! striped with one lock per bucket.
//!
//! [`HashTable`] is one member of a family of tables that differ only in how
//! coarsely they lock. This one gives every bucket its own error-checking
//! mutex, takes it only on the write path, and lets readers walk chains
//! without any locking at all.
//!
//! ```
//! use stripe_table::HashTable;
//!
//! let table = HashTable::new();
//!
//! table.add_entry("alice", 1);
//! table.add_entry("bob", 2);
//! table.add_entry("alice", 3);
//!
//! assert_eq!(table.get_value("alice"), 3);
//! assert_eq!(table.get_value("bob"), 2);
//! assert!(!table.contains("carol"));
//! ```

pub mod error;
pub mod hash;
mod lock;
pub mod map;

pub use error::LockError;
pub use hash::{bernstein_hash, BernsteinState};
pub use map::{HashTable, InsertMode, ParseInsertModeError, CAPACITY};
