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

use std::process;

/// Unrecoverable misuse of a bucket lock.
///
/// None of these are ever returned to callers of [`HashTable`]; they are
/// reported through [`fatal`], which terminates the process.
///
/// [`HashTable`]: crate::HashTable
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("bucket {bucket}: lock is already held by the calling thread")]
    Deadlock { bucket: usize },
    #[error("bucket {bucket}: lock destroyed while held")]
    Busy { bucket: usize },
}

fn report(error: LockError) -> String {
    format!("fatal lock error: {}", error)
}

/// Reports `error` on stderr and through `log`, then aborts the process. No
/// unwinding happens, so no cleanup of already allocated entries is
/// attempted.
#[cold]
pub(crate) fn fatal(error: LockError) -> ! {
    let report = report(error);

    // stderr first; the process may have no logger installed
    eprintln!("{}", report);
    log::error!("{}", report);

    process::abort()
}
