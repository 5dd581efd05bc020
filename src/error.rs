// Copyright 2025 pagecache Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Page cache error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The allocator failed to produce a buffer of the requested layout.
    ///
    /// The enclosing operation aborts; no partially constructed page is left
    /// in the cache.
    #[error("buffer allocation of {size} bytes (align {align}) failed")]
    Allocation {
        /// Requested buffer size in bytes.
        size: usize,
        /// Requested buffer alignment in bytes.
        align: usize,
    },
    /// Invalid construction parameters.
    #[error("config error: {0}")]
    Config(String),
}

/// Page cache result.
pub type Result<T> = std::result::Result<T, Error>;
