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

//! A pluggable page cache for page-oriented storage engines.
//!
//! The host engine fetches pages by numeric id and operates on their buffers
//! while they are pinned; the cache selects which resident pages to reuse
//! when capacity is reached. Two replacement algorithms ship: classical LRU
//! and LRU-2.
//!
//! A cache instance is single-threaded by contract (the host serializes all
//! calls) and hands out raw page handles whose buffer addresses stay stable
//! across unrelated cache operations.
//!
//! # Example
//!
//! ```
//! use pagecache::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let mut cache = PageCache::builder(4096, 0)
//!     .with_eviction_config(EvictionConfig::Lru2)
//!     .with_max_pages(64)
//!     .build()?;
//!
//! let mut page = cache.fetch(1, true)?.expect("under capacity");
//! unsafe {
//!     page.data_mut()[..4].copy_from_slice(b"head");
//!     cache.unpin(page, false);
//! }
//! # Ok(())
//! # }
//! ```

pub mod assert;
pub mod bits;
pub mod buffer;
pub mod cache;
pub mod directory;
pub mod error;
pub mod eviction;
pub mod metrics;
pub mod page;
pub mod prelude;
