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

use std::{fmt::Debug, ptr::NonNull};

use crate::{
    bits,
    directory::PageDirectory,
    error::{Error, Result},
    eviction::{Eviction, EvictionConfig},
    metrics::Metrics,
    page::{Page, PageId, MAX_EXTRA_SIZE},
    strict_assert, strict_assert_eq,
};

/// Builder for [`PageCache`].
pub struct PageCacheBuilder {
    page_size: usize,
    extra_size: usize,
    max_pages: usize,
    eviction_config: EvictionConfig,
}

impl PageCacheBuilder {
    /// Start a builder.
    ///
    /// `page_size` must be a power of two; `extra_size` must not exceed
    /// [`MAX_EXTRA_SIZE`]. Violations surface from [`Self::build`].
    pub fn new(page_size: usize, extra_size: usize) -> Self {
        Self {
            page_size,
            extra_size,
            max_pages: 0,
            eviction_config: EvictionConfig::default(),
        }
    }

    /// Select the replacement algorithm.
    pub fn with_eviction_config(mut self, eviction_config: EvictionConfig) -> Self {
        self.eviction_config = eviction_config;
        self
    }

    /// Set the initial maximum number of resident pages. Defaults to 0.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn build(self) -> Result<PageCache> {
        if !bits::is_pow2(self.page_size) {
            return Err(Error::Config(format!(
                "page size must be a non-zero power of two, got {}",
                self.page_size
            )));
        }
        if self.extra_size > MAX_EXTRA_SIZE {
            return Err(Error::Config(format!(
                "extra size must not exceed {}, got {}",
                MAX_EXTRA_SIZE, self.extra_size
            )));
        }
        Ok(PageCache {
            page_size: self.page_size,
            extra_size: self.extra_size,
            max_pages: self.max_pages,
            directory: PageDirectory::new(),
            eviction: self.eviction_config.build(),
            metrics: Metrics::default(),
        })
    }
}

/// A raw, copyable token for a resident page.
///
/// The handle names the page, not its id: it stays attached to the same
/// buffers through rekey and victim reuse. It is valid while the page is
/// resident; the host contract guarantees a handle is not used after the
/// page is discarded, truncated away, or released back to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle {
    ptr: NonNull<Page>,
}

unsafe impl Send for PageHandle {}

impl PageHandle {
    fn new(ptr: NonNull<Page>) -> Self {
        Self { ptr }
    }

    /// Current identifier of the page.
    ///
    /// # Safety
    ///
    /// The page must still be resident in the cache that returned this
    /// handle.
    pub unsafe fn page_id(&self) -> PageId {
        unsafe { self.ptr.as_ref() }.page_id()
    }

    /// Whether the page is currently pinned.
    ///
    /// # Safety
    ///
    /// The page must still be resident in the cache that returned this
    /// handle.
    pub unsafe fn is_pinned(&self) -> bool {
        unsafe { self.ptr.as_ref() }.is_pinned()
    }

    /// The primary data buffer.
    ///
    /// # Safety
    ///
    /// The page must still be resident, and it must not be mutated through
    /// another copy of the handle while the returned borrow lives.
    pub unsafe fn data(&self) -> &[u8] {
        unsafe { self.ptr.as_ref() }.data()
    }

    /// The primary data buffer, mutably.
    ///
    /// # Safety
    ///
    /// The page must still be resident and pinned, and no other borrow of
    /// its buffers may live while the returned borrow does.
    pub unsafe fn data_mut(&mut self) -> &mut [u8] {
        unsafe { self.ptr.as_mut() }.data_mut()
    }

    /// The side buffer. May be empty.
    ///
    /// # Safety
    ///
    /// As for [`Self::data`].
    pub unsafe fn extra(&self) -> &[u8] {
        unsafe { self.ptr.as_ref() }.extra()
    }

    /// The side buffer, mutably.
    ///
    /// # Safety
    ///
    /// As for [`Self::data_mut`].
    pub unsafe fn extra_mut(&mut self) -> &mut [u8] {
        unsafe { self.ptr.as_mut() }.extra_mut()
    }
}

/// A pluggable page cache for page-oriented storage engines.
///
/// The host fetches pages by id and operates on their buffers while they are
/// pinned; the cache decides which resident pages to reuse when capacity is
/// reached. Pinning is a boolean claim, not a reference count: any number of
/// fetches establish the same pin and a single unpin releases it.
///
/// A cache instance is strictly single-threaded; the host serializes all
/// calls. The instance may still be sent across threads between calls.
pub struct PageCache {
    page_size: usize,
    extra_size: usize,
    max_pages: usize,

    directory: PageDirectory,
    eviction: Box<dyn Eviction>,

    metrics: Metrics,
}

unsafe impl Send for PageCache {}

impl Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("page_size", &self.page_size)
            .field("extra_size", &self.extra_size)
            .field("max_pages", &self.max_pages)
            .field("num_pages", &self.directory.len())
            .finish()
    }
}

impl PageCache {
    /// Start building a cache. See [`PageCacheBuilder::new`].
    pub fn builder(page_size: usize, extra_size: usize) -> PageCacheBuilder {
        PageCacheBuilder::new(page_size, extra_size)
    }

    /// Size in bytes of every page's data buffer.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Size in bytes of every page's side buffer.
    pub fn extra_size(&self) -> usize {
        self.extra_size
    }

    /// Current maximum number of resident pages.
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Number of resident pages, both pinned and unpinned.
    pub fn num_pages(&self) -> usize {
        self.directory.len()
    }

    /// Number of fetch operations since creation. Never decreases.
    pub fn num_fetches(&self) -> u64 {
        self.metrics.fetch
    }

    /// Number of fetch hits since creation. Never decreases.
    pub fn num_hits(&self) -> u64 {
        self.metrics.hit
    }

    /// Set the maximum number of resident pages.
    ///
    /// Unpinned pages are evicted in policy order until the resident count
    /// drops to `max_pages` or only pinned pages remain. Any remaining
    /// overflow drains at subsequent [`Self::unpin`] calls.
    pub fn set_max_pages(&mut self, max_pages: usize) {
        self.max_pages = max_pages;
        while self.directory.len() > self.max_pages {
            let Some(victim) = self.eviction.select_victim(&self.directory) else {
                break;
            };
            let page_id = unsafe { victim.as_ref() }.page_id();
            let removed = self.directory.remove(page_id);
            strict_assert_eq!(removed, Some(victim));
            self.free_page(victim);
        }
        tracing::trace!(
            "[cache]: resized to {} pages, {} resident",
            self.max_pages,
            self.directory.len()
        );
    }

    /// Fetch and pin a page.
    ///
    /// On a directory hit the page is pinned (idempotently) and returned. On
    /// a miss with `allocate` unset, `None` is returned. On a miss with
    /// `allocate` set, a new page is created while under capacity; at or over
    /// capacity an unpinned page is re-identified in place instead, keeping
    /// its buffers (contents are not rezeroed; the host re-initializes them).
    /// `None` is returned if every resident page is pinned.
    ///
    /// # Errors
    ///
    /// Fails only when buffer allocation fails; no partial page is left
    /// behind.
    pub fn fetch(&mut self, page_id: PageId, allocate: bool) -> Result<Option<PageHandle>> {
        self.metrics.fetch = self.metrics.fetch.saturating_add(1);

        if let Some(mut ptr) = self.directory.get(page_id) {
            self.metrics.hit = self.metrics.hit.saturating_add(1);
            unsafe { ptr.as_mut() }.set_pinned(true);
            self.eviction.on_pin(ptr);
            tracing::trace!("[cache]: fetch page {} hit", page_id);
            return Ok(Some(PageHandle::new(ptr)));
        }

        if !allocate {
            return Ok(None);
        }

        if self.directory.len() < self.max_pages {
            let page = Page::new(self.page_size, self.extra_size, page_id)?;
            let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(page)) };
            self.eviction.on_create(ptr);
            let old = self.directory.insert(ptr);
            strict_assert!(old.is_none());
            tracing::trace!("[cache]: fetch page {} miss, created", page_id);
            return Ok(Some(PageHandle::new(ptr)));
        }

        // At or over capacity: re-identify an unpinned page in place, keeping
        // its buffers. No live handle names the victim id.
        let Some(mut ptr) = self.eviction.select_victim(&self.directory) else {
            tracing::trace!("[cache]: fetch page {} miss, all pages pinned", page_id);
            return Ok(None);
        };
        let old_page_id = unsafe { ptr.as_ref() }.page_id();
        let removed = self.directory.remove(old_page_id);
        strict_assert_eq!(removed, Some(ptr));
        self.eviction.on_destroy(ptr);
        {
            let page = unsafe { ptr.as_mut() };
            strict_assert!(!page.is_pinned());
            page.set_page_id(page_id);
            page.set_pinned(true);
        }
        self.eviction.on_create(ptr);
        let old = self.directory.insert(ptr);
        strict_assert!(old.is_none());
        tracing::trace!("[cache]: fetch page {} miss, reused page {}", page_id, old_page_id);
        Ok(Some(PageHandle::new(ptr)))
    }

    /// Release the host's pin on a page.
    ///
    /// The page is unpinned regardless of how many fetches pinned it. With
    /// `discard` set, or while the cache is over capacity, the page is
    /// destroyed instead of becoming an eviction candidate.
    ///
    /// # Safety
    ///
    /// `page` must have been returned by this cache and still be resident.
    pub unsafe fn unpin(&mut self, page: PageHandle, discard: bool) {
        let mut ptr = page.ptr;
        strict_assert!(unsafe { ptr.as_ref() }.is_in_directory());

        if discard || self.directory.len() > self.max_pages {
            let page_id = unsafe { ptr.as_ref() }.page_id();
            let removed = self.directory.remove(page_id);
            strict_assert_eq!(removed, Some(ptr));
            self.free_page(ptr);
            tracing::trace!("[cache]: unpin page {} discarded", page_id);
            return;
        }

        unsafe { ptr.as_mut() }.set_pinned(false);
        self.eviction.on_unpin(ptr);
    }

    /// Change the id of a resident page without disturbing its buffers.
    ///
    /// If a page with `new_page_id` is already resident it is destroyed to
    /// make room; the host guarantees such a page is unpinned. The subject
    /// page keeps its pin state, buffers, and replacement bookkeeping.
    /// Rekeying a page to its current id is a no-op.
    ///
    /// # Safety
    ///
    /// `page` must have been returned by this cache and still be resident.
    pub unsafe fn rekey(&mut self, page: PageHandle, new_page_id: PageId) {
        let mut ptr = page.ptr;
        strict_assert!(unsafe { ptr.as_ref() }.is_in_directory());

        let old_page_id = unsafe { ptr.as_ref() }.page_id();
        if old_page_id == new_page_id {
            return;
        }

        if let Some(collided) = self.directory.remove(new_page_id) {
            strict_assert!(!unsafe { collided.as_ref() }.is_pinned());
            self.free_page(collided);
        }

        let removed = self.directory.remove(old_page_id);
        strict_assert_eq!(removed, Some(ptr));
        unsafe { ptr.as_mut() }.set_page_id(new_page_id);
        let old = self.directory.insert(ptr);
        strict_assert!(old.is_none());
        tracing::trace!("[cache]: rekey page {} to {}", old_page_id, new_page_id);
    }

    /// Destroy every resident page with `page_id >= page_id_limit`,
    /// pinned or not.
    ///
    /// Pinned pages in the range are implicitly unpinned and freed; the host
    /// guarantees it no longer dereferences handles into the range.
    pub fn truncate(&mut self, page_id_limit: PageId) {
        let victims = self.directory.extract(|page| page.page_id() >= page_id_limit);
        let count = victims.len();
        for ptr in victims {
            self.free_page(ptr);
        }
        tracing::trace!("[cache]: truncate at {} dropped {} pages", page_id_limit, count);
    }

    /// Destroy every resident page regardless of pin state.
    pub fn clear(&mut self) {
        let pages: Vec<NonNull<Page>> = self.directory.drain().collect();
        for ptr in pages {
            self.free_page(ptr);
        }
    }

    /// Release a page that has already been removed from the directory.
    fn free_page(&mut self, ptr: NonNull<Page>) {
        strict_assert!(!unsafe { ptr.as_ref() }.is_in_directory());
        self.eviction.on_destroy(ptr);
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

impl Drop for PageCache {
    fn drop(&mut self) {
        self.clear();
    }
}
