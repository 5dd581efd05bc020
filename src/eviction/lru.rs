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

use std::ptr::NonNull;

use crate::{
    directory::PageDirectory,
    page::{EvictionState, Page},
};

use super::Eviction;

/// Lru eviction algorithm state.
///
/// `seq` is the stamp of the page's most recent unpin, `None` until the page
/// has been unpinned at least once. A `None` stamp orders after every real
/// stamp, so a freshly created page is the last possible choice among
/// unpinned candidates.
#[derive(Debug, Default)]
pub struct LruState {
    pub(crate) seq: Option<u64>,
}

/// Classical LRU: evict the unpinned page whose last unpin is oldest.
#[derive(Debug, Default)]
pub struct Lru {
    next_seq: u64,
}

impl Lru {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

impl Eviction for Lru {
    fn on_create(&mut self, mut ptr: NonNull<Page>) {
        unsafe { ptr.as_mut() }.state = EvictionState::Lru(LruState::default());
    }

    fn on_pin(&mut self, _: NonNull<Page>) {}

    fn on_unpin(&mut self, mut ptr: NonNull<Page>) {
        let seq = self.next_seq();
        unsafe { ptr.as_mut() }.state.as_lru_mut().seq = Some(seq);
    }

    fn on_destroy(&mut self, _: NonNull<Page>) {}

    fn select_victim(&mut self, directory: &PageDirectory) -> Option<NonNull<Page>> {
        let mut victim: Option<(u64, NonNull<Page>)> = None;
        for ptr in directory.iter() {
            let page = unsafe { ptr.as_ref() };
            if page.is_pinned() {
                continue;
            }
            let seq = page.state.as_lru().seq.unwrap_or(u64::MAX);
            match victim {
                Some((min, _)) if seq > min => {}
                _ => victim = Some((seq, ptr)),
            }
        }
        victim.map(|(_, ptr)| ptr)
    }
}

#[cfg(test)]
pub mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::page::PageId;

    fn new_test_page_ptr(page_id: PageId) -> NonNull<Page> {
        let page = Page::new(64, 0, page_id).unwrap();
        unsafe { NonNull::new_unchecked(Box::into_raw(page)) }
    }

    fn del_test_page_ptr(ptr: NonNull<Page>) {
        let _ = unsafe { Box::from_raw(ptr.as_ptr()) };
    }

    #[test]
    fn test_lru_victim_order() {
        let mut lru = Lru::default();
        let mut directory = PageDirectory::new();
        let ptrs = (0..4).map(new_test_page_ptr).collect_vec();
        for &ptr in &ptrs {
            lru.on_create(ptr);
            directory.insert(ptr);
        }

        // Unpin 2, 0, 3; keep 1 pinned.
        for &i in &[2usize, 0, 3] {
            let mut ptr = ptrs[i];
            unsafe { ptr.as_mut() }.set_pinned(false);
            lru.on_unpin(ptr);
        }

        assert_eq!(lru.select_victim(&directory), Some(ptrs[2]));

        // Re-pin 2; the next victim is the next oldest unpin.
        let mut repinned = ptrs[2];
        unsafe { repinned.as_mut() }.set_pinned(true);
        lru.on_pin(repinned);
        assert_eq!(lru.select_victim(&directory), Some(ptrs[0]));

        for ptr in directory.drain().collect_vec() {
            del_test_page_ptr(ptr);
        }
    }

    #[test]
    fn test_lru_no_unpinned_page() {
        let mut lru = Lru::default();
        let mut directory = PageDirectory::new();
        let ptrs = (0..3).map(new_test_page_ptr).collect_vec();
        for &ptr in &ptrs {
            lru.on_create(ptr);
            directory.insert(ptr);
        }

        // All pages are pinned at creation.
        assert_eq!(lru.select_victim(&directory), None);

        for ptr in directory.drain().collect_vec() {
            del_test_page_ptr(ptr);
        }
    }

    #[test]
    fn test_lru_unstamped_page_chosen_last() {
        let mut lru = Lru::default();
        let mut directory = PageDirectory::new();
        let mut stamped = new_test_page_ptr(0);
        let mut unstamped = new_test_page_ptr(1);
        for &ptr in &[stamped, unstamped] {
            lru.on_create(ptr);
            directory.insert(ptr);
        }

        unsafe { stamped.as_mut() }.set_pinned(false);
        lru.on_unpin(stamped);
        // Force the sentinel path: an unpinned page that was never unpinned
        // through the policy.
        unsafe { unstamped.as_mut() }.set_pinned(false);

        assert_eq!(lru.select_victim(&directory), Some(stamped));

        for ptr in directory.drain().collect_vec() {
            del_test_page_ptr(ptr);
        }
    }

    #[test]
    fn test_lru_recency_follows_unpin_not_creation() {
        let mut lru = Lru::default();
        let mut directory = PageDirectory::new();
        let ptrs = (0..3).map(new_test_page_ptr).collect_vec();
        for &ptr in &ptrs {
            lru.on_create(ptr);
            directory.insert(ptr);
        }

        // Unpin in reverse creation order; the victim is the earliest unpin.
        for &i in &[2usize, 1, 0] {
            let mut ptr = ptrs[i];
            unsafe { ptr.as_mut() }.set_pinned(false);
            lru.on_unpin(ptr);
        }
        assert_eq!(lru.select_victim(&directory), Some(ptrs[2]));

        // Unpinning 2 again refreshes its stamp.
        lru.on_unpin(ptrs[2]);
        assert_eq!(lru.select_victim(&directory), Some(ptrs[1]));

        for ptr in directory.drain().collect_vec() {
            del_test_page_ptr(ptr);
        }
    }
}
