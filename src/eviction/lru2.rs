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
    assert::OptionExt,
    directory::PageDirectory,
    page::{EvictionState, Page},
};

use super::Eviction;

/// Bounded queue of the two most recent unpin stamps, oldest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpinHistory {
    stamps: [u64; 2],
    len: u8,
}

impl UnpinHistory {
    /// Append a stamp, dropping the oldest when full.
    pub fn push(&mut self, stamp: u64) {
        if self.len < 2 {
            self.stamps[self.len as usize] = stamp;
            self.len += 1;
        } else {
            self.stamps[0] = self.stamps[1];
            self.stamps[1] = stamp;
        }
    }

    /// The oldest retained stamp.
    pub fn front(&self) -> Option<u64> {
        (self.len > 0).then(|| self.stamps[0])
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Lru-2 eviction algorithm state.
#[derive(Debug, Default)]
pub struct Lru2State {
    pub(crate) history: UnpinHistory,
}

/// LRU-2: evict the unpinned page whose second-to-last unpin is oldest.
///
/// Pages that have been unpinned only once are "unseasoned" and are evicted
/// before any fully seasoned page: a single unseasoned candidate is taken
/// outright, several are ordered by their first stamp.
#[derive(Debug, Default)]
pub struct Lru2 {
    next_seq: u64,
}

impl Lru2 {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

impl Eviction for Lru2 {
    fn on_create(&mut self, mut ptr: NonNull<Page>) {
        unsafe { ptr.as_mut() }.state = EvictionState::Lru2(Lru2State::default());
    }

    fn on_pin(&mut self, _: NonNull<Page>) {}

    fn on_unpin(&mut self, mut ptr: NonNull<Page>) {
        let seq = self.next_seq();
        unsafe { ptr.as_mut() }.state.as_lru2_mut().history.push(seq);
    }

    fn on_destroy(&mut self, _: NonNull<Page>) {}

    fn select_victim(&mut self, directory: &PageDirectory) -> Option<NonNull<Page>> {
        let mut num_unpinned = 0usize;
        let mut num_unseasoned = 0usize;
        for ptr in directory.iter() {
            let page = unsafe { ptr.as_ref() };
            if page.is_pinned() {
                continue;
            }
            num_unpinned += 1;
            if page.state.as_lru2().history.len() < 2 {
                num_unseasoned += 1;
            }
        }

        if num_unpinned == 0 {
            return None;
        }

        let mut victim: Option<(u64, NonNull<Page>)> = None;
        for ptr in directory.iter() {
            let page = unsafe { ptr.as_ref() };
            if page.is_pinned() {
                continue;
            }
            let history = &page.state.as_lru2().history;
            if num_unseasoned > 0 && history.len() == 2 {
                continue;
            }
            if num_unseasoned == 1 {
                // The only unseasoned candidate; its stamp is not consulted.
                return Some(ptr);
            }
            // An unpinned page always carries at least one stamp: it was
            // stamped by the unpin that made it a candidate.
            let front = unsafe { history.front().strict_unwrap_unchecked() };
            match victim {
                Some((min, _)) if front > min => {}
                _ => victim = Some((front, ptr)),
            }
        }
        victim.map(|(_, ptr)| ptr)
    }
}
