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

use std::fmt::Debug;

use bitflags::bitflags;

use crate::{
    buffer::RawBuffer,
    error::Result,
    eviction::{lru::LruState, lru2::Lru2State},
};

/// Identifier of a page in the backing store.
pub type PageId = u32;

/// Required alignment of the primary data buffer.
pub const DATA_ALIGN: usize = 8;

/// Upper bound on the side buffer size.
pub const MAX_EXTRA_SIZE: usize = 250;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Flags: u8 {
        const PINNED = 0b00000001;
        const IN_DIRECTORY = 0b00000010;
    }
}

/// Per-page replacement bookkeeping, owned by the active eviction policy.
#[derive(Debug)]
pub enum EvictionState {
    Lru(LruState),
    Lru2(Lru2State),
}

impl Default for EvictionState {
    fn default() -> Self {
        Self::Lru(LruState::default())
    }
}

impl EvictionState {
    pub fn as_lru(&self) -> &LruState {
        match self {
            Self::Lru(state) => state,
            _ => unreachable!("lru state expected"),
        }
    }

    pub fn as_lru_mut(&mut self) -> &mut LruState {
        match self {
            Self::Lru(state) => state,
            _ => unreachable!("lru state expected"),
        }
    }

    pub fn as_lru2(&self) -> &Lru2State {
        match self {
            Self::Lru2(state) => state,
            _ => unreachable!("lru-2 state expected"),
        }
    }

    pub fn as_lru2_mut(&mut self) -> &mut Lru2State {
        match self {
            Self::Lru2(state) => state,
            _ => unreachable!("lru-2 state expected"),
        }
    }
}

/// A resident page.
///
/// A page exclusively owns two buffers: `data` (exactly `page_size` bytes,
/// base address aligned to [`DATA_ALIGN`]) and `extra` (exactly `extra_size`
/// bytes of side-channel scratch for the host). Both buffers keep their
/// address and length from creation until the page is destroyed, so raw
/// pointers handed out while the page is pinned stay valid across unrelated
/// cache operations.
pub struct Page {
    data: RawBuffer,
    extra: RawBuffer,
    page_id: PageId,
    flags: Flags,
    pub(crate) state: EvictionState,
}

impl Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("page_id", &self.page_id)
            .field("flags", &self.flags)
            .finish()
    }
}

impl Page {
    /// Allocate a page with zeroed buffers.
    ///
    /// The page starts pinned. If either allocation fails the partially
    /// constructed buffers are released and nothing leaks.
    pub(crate) fn new(page_size: usize, extra_size: usize, page_id: PageId) -> Result<Box<Self>> {
        let data = RawBuffer::zeroed(page_size, DATA_ALIGN)?;
        let extra = RawBuffer::zeroed(extra_size, 1)?;
        Ok(Box::new(Self {
            data,
            extra,
            page_id,
            flags: Flags::PINNED,
            state: EvictionState::default(),
        }))
    }

    /// Current identifier of the page. Changes only through rekey and victim
    /// reuse.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub(crate) fn set_page_id(&mut self, page_id: PageId) {
        self.page_id = page_id;
    }

    /// The primary data buffer.
    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut_slice()
    }

    /// The side buffer. May be empty.
    pub fn extra(&self) -> &[u8] {
        self.extra.as_slice()
    }

    pub fn extra_mut(&mut self) -> &mut [u8] {
        self.extra.as_mut_slice()
    }

    pub fn is_pinned(&self) -> bool {
        self.flags.contains(Flags::PINNED)
    }

    pub(crate) fn set_pinned(&mut self, pinned: bool) {
        self.flags.set(Flags::PINNED, pinned);
    }

    pub(crate) fn is_in_directory(&self) -> bool {
        self.flags.contains(Flags::IN_DIRECTORY)
    }

    pub(crate) fn set_in_directory(&mut self, in_directory: bool) {
        self.flags.set(Flags::IN_DIRECTORY, in_directory);
    }
}
