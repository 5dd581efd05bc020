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

use serde::{Deserialize, Serialize};

use crate::{directory::PageDirectory, page::Page};

use self::{lru::Lru, lru2::Lru2};

/// Replacement algorithm selection, made at cache construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvictionConfig {
    /// Evict the page whose last unpin is oldest.
    #[default]
    Lru,
    /// Evict the page whose second-to-last unpin is oldest, with a tiered
    /// fallback for pages that have been unpinned only once.
    Lru2,
}

impl EvictionConfig {
    pub(crate) fn build(self) -> Box<dyn Eviction> {
        match self {
            Self::Lru => Box::<Lru>::default(),
            Self::Lru2 => Box::<Lru2>::default(),
        }
    }
}

/// Replacement policy abstraction.
///
/// The engine notifies the policy of every page lifecycle transition and asks
/// it to nominate victims among unpinned resident pages. Policies keep their
/// per-page bookkeeping inline in the page
/// ([`EvictionState`](crate::page::EvictionState)) plus a per-instance
/// monotone sequence counter advanced at each unpin.
///
/// Pointers passed to the hooks are owned by the calling engine and valid for
/// the duration of the call. A hook may dereference its pointer mutably
/// ***iff*** it received `&mut self`; `select_victim` must only read through
/// the pointers it observes.
pub trait Eviction: Send + Sync + 'static {
    /// Note a freshly created page, or a victim being reused under a new id.
    ///
    /// Resets the page's policy state; the page carries no recency yet.
    fn on_create(&mut self, ptr: NonNull<Page>);

    /// Called on every fetch hit.
    ///
    /// Pinned pages carry no live replacement metadata, so both shipped
    /// policies leave the page untouched here; recency is reassigned at the
    /// next unpin.
    fn on_pin(&mut self, ptr: NonNull<Page>);

    /// Record an unpin event and assign fresh recency bookkeeping.
    fn on_unpin(&mut self, ptr: NonNull<Page>);

    /// Forget a page that is about to be destroyed.
    fn on_destroy(&mut self, ptr: NonNull<Page>);

    /// Nominate one unpinned page for eviction.
    ///
    /// Returns `None` iff no unpinned page exists. Ties are broken by
    /// directory iteration order.
    fn select_victim(&mut self, directory: &PageDirectory) -> Option<NonNull<Page>>;
}

pub mod lru;
pub mod lru2;
