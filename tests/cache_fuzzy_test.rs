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

//! Randomized operation traces checked against a reference model.
//!
//! Unpin stamps are unique, so victim selection is fully deterministic for
//! both algorithms and the model can predict every eviction exactly.

use std::collections::HashMap;

use pagecache::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

const ID_SPACE: PageId = 24;
const STEPS: usize = 3000;

struct ModelPage {
    pinned: bool,
    seq: Option<u64>,
    history: Vec<u64>,
}

enum FetchOutcome {
    Null,
    Hit,
    New,
    Reused(PageId),
}

struct Model {
    eviction_config: EvictionConfig,
    max_pages: usize,
    pages: HashMap<PageId, ModelPage>,
    next_seq: u64,
    fetches: u64,
    hits: u64,
}

impl Model {
    fn new(eviction_config: EvictionConfig, max_pages: usize) -> Self {
        Self {
            eviction_config,
            max_pages,
            pages: HashMap::new(),
            next_seq: 0,
            fetches: 0,
            hits: 0,
        }
    }

    fn select_victim(&self) -> Option<PageId> {
        let unpinned: Vec<(PageId, &ModelPage)> = self
            .pages
            .iter()
            .filter(|(_, page)| !page.pinned)
            .map(|(&page_id, page)| (page_id, page))
            .collect();
        if unpinned.is_empty() {
            return None;
        }
        match self.eviction_config {
            EvictionConfig::Lru => unpinned
                .into_iter()
                .min_by_key(|(_, page)| page.seq.unwrap_or(u64::MAX))
                .map(|(page_id, _)| page_id),
            EvictionConfig::Lru2 => {
                let unseasoned: Vec<(PageId, &ModelPage)> = unpinned
                    .iter()
                    .copied()
                    .filter(|(_, page)| page.history.len() < 2)
                    .collect();
                let candidates = if unseasoned.is_empty() { unpinned } else { unseasoned };
                candidates
                    .into_iter()
                    .min_by_key(|(_, page)| page.history.first().copied().unwrap_or(u64::MAX))
                    .map(|(page_id, _)| page_id)
            }
        }
    }

    fn fetch(&mut self, page_id: PageId, allocate: bool) -> FetchOutcome {
        self.fetches += 1;
        if let Some(page) = self.pages.get_mut(&page_id) {
            self.hits += 1;
            page.pinned = true;
            return FetchOutcome::Hit;
        }
        if !allocate {
            return FetchOutcome::Null;
        }
        if self.pages.len() < self.max_pages {
            self.pages.insert(
                page_id,
                ModelPage {
                    pinned: true,
                    seq: None,
                    history: vec![],
                },
            );
            return FetchOutcome::New;
        }
        let Some(victim_id) = self.select_victim() else {
            return FetchOutcome::Null;
        };
        self.pages.remove(&victim_id);
        self.pages.insert(
            page_id,
            ModelPage {
                pinned: true,
                seq: None,
                history: vec![],
            },
        );
        FetchOutcome::Reused(victim_id)
    }

    /// Returns `true` if the page was destroyed.
    fn unpin(&mut self, page_id: PageId, discard: bool) -> bool {
        if discard || self.pages.len() > self.max_pages {
            self.pages.remove(&page_id);
            return true;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let page = self.pages.get_mut(&page_id).unwrap();
        page.pinned = false;
        page.seq = Some(seq);
        page.history.push(seq);
        if page.history.len() > 2 {
            page.history.remove(0);
        }
        false
    }

    fn rekey(&mut self, page_id: PageId, new_page_id: PageId) {
        if page_id == new_page_id {
            return;
        }
        self.pages.remove(&new_page_id);
        let page = self.pages.remove(&page_id).unwrap();
        self.pages.insert(new_page_id, page);
    }

    fn truncate(&mut self, page_id_limit: PageId) {
        self.pages.retain(|&page_id, _| page_id < page_id_limit);
    }

    fn set_max_pages(&mut self, max_pages: usize) {
        self.max_pages = max_pages;
        while self.pages.len() > self.max_pages {
            let Some(victim_id) = self.select_victim() else {
                break;
            };
            self.pages.remove(&victim_id);
        }
    }

    fn pinned_ids(&self) -> Vec<PageId> {
        let mut ids: Vec<_> = self
            .pages
            .iter()
            .filter(|(_, page)| page.pinned)
            .map(|(&page_id, _)| page_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn resident_ids(&self) -> Vec<PageId> {
        let mut ids: Vec<_> = self.pages.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

fn check(cache: &PageCache, model: &Model, max_concurrent_pins: usize) {
    assert_eq!(cache.num_pages(), model.pages.len());
    assert_eq!(cache.num_fetches(), model.fetches);
    assert_eq!(cache.num_hits(), model.hits);
    assert!(cache.num_hits() <= cache.num_fetches());
    assert!(cache.num_pages() <= cache.max_pages().max(max_concurrent_pins));
}

fn fuzzy(eviction_config: EvictionConfig, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let max_pages = rng.gen_range(1..8usize);

    let mut cache = PageCache::builder(512, 16)
        .with_eviction_config(eviction_config)
        .with_max_pages(max_pages)
        .build()
        .unwrap();
    let mut model = Model::new(eviction_config, max_pages);
    let mut handles: HashMap<PageId, PageHandle> = HashMap::new();
    let mut max_concurrent_pins = 0usize;

    for _ in 0..STEPS {
        match rng.gen_range(0..100) {
            // fetch
            0..=54 => {
                let page_id = rng.gen_range(0..ID_SPACE);
                let allocate = rng.gen_bool(0.8);
                let outcome = model.fetch(page_id, allocate);
                let handle = cache.fetch(page_id, allocate).unwrap();
                match outcome {
                    FetchOutcome::Null => assert!(handle.is_none()),
                    FetchOutcome::Hit => {
                        assert_eq!(handle, Some(handles[&page_id]));
                    }
                    FetchOutcome::New => {
                        handles.insert(page_id, handle.unwrap());
                    }
                    FetchOutcome::Reused(victim_id) => {
                        // In-place reuse hands back the victim's allocation.
                        let reused = handles.remove(&victim_id).unwrap();
                        assert_eq!(handle, Some(reused));
                        handles.insert(page_id, reused);
                    }
                }
            }
            // unpin
            55..=84 => {
                let pinned = model.pinned_ids();
                if pinned.is_empty() {
                    continue;
                }
                let page_id = pinned[rng.gen_range(0..pinned.len())];
                let discard = rng.gen_bool(0.2);
                let destroyed = model.unpin(page_id, discard);
                let handle = handles[&page_id];
                unsafe { cache.unpin(handle, discard) };
                if destroyed {
                    handles.remove(&page_id);
                }
            }
            // rekey
            85..=89 => {
                let resident = model.resident_ids();
                if resident.is_empty() {
                    continue;
                }
                let page_id = resident[rng.gen_range(0..resident.len())];
                let new_page_id = rng.gen_range(0..ID_SPACE);
                // Rekey onto a pinned duplicate is undefined; keep the trace
                // legal.
                if model.pages.get(&new_page_id).map(|page| page.pinned) == Some(true) && new_page_id != page_id {
                    continue;
                }
                let handle = handles[&page_id];
                model.rekey(page_id, new_page_id);
                unsafe { cache.rekey(handle, new_page_id) };
                if new_page_id != page_id {
                    handles.remove(&new_page_id);
                    let moved = handles.remove(&page_id).unwrap();
                    handles.insert(new_page_id, moved);
                }
            }
            // truncate
            90..=93 => {
                let page_id_limit = rng.gen_range(0..ID_SPACE + 8);
                model.truncate(page_id_limit);
                cache.truncate(page_id_limit);
                handles.retain(|&page_id, _| page_id < page_id_limit);
            }
            // resize
            _ => {
                let max_pages = rng.gen_range(0..8usize);
                model.set_max_pages(max_pages);
                cache.set_max_pages(max_pages);
                handles.retain(|page_id, _| model.pages.contains_key(page_id));
            }
        }

        max_concurrent_pins = max_concurrent_pins.max(model.pinned_ids().len());
        check(&cache, &model, max_concurrent_pins);
    }

    // Every page the model considers resident is reachable, every other id
    // is not.
    for page_id in 0..ID_SPACE + 8 {
        let expected = model.pages.contains_key(&page_id);
        let outcome = model.fetch(page_id, false);
        let handle = cache.fetch(page_id, false).unwrap();
        assert_eq!(handle.is_some(), expected);
        if let FetchOutcome::Hit = outcome {
            assert_eq!(handle, Some(handles[&page_id]));
        }
    }
    check(&cache, &model, max_concurrent_pins);
}

#[test]
fn test_fuzzy_lru() {
    for seed in 0..8 {
        fuzzy(EvictionConfig::Lru, seed);
    }
}

#[test]
fn test_fuzzy_lru2() {
    for seed in 0..8 {
        fuzzy(EvictionConfig::Lru2, seed);
    }
}
