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

use ahash::RandomState;
use hashbrown::hash_table::{Entry as HashTableEntry, HashTable};

use crate::{
    page::{Page, PageId},
    strict_assert,
};

/// Mapping from page id to resident page.
///
/// The directory stores stable raw pointers to heap-allocated pages; it never
/// owns nor relocates them. Iteration order is unspecified and need not be
/// stable across mutations.
///
/// The pointers can be dereferenced as long as the engine that owns the pages
/// is alive; mutable dereferencing additionally requires exclusive access to
/// that engine.
pub struct PageDirectory {
    table: HashTable<NonNull<Page>>,
    hash_builder: RandomState,
}

impl Default for PageDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl PageDirectory {
    pub fn new() -> Self {
        Self {
            table: HashTable::new(),
            hash_builder: RandomState::default(),
        }
    }

    /// Insert a page under its current id.
    ///
    /// On key collision the resident entry is replaced and returned. The
    /// engine forbids duplicate ids (rekey destroys the collided entry
    /// first), so a returned page indicates a caller bug.
    pub fn insert(&mut self, mut ptr: NonNull<Page>) -> Option<NonNull<Page>> {
        let page_id = unsafe { ptr.as_ref() }.page_id();
        {
            let page = unsafe { ptr.as_mut() };
            strict_assert!(!page.is_in_directory());
            page.set_in_directory(true);
        }

        let hash_builder = &self.hash_builder;
        match self.table.entry(
            hash_builder.hash_one(page_id),
            |p| unsafe { p.as_ref() }.page_id() == page_id,
            |p| hash_builder.hash_one(unsafe { p.as_ref() }.page_id()),
        ) {
            HashTableEntry::Occupied(mut o) => {
                std::mem::swap(o.get_mut(), &mut ptr);
                let old = unsafe { ptr.as_mut() };
                strict_assert!(old.is_in_directory());
                old.set_in_directory(false);
                Some(ptr)
            }
            HashTableEntry::Vacant(v) => {
                v.insert(ptr);
                None
            }
        }
    }

    pub fn get(&self, page_id: PageId) -> Option<NonNull<Page>> {
        self.table
            .find(self.hash_builder.hash_one(page_id), |p| {
                unsafe { p.as_ref() }.page_id() == page_id
            })
            .copied()
    }

    pub fn remove(&mut self, page_id: PageId) -> Option<NonNull<Page>> {
        let hash_builder = &self.hash_builder;
        match self.table.entry(
            hash_builder.hash_one(page_id),
            |p| unsafe { p.as_ref() }.page_id() == page_id,
            |p| hash_builder.hash_one(unsafe { p.as_ref() }.page_id()),
        ) {
            HashTableEntry::Occupied(o) => {
                let (mut ptr, _) = o.remove();
                let page = unsafe { ptr.as_mut() };
                strict_assert!(page.is_in_directory());
                page.set_in_directory(false);
                Some(ptr)
            }
            HashTableEntry::Vacant(_) => None,
        }
    }

    /// Remove and return every page matching the predicate.
    pub fn extract<F>(&mut self, mut pred: F) -> Vec<NonNull<Page>>
    where
        F: FnMut(&Page) -> bool,
    {
        let page_ids: Vec<PageId> = self
            .table
            .iter()
            .filter(|ptr| pred(unsafe { ptr.as_ref() }))
            .map(|ptr| unsafe { ptr.as_ref() }.page_id())
            .collect();
        page_ids.into_iter().filter_map(|page_id| self.remove(page_id)).collect()
    }

    /// Remove and yield every page.
    pub fn drain(&mut self) -> impl Iterator<Item = NonNull<Page>> + '_ {
        self.table.drain().map(|mut ptr| {
            unsafe { ptr.as_mut() }.set_in_directory(false);
            ptr
        })
    }

    /// Iterate over the resident pages in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = NonNull<Page>> + '_ {
        self.table.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

unsafe impl Send for PageDirectory {}
