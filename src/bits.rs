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

/// Check if the given value is a power of 2.
#[inline(always)]
pub fn is_pow2(v: usize) -> bool {
    v != 0 && v & (v - 1) == 0
}

/// Check if the given value is aligned with the given align.
///
/// Note: The given align must be a power of 2.
#[inline(always)]
pub fn is_aligned(align: usize, v: usize) -> bool {
    debug_assert!(is_pow2(align));
    v & (align - 1) == 0
}
