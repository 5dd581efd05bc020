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

use std::{alloc, fmt::Debug, ptr::NonNull, slice};

use crate::{
    bits,
    error::{Error, Result},
    strict_assert,
};

/// An exclusively owned, zero-initialized heap buffer with a guaranteed
/// minimum alignment.
///
/// The base address and length are stable for the lifetime of the buffer.
///
/// A zero-length buffer performs no allocation; its base pointer is dangling
/// and must never be dereferenced (the slice accessors are still valid and
/// yield empty slices).
pub struct RawBuffer {
    ptr: NonNull<u8>,
    size: usize,
    align: usize,
}

impl Debug for RawBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawBuffer")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .field("align", &self.align)
            .finish()
    }
}

impl RawBuffer {
    /// Allocate a zeroed buffer of `size` bytes aligned to `align` bytes.
    ///
    /// `align` must be a power of 2.
    pub fn zeroed(size: usize, align: usize) -> Result<Self> {
        debug_assert!(bits::is_pow2(align));

        if size == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                size,
                align,
            });
        }

        let layout = alloc::Layout::from_size_align(size, align).map_err(|_| Error::Allocation { size, align })?;
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => {
                strict_assert!(bits::is_aligned(align, ptr.as_ptr() as usize));
                Ok(Self { ptr, size, align })
            }
            None => Err(Error::Allocation { size, align }),
        }
    }

    /// Length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Return `true` if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Base address of the buffer.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        if self.size > 0 {
            // The layout was validated at allocation time.
            let layout = unsafe { alloc::Layout::from_size_align_unchecked(self.size, self.align) };
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

unsafe impl Send for RawBuffer {}
unsafe impl Sync for RawBuffer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_and_aligned() {
        let buf = RawBuffer::zeroed(4096, 8).unwrap();
        assert_eq!(buf.len(), 4096);
        assert!(bits::is_aligned(8, buf.as_ptr() as usize));
        assert!(buf.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_small_sizes_keep_alignment() {
        for size in [1, 2, 4] {
            let buf = RawBuffer::zeroed(size, 8).unwrap();
            assert_eq!(buf.len(), size);
            assert!(bits::is_aligned(8, buf.as_ptr() as usize));
        }
    }

    #[test]
    fn test_empty_buffer() {
        let buf = RawBuffer::zeroed(0, 1).unwrap();
        assert!(buf.is_empty());
        assert!(buf.as_slice().is_empty());
    }

    #[test]
    fn test_address_stable_across_moves() {
        let mut buf = RawBuffer::zeroed(64, 8).unwrap();
        let base = buf.as_ptr();
        buf.as_mut_slice()[0] = 0xA5;
        let moved = buf;
        assert_eq!(moved.as_ptr(), base);
        assert_eq!(moved.as_slice()[0], 0xA5);
    }
}
