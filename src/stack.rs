/*
 * This file is part of rax.
 *
 * rax is a free and open-source in-memory radix tree engine.
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! A small-size-optimized stack of node pointers, used by low-walk (when the caller asks for an
//! ancestor path) and by the unsafe iterator. Shallow trees never touch the allocator; deep ones
//! spill to a heap buffer transparently. Growth is fallible: a failed grow sets a sticky OOM flag
//! instead of aborting, matching [`crate::error::RaxError::StackOom`].

use {
    crate::node::RawNode,
    core::{
        mem::{ManuallyDrop, MaybeUninit},
        ptr, slice,
    },
    std::alloc::{self, Layout},
};

/// Number of node pointers kept inline before the stack spills to the heap.
pub(crate) const STATIC_ITEMS: usize = 32;

union StackData {
    inline: ManuallyDrop<[MaybeUninit<RawNode>; STATIC_ITEMS]>,
    heap: *mut RawNode,
}

/// A path stack of ancestor node pointers.
///
/// `RawNode` is a bare, non-owning pointer: the stack never drops its contents, it only ever
/// forgets them.
pub(crate) struct PathStack {
    d: StackData,
    len: usize,
    cap: usize,
    oom: bool,
}

impl PathStack {
    const INLINE_NULL: [MaybeUninit<RawNode>; STATIC_ITEMS] =
        [MaybeUninit::uninit(); STATIC_ITEMS];

    #[inline(always)]
    pub fn new() -> Self {
        Self {
            d: StackData {
                inline: ManuallyDrop::new(Self::INLINE_NULL),
            },
            len: 0,
            cap: STATIC_ITEMS,
            oom: false,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    fn on_heap(&self) -> bool {
        self.cap > STATIC_ITEMS
    }

    #[inline(always)]
    fn as_ptr(&self) -> *const RawNode {
        unsafe {
            // SAFETY: `d` is read through the variant matching `on_heap()`
            if self.on_heap() {
                self.d.heap
            } else {
                self.d.inline.as_ptr() as *const RawNode
            }
        }
    }

    #[inline(always)]
    fn as_mut_ptr(&mut self) -> *mut RawNode {
        unsafe {
            // SAFETY: see `as_ptr`
            if self.on_heap() {
                self.d.heap
            } else {
                self.d.inline.as_mut_ptr() as *mut RawNode
            }
        }
    }

    pub fn as_slice(&self) -> &[RawNode] {
        unsafe {
            // SAFETY: `len` is always <= `cap`, and the backing buffer (inline or heap) always
            // has room for `cap` elements
            slice::from_raw_parts(self.as_ptr(), self.len)
        }
    }

    #[inline(always)]
    pub fn last(&self) -> Option<RawNode> {
        self.as_slice().last().copied()
    }

    #[inline(always)]
    pub fn get(&self, idx: usize) -> RawNode {
        self.as_slice()[idx]
    }

    #[inline(always)]
    pub fn is_oom(&self) -> bool {
        self.oom
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Push a node pointer. Returns `false` (and sets the sticky OOM flag) if growth was needed
    /// and the allocator failed; the stack is left unchanged in that case.
    #[inline(always)]
    pub fn push(&mut self, node: RawNode) -> bool {
        if self.oom {
            return false;
        }
        if self.len == self.cap && !self.grow() {
            return false;
        }
        unsafe {
            // SAFETY: len < cap after the grow check above
            self.as_mut_ptr().add(self.len).write(node);
        }
        self.len += 1;
        true
    }

    #[inline(always)]
    pub fn pop(&mut self) -> Option<RawNode> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        unsafe {
            // SAFETY: len was > 0, so `len` (post-decrement) is a valid occupied index
            Some(ptr::read(self.as_ptr().add(self.len)))
        }
    }

    /// Double the backing capacity. Returns `false` and sets the sticky OOM flag on failure.
    fn grow(&mut self) -> bool {
        let new_cap = self.cap * 2;
        let layout = match Layout::array::<RawNode>(new_cap) {
            Ok(l) => l,
            Err(_) => {
                self.oom = true;
                return false;
            }
        };
        let new_ptr = unsafe {
            // SAFETY: layout has nonzero size since new_cap > STATIC_ITEMS > 0
            alloc::alloc(layout) as *mut RawNode
        };
        if new_ptr.is_null() {
            self.oom = true;
            return false;
        }
        unsafe {
            // SAFETY: copying `len` (<= old cap) initialized elements into the fresh,
            // larger-or-equal buffer
            ptr::copy_nonoverlapping(self.as_ptr(), new_ptr, self.len);
            if self.on_heap() {
                let old_layout = Layout::array::<RawNode>(self.cap).unwrap_unchecked();
                alloc::dealloc(self.d.heap as *mut u8, old_layout);
            }
        }
        self.d = StackData { heap: new_ptr };
        self.cap = new_cap;
        true
    }
}

impl Drop for PathStack {
    fn drop(&mut self) {
        if self.on_heap() {
            unsafe {
                // SAFETY: `cap` is exactly the array length this allocation was made with
                let layout = Layout::array::<RawNode>(self.cap).unwrap_unchecked();
                alloc::dealloc(self.d.heap as *mut u8, layout);
            }
        }
    }
}
