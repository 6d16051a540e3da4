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

//! The iterator's "current key" buffer: grows on descent, truncates on ascent. Small keys never
//! touch the allocator; long ones spill to a heap `Vec`.

const INLINE_CAP: usize = 48;

enum Storage {
    Inline([u8; INLINE_CAP], usize),
    Heap(Vec<u8>),
}

pub(crate) struct KeyBuf(Storage);

impl KeyBuf {
    pub fn new() -> Self {
        Self(Storage::Inline([0; INLINE_CAP], 0))
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.0 {
            Storage::Inline(buf, len) => &buf[..*len],
            Storage::Heap(v) => v.as_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    pub fn truncate(&mut self, len: usize) {
        match &mut self.0 {
            Storage::Inline(_, l) => *l = len.min(*l),
            Storage::Heap(v) => v.truncate(len),
        }
    }

    pub fn push(&mut self, byte: u8) {
        self.extend_from_slice(&[byte]);
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        match &mut self.0 {
            Storage::Inline(buf, len) => {
                if *len + bytes.len() <= INLINE_CAP {
                    buf[*len..*len + bytes.len()].copy_from_slice(bytes);
                    *len += bytes.len();
                    return;
                }
                let mut v = Vec::with_capacity(*len + bytes.len());
                v.extend_from_slice(&buf[..*len]);
                v.extend_from_slice(bytes);
                self.0 = Storage::Heap(v);
            }
            Storage::Heap(v) => v.extend_from_slice(bytes),
        }
    }

    pub fn set(&mut self, bytes: &[u8]) {
        self.clear();
        self.extend_from_slice(bytes);
    }
}
