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

//! An in-memory compressed radix tree ("rax") mapping byte-string keys to caller-chosen values.
//!
//! A [`Tree`] is a PATRICIA-style trie whose nodes carry runs of edge bytes rather than single
//! characters: any stretch of keyspace with exactly one path through it collapses into a single
//! node, so keys that share long common prefixes cost little beyond the prefix itself. Every node
//! is one heap allocation sized exactly for its content (see [`node`] for the layout); lookups,
//! inserts, and removals walk and rewrite that allocation directly rather than through a
//! secondary indirection layer.
//!
//! ```
//! use rax::Tree;
//!
//! let mut tree: Tree<u32> = Tree::new();
//! tree.insert(b"foo", 1);
//! tree.insert(b"foobar", 2);
//! tree.insert(b"footer", 3);
//!
//! assert_eq!(tree.find(b"foobar"), Some(&2));
//! assert_eq!(tree.remove(b"foo").unwrap(), Some(1));
//! assert_eq!(tree.find(b"foo"), None);
//!
//! let mut it = tree.iter();
//! it.seek(rax::SeekOp::Begin, b"");
//! let mut keys = Vec::new();
//! while it.next() {
//!     keys.push(it.key().to_vec());
//! }
//! assert_eq!(keys, vec![b"foobar".to_vec(), b"footer".to_vec()]);
//! ```
//!
//! # Why `Tree<V>` is generic
//!
//! The reference design this crate's node layout and split/merge algebra are drawn from stores an
//! opaque `void *` per key and leaves interpreting it to the caller. Rust has no such universally
//! opaque handle: a bare pointer type forces every caller through `unsafe` just to read back what
//! they stored, and throws away the compiler's ability to check that a handle is used consistently.
//! `Tree<V: Copy>` keeps the same storage discipline (a fixed-width handle living inline in the
//! node, no indirection through a side table) while letting `V` be whatever small `Copy` type a
//! caller actually wants: an index into an external arena, a `NonZeroU64`, a raw pointer if they
//! really do need one. See `DESIGN.md` for the fuller rationale.
//!
//! # Safe vs. unsafe iteration
//!
//! [`Tree::iter`] returns an iterator that steps by following sibling/child pointers directly —
//! cheap, but its ancestor stack is invalidated by any mutation of the tree between steps.
//! [`Tree::iter_safe`] re-seeks from the root on every step using the previously-returned key,
//! which tolerates concurrent mutation at the cost of a fresh descent per step. Debug builds
//! assert (via an internal generation counter) that an unsafe iterator isn't stepped across a
//! mutation; release builds skip the check for speed, matching this crate's "trust the caller at
//! the boundary, check for free in debug" stance throughout.
//!
//! The one sanctioned exception is [`iter::RaxIter::next_with_callback`]: its callback may trigger
//! in-place compaction of the node just visited, and the iterator re-links around that reallocation
//! itself, so it's safe to use even on an otherwise-unsafe iterator.

mod error;
mod insert;
mod iter;
mod keybuf;
mod node;
mod remove;
mod splice;
mod stack;
mod tree;
mod walk;


pub use error::{RaxError, RaxResult};
pub use iter::{NodeInfo, RaxIter, SeekOp};
pub use node::MAX_NODE_SIZE;
pub use tree::Tree;
