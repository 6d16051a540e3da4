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

//! [`Tree`]: the public handle that owns the root node and the `numele`/`numnodes` counters, and
//! wires low-walk/insert/remove into a safe surface.

use std::cell::Cell;

use crate::{
    error::{RaxError, RaxResult},
    iter::RaxIter,
    insert, node::RawNode, remove,
};

/// An in-memory compressed radix tree mapping byte-string keys to `V`.
///
/// `V` is typically a small `Copy` handle (an index, a raw pointer, a `NonZeroU64`) — the tree
/// never interprets it, only stores and returns it. See the crate-level docs for why `Tree` is
/// generic over `V` rather than hard-coding an opaque pointer type.
///
/// `Tree<V>` is `Send` (it owns its nodes exclusively) but not `Sync`: concurrent access from
/// multiple threads is the caller's responsibility, same as the reference engine this crate's
/// compression/split algebra is drawn from.
pub struct Tree<V: Copy> {
    root: Cell<RawNode>,
    numele: u64,
    numnodes: u64,
    #[cfg(debug_assertions)]
    generation: u64,
}

// SAFETY: `Tree<V>` exclusively owns every node it reaches and holds no thread-affine handles;
// nothing about sending the whole structure to another thread is unsound. It is intentionally
// not `Sync` (no impl below) since nodes are mutated through raw, unsynchronized pointer writes.
unsafe impl<V: Copy + Send> Send for Tree<V> {}

impl<V: Copy> Tree<V> {
    /// An empty tree: a single non-compressed, non-key root node with no children.
    pub fn new() -> Self {
        let root = RawNode::alloc::<V>(0, false).expect("initial root allocation cannot fail");
        Self {
            root: Cell::new(root),
            numele: 0,
            numnodes: 1,
            #[cfg(debug_assertions)]
            generation: 0,
        }
    }

    /// Number of keys stored (`numele`).
    pub fn len(&self) -> u64 {
        self.numele
    }

    /// Number of nodes currently allocated (`numnodes`).
    pub fn node_count(&self) -> u64 {
        self.numnodes
    }

    pub fn is_empty(&self) -> bool {
        self.numele == 0
    }

    pub(crate) fn root(&self) -> RawNode {
        self.root.get()
    }

    pub(crate) fn root_cell(&self) -> &Cell<RawNode> {
        &self.root
    }

    #[cfg(debug_assertions)]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg(debug_assertions)]
    fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    #[cfg(not(debug_assertions))]
    fn bump_generation(&mut self) {}

    /// Insert `key -> value`, overwriting and returning any prior value for the same key.
    pub fn insert(&mut self, key: &[u8], value: V) -> RaxResult<Option<V>> {
        self.bump_generation();
        let result = insert::insert::<V>(&self.root, &mut self.numele, &mut self.numnodes, key, value, true);
        self.warn_on_err(&result);
        result
    }

    /// Insert `key -> value` only if `key` is absent; on a hit, returns the existing value and
    /// leaves the tree untouched.
    pub fn try_insert(&mut self, key: &[u8], value: V) -> RaxResult<Option<V>> {
        self.bump_generation();
        let result = insert::insert::<V>(&self.root, &mut self.numele, &mut self.numnodes, key, value, false);
        self.warn_on_err(&result);
        result
    }

    /// Remove `key`, returning its value if present.
    pub fn remove(&mut self, key: &[u8]) -> RaxResult<Option<V>> {
        self.bump_generation();
        let result = remove::remove::<V>(&self.root, &mut self.numele, &mut self.numnodes, key);
        self.warn_on_err(&result);
        result
    }

    /// Point lookup. `None` stands in for spec.md's `NotFound` sentinel — see the crate docs for
    /// why a separate sentinel constant isn't needed in Rust.
    pub fn find(&self, key: &[u8]) -> Option<&V> {
        let walk = crate::walk::low_walk::<V>(self.root(), key, false);
        let at_boundary = !walk.stop.is_compr() || walk.split_pos == 0;
        if walk.i == key.len() && at_boundary && walk.stop.is_key() {
            walk.stop.value_ref::<V>()
        } else {
            None
        }
    }

    /// A fresh unsafe-mode iterator: cheaper to step, invalidated by any mutation of this tree
    /// between steps.
    pub fn iter(&self) -> RaxIter<'_, V> {
        RaxIter::new(self, false)
    }

    /// A fresh safe-mode iterator: tolerates mutation of this tree between steps, at the cost of
    /// a re-seek from the root on every step.
    pub fn iter_safe(&self) -> RaxIter<'_, V> {
        RaxIter::new(self, true)
    }

    /// Release every node, invoking `on_value` once per stored value before its node is freed.
    /// Consumes the tree; use this instead of letting `Drop` run when `V`'s backing resource
    /// needs an explicit release step (the opaque-handle case spec.md describes).
    pub fn free_with_callback(self, mut on_value: impl FnMut(V)) {
        let mut released = 0u64;
        free_recursive(self.root(), &mut |v| {
            on_value(v);
            released += 1;
        });
        log::trace!("rax: released {released} value handle(s) during teardown");
        std::mem::forget(self);
    }

    fn warn_on_err<T>(&self, result: &RaxResult<T>) {
        match result {
            Err(RaxError::AllocationFailure) => {
                log::warn!("rax: allocation failure, operation rolled back")
            }
            Err(RaxError::StackOom) => {
                log::warn!("rax: path stack failed to grow, operation aborted")
            }
            Ok(_) => {}
        }
    }

    /// Hook point for the iterator's node-callback contract (§4.E / design notes "callback
    /// reseating"): given the node a forward step just landed on, returns the node that should
    /// now occupy that slot, reallocating it in place if doing so would compact it. Every node
    /// this crate allocates is already sized exactly for its content (no over-allocation ever
    /// occurs — see [`crate::node`]), so there is never anything to compact and this always
    /// returns `node` unchanged; the hook exists so the iterator's re-linking path is exercised
    /// by the same mechanism a future node representation with compactable slack would use.
    pub(crate) fn compact_one(&self, node: RawNode) -> RawNode {
        node
    }
}

impl<V: Copy> Default for Tree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Copy> Drop for Tree<V> {
    fn drop(&mut self) {
        free_recursive(self.root(), &mut |_v: V| {});
    }
}

/// Walk `root`'s subtree freeing every node (depth-first via an explicit stack, not recursion —
/// a 1000-byte key is a 1000-deep compressed chain and this must not blow the call stack).
/// Invokes `on_value` for every `iskey` node's stored value before freeing that node.
fn free_recursive<V: Copy>(root: RawNode, on_value: &mut impl FnMut(V)) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        for idx in 0..node.child_count() {
            stack.push(node.child_at::<V>(idx));
        }
        if let Some(v) = node.value::<V>() {
            on_value(v);
        }
        node.dealloc::<V>();
    }
}
