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

//! In-order iteration and seeking over a [`Tree`].
//!
//! In unsafe mode the iterator keeps the ancestor stack [`low_walk`] builds and steps directly by
//! following sibling/child pointers — cheap, but invalidated by any mutation of the tree it's
//! walking. In safe mode every step re-seeks from the root using the previous key, trading that
//! speed for correctness across mutation: see [`Tree::iter`] / [`Tree::iter_safe`].

use std::cmp::Ordering;

use crate::{
    keybuf::KeyBuf, node::RawNode, splice::relink, stack::PathStack, tree::Tree, walk::low_walk,
};

/// A seek operator: which key, relative to the target, to land the iterator on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOp {
    /// Before the first key in the tree.
    Begin,
    /// After the last key in the tree.
    End,
    /// Exactly the target key.
    Eq,
    /// The target key, or the smallest key greater than it.
    Ge,
    /// The smallest key strictly greater than the target.
    Gt,
    /// The target key, or the largest key less than it.
    Le,
    /// The largest key strictly less than the target.
    Lt,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    DescendMin,
    DescendMax,
}

pub struct RaxIter<'a, V: Copy> {
    tree: &'a Tree<V>,
    node: Option<RawNode>,
    key: KeyBuf,
    stack: PathStack,
    eof: bool,
    just_seeked: bool,
    safe: bool,
    pending: Pending,
    #[cfg(debug_assertions)]
    generation: u64,
}

impl<'a, V: Copy> RaxIter<'a, V> {
    pub(crate) fn new(tree: &'a Tree<V>, safe: bool) -> Self {
        Self {
            tree,
            node: None,
            key: KeyBuf::new(),
            stack: PathStack::new(),
            eof: true,
            just_seeked: false,
            safe,
            pending: Pending::None,
            #[cfg(debug_assertions)]
            generation: tree.generation(),
        }
    }

    pub fn eof(&self) -> bool {
        self.eof
    }

    pub fn key(&self) -> &[u8] {
        self.key.as_slice()
    }

    pub fn value(&self) -> Option<&V> {
        self.node?.value_ref::<V>()
    }

    pub fn compare(&self, op: SeekOp, key: &[u8]) -> bool {
        let ord = self.key.as_slice().cmp(key);
        match op {
            SeekOp::Eq => ord == Ordering::Equal,
            SeekOp::Ge => ord != Ordering::Less,
            SeekOp::Gt => ord == Ordering::Greater,
            SeekOp::Le => ord != Ordering::Greater,
            SeekOp::Lt => ord == Ordering::Less,
            SeekOp::Begin | SeekOp::End => false,
        }
    }

    pub fn seek(&mut self, op: SeekOp, key: &[u8]) -> bool {
        self.check_generation();
        self.just_seeked = true;
        self.pending = Pending::None;
        self.stack.clear();
        self.key.clear();
        self.node = Some(self.tree.root());
        self.eof = false;

        match op {
            SeekOp::Begin => {
                self.pending = Pending::DescendMin;
                true
            }
            SeekOp::End => {
                self.pending = Pending::DescendMax;
                true
            }
            _ => self.seek_cmp(op, key),
        }
    }

    pub fn next(&mut self) -> bool {
        self.check_generation();
        if self.eof {
            return false;
        }
        self.just_seeked = false;
        match self.pending {
            Pending::DescendMin => {
                self.pending = Pending::None;
                let root = self.tree.root();
                self.descend_min(root)
            }
            Pending::DescendMax => {
                self.pending = Pending::None;
                self.fail();
                false
            }
            Pending::None if self.safe => self.reseek_from_current(SeekOp::Gt),
            Pending::None => self.step_forward(),
        }
    }

    pub fn prev(&mut self) -> bool {
        self.check_generation();
        if self.eof {
            return false;
        }
        self.just_seeked = false;
        match self.pending {
            Pending::DescendMax => {
                self.pending = Pending::None;
                let root = self.tree.root();
                self.descend_max(root)
            }
            Pending::DescendMin => {
                self.pending = Pending::None;
                self.fail();
                false
            }
            Pending::None if self.safe => self.reseek_from_current(SeekOp::Lt),
            Pending::None => self.climb(false),
        }
    }

    fn reseek_from_current(&mut self, op: SeekOp) -> bool {
        let target = self.key.as_slice().to_vec();
        self.seek_cmp(op, &target)
    }

    fn fail(&mut self) {
        self.eof = true;
        self.node = None;
    }

    /// Push onto the ancestor stack, failing the iterator (and reporting failure to the caller)
    /// if growth was needed and the allocator couldn't provide it — per SPEC_FULL.md §4.G/§7, a
    /// stack-growth failure must make the operation that needed it fail fast rather than proceed
    /// with an ancestor path that's silently missing entries from the failure point onward.
    fn push_stack(&mut self, node: RawNode) -> bool {
        if self.stack.push(node) {
            true
        } else {
            self.fail();
            false
        }
    }

    fn seek_cmp(&mut self, op: SeekOp, key: &[u8]) -> bool {
        let walk = low_walk::<V>(self.tree.root(), key, true);
        self.stack = walk.stack.expect("low_walk asked for a stack");
        if self.stack.is_oom() {
            self.fail();
            return false;
        }
        // See `insert::insert`'s comment: low-walk always descends past a fully matched
        // compressed edge, so the only boundary cases here are a non-compressed stop or a
        // compressed one we haven't matched any bytes of yet.
        let exact_boundary = !walk.stop.is_compr() || walk.split_pos == 0;

        if walk.i == key.len() && exact_boundary {
            self.key.set(key);
            if walk.stop.is_key() {
                return match op {
                    SeekOp::Eq | SeekOp::Ge | SeekOp::Le => {
                        self.node = Some(walk.stop);
                        true
                    }
                    SeekOp::Gt => {
                        self.node = Some(walk.stop);
                        self.step_forward()
                    }
                    SeekOp::Lt => self.climb(false),
                    SeekOp::Begin | SeekOp::End => unreachable!("handled in seek()"),
                };
            }
            if op == SeekOp::Eq {
                self.fail();
                return false;
            }
            return match op {
                SeekOp::Ge | SeekOp::Gt => self.descend_min(walk.stop),
                SeekOp::Le | SeekOp::Lt => self.climb(false),
                _ => unreachable!(),
            };
        }

        if op == SeekOp::Eq {
            self.fail();
            return false;
        }

        let ascending = matches!(op, SeekOp::Ge | SeekOp::Gt);

        if walk.stop.is_compr() {
            // `stop` has exactly one branch: classify whether everything reachable through it
            // sorts above or below `key`, then either descend into that single branch or climb
            // past `stop` looking for a sibling higher up.
            let greater = if walk.i == key.len() {
                // target ran out strictly inside the edge: it is a proper prefix of the content
                // here, hence smaller than everything stored under it.
                true
            } else {
                key[walk.i] < walk.stop.edge_bytes()[walk.split_pos]
            };
            if greater == ascending {
                return self.descend_from_divergence(walk.stop, walk.i, walk.split_pos, ascending);
            }
            let consumed = walk.i - walk.split_pos;
            self.key.set(&key[..consumed]);
            return self.climb(ascending);
        }

        // `stop` is non-compressed: among its sorted edge bytes, pick the smallest sibling
        // greater than `key[walk.i]` (ascending) or the largest one smaller than it (descending).
        let pos = walk
            .stop
            .find_child_pos(key[walk.i])
            .expect_err("an exact child match would not have ended the walk here");
        if ascending {
            if pos < walk.stop.child_count() {
                let byte = walk.stop.edge_bytes()[pos];
                self.key.set(&key[..walk.i]);
                self.key.push(byte);
                if !self.push_stack(walk.stop) {
                    return false;
                }
                let child = walk.stop.child_at::<V>(pos);
                return self.descend_min(child);
            }
        } else {
            if pos > 0 {
                let byte = walk.stop.edge_bytes()[pos - 1];
                self.key.set(&key[..walk.i]);
                self.key.push(byte);
                if !self.push_stack(walk.stop) {
                    return false;
                }
                let child = walk.stop.child_at::<V>(pos - 1);
                return self.descend_max(child);
            }
            if walk.stop.is_key() {
                self.key.set(&key[..walk.i]);
                self.node = Some(walk.stop);
                return true;
            }
        }
        // No usable branch (or own key) at `stop` itself: climb past it.
        self.key.set(&key[..walk.i]);
        self.climb(ascending)
    }

    /// Land on the smallest (`ascending`) or largest (`!ascending`) key reachable from the single
    /// branch of the compressed node `stop`, given that the walk matched `consumed - split_pos`
    /// clean bytes plus a further `split_pos` bytes of `stop`'s own edge.
    fn descend_from_divergence(
        &mut self,
        stop: RawNode,
        consumed: usize,
        split_pos: usize,
        ascending: bool,
    ) -> bool {
        debug_assert!(stop.is_compr());
        self.key.truncate(consumed - split_pos);
        self.key.extend_from_slice(&stop.edge_bytes()[split_pos..]);
        if !self.push_stack(stop) {
            return false;
        }
        let child = stop.child_at::<V>(0);
        if ascending {
            self.descend_min(child)
        } else {
            self.descend_max(child)
        }
    }

    /// Smallest key at or under `node`, extending `self.key`/`self.stack` as it descends.
    fn descend_min(&mut self, mut node: RawNode) -> bool {
        loop {
            if node.is_key() {
                self.node = Some(node);
                return true;
            }
            if node.child_count() == 0 {
                self.fail();
                return false;
            }
            if !self.push_stack(node) {
                return false;
            }
            node = if node.is_compr() {
                self.key.extend_from_slice(node.edge_bytes());
                node.child_at::<V>(0)
            } else {
                let byte = node.edge_bytes()[0];
                self.key.push(byte);
                node.child_at::<V>(0)
            };
        }
    }

    /// Largest key at or under `node`.
    fn descend_max(&mut self, mut node: RawNode) -> bool {
        loop {
            if node.child_count() == 0 {
                self.node = Some(node);
                return true;
            }
            if !self.push_stack(node) {
                return false;
            }
            node = if node.is_compr() {
                self.key.extend_from_slice(node.edge_bytes());
                node.child_at::<V>(0)
            } else {
                let idx = node.child_count() - 1;
                let byte = node.edge_bytes()[idx];
                self.key.push(byte);
                node.child_at::<V>(idx)
            };
        }
    }

    /// Move from the current node into the next key in forward order: its smallest child if it
    /// has one (any descendant key is greater than the current node's own), else climb until a
    /// larger sibling branch exists.
    fn step_forward(&mut self) -> bool {
        let node = self.node.expect("step_forward requires a current node");
        if node.child_count() > 0 {
            if !self.push_stack(node) {
                return false;
            }
            let child = if node.is_compr() {
                self.key.extend_from_slice(node.edge_bytes());
                node.child_at::<V>(0)
            } else {
                let byte = node.edge_bytes()[0];
                self.key.push(byte);
                node.child_at::<V>(0)
            };
            return self.descend_min(child);
        }
        self.climb(true)
    }

    /// Pop the ancestor stack looking for a sibling branch smaller (`!ascending`) or larger
    /// (`ascending`) than the one we came from, descending into it (rightmost/leftmost
    /// respectively) once found. A node's own key, reached while climbing with `!ascending`,
    /// is itself a valid answer: it is a strict prefix of (and so sorts before) everything we
    /// have already ruled out in its subtree, but nothing popped so far qualifies unless no
    /// closer sibling exists.
    fn climb(&mut self, ascending: bool) -> bool {
        loop {
            let anc = match self.stack.pop() {
                Some(a) => a,
                None => {
                    self.fail();
                    return false;
                }
            };
            if anc.is_compr() {
                let contrib = anc.edge_bytes().len();
                let new_len = self.key.len() - contrib;
                self.key.truncate(new_len);
                if !ascending && anc.is_key() {
                    self.node = Some(anc);
                    return true;
                }
                continue;
            }
            let used_byte = *self
                .key
                .as_slice()
                .last()
                .expect("a non-compressed ancestor contributed exactly one byte");
            self.key.truncate(self.key.len() - 1);
            let edges = anc.edge_bytes();
            let pos = edges
                .binary_search(&used_byte)
                .expect("used_byte must be one of this ancestor's edge bytes");
            if ascending {
                if pos + 1 < edges.len() {
                    let byte = edges[pos + 1];
                    self.key.push(byte);
                    let child = anc.child_at::<V>(pos + 1);
                    if !self.push_stack(anc) {
                        return false;
                    }
                    return self.descend_min(child);
                }
            } else if pos > 0 {
                let byte = edges[pos - 1];
                self.key.push(byte);
                let child = anc.child_at::<V>(pos - 1);
                if !self.push_stack(anc) {
                    return false;
                }
                return self.descend_max(child);
            }
            if !ascending && anc.is_key() {
                self.node = Some(anc);
                return true;
            }
        }
    }

    #[cfg(debug_assertions)]
    fn check_generation(&self) {
        debug_assert_eq!(
            self.generation,
            self.tree.generation(),
            "iterator used across a tree mutation in unsafe mode without re-seeking"
        );
    }

    #[cfg(not(debug_assertions))]
    fn check_generation(&self) {}

    /// Step forward like [`Self::next`], then offer the node landed on to `visit` before
    /// returning. This is the public face of the "node callback" the node layout's design notes
    /// call the only sanctioned form of concurrent tree modification: internally, `visit` runs
    /// against the live node and may trigger [`Tree`]-side compaction of it; the iterator detects
    /// any resulting reallocation by pointer identity and re-links the parent's child slot (or
    /// the tree's root) to the replacement itself, so callers never see or handle raw node
    /// pointers. Only defined for forward iteration; `prev` has no equivalent.
    pub fn next_with_callback(&mut self, mut visit: impl FnMut(NodeInfo<'_, V>)) -> bool {
        let advanced = self.next();
        if let Some(node) = self.node {
            let before = node;
            visit(NodeInfo {
                raw: node,
                _marker: std::marker::PhantomData,
            });
            let after = self.tree.compact_one(node);
            if after != before {
                relink::<V>(&self.stack, before, after, self.tree.root_cell());
                self.node = Some(after);
            }
        }
        advanced
    }
}

/// A read-only view onto the node a forward-iteration callback ([`RaxIter::next_with_callback`])
/// just landed on.
pub struct NodeInfo<'a, V: Copy> {
    raw: RawNode,
    _marker: std::marker::PhantomData<(&'a (), V)>,
}

impl<'a, V: Copy> NodeInfo<'a, V> {
    pub fn is_key(&self) -> bool {
        self.raw.is_key()
    }

    pub fn value(&self) -> Option<&V> {
        self.raw.value_ref::<V>()
    }

    pub fn edge_len(&self) -> usize {
        self.raw.size() as usize
    }
}
