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

//! Low-walk: descend from the root matching as many bytes of a key as possible.

use crate::{node::RawNode, stack::PathStack};

pub(crate) struct LowWalkResult {
    /// The node where matching stopped.
    pub stop: RawNode,
    /// Bytes of the key consumed, including any partial match inside `stop`'s own edge.
    pub i: usize,
    /// When `stop` is compressed and matching stopped inside its edge, the 0-based index into
    /// that edge where the mismatch (or key exhaustion) occurred. Zero otherwise, including the
    /// case where the mismatch is at the very first byte of a freshly-entered compressed edge.
    pub split_pos: usize,
    /// Ancestors of `stop`, root-first, not including `stop` itself. `None` if the caller didn't
    /// ask for one.
    pub stack: Option<PathStack>,
}

impl LowWalkResult {
    /// Whether the ancestor stack hit its sticky OOM flag while this walk was building it. A
    /// caller that asked for a stack must check this before trusting `stack`/using it for a
    /// relink or a climb: a stack that failed to grow mid-walk is missing ancestors from the
    /// point of failure onward, not just short by one push.
    pub fn stack_oom(&self) -> bool {
        match &self.stack {
            Some(s) => s.is_oom(),
            None => false,
        }
    }
}

/// Descend from `root` matching `key` greedily. `want_stack` requests the ancestor path (needed
/// by insert/remove/unsafe-iteration; lookup-only callers can skip it).
pub(crate) fn low_walk<V: Copy>(root: RawNode, key: &[u8], want_stack: bool) -> LowWalkResult {
    let mut node = root;
    let mut i = 0usize;
    let mut split_pos;
    let mut stack = if want_stack {
        Some(PathStack::new())
    } else {
        None
    };

    loop {
        if node.is_compr() {
            let edge = node.edge_bytes();
            let mut j = 0usize;
            while j < edge.len() && i < key.len() && edge[j] == key[i] {
                j += 1;
                i += 1;
            }
            split_pos = j;
            if j != edge.len() {
                // mismatch (possibly at j == 0) or key exhausted mid-edge: `node` itself is the
                // stopping point, consulted (or split) via its own `split_pos`.
                break;
            }
            // Edge fully matched: always descend, even if the key ended exactly here. `iskey`
            // on a node describes the path *not including* that node's own edge (invariant 6),
            // so the node whose `iskey`/value corresponds to "path + this edge" is the child, not
            // `node` itself. The next loop iteration re-checks `i == key.len()` against the
            // child's own (empty-so-far) split position, which is exactly the boundary case.
            if let Some(s) = stack.as_mut() {
                if !s.push(node) {
                    // Stack growth failed: the caller will see `is_oom()` and discard this whole
                    // result, so there is no point continuing to walk (and pushing more ancestors
                    // that would also be refused once the sticky flag is set).
                    break;
                }
            }
            node = node.child_at::<V>(0);
        } else {
            split_pos = 0;
            if i == key.len() {
                break;
            }
            match node.find_child_pos(key[i]) {
                Ok(idx) => {
                    if let Some(s) = stack.as_mut() {
                        if !s.push(node) {
                            break;
                        }
                    }
                    node = node.child_at::<V>(idx);
                    i += 1;
                }
                Err(_) => break,
            }
        }
    }

    LowWalkResult {
        stop: node,
        i,
        split_pos,
        stack,
    }
}
