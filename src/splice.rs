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

//! Small helpers shared by insert and remove for repointing a node's slot in the tree once its
//! allocation has moved (or been replaced outright), using the ancestor stack low-walk built.
//!
//! The tree's root handle lives in a [`Cell`] rather than behind a plain `&mut` so that the
//! iterator's node-callback path (§4.E: "the only sanctioned form of concurrent tree
//! modification") can re-seat the root through a shared `&Tree` borrow exactly the same way
//! insert/remove re-seat it through `&mut Tree` — `relink` doesn't need to know which caller it
//! is.

use crate::{node::RawNode, stack::PathStack};
use std::cell::Cell;

/// The index of `child` among `parent`'s live children. `parent` must actually hold `child`.
pub(crate) fn child_index_of<V: Copy>(parent: &RawNode, child: RawNode) -> usize {
    parent
        .children::<V>()
        .iter()
        .position(|&c| c == child)
        .expect("child present in parent")
}

/// Replace `prev` with `node` wherever it's referenced: the immediate parent's child slot (top
/// of `stack`), or the tree's root handle if `stack` is empty (i.e. `prev` was the root).
pub(crate) fn relink<V: Copy>(
    stack: &PathStack,
    prev: RawNode,
    node: RawNode,
    root: &Cell<RawNode>,
) {
    if prev == node {
        return;
    }
    match stack.last() {
        Some(mut parent) => {
            let idx = child_index_of::<V>(&parent, prev);
            parent.set_child_at::<V>(idx, node);
        }
        None => root.set(node),
    }
}
