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

//! Remove: unmark a key, then prune dead leaf chains and re-compress single-child non-key nodes
//! bottom-up.
//!
//! The root is exempt from both pruning and fusion — it must stay non-compressed (see
//! [`crate::node::RawNode`]'s header layout), so a root that ends up with exactly one child after
//! a removal simply stays that way; this is the one documented exception to "no non-key node has
//! exactly one child".

use std::cell::Cell;

use crate::{
    error::RaxError,
    node::{RawNode, MAX_NODE_SIZE},
    splice::{child_index_of, relink},
    walk::low_walk,
};

pub(crate) fn remove<V: Copy>(
    tree_root: &Cell<RawNode>,
    numele: &mut u64,
    numnodes: &mut u64,
    key: &[u8],
) -> Result<Option<V>, RaxError> {
    let walk = low_walk::<V>(tree_root.get(), key, true);
    if walk.stack_oom() {
        return Err(RaxError::StackOom);
    }
    // See `insert::insert`'s comment: low-walk always descends past a fully matched compressed
    // edge, so the only boundary cases here are a non-compressed stop or a compressed one we
    // haven't matched any bytes of yet.
    let at_boundary = !walk.stop.is_compr() || walk.split_pos == 0;
    if walk.i != key.len() || !at_boundary || !walk.stop.is_key() {
        return Ok(None);
    }
    let old_value = walk.stop.value::<V>();
    let mut stack = walk.stack.expect("low_walk asked for a stack");

    let prev = walk.stop;
    let mut node = match prev.clear_value::<V>() {
        Some(n) => n,
        None => return Err(RaxError::AllocationFailure),
    };
    relink::<V>(&stack, prev, node, tree_root);
    *numele -= 1;

    // Prune the now-dead leaf chain bottom-up: each iteration frees one childless, non-key node
    // and removes it from its parent, climbing until the settled node either still has a child
    // left or is itself a key.
    loop {
        if !stack.is_empty() && node.size() == 0 && !node.is_key() {
            let parent = stack.last().expect("checked non-empty above");
            let idx = child_index_of::<V>(&parent, node);
            let popped_parent = stack.pop().expect("checked non-empty above");
            match popped_parent.remove_child_at::<V>(idx) {
                Some(new_parent) => {
                    node.dealloc::<V>();
                    *numnodes -= 1;
                    relink::<V>(&stack, popped_parent, new_parent, tree_root);
                    node = new_parent;
                    continue;
                }
                None => {
                    // shrink failed: the dead leaf is left attached rather than forcing the
                    // whole removal to fail; `popped_parent` is unchanged, so restore it
                    let pushed = stack.push(popped_parent);
                    debug_assert!(
                        pushed,
                        "pushing back an element just popped from this same stack cannot need to grow it"
                    );
                    break;
                }
            }
        }
        break;
    }

    // Re-compress upward: the node the prune loop settled on may now have exactly one child that
    // needs fusing into it, and the fused result may in turn leave *its* parent with exactly one
    // child too — climb one ancestor at a time, fusing, until a level needs no more fusing or we
    // reach the root (which is exempt).
    loop {
        if stack.is_empty() || node.is_key() || node.child_count() != 1 {
            break;
        }
        let child = node.child_at::<V>(0);
        // `child` is only actually absorbed (and its node freed) when it is itself a non-key
        // compressed node; otherwise a compressed `node` with this one child is already the
        // exempt shape spec.md's invariant allows to persist (a non-compressed `node`, though,
        // must still be canonicalized into a one-byte compressed node even when there is nothing
        // to absorb — that conversion just doesn't free anything).
        let absorb_child = child.is_compr() && !child.is_key();
        let needs_fuse = !node.is_compr() || absorb_child;
        if !needs_fuse {
            break;
        }
        let fused = match try_fuse::<V>(node, child) {
            FuseOutcome::Fused(f) => f,
            FuseOutcome::TooLarge | FuseOutcome::AllocFailed => break,
        };
        if absorb_child {
            *numnodes -= 1;
        }
        relink::<V>(&stack, node, fused, tree_root);
        // `fused` now sits where `node` did, in its parent's child slot. Climb to that parent
        // and re-check it against its own (possibly now-singular) child, `fused`.
        node = match stack.pop() {
            Some(parent) => parent,
            None => break,
        };
    }
    Ok(old_value)
}

enum FuseOutcome {
    Fused(RawNode),
    TooLarge,
    AllocFailed,
}

/// Merge a non-key node with exactly one child into a single compressed node, when the combined
/// edge fits within `MAX_NODE_SIZE`. If `child` is itself compressed and non-key its edge is
/// absorbed too; a key-bearing child is never absorbed (that would erase its node identity).
fn try_fuse<V: Copy>(current: RawNode, child: RawNode) -> FuseOutcome {
    let current_bytes = current.edge_bytes();
    let absorb_child = child.is_compr() && !child.is_key();
    let child_bytes: &[u8] = if absorb_child { child.edge_bytes() } else { &[] };
    let combined_len = current_bytes.len() + child_bytes.len();
    if combined_len as u64 > MAX_NODE_SIZE as u64 {
        return FuseOutcome::TooLarge;
    }
    let new_child = if absorb_child {
        child.child_at::<V>(0)
    } else {
        child
    };
    let mut fused = match RawNode::alloc::<V>(combined_len as u32, true) {
        Some(n) => n,
        None => return FuseOutcome::AllocFailed,
    };
    {
        let (a, b) = fused.edge_bytes_mut().split_at_mut(current_bytes.len());
        a.copy_from_slice(current_bytes);
        b.copy_from_slice(child_bytes);
    }
    fused.set_child_at::<V>(0, new_child);
    current.dealloc::<V>();
    if absorb_child {
        child.dealloc::<V>();
    }
    FuseOutcome::Fused(fused)
}
