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

//! Insert and its split algebra.
//!
//! Every case allocates everything it needs up front, wires the fresh pieces together offline,
//! and only then relinks the parent and discards the old node(s) — the existing tree stays fully
//! valid and readable right up until the moment it's safe to commit, so an allocation failure at
//! any point leaves it exactly as it was before the call.

use std::cell::Cell;

use crate::{
    error::RaxError,
    node::{RawNode, MAX_NODE_SIZE},
    splice::relink,
    stack::PathStack,
    walk::low_walk,
};

pub(crate) fn insert<V: Copy>(
    root: &Cell<RawNode>,
    numele: &mut u64,
    numnodes: &mut u64,
    key: &[u8],
    value: V,
    overwrite: bool,
) -> Result<Option<V>, RaxError> {
    let walk = low_walk::<V>(root.get(), key, true);
    if walk.stack_oom() {
        return Err(RaxError::StackOom);
    }
    let stack = walk.stack.expect("low_walk asked for a stack");

    // A node boundary is either a non-compressed node, or a compressed node we stand in front
    // of without having matched any of its own edge yet (`split_pos == 0`): low-walk always
    // descends past a *fully* matched compressed edge (see `low_walk`), so `split_pos` can only
    // be 0 or a genuine partial match here, never the edge's full length.
    if walk.i == key.len() && (!walk.stop.is_compr() || walk.split_pos == 0) {
        return case_mark::<V>(root, numele, &stack, walk.stop, value, overwrite);
    }
    if walk.i == key.len() {
        return case_prefix_split::<V>(
            root,
            numele,
            numnodes,
            &stack,
            walk.stop,
            walk.split_pos,
            value,
        );
    }
    if !walk.stop.is_compr() {
        return case_add_sibling::<V>(
            root,
            numele,
            numnodes,
            &stack,
            walk.stop,
            &key[walk.i..],
            value,
        );
    }
    case_full_split::<V>(
        root,
        numele,
        numnodes,
        &stack,
        walk.stop,
        walk.split_pos,
        &key[walk.i..],
        value,
    )
}

/// `stop` is exactly where the key ends (a node boundary, not mid-edge): mark or overwrite it.
fn case_mark<V: Copy>(
    root: &Cell<RawNode>,
    numele: &mut u64,
    stack: &PathStack,
    stop: RawNode,
    value: V,
    overwrite: bool,
) -> Result<Option<V>, RaxError> {
    if stop.is_key() {
        let old = stop.value::<V>();
        if !overwrite {
            return Ok(old);
        }
        let updated = stop.set_value::<V>(value).ok_or(RaxError::AllocationFailure)?;
        relink::<V>(stack, stop, updated, root);
        return Ok(old);
    }
    let updated = stop.set_value::<V>(value).ok_or(RaxError::AllocationFailure)?;
    relink::<V>(stack, stop, updated, root);
    *numele += 1;
    Ok(None)
}

/// `stop` is non-compressed and has no child for the next key byte: add one.
fn case_add_sibling<V: Copy>(
    root: &Cell<RawNode>,
    numele: &mut u64,
    numnodes: &mut u64,
    stack: &PathStack,
    stop: RawNode,
    rest: &[u8],
    value: V,
) -> Result<Option<V>, RaxError> {
    let byte = rest[0];
    let pos = match stop.find_child_pos(byte) {
        Err(pos) => pos,
        Ok(_) => unreachable!("low_walk would have descended into an existing matching child"),
    };
    let (leaf, added) = build_chain::<V>(&rest[1..], value).ok_or(RaxError::AllocationFailure)?;
    let updated = match stop.add_child::<V>(pos, byte, leaf) {
        Some(n) => n,
        None => {
            free_chain::<V>(leaf);
            return Err(RaxError::AllocationFailure);
        }
    };
    relink::<V>(stack, stop, updated, root);
    *numele += 1;
    *numnodes += added;
    Ok(None)
}

/// `stop` is compressed and the key ends strictly inside its edge: split into a `prefix` (the
/// matched bytes, inheriting `stop`'s old key-ness) and a `suffix` (the rest of the old edge plus
/// `stop`'s old child, newly marked as the key being inserted).
fn case_prefix_split<V: Copy>(
    root: &Cell<RawNode>,
    numele: &mut u64,
    numnodes: &mut u64,
    stack: &PathStack,
    stop: RawNode,
    split_pos: usize,
    value: V,
) -> Result<Option<V>, RaxError> {
    let edge = stop.edge_bytes();
    let old_child = stop.child_at::<V>(0);

    let suffix = RawNode::new_compressed::<V>(&edge[split_pos..], old_child)
        .ok_or(RaxError::AllocationFailure)?;
    let suffix = match suffix.set_value::<V>(value) {
        Some(n) => n,
        None => {
            suffix.dealloc::<V>();
            return Err(RaxError::AllocationFailure);
        }
    };

    let prefix = match RawNode::new_compressed::<V>(&edge[..split_pos], suffix) {
        Some(n) => n,
        None => {
            suffix.dealloc::<V>();
            return Err(RaxError::AllocationFailure);
        }
    };

    let was_key = stop.is_key();
    let prefix = if was_key {
        let old_value = stop
            .value::<V>()
            .expect("iskey always implies a stored value in this crate");
        match prefix.set_value::<V>(old_value) {
            Some(n) => n,
            None => {
                prefix.dealloc::<V>();
                suffix.dealloc::<V>();
                return Err(RaxError::AllocationFailure);
            }
        }
    } else {
        prefix
    };

    relink::<V>(stack, stop, prefix, root);
    stop.dealloc::<V>();
    *numele += 1;
    *numnodes += 1; // net: -1 (stop) + 2 (prefix, suffix)
    Ok(None)
}

/// `stop` is compressed and the key diverges strictly inside its edge (or at its very first
/// byte): split into an optional `prefix`, a two-way `pivot` branching on the diverging byte, the
/// old continuation (`stop`'s remaining edge and child, unless nothing remains), and a fresh leaf
/// chain for the new key's remaining bytes.
fn case_full_split<V: Copy>(
    root: &Cell<RawNode>,
    numele: &mut u64,
    numnodes: &mut u64,
    stack: &PathStack,
    stop: RawNode,
    split_pos: usize,
    rest: &[u8],
    value: V,
) -> Result<Option<V>, RaxError> {
    let edge = stop.edge_bytes();
    let old_size = edge.len();
    let old_byte = edge[split_pos];
    let new_byte = rest[0];
    debug_assert_ne!(old_byte, new_byte);
    let old_child = stop.child_at::<V>(0);

    let mut new_nodes = 0u64;

    let old_branch = if split_pos + 1 == old_size {
        old_child
    } else {
        match RawNode::new_compressed::<V>(&edge[split_pos + 1..], old_child) {
            Some(n) => {
                new_nodes += 1;
                n
            }
            None => return Err(RaxError::AllocationFailure),
        }
    };
    let free_old_branch = |b: RawNode| {
        if b != old_child {
            b.dealloc::<V>();
        }
    };

    let (new_leaf, leaf_added) = match build_chain::<V>(&rest[1..], value) {
        Some(r) => r,
        None => {
            free_old_branch(old_branch);
            return Err(RaxError::AllocationFailure);
        }
    };
    new_nodes += leaf_added;

    let mut pivot = match RawNode::alloc::<V>(2, false) {
        Some(n) => n,
        None => {
            free_old_branch(old_branch);
            free_chain::<V>(new_leaf);
            return Err(RaxError::AllocationFailure);
        }
    };
    new_nodes += 1;
    if old_byte < new_byte {
        pivot.edge_bytes_mut().copy_from_slice(&[old_byte, new_byte]);
        pivot.set_child_at::<V>(0, old_branch);
        pivot.set_child_at::<V>(1, new_leaf);
    } else {
        pivot.edge_bytes_mut().copy_from_slice(&[new_byte, old_byte]);
        pivot.set_child_at::<V>(0, new_leaf);
        pivot.set_child_at::<V>(1, old_branch);
    }

    let free_everything_so_far = |pivot: RawNode| {
        pivot.dealloc::<V>();
        free_old_branch(old_branch);
        free_chain::<V>(new_leaf);
    };

    let mut top = if split_pos > 0 {
        match RawNode::new_compressed::<V>(&edge[..split_pos], pivot) {
            Some(n) => {
                new_nodes += 1;
                n
            }
            None => {
                free_everything_so_far(pivot);
                return Err(RaxError::AllocationFailure);
            }
        }
    } else {
        pivot
    };

    if stop.is_key() {
        let old_value = stop
            .value::<V>()
            .expect("iskey always implies a stored value in this crate");
        top = match top.set_value::<V>(old_value) {
            Some(n) => n,
            None => {
                top.dealloc::<V>();
                free_old_branch(old_branch);
                free_chain::<V>(new_leaf);
                return Err(RaxError::AllocationFailure);
            }
        };
    }

    relink::<V>(stack, stop, top, root);
    stop.dealloc::<V>();
    *numele += 1;
    *numnodes += new_nodes; // stop itself is removed, not counted here
    Ok(None)
}

/// Build the chain of (at most `MAX_NODE_SIZE`-byte) compressed nodes needed to hold `bytes`,
/// terminating in a key-bearing leaf holding `value`. Returns the outermost node and the total
/// count of nodes created. `bytes` may be empty, in which case the leaf alone is returned.
fn build_chain<V: Copy>(bytes: &[u8], value: V) -> Option<(RawNode, u64)> {
    let leaf = RawNode::alloc::<V>(0, false)?;
    let mut node = match leaf.set_value::<V>(value) {
        Some(n) => n,
        None => {
            leaf.dealloc::<V>();
            return None;
        }
    };
    let mut count = 1u64;
    let mut pos = bytes.len();
    while pos > 0 {
        let take = pos.min(MAX_NODE_SIZE as usize);
        let start = pos - take;
        let chunk = match RawNode::new_compressed::<V>(&bytes[start..pos], node) {
            Some(n) => n,
            None => {
                free_chain::<V>(node);
                return None;
            }
        };
        node = chunk;
        count += 1;
        pos = start;
    }
    Some((node, count))
}

/// Free a chain of nodes built by `build_chain` (or a single leaf) that was never linked into a
/// tree, following single-child links down to the leaf.
fn free_chain<V: Copy>(mut node: RawNode) {
    loop {
        if node.child_count() == 0 {
            node.dealloc::<V>();
            return;
        }
        let child = node.child_at::<V>(0);
        node.dealloc::<V>();
        node = child;
    }
}
