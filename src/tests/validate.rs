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

//! Structural invariant checks, run against a live tree after every mutation in the rest of the
//! test suite. Not a public API: this walks the crate's private node representation directly.

use crate::{
    node::{RawNode, MAX_NODE_SIZE},
    Tree,
};

/// Asserts every structural invariant spec.md §8 lists holds for `tree`, panicking with a
/// descriptive message on the first violation found.
pub(crate) fn validate<V: Copy>(tree: &Tree<V>) {
    super::init_logging();
    let mut numele = 0u64;
    let mut numnodes = 0u64;
    walk::<V>(tree.root(), true, &mut numele, &mut numnodes);
    assert_eq!(
        numele,
        tree.len(),
        "numele ({}) disagrees with the count of reachable iskey nodes ({numele})",
        tree.len(),
    );
    assert_eq!(
        numnodes,
        tree.node_count(),
        "numnodes ({}) disagrees with the count of reachable nodes ({numnodes})",
        tree.node_count(),
    );
}

fn walk<V: Copy>(node: RawNode, is_root: bool, numele: &mut u64, numnodes: &mut u64) {
    *numnodes += 1;
    if node.is_key() {
        *numele += 1;
    }

    if !node.is_compr() {
        let edges = node.edge_bytes();
        for pair in edges.windows(2) {
            assert!(
                pair[0] < pair[1],
                "non-compressed node has non-increasing edge bytes: {edges:?}"
            );
        }
    }

    if !is_root && !node.is_key() && node.child_count() == 1 {
        let child = node.child_at::<V>(0);
        assert!(
            !should_have_fused::<V>(node, child),
            "non-key node {node:?} has exactly one child and should have been fused with it"
        );
    }

    for idx in 0..node.child_count() {
        walk::<V>(node.child_at::<V>(idx), false, numele, numnodes);
    }
}

/// Mirrors `remove::remove`'s own decision of whether a non-key, single-child `node` still needs
/// fusing: a non-compressed node must always be canonicalized into compressed form, while an
/// already-compressed node only needs further work when `child` is itself absorbable (a non-key
/// compressed node) and the combined edge still fits in one node — otherwise `node` is already in
/// the shape spec.md's invariant explicitly exempts from "no non-key node has exactly one child".
fn should_have_fused<V: Copy>(node: RawNode, child: RawNode) -> bool {
    if !node.is_compr() {
        return true;
    }
    let absorb_child = child.is_compr() && !child.is_key();
    if !absorb_child {
        return false;
    }
    let combined = node.edge_bytes().len() + child.edge_bytes().len();
    combined as u64 <= MAX_NODE_SIZE as u64
}
