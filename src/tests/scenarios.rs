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

use super::validate::validate;
use crate::{RaxIter, SeekOp, Tree, MAX_NODE_SIZE};

fn forward_keys<V: Copy>(tree: &Tree<V>) -> Vec<Vec<u8>> {
    let mut it = tree.iter();
    assert!(it.seek(SeekOp::Begin, b""));
    let mut out = Vec::new();
    while it.next() {
        out.push(it.key().to_vec());
    }
    out
}

fn backward_keys<V: Copy>(tree: &Tree<V>) -> Vec<Vec<u8>> {
    let mut it = tree.iter();
    assert!(it.seek(SeekOp::End, b""));
    let mut out = Vec::new();
    while it.prev() {
        out.push(it.key().to_vec());
    }
    out
}

// Scenario 1: "foo", "foobar", "footer" share a "foo" prefix and then branch on 'b'/'t'.
#[test]
fn scenario_foo_foobar_footer() {
    let mut tree: Tree<u32> = Tree::new();
    tree.insert(b"foo", 1).unwrap();
    tree.insert(b"foobar", 2).unwrap();
    tree.insert(b"footer", 3).unwrap();
    validate(&tree);

    assert_eq!(tree.len(), 3);
    assert_eq!(tree.find(b"foo"), Some(&1));
    assert_eq!(tree.find(b"foobar"), Some(&2));
    assert_eq!(tree.find(b"footer"), Some(&3));
    assert_eq!(tree.find(b"foot"), None);

    assert_eq!(
        forward_keys(&tree),
        vec![b"foo".to_vec(), b"foobar".to_vec(), b"footer".to_vec()]
    );
}

// Scenario 2: inserting "first" on top of scenario 1 forces the "foo" prefix to split again,
// this time branching on 'i'/'o' right after the shared "f".
#[test]
fn scenario_adding_first_splits_the_prefix() {
    let mut tree: Tree<u32> = Tree::new();
    tree.insert(b"foo", 1).unwrap();
    tree.insert(b"foobar", 2).unwrap();
    tree.insert(b"footer", 3).unwrap();
    tree.insert(b"first", 4).unwrap();
    validate(&tree);

    assert_eq!(tree.len(), 4);
    assert_eq!(tree.find(b"first"), Some(&4));
    assert_eq!(
        forward_keys(&tree),
        vec![
            b"first".to_vec(),
            b"foo".to_vec(),
            b"foobar".to_vec(),
            b"footer".to_vec(),
        ]
    );
}

// Scenario 3: the empty key is a legitimate key in its own right, and sorts before everything.
#[test]
fn scenario_empty_key_then_a() {
    let mut tree: Tree<u32> = Tree::new();
    tree.insert(b"", 10).unwrap();
    tree.insert(b"a", 20).unwrap();
    validate(&tree);

    assert_eq!(tree.find(b""), Some(&10));
    assert_eq!(tree.find(b"a"), Some(&20));
    assert_eq!(forward_keys(&tree), vec![b"".to_vec(), b"a".to_vec()]);

    let mut it = tree.iter();
    assert!(it.seek(SeekOp::Gt, b""));
    assert_eq!(it.key(), b"a");
}

// Scenario 4: "ab" then "a" — "a" is a proper prefix of an existing key and must get its own
// node (an `iskey` marker on an otherwise purely-internal node), not overwrite "ab".
#[test]
fn scenario_prefix_key_inserted_after_its_extension() {
    let mut tree: Tree<u32> = Tree::new();
    tree.insert(b"ab", 1).unwrap();
    tree.insert(b"a", 2).unwrap();
    validate(&tree);

    assert_eq!(tree.len(), 2);
    assert_eq!(tree.find(b"a"), Some(&2));
    assert_eq!(tree.find(b"ab"), Some(&1));
    assert_eq!(forward_keys(&tree), vec![b"a".to_vec(), b"ab".to_vec()]);
}

// The reverse insertion order (extension after prefix) must land on the same shape.
#[test]
fn scenario_prefix_key_inserted_before_its_extension() {
    let mut tree: Tree<u32> = Tree::new();
    tree.insert(b"a", 2).unwrap();
    tree.insert(b"ab", 1).unwrap();
    validate(&tree);

    assert_eq!(tree.len(), 2);
    assert_eq!(tree.find(b"a"), Some(&2));
    assert_eq!(tree.find(b"ab"), Some(&1));
    assert_eq!(forward_keys(&tree), vec![b"a".to_vec(), b"ab".to_vec()]);
}

// Scenario 5: 1000 zero-padded keys, then remove every even-indexed one.
#[test]
fn scenario_thousand_keys_then_remove_evens() {
    let mut tree: Tree<u32> = Tree::new();
    let keys: Vec<String> = (0..1000).map(|i| format!("key-{i:05}")).collect();
    for (i, k) in keys.iter().enumerate() {
        tree.insert(k.as_bytes(), i as u32).unwrap();
    }
    validate(&tree);
    assert_eq!(tree.len(), 1000);
    assert_eq!(
        forward_keys(&tree),
        keys.iter().map(|k| k.as_bytes().to_vec()).collect::<Vec<_>>()
    );

    for (i, k) in keys.iter().enumerate() {
        if i % 2 == 0 {
            assert_eq!(tree.remove(k.as_bytes()).unwrap(), Some(i as u32));
        }
    }
    validate(&tree);
    assert_eq!(tree.len(), 500);

    let remaining: Vec<Vec<u8>> = keys
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 2 != 0)
        .map(|(_, k)| k.as_bytes().to_vec())
        .collect();
    assert_eq!(forward_keys(&tree), remaining);
}

// Scenario 6: `<=`/`<` seeks around a key that isn't in the tree, and at the tree's own edges.
#[test]
fn scenario_seek_le_lt_boundaries() {
    let mut tree: Tree<u32> = Tree::new();
    for (i, k) in [b"b".as_slice(), b"d".as_slice(), b"f".as_slice()]
        .into_iter()
        .enumerate()
    {
        tree.insert(k, i as u32).unwrap();
    }
    validate(&tree);

    let mut it = tree.iter();
    assert!(it.seek(SeekOp::Le, b"e"));
    assert_eq!(it.key(), b"d");

    let mut it = tree.iter();
    assert!(!it.seek(SeekOp::Lt, b"b"));
    assert!(it.eof());
    assert_eq!(it.value(), None);
}

#[test]
fn insert_then_find_roundtrip() {
    let mut tree: Tree<u64> = Tree::new();
    for (i, k) in ["", "k", "key", "keys", "keyboard", "zzz"].iter().enumerate() {
        tree.insert(k.as_bytes(), i as u64).unwrap();
    }
    validate(&tree);
    for (i, k) in ["", "k", "key", "keys", "keyboard", "zzz"].iter().enumerate() {
        assert_eq!(tree.find(k.as_bytes()), Some(&(i as u64)));
    }
}

#[test]
fn insert_then_remove_then_find_is_none() {
    let mut tree: Tree<u32> = Tree::new();
    tree.insert(b"alpha", 1).unwrap();
    tree.insert(b"alphabet", 2).unwrap();
    validate(&tree);

    assert_eq!(tree.remove(b"alpha").unwrap(), Some(1));
    validate(&tree);
    assert_eq!(tree.find(b"alpha"), None);
    assert_eq!(tree.find(b"alphabet"), Some(&2));
}

#[test]
fn try_insert_keeps_first_value() {
    let mut tree: Tree<u32> = Tree::new();
    assert_eq!(tree.try_insert(b"k", 1).unwrap(), None);
    assert_eq!(tree.try_insert(b"k", 2).unwrap(), Some(1));
    assert_eq!(tree.find(b"k"), Some(&1));
    assert_eq!(tree.len(), 1);
}

#[test]
fn insert_overwrites_and_returns_old_value() {
    let mut tree: Tree<u32> = Tree::new();
    assert_eq!(tree.insert(b"k", 1).unwrap(), None);
    assert_eq!(tree.insert(b"k", 2).unwrap(), Some(1));
    assert_eq!(tree.find(b"k"), Some(&2));
    assert_eq!(tree.len(), 1);
}

#[test]
fn forward_and_backward_iteration_are_reverses() {
    let mut tree: Tree<u32> = Tree::new();
    for (i, k) in ["ant", "bee", "cat", "dog", "eel"].iter().enumerate() {
        tree.insert(k.as_bytes(), i as u32).unwrap();
    }
    validate(&tree);

    let forward = forward_keys(&tree);
    let mut backward = backward_keys(&tree);
    backward.reverse();
    assert_eq!(forward, backward);
}

#[test]
fn seek_ge_and_gt_on_a_present_key() {
    let mut tree: Tree<u32> = Tree::new();
    for (i, k) in ["ant", "bee", "cat"].iter().enumerate() {
        tree.insert(k.as_bytes(), i as u32).unwrap();
    }
    validate(&tree);

    let mut it = tree.iter();
    assert!(it.seek(SeekOp::Ge, b"bee"));
    assert_eq!(it.key(), b"bee");

    let mut it = tree.iter();
    assert!(it.seek(SeekOp::Gt, b"bee"));
    assert_eq!(it.key(), b"cat");
}

#[test]
fn insert_remove_cycle_restores_node_count() {
    let mut tree: Tree<u32> = Tree::new();
    let baseline = tree.node_count();
    let keys: [&[u8]; 5] = [b"foo", b"foobar", b"footer", b"first", b"fo"];

    for (i, k) in keys.iter().enumerate() {
        tree.insert(k, i as u32).unwrap();
    }
    validate(&tree);

    for k in keys.iter().rev() {
        tree.remove(k).unwrap();
    }
    validate(&tree);

    assert_eq!(tree.node_count(), baseline);
    assert_eq!(tree.len(), 0);
}

#[test]
fn safe_mode_forward_iteration_matches_unsafe_mode() {
    let mut tree: Tree<u32> = Tree::new();
    for (i, k) in ["ant", "bee", "cat", "dog"].iter().enumerate() {
        tree.insert(k.as_bytes(), i as u32).unwrap();
    }
    validate(&tree);

    let mut safe: RaxIter<'_, u32> = tree.iter_safe();
    assert!(safe.seek(SeekOp::Begin, b""));
    let mut safe_keys = Vec::new();
    while safe.next() {
        safe_keys.push(safe.key().to_vec());
    }

    assert_eq!(safe_keys, forward_keys(&tree));
}

// "Between steps" necessarily means between two separate iterator borrows in safe Rust: a live
// `RaxIter` holds `&Tree`, so it cannot coexist with the `&mut Tree` a mutation requires. What
// `iter_safe` actually buys you is that resuming from a remembered key after such a mutation is
// cheap and well-defined, rather than needing to detect and repair a dangling ancestor stack.
#[test]
fn safe_iteration_resumes_correctly_after_mutation() {
    let mut tree: Tree<u32> = Tree::new();
    for (i, k) in ["a", "c", "e"].iter().enumerate() {
        tree.insert(k.as_bytes(), i as u32).unwrap();
    }
    validate(&tree);

    let last_key = {
        let mut it = tree.iter_safe();
        assert!(it.seek(SeekOp::Begin, b""));
        assert!(it.next());
        assert_eq!(it.key(), b"a");
        it.key().to_vec()
    };

    tree.remove(b"c").unwrap();
    tree.insert(b"b", 99).unwrap();
    validate(&tree);

    let mut it = tree.iter_safe();
    assert!(it.seek(SeekOp::Gt, &last_key));
    assert_eq!(it.key(), b"b");
    assert_eq!(it.value(), Some(&99));
    assert!(it.next());
    assert_eq!(it.key(), b"e");
    assert!(!it.next());
}

#[test]
#[ignore = "allocates a single node chain spanning > MAX_NODE_SIZE bytes; run explicitly"]
fn key_longer_than_max_node_size_forces_a_chain() {
    let mut tree: Tree<u8> = Tree::new();
    let key = vec![b'x'; MAX_NODE_SIZE as usize + 10];
    tree.insert(&key, 7).unwrap();
    validate(&tree);
    assert_eq!(tree.find(&key), Some(&7));
    assert_eq!(tree.remove(&key).unwrap(), Some(7));
}
