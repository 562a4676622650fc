//! The six end-to-end scenarios of the spec's Testable Properties section,
//! written as plain `#[test]` functions against the public `Tree` API —
//! no subprocess scripting, since there is no REPL binary here to script.

use critcell::bitops::builtin::{Cstr, S32, U32};
use critcell::Tree;

unsafe fn collect_ascending<T, B: critcell::BitOps<T>>(tree: &Tree<T, B>) -> Vec<T>
where
    T: Copy,
{
    let mut out = Vec::new();
    let mut cur = tree.first();
    while let Some((obj, c)) = cur {
        out.push(*obj);
        cur = tree.next(&c);
    }
    out
}

#[test]
fn signed_ordering() {
    let keys: Vec<i32> = vec![-3, 7, 0, -128, 127, 1];
    let mut tree = Tree::new(S32 { key_offset: 0 });
    unsafe {
        for k in &keys {
            tree.add(k as *const i32).expect("keys are distinct");
        }
        let seen = collect_ascending(&tree);
        assert_eq!(seen, vec![-128, -3, 0, 1, 7, 127]);
    }
}

#[test]
fn string_prefix_ordering() {
    // Fixed-size, nul-terminated buffers so addresses stay stable: the
    // backing Vec is built fully before any pointer is taken.
    let mut keys: Vec<[u8; 16]> = Vec::new();
    for s in ["abc", "abc1", "abcd", "ab"] {
        let mut buf = [0u8; 16];
        buf[..s.len()].copy_from_slice(s.as_bytes());
        keys.push(buf);
    }
    let ops = Cstr::new(0, 16 * 8);
    let mut tree = Tree::new(ops);
    unsafe {
        for k in &keys {
            tree.add(k as *const [u8; 16]).expect("keys are distinct");
        }
        let seen = collect_ascending(&tree);
        let as_strs: Vec<String> = seen
            .iter()
            .map(|b| {
                let end = b.iter().position(|&c| c == 0).unwrap_or(b.len());
                String::from_utf8(b[..end].to_vec()).unwrap()
            })
            .collect();
        assert_eq!(as_strs, vec!["ab", "abc", "abc1", "abcd"]);

        // "abc1" is keys[1] (second inserted, third in ascending iteration order);
        // `find` must return the handle for that exact insertion.
        let abc1 = &keys[1];
        let found = tree.find(abc1);
        assert!(found.is_some());
        assert_eq!(found.unwrap(), abc1 as *const [u8; 16]);
    }
}

#[test]
fn split_trigger() {
    let keys: Vec<u32> = (0..8u32).map(|i| i * 7).chain(std::iter::once(56)).collect();
    // keys: 0,7,14,...,49 (8 values), then 56 (9th) — matches the scenario.
    assert_eq!(keys.len(), 9);
    let mut tree = Tree::new(U32 { key_offset: 0 });
    unsafe {
        for k in &keys[..8] {
            tree.add(k as *const u32).expect("keys are distinct");
        }
        assert_eq!(tree.stats().splits, 0);
        tree.add(&keys[8] as *const u32).expect("key is distinct");
        assert_eq!(tree.stats().splits, 1, "a ninth key must trigger exactly one split");
        assert_eq!(tree.stats().cells_in_use, 2);

        for k in &keys {
            assert!(tree.find(k).is_some(), "key {k} must remain retrievable after split");
        }
        let seen = collect_ascending(&tree);
        let mut expected: Vec<u32> = keys.clone();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }
}

#[test]
fn push_up_on_delete() {
    let keys: Vec<u32> = (0..8u32).map(|i| i * 7).chain(std::iter::once(56)).collect();
    let mut tree = Tree::new(U32 { key_offset: 0 });
    unsafe {
        for k in &keys {
            tree.add(k as *const u32).expect("keys are distinct");
        }
        assert_eq!(tree.stats().cells_in_use, 2);

        for k in [0u32, 7, 14, 21] {
            let idx = keys.iter().position(|&x| x == k).unwrap();
            tree.remove(&keys[idx]).expect("key was inserted above");
        }

        assert_eq!(tree.count(), 5);
        assert_eq!(tree.stats().cells_in_use, 1, "push-up must collapse back to a single cell");

        let remaining: Vec<u32> = keys.iter().copied().filter(|k| ![0, 7, 14, 21].contains(k)).collect();
        for k in &remaining {
            assert!(tree.find(k).is_some());
        }
        let seen = collect_ascending(&tree);
        let mut expected = remaining;
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }
}

#[test]
fn duplicate_rejection() {
    let key: u32 = 42;
    let mut tree = Tree::new(U32 { key_offset: 0 });
    unsafe {
        assert!(tree.add(&key as *const u32).is_ok());
        assert_eq!(tree.count(), 1);
        let err = tree.add(&key as *const u32);
        assert_eq!(err, Err(critcell::TreeError::AlreadyPresent));
        assert_eq!(tree.count(), 1);
    }
}

#[test]
fn large_sequential_insert_remove_reinsert() {
    const N: usize = 100_000;
    let keys: Vec<u32> = (0..N as u32).map(|i| i * 7).collect();
    let mut tree = Tree::new(U32 { key_offset: 0 });
    unsafe {
        for k in &keys {
            tree.add(k as *const u32).expect("keys are distinct");
        }
        assert_eq!(tree.count(), N);

        let evens: Vec<usize> = (0..N).step_by(2).collect();
        for &i in &evens {
            tree.remove(&keys[i]).expect("key was inserted above");
        }
        assert_eq!(tree.count(), N - evens.len());

        for &i in &evens {
            tree.add(&keys[i] as *const u32).expect("key was just removed");
        }
        assert_eq!(tree.count(), N);

        let seen = collect_ascending(&tree);
        let mut expected = keys.clone();
        expected.sort_unstable();
        assert_eq!(seen, expected);

        let s = tree.stats();
        assert!(s.splits >= 1, "100k keys must force at least one split");
        // every split grows cells_in_use by exactly one, so the final cell
        // count must be enough to hold n_objects - 1 nodes.
        let capacity = s.cells_in_use as usize * critcell::NODES_PER_CELL;
        assert!(capacity >= tree.count() - 1, "cells_in_use must cover every node");
    }
}
