//! Quickcheck-driven Law properties from the spec's Testable Properties
//! section: lookup-after-add, remove-after-add, iteration totality, the
//! inverse property, and insertion commutativity — exercised over
//! randomized, deduplicated key sequences rather than fixed examples.

use quickcheck::{quickcheck, TestResult};

use critcell::bitops::builtin::U32;
use critcell::Tree;

fn unique_u32s(xs: Vec<u32>) -> Vec<u32> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for x in xs {
        if seen.insert(x) {
            out.push(x);
        }
    }
    out
}

fn lookup_after_add_prop(xs: Vec<u32>) -> TestResult {
    let keys = unique_u32s(xs);
    if keys.is_empty() {
        return TestResult::discard();
    }
    let mut tree = Tree::new(U32 { key_offset: 0 });
    unsafe {
        for k in &keys {
            tree.add(k as *const u32).expect("deduplicated keys are distinct");
        }
        for k in &keys {
            let found = tree.find(k);
            if found != Some(k as *const u32) {
                return TestResult::failed();
            }
        }
    }
    TestResult::passed()
}

#[test]
fn lookup_after_add() {
    quickcheck(lookup_after_add_prop as fn(Vec<u32>) -> TestResult);
}

fn remove_after_add_prop(xs: Vec<u32>) -> TestResult {
    let keys = unique_u32s(xs);
    if keys.is_empty() {
        return TestResult::discard();
    }
    let mut tree = Tree::new(U32 { key_offset: 0 });
    unsafe {
        for k in &keys {
            tree.add(k as *const u32).expect("deduplicated keys are distinct");
        }
        let before = tree.count();
        for k in &keys {
            tree.remove(k).expect("key was just added");
            if tree.find(k).is_some() {
                return TestResult::failed();
            }
            tree.add(k as *const u32).expect("key was just removed");
        }
        if tree.count() != before {
            return TestResult::failed();
        }
    }
    TestResult::passed()
}

#[test]
fn remove_after_add() {
    quickcheck(remove_after_add_prop as fn(Vec<u32>) -> TestResult);
}

fn iteration_totality_prop(xs: Vec<u32>) -> TestResult {
    let keys = unique_u32s(xs);
    if keys.is_empty() {
        return TestResult::discard();
    }
    let mut tree = Tree::new(U32 { key_offset: 0 });
    unsafe {
        for k in &keys {
            tree.add(k as *const u32).expect("deduplicated keys are distinct");
        }
        let mut ascending = Vec::new();
        let mut cur = tree.first();
        while let Some((obj, c)) = cur {
            ascending.push(*obj);
            cur = tree.next(&c);
        }
        let mut expected = keys.clone();
        expected.sort_unstable();
        if ascending != expected {
            return TestResult::failed();
        }

        let mut descending = Vec::new();
        let mut cur = tree.last();
        while let Some((obj, c)) = cur {
            descending.push(*obj);
            cur = tree.prev(&c);
        }
        descending.reverse();
        if descending != expected {
            return TestResult::failed();
        }
    }
    TestResult::passed()
}

#[test]
fn iteration_totality() {
    quickcheck(iteration_totality_prop as fn(Vec<u32>) -> TestResult);
}

fn inverse_prop(xs: Vec<u32>) -> TestResult {
    let keys = unique_u32s(xs);
    if keys.len() < 2 {
        return TestResult::discard();
    }
    let mut tree = Tree::new(U32 { key_offset: 0 });
    unsafe {
        for k in &keys {
            tree.add(k as *const u32).expect("deduplicated keys are distinct");
        }
        // Every cursor except the global maximum must round-trip next/prev.
        let mut cur = tree.first();
        while let Some((obj, c)) = cur {
            let next = tree.next(&c);
            if let Some((_, nc)) = next {
                let back = tree.prev(&nc);
                match back {
                    Some((back_obj, _)) if back_obj == obj => {}
                    _ => return TestResult::failed(),
                }
            }
            cur = next;
        }
    }
    TestResult::passed()
}

#[test]
fn inverse_next_then_prev() {
    quickcheck(inverse_prop as fn(Vec<u32>) -> TestResult);
}

fn insertion_commutes_prop(a: u32, b: u32) -> TestResult {
    if a == b {
        return TestResult::discard();
    }
    let mut forward = Tree::new(U32 { key_offset: 0 });
    let mut backward = Tree::new(U32 { key_offset: 0 });
    unsafe {
        forward.add(&a as *const u32).unwrap();
        forward.add(&b as *const u32).unwrap();
        backward.add(&b as *const u32).unwrap();
        backward.add(&a as *const u32).unwrap();

        let collect = |t: &Tree<u32, U32>| -> Vec<u32> {
            let mut out = Vec::new();
            let mut cur = unsafe { t.first() };
            while let Some((obj, c)) = cur {
                out.push(unsafe { *obj });
                cur = unsafe { t.next(&c) };
            }
            out
        };
        if collect(&forward) != collect(&backward) {
            return TestResult::failed();
        }
        if forward.count() != backward.count() {
            return TestResult::failed();
        }
    }
    TestResult::passed()
}

#[test]
fn insertion_commutes() {
    quickcheck(insertion_commutes_prop as fn(u32, u32) -> TestResult);
}
