//! Builds a small tree, drives it through add/find/iterate/remove, and
//! prints a shape summary plus a timing line — the same role `repl.rs`'s
//! `print_constants`/`print_tree` play for `cstack`.

use std::time::Instant;

use critcell::bitops::builtin::U32;
use critcell::Tree;

fn print_constants() {
    println!("NODES_PER_CELL: {}", critcell::NODES_PER_CELL);
    println!("PTRS_PER_CELL: {}", critcell::PTRS_PER_CELL);
    println!("CELL_MIN: {}", critcell::CELL_MIN);
}

fn main() {
    print_constants();

    let values: Vec<u32> = (0..10_000u32).map(|i| i * 7).collect();
    let mut tree = Tree::new(U32 { key_offset: 0 });

    let start = Instant::now();
    unsafe {
        for v in &values {
            tree.add(v as *const u32).expect("key is unique by construction");
        }
    }
    let insert_elapsed = start.elapsed();

    println!("n_objects: {}", tree.count());
    println!("stats: {:?}", tree.stats());

    let found = unsafe { tree.find(&values[values.len() / 2]) };
    println!("find({}): {:?}", values[values.len() / 2], found.map(|p| unsafe { *p }));

    let mut seen = 0usize;
    let mut cur = unsafe { tree.first() };
    while let Some((obj, c)) = cur {
        seen += 1;
        cur = unsafe { tree.next(&c).map(|(o, c2)| (o, c2)) };
        let _ = obj;
    }
    println!("iterated {} objects in ascending order", seen);

    let start = Instant::now();
    unsafe {
        for v in values.iter().step_by(2) {
            tree.remove(v).expect("value was inserted above");
        }
    }
    let remove_elapsed = start.elapsed();

    println!("n_objects after half-removal: {}", tree.count());
    println!("insert: {:?}, remove: {:?}", insert_elapsed, remove_elapsed);
}
