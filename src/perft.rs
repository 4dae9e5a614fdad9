use crate::movegen::MoveGenerator;
use crate::state::{GameStatus, Position};
use std::time::Instant;

pub fn perft(pos: &mut Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    // Finished games have no subtree.
    if pos.game_status() != GameStatus::Ongoing {
        return 0;
    }

    let mut gen = MoveGenerator::new();
    gen.generate_moves(pos);

    let mut nodes = 0;
    for i in 0..gen.list.count {
        pos.make_move(gen.list.moves[i]);
        nodes += perft(pos, depth - 1);
        pos.unmake_move();
    }
    nodes
}

/// Per-root-move subtotals, for pinning down a generator bug.
pub fn perft_divide(pos: &mut Position, depth: u32) {
    let mut gen = MoveGenerator::new();
    gen.generate_moves(pos);

    let mut total = 0;
    for i in 0..gen.list.count {
        let m = gen.list.moves[i];
        pos.make_move(m);
        let count = if depth > 0 { perft(pos, depth - 1) } else { 1 };
        pos.unmake_move();
        println!("{}: {}", m, count);
        total += count;
    }
    println!("total: {}", total);
}

pub fn run_perft_suite() {
    println!("--- perft suite ---");

    // Depth 2 from the start is exactly 24*24: the armies cannot interact
    // in one move, so Dark's replies are independent of Light's choice.
    let expected: [u64; 3] = [1, 24, 576];

    let mut pos = Position::new();
    let mut total_nodes = 0;
    let mut total_ms = 0;
    let mut all_pass = true;

    for (depth, want) in expected.iter().enumerate() {
        let start = Instant::now();
        let nodes = perft(&mut pos, depth as u32);
        let ms = start.elapsed().as_millis();
        total_nodes += nodes;
        total_ms += ms;

        let verdict = if nodes == *want { "ok" } else { "FAIL" };
        println!(
            "depth {}: {} nodes, expected {} ({}), {} ms",
            depth, nodes, want, verdict, ms
        );
        if nodes != *want {
            all_pass = false;
            perft_divide(&mut pos, depth as u32);
        }
    }

    // Deeper runs have no pinned reference count; report for the record.
    for depth in 3..=5u32 {
        let start = Instant::now();
        let nodes = perft(&mut pos, depth);
        let ms = start.elapsed().as_millis();
        total_nodes += nodes;
        total_ms += ms;
        println!("depth {}: {} nodes, {} ms", depth, nodes, ms);
    }

    println!(
        "--- done: {} nodes in {} ms{} ---",
        total_nodes,
        total_ms,
        if all_pass { "" } else { ", WITH FAILURES" }
    );
    if total_ms > 0 {
        println!("nps: {}", total_nodes as u128 * 1000 / total_ms);
    }
}
