use kapok::movegen::MoveGenerator;
use kapok::search::{score_from_tt, Searcher, SCORE_MATE};
use kapok::state::Position;
use kapok::tt::FLAG_EXACT;
use std::sync::Once;
use std::time::Instant;

static INIT: Once = Once::new();

fn init() {
    INIT.call_once(kapok::init_static_tables);
}

#[test]
fn den_entry_scores_mate_at_the_entry_ply() {
    init();
    let mut pos = Position::from_fen("7/3W3/7/7/7/7/7/7/e6 w").unwrap();
    let mut searcher = Searcher::new(1);
    let best = searcher.think(&mut pos, 4, 2000, false);

    assert_eq!(best.to_string(), "d8d9");
    // The den was entered on the move played at ply 0.
    let entry = searcher.tt.probe(pos.hash).unwrap();
    assert_eq!(entry.flag, FLAG_EXACT);
    assert_eq!(score_from_tt(entry.score as i32, 0), SCORE_MATE);
}

#[test]
fn mate_in_two_reports_the_right_distance() {
    init();
    // The wolf needs two moves to reach the dark den; nothing can stop it.
    let mut pos = Position::from_fen("7/7/3W3/7/7/7/7/7/e6 w").unwrap();
    let mut searcher = Searcher::new(1);
    let best = searcher.think(&mut pos, 6, 5000, false);

    assert_eq!(best.to_string(), "d7d8");
    let entry = searcher.tt.probe(pos.hash).unwrap();
    assert_eq!(entry.flag, FLAG_EXACT);
    assert_eq!(score_from_tt(entry.score as i32, 0), SCORE_MATE - 2);
}

#[test]
fn iterative_deepening_converges_and_respects_time() {
    init();
    let mut pos = Position::new();
    let mut searcher = Searcher::new(8);

    let start = Instant::now();
    let best = searcher.think(&mut pos, 0, 150, false);
    let elapsed = start.elapsed().as_millis();

    let mut gen = MoveGenerator::new();
    gen.generate_moves(&pos);
    assert!(gen.list.contains(best));
    // Hard cap is 1.5x the budget; leave generous slack for slow machines.
    assert!(elapsed < 3000, "search overran its budget: {} ms", elapsed);
}

#[test]
fn boxed_in_side_returns_the_null_move() {
    init();
    // Light's lone rat in the corner faces a cat and a dog it cannot
    // capture: zero legal moves, so the answer is the null move 0000.
    let mut pos = Position::from_fen("7/7/7/7/7/7/7/c6/Rd5 w").unwrap();
    let mut gen = MoveGenerator::new();
    gen.generate_moves(&pos);
    assert_eq!(gen.list.count, 0);

    let mut searcher = Searcher::new(1);
    let best = searcher.think(&mut pos, 4, 1000, false);
    assert!(best.is_none());
    assert_eq!(best.to_string(), "0000");
}
