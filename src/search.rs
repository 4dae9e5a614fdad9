use crate::board::{den_sq, manhattan, NUM_SQ};
use crate::eval;
use crate::movegen::{MoveGenerator, MAX_MOVES};
use crate::state::{GameStatus, Move, Position, MATERIAL, TIGER};
use crate::tt::{TranspositionTable, FLAG_ALPHA, FLAG_BETA, FLAG_EXACT};
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

pub const MAX_PLY: usize = 128;
pub const SCORE_INF: i32 = 30_000;
pub const SCORE_MATE: i32 = 29_000;

// Half-moves without a capture before the game is scored as drawn.
pub const HALFMOVE_DRAW: u32 = 200;

static LMR_TABLE: OnceLock<[[u8; 64]; 64]> = OnceLock::new();

pub fn init_lmr() {
    LMR_TABLE.get_or_init(|| {
        let mut table = [[0u8; 64]; 64];
        for (d, row) in table.iter_mut().enumerate().skip(1) {
            for (i, cell) in row.iter_mut().enumerate().skip(1) {
                let r = 0.75 + (d as f64).ln() * (i as f64).ln() / 2.5;
                *cell = r as u8;
            }
        }
        table
    });
}

#[inline(always)]
fn lmr_reduction(depth: i32, move_index: usize) -> i32 {
    let t = LMR_TABLE.get().expect("lmr table not initialized");
    t[(depth as usize).min(63)][move_index.min(63)] as i32
}

// Mate scores are stored relative to the node so a TT hit at a different
// ply still reports the right distance.
pub fn score_to_tt(score: i32, ply: usize) -> i32 {
    if score >= SCORE_MATE - MAX_PLY as i32 {
        score + ply as i32
    } else if score <= -(SCORE_MATE - MAX_PLY as i32) {
        score - ply as i32
    } else {
        score
    }
}

pub fn score_from_tt(score: i32, ply: usize) -> i32 {
    if score >= SCORE_MATE - MAX_PLY as i32 {
        score - ply as i32
    } else if score <= -(SCORE_MATE - MAX_PLY as i32) {
        score + ply as i32
    } else {
        score
    }
}

/// An enemy piece within two steps of our den forces exact play: pruning
/// and reductions switch off while this holds.
fn in_danger(pos: &Position) -> bool {
    let our_den = den_sq(pos.side_to_move);
    let opp = 1 - pos.side_to_move;
    for rank in 1..=8 {
        let sq = pos.piece_sq[opp][rank];
        if sq >= 0 && manhattan(sq as usize, our_den) <= 2 {
            return true;
        }
    }
    false
}

fn pick_best(moves: &mut [Move], scores: &mut [i32], cur: usize) {
    let mut best = cur;
    for i in cur + 1..scores.len() {
        if scores[i] > scores[best] {
            best = i;
        }
    }
    if best != cur {
        moves.swap(cur, best);
        scores.swap(cur, best);
    }
}

pub struct Searcher {
    pub tt: TranspositionTable,
    killers: [[Move; 2]; MAX_PLY],
    history: Box<[[[i32; NUM_SQ]; NUM_SQ]; 2]>,
    pv: Box<[[Move; MAX_PLY]; MAX_PLY]>,
    pv_len: [usize; MAX_PLY],
    stop_flag: Arc<AtomicBool>,
    stopped: bool,
    nodes: u64,
    seldepth: usize,
    start: Instant,
    allocated_ms: i64,
    hard_ms: i64,
    time_managed: bool,
}

impl Searcher {
    pub fn new(tt_mb: usize) -> Self {
        init_lmr();
        Searcher {
            tt: TranspositionTable::new(tt_mb),
            killers: [[Move::NONE; 2]; MAX_PLY],
            history: Box::new([[[0; NUM_SQ]; NUM_SQ]; 2]),
            pv: Box::new([[Move::NONE; MAX_PLY]; MAX_PLY]),
            pv_len: [0; MAX_PLY],
            stop_flag: Arc::new(AtomicBool::new(false)),
            stopped: false,
            nodes: 0,
            seldepth: 0,
            start: Instant::now(),
            allocated_ms: 0,
            hard_ms: 0,
            time_managed: false,
        }
    }

    pub fn set_tt_size(&mut self, mb: usize) -> usize {
        self.tt.set_size(mb)
    }

    pub fn clear_game(&mut self) {
        self.tt.clear();
        self.killers = [[Move::NONE; 2]; MAX_PLY];
        for side in self.history.iter_mut() {
            for from in side.iter_mut() {
                from.fill(0);
            }
        }
    }

    /// Shared flag another thread may set to end the search.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    #[inline(always)]
    fn check_time(&mut self) {
        if self.stop_flag.load(Ordering::Relaxed) {
            self.stopped = true;
            return;
        }
        if self.time_managed && self.start.elapsed().as_millis() as i64 >= self.hard_ms {
            self.stopped = true;
        }
    }

    fn score_move(&self, pos: &Position, m: Move, ply: usize, hash_move: Move) -> i32 {
        if m == hash_move {
            return 1_000_000;
        }
        let to = m.to();
        if to == den_sq(1 - pos.side_to_move) {
            return 900_000;
        }
        let target = pos.squares[to];
        if target != 0 {
            let victim = MATERIAL[target.unsigned_abs() as usize];
            let attacker = MATERIAL[pos.squares[m.from()].unsigned_abs() as usize];
            return 500_000 + victim * 10 - attacker;
        }
        if ply < MAX_PLY {
            if m == self.killers[ply][0] {
                return 400_000;
            }
            if m == self.killers[ply][1] {
                return 399_000;
            }
        }
        self.history[pos.side_to_move][m.from()][to]
    }

    fn quiescence(&mut self, pos: &mut Position, mut alpha: i32, beta: i32, ply: usize) -> i32 {
        self.nodes += 1;
        if self.nodes % 4096 == 0 {
            self.check_time();
        }
        if self.stopped {
            return 0;
        }
        if ply > self.seldepth {
            self.seldepth = ply;
        }

        match pos.game_status() {
            GameStatus::Win => return SCORE_MATE - ply as i32,
            GameStatus::Loss => return -(SCORE_MATE - ply as i32),
            GameStatus::Ongoing => {}
        }
        if ply >= MAX_PLY - 1 {
            return eval::evaluate(pos);
        }

        let stand_pat = eval::evaluate(pos);
        if stand_pat >= beta {
            return stand_pat;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let mut gen = MoveGenerator::new();
        gen.generate_captures(pos);
        let count = gen.list.count;
        let mut scores = [0i32; MAX_MOVES];
        for i in 0..count {
            scores[i] = self.score_move(pos, gen.list.moves[i], ply, Move::NONE);
        }

        for i in 0..count {
            pick_best(&mut gen.list.moves[..count], &mut scores[..count], i);
            let m = gen.list.moves[i];

            // Even winning this victim cleanly cannot lift alpha.
            let target = pos.squares[m.to()];
            if target != 0 {
                let gain = MATERIAL[target.unsigned_abs() as usize];
                if stand_pat + gain + 200 < alpha {
                    continue;
                }
            }

            pos.make_move(m);
            let score = -self.quiescence(pos, -beta, -alpha, ply + 1);
            pos.unmake_move();
            if self.stopped {
                return 0;
            }
            if score > alpha {
                alpha = score;
                if score >= beta {
                    return beta;
                }
            }
        }

        alpha
    }

    #[allow(clippy::too_many_arguments)]
    fn alpha_beta(
        &mut self,
        pos: &mut Position,
        depth: i32,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        is_pv: bool,
        allow_null: bool,
    ) -> i32 {
        self.pv_len[ply] = ply;

        match pos.game_status() {
            GameStatus::Win => return SCORE_MATE - ply as i32,
            GameStatus::Loss => return -(SCORE_MATE - ply as i32),
            GameStatus::Ongoing => {}
        }

        if ply > 0 {
            if pos.is_repetition() {
                return 0;
            }
            if pos.halfmove >= HALFMOVE_DRAW {
                return 0;
            }
        }

        if ply >= MAX_PLY - 1 {
            return eval::evaluate(pos);
        }

        if depth <= 0 {
            return self.quiescence(pos, alpha, beta, ply);
        }

        self.nodes += 1;
        if ply > self.seldepth {
            self.seldepth = ply;
        }
        if self.nodes % 4096 == 0 {
            self.check_time();
        }
        if self.stopped {
            return 0;
        }

        let mut hash_move = Move::NONE;
        if let Some(e) = self.tt.probe(pos.hash) {
            hash_move = e.best_move;
            if !is_pv && e.depth as i32 >= depth {
                let tt_score = score_from_tt(e.score as i32, ply);
                match e.flag {
                    FLAG_EXACT => return tt_score,
                    FLAG_ALPHA if tt_score <= alpha => return tt_score,
                    FLAG_BETA if tt_score >= beta => return tt_score,
                    _ => {}
                }
            }
        }

        let static_eval = eval::evaluate(pos);
        let danger = in_danger(pos);

        // Razoring: hopeless nodes drop straight into quiescence.
        if !is_pv && !danger && depth <= 2 && static_eval + 300 * depth <= alpha {
            let v = self.quiescence(pos, alpha, beta, ply);
            if self.stopped {
                return 0;
            }
            if v <= alpha {
                return v;
            }
        }

        // Reverse futility: a static margin already clears beta.
        if !is_pv
            && !danger
            && depth <= 3
            && beta.abs() < SCORE_MATE - MAX_PLY as i32
            && static_eval - 120 * depth >= beta
        {
            return static_eval - 120 * depth;
        }

        // Null move: hand over the turn and see if beta still holds.
        if !is_pv
            && allow_null
            && depth >= 3
            && !danger
            && static_eval >= beta
            && pos.piece_count[pos.side_to_move] >= 2
            && beta.abs() < SCORE_MATE - MAX_PLY as i32
        {
            let r = 3 + depth / 6;
            pos.make_null_move();
            let mut null_score =
                -self.alpha_beta(pos, depth - 1 - r, -beta, -beta + 1, ply + 1, false, false);
            pos.unmake_null_move();
            if self.stopped {
                return 0;
            }
            if null_score >= beta {
                if null_score >= SCORE_MATE - MAX_PLY as i32 {
                    null_score = beta;
                }
                return null_score;
            }
        }

        // Internal iterative deepening to seed a hash move on PV nodes.
        if is_pv && hash_move.is_none() && depth >= 4 {
            self.alpha_beta(pos, depth - 2, alpha, beta, ply, true, false);
            if self.stopped {
                return 0;
            }
            if let Some(e) = self.tt.probe(pos.hash) {
                hash_move = e.best_move;
            }
        }

        let mut gen = MoveGenerator::new();
        gen.generate_moves(pos);
        let count = gen.list.count;
        if count == 0 {
            return -(SCORE_MATE - ply as i32);
        }

        let mut scores = [0i32; MAX_MOVES];
        for i in 0..count {
            scores[i] = self.score_move(pos, gen.list.moves[i], ply, hash_move);
        }

        let opp_den = den_sq(1 - pos.side_to_move);
        let mut best_score = -SCORE_INF;
        let mut best_move = Move::NONE;
        let mut flag = FLAG_ALPHA;
        let mut searched = 0usize;

        for i in 0..count {
            pick_best(&mut gen.list.moves[..count], &mut scores[..count], i);
            let m = gen.list.moves[i];
            let to = m.to();
            let is_capture = pos.squares[to] != 0;

            // Entering the opponent's den wins on the spot.
            if to == opp_den {
                let score = SCORE_MATE - ply as i32;
                self.pv[ply][ply] = m;
                self.pv_len[ply] = ply + 1;
                self.tt
                    .store(pos.hash, score_to_tt(score, ply), m, depth, FLAG_EXACT);
                return score;
            }

            let victim_rank = pos.squares[to].unsigned_abs() as usize;
            let ext = if danger || (is_capture && victim_rank >= TIGER) {
                1
            } else {
                0
            };

            // Futility: a quiet move at shallow depth cannot recover a bad
            // static score. Always search at least one move.
            if !is_pv
                && !danger
                && depth <= 2
                && !is_capture
                && searched > 0
                && static_eval + 150 * depth <= alpha
            {
                continue;
            }

            let new_depth = depth - 1 + ext;
            pos.make_move(m);

            let mut score;
            if searched == 0 {
                score = -self.alpha_beta(pos, new_depth, -beta, -alpha, ply + 1, is_pv, true);
            } else {
                let mut reduction = 0;
                if depth >= 3 && searched >= 2 && !is_capture && !danger {
                    reduction = lmr_reduction(depth, searched);
                    if is_pv && reduction > 0 {
                        reduction -= 1;
                    }
                    reduction = reduction.min(new_depth.max(0));
                }
                score = -self.alpha_beta(
                    pos,
                    new_depth - reduction,
                    -alpha - 1,
                    -alpha,
                    ply + 1,
                    false,
                    true,
                );
                if score > alpha && reduction > 0 {
                    score =
                        -self.alpha_beta(pos, new_depth, -alpha - 1, -alpha, ply + 1, false, true);
                }
                if is_pv && score > alpha && score < beta {
                    score = -self.alpha_beta(pos, new_depth, -beta, -alpha, ply + 1, true, true);
                }
            }

            pos.unmake_move();
            if self.stopped {
                return 0;
            }
            searched += 1;

            if score > best_score {
                best_score = score;
                best_move = m;

                if score > alpha {
                    alpha = score;
                    flag = FLAG_EXACT;

                    let child_len = self.pv_len[ply + 1];
                    let (head, tail) = self.pv.split_at_mut(ply + 1);
                    head[ply][ply] = m;
                    head[ply][ply + 1..child_len]
                        .copy_from_slice(&tail[0][ply + 1..child_len]);
                    self.pv_len[ply] = child_len;

                    if score >= beta {
                        flag = FLAG_BETA;
                        if !is_capture {
                            if m != self.killers[ply][0] {
                                self.killers[ply][1] = self.killers[ply][0];
                                self.killers[ply][0] = m;
                            }
                            let stm = pos.side_to_move;
                            let entry = &mut self.history[stm][m.from()][to];
                            *entry += depth * depth;
                            if *entry > 100_000 {
                                age_history(&mut self.history);
                            }
                        }
                        break;
                    }
                }
            }
        }

        self.tt
            .store(pos.hash, score_to_tt(best_score, ply), best_move, depth, flag);
        best_score
    }

    /// Iterative deepening driver. Streams one info line per completed
    /// depth and returns the best move of the last completed iteration.
    pub fn think(
        &mut self,
        pos: &mut Position,
        max_depth: i32,
        move_time_ms: i64,
        infinite: bool,
    ) -> Move {
        self.start = Instant::now();
        self.stopped = false;
        self.nodes = 0;
        self.seldepth = 0;

        let max_depth = if max_depth <= 0 {
            MAX_PLY as i32 - 1
        } else {
            max_depth.min(MAX_PLY as i32 - 1)
        };
        let move_time_ms = if move_time_ms <= 0 && !infinite {
            5000
        } else {
            move_time_ms
        };
        self.time_managed = !infinite;
        self.allocated_ms = move_time_ms;
        self.hard_ms = move_time_ms.saturating_add(move_time_ms / 2);

        // Killers go stale between searches; history carries over.
        self.killers = [[Move::NONE; 2]; MAX_PLY];

        let mut root_best = Move::NONE;
        let mut prev_score = 0;

        for depth in 1..=max_depth {
            self.seldepth = 0;

            let mut window = 40;
            let (mut alpha, mut beta) = if depth >= 5 {
                (prev_score - window, prev_score + window)
            } else {
                (-SCORE_INF, SCORE_INF)
            };

            let mut score;
            let mut failures = 0;
            loop {
                score = self.alpha_beta(pos, depth, alpha, beta, 0, true, true);
                if self.stopped || (score > alpha && score < beta) {
                    break;
                }
                failures += 1;
                if failures >= 2 {
                    alpha = -SCORE_INF;
                    beta = SCORE_INF;
                } else {
                    window *= 3;
                    alpha = (prev_score - window).max(-SCORE_INF);
                    beta = (prev_score + window).min(SCORE_INF);
                }
            }

            if self.stopped && depth > 1 {
                break;
            }

            if self.pv_len[0] > 0 {
                root_best = self.pv[0][0];
            }
            prev_score = score;

            let ms = self.start.elapsed().as_millis() as u64;
            let nps = if ms > 0 {
                self.nodes * 1000 / ms
            } else {
                self.nodes
            };
            let score_str = if score.abs() >= SCORE_MATE - MAX_PLY as i32 {
                let mate_in = (SCORE_MATE - score.abs() + 1) / 2;
                if score > 0 {
                    format!("mate {}", mate_in)
                } else {
                    format!("mate -{}", mate_in)
                }
            } else {
                format!("cp {}", score)
            };
            let mut pv_str = String::new();
            for j in 0..self.pv_len[0] {
                pv_str.push(' ');
                pv_str.push_str(&self.pv[0][j].to_string());
            }
            println!(
                "info depth {} seldepth {} score {} nodes {} nps {} time {} pv{}",
                depth, self.seldepth, score_str, self.nodes, nps, ms, pv_str
            );

            if self.stopped {
                break;
            }
            // A proven mate inside the horizon will not improve.
            if score.abs() >= SCORE_MATE - depth {
                break;
            }
            // Starting an iteration we cannot finish wastes the clock.
            if self.time_managed && ms as i64 >= self.allocated_ms / 2 {
                break;
            }
        }

        // Whatever happened above, hand back something legal.
        let mut gen = MoveGenerator::new();
        gen.generate_moves(pos);
        if (root_best.is_none() || !gen.list.contains(root_best)) && gen.list.count > 0 {
            root_best = gen.list.moves[0];
        }
        info!(
            "search finished: best {} nodes {} time {} ms",
            root_best,
            self.nodes,
            self.start.elapsed().as_millis()
        );
        root_best
    }
}

fn age_history(history: &mut [[[i32; NUM_SQ]; NUM_SQ]; 2]) {
    for side in history.iter_mut() {
        for from in side.iter_mut() {
            for v in from.iter_mut() {
                *v /= 2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(fen: &str) -> Position {
        crate::init_static_tables();
        let mut pos = Position::new();
        pos.set_fen(fen).unwrap();
        pos
    }

    #[test]
    fn mate_distance_adjustment_round_trips() {
        for &score in &[0, 37, -512, SCORE_MATE - 3, -(SCORE_MATE - 7), SCORE_MATE - 90] {
            for ply in [0usize, 1, 5, 40, 90] {
                assert_eq!(score_from_tt(score_to_tt(score, ply), ply), score);
            }
        }
    }

    #[test]
    fn tt_mate_scores_keep_their_distance() {
        crate::init_static_tables();
        let mut tt = TranspositionTable::new(1);
        // A mate found 3 plies below a node at ply 5.
        let at_ply = 5usize;
        let score = SCORE_MATE - 8; // mate at absolute ply 8
        tt.store(
            0xABCD,
            score_to_tt(score, at_ply),
            Move::new(0, 7),
            4,
            crate::tt::FLAG_EXACT,
        );
        // Probing the same position reached at ply 9 must report the mate
        // three plies below that node, not eight.
        let e = tt.probe(0xABCD).unwrap();
        assert_eq!(score_from_tt(e.score as i32, 9), SCORE_MATE - 12);
        assert_eq!(score_from_tt(e.score as i32, at_ply), score);
    }

    #[test]
    fn lmr_table_matches_the_formula() {
        init_lmr();
        assert_eq!(lmr_reduction(1, 1), 0); // ln(1) zeroes the product
        assert_eq!(lmr_reduction(10, 10), 2);
        assert_eq!(lmr_reduction(3, 2), 1);
        assert_eq!(lmr_reduction(63, 63), 7);
        // Monotone in both arguments.
        assert!(lmr_reduction(20, 30) >= lmr_reduction(20, 5));
        assert!(lmr_reduction(20, 30) >= lmr_reduction(6, 30));
    }

    #[test]
    fn finds_den_entry_mate_in_one() {
        let mut pos = setup("7/3W3/7/7/7/7/7/7/e6 w");
        let mut searcher = Searcher::new(1);
        let best = searcher.think(&mut pos, 3, 1000, false);
        assert_eq!(best.to_string(), "d8d9");
    }

    #[test]
    fn takes_the_hanging_elephant() {
        // Capturing the lone elephant bares the dark side and wins.
        let mut pos = setup("7/7/7/7/7/7/1Re4/7/7 w");
        let mut searcher = Searcher::new(1);
        let best = searcher.think(&mut pos, 4, 1000, false);
        assert_eq!(best.to_string(), "b3c3");
    }

    #[test]
    fn defends_the_den_before_racing() {
        // Dark wolf sits one step from the light den; the light tiger can
        // take it. Any non-capturing move loses next ply.
        let mut pos = setup("7/7/7/7/7/7/7/2Tw3/7 w");
        let mut searcher = Searcher::new(1);
        let best = searcher.think(&mut pos, 5, 2000, false);
        assert_eq!(best.to_string(), "c2d2");
    }

    #[test]
    fn pre_set_stop_still_returns_a_legal_move() {
        crate::init_static_tables();
        let mut pos = Position::new();
        let mut searcher = Searcher::new(1);
        searcher.stop();
        let best = searcher.think(&mut pos, 8, 1000, false);
        let mut gen = MoveGenerator::new();
        gen.generate_moves(&pos);
        assert!(gen.list.contains(best));
    }

    #[test]
    fn search_leaves_the_position_untouched() {
        let mut pos = setup("l5t/1d3c1/r1p1w1e/7/7/7/E1W1P1R/1C3D1/T5L w");
        let before_hash = pos.hash;
        let before_fen = pos.to_fen();
        let mut searcher = Searcher::new(1);
        searcher.think(&mut pos, 4, 500, false);
        assert_eq!(pos.hash, before_hash);
        assert_eq!(pos.to_fen(), before_fen);
    }

    #[test]
    fn repetition_is_scored_as_draw() {
        // Two lone jumpers shuffling: the search should never see a mate.
        let mut pos = setup("6t/7/7/7/7/7/7/7/T6 w");
        let mut searcher = Searcher::new(1);
        searcher.think(&mut pos, 6, 1000, false);
        // No crash, position restored; draws bounded the score.
        assert_eq!(pos.to_fen(), "6t/7/7/7/7/7/7/7/T6 w");
    }
}
