use kapok::movegen::{MoveGenerator, MAX_MOVES};
use kapok::state::{split_piece, GameStatus, Position};
use std::sync::Once;

static INIT: Once = Once::new();

fn init() {
    INIT.call_once(kapok::init_static_tables);
}

// Deterministic move picker so the playouts are reproducible.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

fn assert_internally_consistent(pos: &Position) {
    // Board and piece list must describe the same world.
    let mut counted = [0u8; 2];
    for sq in 0..kapok::board::NUM_SQ {
        let pc = pos.squares[sq];
        if pc == 0 {
            continue;
        }
        let (rank, color) = split_piece(pc);
        counted[color] += 1;
        assert_eq!(
            pos.piece_sq[color][rank], sq as i8,
            "piece list out of sync at square {}",
            sq
        );
    }
    assert_eq!(counted, pos.piece_count);

    for color in 0..2 {
        for rank in 1..=8 {
            let sq = pos.piece_sq[color][rank];
            if sq >= 0 {
                let (r, c) = split_piece(pos.squares[sq as usize]);
                assert_eq!((r, c), (rank, color));
            }
        }
    }

    // Incremental hash equals the from-scratch hash.
    let mut scratch = pos.clone();
    scratch.compute_hash();
    assert_eq!(scratch.hash, pos.hash);

    // Stack bookkeeping.
    assert_eq!(pos.search_ply() + 1, pos.history_len());
}

#[test]
fn random_playouts_round_trip() {
    init();
    for seed in 1..=8u64 {
        let mut rng = XorShift(seed * 0x9E37_79B9);
        let mut pos = Position::new();
        let start = pos.clone();
        let mut made = 0;

        for _ in 0..120 {
            if pos.game_status() != GameStatus::Ongoing {
                break;
            }
            let mut gen = MoveGenerator::new();
            gen.generate_moves(&pos);
            assert!(gen.list.count <= MAX_MOVES);
            if gen.list.count == 0 {
                break;
            }

            // Captures are always a subset of the full move list.
            let mut caps = MoveGenerator::new();
            caps.generate_captures(&pos);
            for i in 0..caps.list.count {
                assert!(gen.list.contains(caps.list.moves[i]));
            }

            let pick = (rng.next() % gen.list.count as u64) as usize;
            pos.make_move(gen.list.moves[pick]);
            made += 1;
            assert_internally_consistent(&pos);
        }

        for _ in 0..made {
            pos.unmake_move();
            assert_internally_consistent(&pos);
        }

        assert_eq!(pos.hash, start.hash);
        assert_eq!(pos.to_fen(), start.to_fen());
        assert_eq!(pos.halfmove, start.halfmove);
        assert_eq!(pos.piece_sq, start.piece_sq);
    }
}

#[test]
fn null_moves_interleave_with_real_ones() {
    init();
    let mut pos = Position::new();
    let start_hash = pos.hash;

    let mut gen = MoveGenerator::new();
    gen.generate_moves(&pos);
    let m = gen.list.moves[0];

    pos.make_move(m);
    pos.make_null_move();
    let mut gen2 = MoveGenerator::new();
    gen2.generate_moves(&pos);
    pos.make_move(gen2.list.moves[0]);

    pos.unmake_move();
    pos.unmake_null_move();
    pos.unmake_move();

    assert_eq!(pos.hash, start_hash);
    assert_internally_consistent(&pos);
}
