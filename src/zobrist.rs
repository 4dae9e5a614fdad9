use crate::board::NUM_SQ;
use crate::state::NUM_RANKS;
use std::sync::OnceLock;

static PIECE_KEYS: OnceLock<[[[u64; 2]; NUM_RANKS]; NUM_SQ]> = OnceLock::new();
static SIDE_KEY: OnceLock<u64> = OnceLock::new();

// Keys must be reproducible across runs, so no external entropy: a fixed-seed
// xorshift generator fills the tables.
struct Prng {
    state: u64,
}

impl Prng {
    fn new(seed: u64) -> Self {
        Prng { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

const ZOBRIST_SEED: u64 = 0x00DE_ADBE_EF42;

pub fn init_zobrist() {
    let mut rng = Prng::new(ZOBRIST_SEED);

    PIECE_KEYS.get_or_init(|| {
        let mut keys = [[[0u64; 2]; NUM_RANKS]; NUM_SQ];
        for sq_keys in keys.iter_mut() {
            for rk in 1..NUM_RANKS {
                for color in 0..2 {
                    sq_keys[rk][color] = rng.next_u64();
                }
            }
        }
        keys
    });
    SIDE_KEY.get_or_init(|| Prng::new(ZOBRIST_SEED ^ 0x9E37_79B9_7F4A_7C15).next_u64());
}

#[inline(always)]
pub fn piece_key(sq: usize, rank: usize, color: usize) -> u64 {
    PIECE_KEYS.get().expect("zobrist keys not initialized")[sq][rank][color]
}

#[inline(always)]
pub fn side_key() -> u64 {
    *SIDE_KEY.get().expect("zobrist keys not initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_distinct_and_stable() {
        init_zobrist();
        let a = piece_key(0, 1, 0);
        init_zobrist(); // idempotent
        assert_eq!(a, piece_key(0, 1, 0));
        assert_ne!(piece_key(0, 1, 0), piece_key(0, 1, 1));
        assert_ne!(piece_key(0, 1, 0), piece_key(1, 1, 0));
        assert_ne!(piece_key(10, 3, 1), side_key());
        assert_ne!(side_key(), 0);
    }

    #[test]
    fn rank_zero_is_unused() {
        init_zobrist();
        for sq in 0..NUM_SQ {
            assert_eq!(piece_key(sq, 0, 0), 0);
            assert_eq!(piece_key(sq, 0, 1), 0);
        }
    }
}
