//! Open-addressed transposition table, single probe slot per position.

use crate::state::Move;
use log::warn;

pub const FLAG_NONE: u8 = 0;
pub const FLAG_EXACT: u8 = 1;
pub const FLAG_ALPHA: u8 = 2; // upper bound (fail-low)
pub const FLAG_BETA: u8 = 3; // lower bound (fail-high)

pub const DEFAULT_TT_MB: usize = 64;
const FALLBACK_TT_MB: usize = 16;

#[derive(Clone, Copy)]
pub struct TTEntry {
    pub key: u64,
    pub score: i16,
    pub best_move: Move,
    pub depth: i8,
    pub flag: u8,
}

impl TTEntry {
    const EMPTY: TTEntry = TTEntry {
        key: 0,
        score: 0,
        best_move: Move::NONE,
        depth: 0,
        flag: FLAG_NONE,
    };
}

pub struct TranspositionTable {
    entries: Vec<TTEntry>,
    mask: usize,
}

impl TranspositionTable {
    pub fn new(mb: usize) -> Self {
        let mut tt = TranspositionTable {
            entries: Vec::new(),
            mask: 0,
        };
        tt.set_size(mb);
        tt
    }

    // Entry count is the largest power of two fitting the byte budget, so
    // indexing is a single mask.
    fn entry_count(mb: usize) -> usize {
        let bytes = mb.max(1) * 1024 * 1024;
        let mut count = 1;
        while count * 2 * std::mem::size_of::<TTEntry>() <= bytes {
            count *= 2;
        }
        count
    }

    fn try_alloc(count: usize) -> Option<Vec<TTEntry>> {
        let mut v = Vec::new();
        v.try_reserve_exact(count).ok()?;
        v.resize(count, TTEntry::EMPTY);
        Some(v)
    }

    /// Resize to roughly `mb` megabytes. On allocation failure the table
    /// falls back to a small default rather than aborting; returns the
    /// megabytes actually in use.
    pub fn set_size(&mut self, mb: usize) -> usize {
        let (entries, used_mb) = match Self::try_alloc(Self::entry_count(mb)) {
            Some(v) => (v, mb),
            None => {
                warn!(
                    "hash allocation of {} MB failed, falling back to {} MB",
                    mb, FALLBACK_TT_MB
                );
                let v = Self::try_alloc(Self::entry_count(FALLBACK_TT_MB))
                    .unwrap_or_else(|| vec![TTEntry::EMPTY; 1]);
                (v, FALLBACK_TT_MB)
            }
        };
        self.mask = entries.len() - 1;
        self.entries = entries;
        used_mb
    }

    pub fn clear(&mut self) {
        self.entries.fill(TTEntry::EMPTY);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline(always)]
    pub fn probe(&self, key: u64) -> Option<TTEntry> {
        let e = &self.entries[(key as usize) & self.mask];
        if e.flag != FLAG_NONE && e.key == key {
            Some(*e)
        } else {
            None
        }
    }

    /// Depth-preferred replacement: an empty slot, the same position, or a
    /// search at least as deep as the incumbent wins the slot.
    #[inline(always)]
    pub fn store(&mut self, key: u64, score: i32, best_move: Move, depth: i32, flag: u8) {
        let e = &mut self.entries[(key as usize) & self.mask];
        if e.flag == FLAG_NONE || e.key == key || e.depth as i32 <= depth {
            *e = TTEntry {
                key,
                score: score.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
                best_move,
                depth: depth as i8,
                flag,
            };
        }
    }
}
