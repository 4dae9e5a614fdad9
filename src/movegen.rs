use crate::board::{
    can_step, den_sq, tables, DEN_DARK, DEN_LIGHT, DIRS, TRAP_DARK, TRAP_LIGHT, WATER,
};
use crate::state::{split_piece, Move, Position, DARK, ELEPHANT, LIGHT, LION, RAT, TIGER};

// 16 pieces cannot exceed this many step and jump moves on a 7x9 board.
pub const MAX_MOVES: usize = 80;

#[derive(Clone, Copy)]
pub struct MoveList {
    pub moves: [Move; MAX_MOVES],
    pub count: usize,
}

impl MoveList {
    pub fn new() -> Self {
        MoveList {
            moves: [Move::NONE; MAX_MOVES],
            count: 0,
        }
    }

    #[inline(always)]
    pub fn push(&mut self, m: Move) {
        if self.count < MAX_MOVES {
            self.moves[self.count] = m;
            self.count += 1;
        }
    }

    pub fn contains(&self, m: Move) -> bool {
        self.moves[..self.count].contains(&m)
    }
}

impl Default for MoveList {
    fn default() -> Self {
        MoveList::new()
    }
}

/// Rank-aware capture legality. `from`/`to` matter because the land/water
/// boundary blocks captures in both directions.
pub fn can_capture(
    attacker_rank: usize,
    defender_rank: usize,
    attacker_color: usize,
    from: usize,
    to: usize,
) -> bool {
    let t = tables();
    let from_water = t.is_water[from];
    let to_water = t.is_water[to];

    if from_water != to_water {
        return false;
    }
    // Both in the river: only rats swim, and rats capture each other.
    if from_water {
        return true;
    }

    // A defender standing in one of the attacker's traps has no rank.
    if attacker_color == LIGHT && t.terrain[to] == TRAP_LIGHT {
        return true;
    }
    if attacker_color == DARK && t.terrain[to] == TRAP_DARK {
        return true;
    }

    if attacker_rank == RAT && defender_rank == ELEPHANT {
        return true;
    }
    if attacker_rank == ELEPHANT && defender_rank == RAT {
        return false;
    }

    attacker_rank >= defender_rank
}

pub struct MoveGenerator {
    pub list: MoveList,
}

impl MoveGenerator {
    pub fn new() -> Self {
        MoveGenerator {
            list: MoveList::new(),
        }
    }

    pub fn generate_moves(&mut self, pos: &Position) {
        self.list.count = 0;
        let color = pos.side_to_move;
        for rank in 1..=8 {
            let sq = pos.piece_sq[color][rank];
            if sq < 0 {
                continue;
            }
            let sq = sq as usize;
            self.add_step_moves(pos, sq, rank, color, false);
            if rank == LION || rank == TIGER {
                self.add_jump_moves(pos, sq, rank, color, false);
            }
        }
    }

    /// Capture moves only, plus entries into the opponent's den — both are
    /// the forcing moves quiescence needs to resolve.
    pub fn generate_captures(&mut self, pos: &Position) {
        self.list.count = 0;
        let color = pos.side_to_move;
        for rank in 1..=8 {
            let sq = pos.piece_sq[color][rank];
            if sq < 0 {
                continue;
            }
            let sq = sq as usize;
            self.add_step_moves(pos, sq, rank, color, true);
            if rank == LION || rank == TIGER {
                self.add_jump_moves(pos, sq, rank, color, true);
            }
        }
    }

    fn add_step_moves(
        &mut self,
        pos: &Position,
        sq: usize,
        rank: usize,
        color: usize,
        forcing_only: bool,
    ) {
        let t = tables();
        for dir in DIRS {
            if !can_step(sq, dir) {
                continue;
            }
            let to = (sq as i32 + dir) as usize;
            let terrain = t.terrain[to];

            if color == LIGHT && terrain == DEN_LIGHT {
                continue;
            }
            if color == DARK && terrain == DEN_DARK {
                continue;
            }
            if terrain == WATER && rank != RAT {
                continue;
            }

            let target = pos.squares[to];
            if target == 0 {
                if !forcing_only || to == den_sq(1 - color) {
                    self.list.push(Move::new(sq, to));
                }
            } else {
                let (target_rank, target_color) = split_piece(target);
                if target_color != color && can_capture(rank, target_rank, color, sq, to) {
                    self.list.push(Move::new(sq, to));
                }
            }
        }
    }

    fn add_jump_moves(
        &mut self,
        pos: &Position,
        sq: usize,
        rank: usize,
        color: usize,
        forcing_only: bool,
    ) {
        let t = tables();
        let sj = &t.jumps[sq];
        for i in 0..sj.count {
            let to = sj.dest[i];

            if color == LIGHT && t.terrain[to] == DEN_LIGHT {
                continue;
            }
            if color == DARK && t.terrain[to] == DEN_DARK {
                continue;
            }

            // Any occupant of the water strip blocks the jump.
            let start = sj.block_start[i];
            let blocked = sj.blocking[start..start + sj.block_count[i]]
                .iter()
                .any(|&b| pos.squares[b] != 0);
            if blocked {
                continue;
            }

            let target = pos.squares[to];
            if target == 0 {
                if !forcing_only || to == den_sq(1 - color) {
                    self.list.push(Move::new(sq, to));
                }
            } else {
                let (target_rank, target_color) = split_piece(target);
                if target_color != color && can_capture(rank, target_rank, color, sq, to) {
                    self.list.push(Move::new(sq, to));
                }
            }
        }
    }
}

impl Default for MoveGenerator {
    fn default() -> Self {
        MoveGenerator::new()
    }
}
