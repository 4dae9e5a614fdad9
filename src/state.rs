use crate::board::{self, den_sq, make_sq, NUM_SQ};
use crate::errors::ParseError;
use crate::movegen::MoveGenerator;
use crate::zobrist;
use std::fmt;

// --- Colours ---
pub const LIGHT: usize = 0;
pub const DARK: usize = 1;

// --- Piece ranks (1-8, 0 = none) ---
pub const RAT: usize = 1;
pub const CAT: usize = 2;
pub const DOG: usize = 3;
pub const WOLF: usize = 4;
pub const LEOPARD: usize = 5;
pub const TIGER: usize = 6;
pub const LION: usize = 7;
pub const ELEPHANT: usize = 8;
pub const NUM_RANKS: usize = 9; // index 0 unused

// Centipawn values indexed by rank. The rat outranks the mid-table animals
// because it threatens the elephant and owns the river.
pub const MATERIAL: [i32; NUM_RANKS] = [0, 400, 250, 300, 450, 650, 950, 1050, 1000];

const RANK_CHARS: [char; NUM_RANKS] = [' ', 'R', 'C', 'D', 'W', 'P', 'T', 'L', 'E'];

pub fn char_to_rank(ch: char) -> Option<usize> {
    RANK_CHARS[1..]
        .iter()
        .position(|&c| c == ch.to_ascii_uppercase())
        .map(|i| i + 1)
}

pub fn piece_char(rank: usize, color: usize) -> char {
    let c = RANK_CHARS[rank];
    if color == DARK {
        c.to_ascii_lowercase()
    } else {
        c
    }
}

// --- Move encoding: from in bits 0-5, to in bits 6-11 ---
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Move(pub u16);

impl Move {
    pub const NONE: Move = Move(0xFFFF);

    #[inline(always)]
    pub fn new(from: usize, to: usize) -> Move {
        Move((from | (to << 6)) as u16)
    }

    #[inline(always)]
    pub fn from(self) -> usize {
        (self.0 & 0x3F) as usize
    }

    #[inline(always)]
    pub fn to(self) -> usize {
        ((self.0 >> 6) & 0x3F) as usize
    }

    #[inline(always)]
    pub fn is_none(self) -> bool {
        self == Move::NONE
    }

    pub fn from_coord(s: &str) -> Result<Move, ParseError> {
        if s.len() < 4 {
            return Err(ParseError::BadMove(s.to_string()));
        }
        let from = board::coord_to_sq(&s[0..2])
            .ok_or_else(|| ParseError::BadSquare(s[0..2].to_string()))?;
        let to = board::coord_to_sq(&s[2..4])
            .ok_or_else(|| ParseError::BadSquare(s[2..4].to_string()))?;
        Ok(Move::new(from, to))
    }
}

impl Default for Move {
    fn default() -> Self {
        Move::NONE
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "0000")
        } else {
            write!(
                f,
                "{}{}",
                board::sq_to_coord(self.from()),
                board::sq_to_coord(self.to())
            )
        }
    }
}

/// Game state seen from the side to move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameStatus {
    Ongoing,
    /// The opponent has no pieces left.
    Win,
    /// An enemy piece sits in our den, or we have no pieces left.
    Loss,
}

#[derive(Clone, Copy, Default)]
struct Undo {
    mv: Move,
    captured: i8,
    hash: u64,
    halfmove: u32,
}

// Search ply cap plus a long game's worth of history.
pub const MAX_GAME_LEN: usize = 2048;

/// Mutable position. Squares hold 0 for empty, +rank for Light, -rank for
/// Dark; a per-side piece list mirrors the board for O(1) piece lookup.
#[derive(Clone)]
pub struct Position {
    pub squares: [i8; NUM_SQ],
    pub piece_sq: [[i8; NUM_RANKS]; 2], // square index, -1 when captured
    pub piece_count: [u8; 2],
    pub side_to_move: usize,
    pub halfmove: u32,
    pub hash: u64,
    ply: usize,
    undo_stack: [Undo; MAX_GAME_LEN],
    pos_history: [u64; MAX_GAME_LEN],
    hist_len: usize,
}

impl Position {
    pub fn new() -> Self {
        let mut pos = Position::empty();
        pos.set_start();
        pos
    }

    fn empty() -> Self {
        Position {
            squares: [0; NUM_SQ],
            piece_sq: [[-1; NUM_RANKS]; 2],
            piece_count: [0; 2],
            side_to_move: LIGHT,
            halfmove: 0,
            hash: 0,
            ply: 0,
            undo_stack: [Undo::default(); MAX_GAME_LEN],
            pos_history: [0; MAX_GAME_LEN],
            hist_len: 0,
        }
    }

    fn clear(&mut self) {
        self.squares = [0; NUM_SQ];
        self.piece_sq = [[-1; NUM_RANKS]; 2];
        self.piece_count = [0; 2];
        self.side_to_move = LIGHT;
        self.halfmove = 0;
        self.ply = 0;
        self.hist_len = 0;
    }

    fn place(&mut self, color: usize, rank: usize, sq: usize) {
        self.squares[sq] = if color == LIGHT { rank as i8 } else { -(rank as i8) };
        self.piece_sq[color][rank] = sq as i8;
        self.piece_count[color] += 1;
    }

    pub fn set_start(&mut self) {
        self.clear();

        self.place(LIGHT, TIGER, make_sq(0, 0));
        self.place(LIGHT, LION, make_sq(0, 6));
        self.place(LIGHT, CAT, make_sq(1, 1));
        self.place(LIGHT, DOG, make_sq(1, 5));
        self.place(LIGHT, ELEPHANT, make_sq(2, 0));
        self.place(LIGHT, WOLF, make_sq(2, 2));
        self.place(LIGHT, LEOPARD, make_sq(2, 4));
        self.place(LIGHT, RAT, make_sq(2, 6));

        // Dark mirrors by point reflection.
        self.place(DARK, TIGER, make_sq(8, 6));
        self.place(DARK, LION, make_sq(8, 0));
        self.place(DARK, CAT, make_sq(7, 5));
        self.place(DARK, DOG, make_sq(7, 1));
        self.place(DARK, ELEPHANT, make_sq(6, 6));
        self.place(DARK, WOLF, make_sq(6, 4));
        self.place(DARK, LEOPARD, make_sq(6, 2));
        self.place(DARK, RAT, make_sq(6, 0));

        self.compute_hash();
        self.pos_history[0] = self.hash;
        self.hist_len = 1;
    }

    // Nine '/'-separated ranks from rank 9 down, then 'w' or 'b'; optional
    // halfmove and fullmove fields are accepted after that. A malformed
    // string leaves the current position untouched.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), ParseError> {
        *self = Position::from_fen(fen)?;
        Ok(())
    }

    pub fn from_fen(fen: &str) -> Result<Position, ParseError> {
        let mut parts = fen.split_whitespace();
        let field = parts
            .next()
            .ok_or_else(|| ParseError::BadBoard(fen.to_string()))?;

        let ranks: Vec<&str> = field.split('/').collect();
        if ranks.len() != board::BOARD_H {
            return Err(ParseError::BadBoard(field.to_string()));
        }

        let mut pos = Position::empty();
        for (i, rank_str) in ranks.iter().enumerate() {
            let row = board::BOARD_H - 1 - i;
            let mut col = 0;
            for ch in rank_str.chars() {
                if ('1'..='7').contains(&ch) {
                    col += ch as usize - '0' as usize;
                } else {
                    let rank = char_to_rank(ch).ok_or(ParseError::BadPieceChar(ch))?;
                    let color = if ch.is_ascii_uppercase() { LIGHT } else { DARK };
                    if col >= board::BOARD_W {
                        return Err(ParseError::BadBoard(field.to_string()));
                    }
                    if pos.piece_sq[color][rank] >= 0 {
                        return Err(ParseError::DuplicatePiece(ch));
                    }
                    pos.place(color, rank, make_sq(row, col));
                    col += 1;
                }
            }
            if col > board::BOARD_W {
                return Err(ParseError::BadBoard(field.to_string()));
            }
        }

        pos.side_to_move = match parts.next() {
            Some("w") => LIGHT,
            Some("b") => DARK,
            _ => return Err(ParseError::BadSideToMove),
        };

        if let Some(hm) = parts.next() {
            if let Ok(n) = hm.parse::<u32>() {
                pos.halfmove = n;
            }
        }
        // A fullmove number, if present, carries no state we track.

        pos.compute_hash();
        pos.pos_history[0] = pos.hash;
        pos.hist_len = 1;
        Ok(pos)
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for row in (0..board::BOARD_H).rev() {
            let mut empty = 0;
            for col in 0..board::BOARD_W {
                let pc = self.squares[make_sq(row, col)];
                if pc == 0 {
                    empty += 1;
                    continue;
                }
                if empty > 0 {
                    fen.push((b'0' + empty) as char);
                    empty = 0;
                }
                let (rank, color) = split_piece(pc);
                fen.push(piece_char(rank, color));
            }
            if empty > 0 {
                fen.push((b'0' + empty) as char);
            }
            if row > 0 {
                fen.push('/');
            }
        }
        fen.push(' ');
        fen.push(if self.side_to_move == LIGHT { 'w' } else { 'b' });
        fen
    }

    pub fn compute_hash(&mut self) {
        let mut hash = 0;
        for sq in 0..NUM_SQ {
            let pc = self.squares[sq];
            if pc != 0 {
                let (rank, color) = split_piece(pc);
                hash ^= zobrist::piece_key(sq, rank, color);
            }
        }
        if self.side_to_move == DARK {
            hash ^= zobrist::side_key();
        }
        self.hash = hash;
    }

    pub fn make_move(&mut self, m: Move) {
        let from = m.from();
        let to = m.to();
        let piece = self.squares[from];
        let (rank, color) = split_piece(piece);

        self.undo_stack[self.ply] = Undo {
            mv: m,
            captured: self.squares[to],
            hash: self.hash,
            halfmove: self.halfmove,
        };

        let captured = self.squares[to];
        if captured != 0 {
            let (crank, ccolor) = split_piece(captured);
            self.piece_sq[ccolor][crank] = -1;
            self.piece_count[ccolor] -= 1;
            self.hash ^= zobrist::piece_key(to, crank, ccolor);
            self.halfmove = 0;
        } else {
            self.halfmove += 1;
        }

        self.hash ^= zobrist::piece_key(from, rank, color);
        self.hash ^= zobrist::piece_key(to, rank, color);
        self.squares[to] = piece;
        self.squares[from] = 0;
        self.piece_sq[color][rank] = to as i8;

        self.side_to_move = 1 - self.side_to_move;
        self.hash ^= zobrist::side_key();
        self.ply += 1;
        self.pos_history[self.hist_len] = self.hash;
        self.hist_len += 1;
    }

    pub fn unmake_move(&mut self) {
        self.ply -= 1;
        self.hist_len -= 1;

        let u = self.undo_stack[self.ply];
        let from = u.mv.from();
        let to = u.mv.to();

        self.side_to_move = 1 - self.side_to_move;
        self.hash = u.hash;
        self.halfmove = u.halfmove;

        let piece = self.squares[to];
        let (rank, color) = split_piece(piece);
        self.squares[from] = piece;
        self.squares[to] = u.captured;
        self.piece_sq[color][rank] = from as i8;

        if u.captured != 0 {
            let (crank, ccolor) = split_piece(u.captured);
            self.piece_sq[ccolor][crank] = to as i8;
            self.piece_count[ccolor] += 1;
        }
    }

    pub fn make_null_move(&mut self) {
        self.undo_stack[self.ply] = Undo {
            mv: Move::NONE,
            captured: 0,
            hash: self.hash,
            halfmove: self.halfmove,
        };
        self.side_to_move = 1 - self.side_to_move;
        self.hash ^= zobrist::side_key();
        self.ply += 1;
        self.pos_history[self.hist_len] = self.hash;
        self.hist_len += 1;
    }

    pub fn unmake_null_move(&mut self) {
        self.ply -= 1;
        self.hist_len -= 1;
        let u = self.undo_stack[self.ply];
        self.side_to_move = 1 - self.side_to_move;
        self.hash = u.hash;
        self.halfmove = u.halfmove;
    }

    /// Parse a coordinate move, check it against the legal move list, and
    /// play it. Anything malformed or illegal leaves the position untouched.
    pub fn make_coord_move(&mut self, s: &str) -> Result<Move, ParseError> {
        let m = Move::from_coord(s)?;
        let mut gen = MoveGenerator::new();
        gen.generate_moves(self);
        if !gen.list.contains(m) {
            return Err(ParseError::IllegalMove(s.to_string()));
        }
        self.make_move(m);
        Ok(m)
    }

    /// Threefold: the current hash has already appeared at least twice among
    /// earlier positions with the same side to move.
    pub fn is_repetition(&self) -> bool {
        if self.hist_len < 5 {
            return false;
        }
        let mut count = 0;
        let mut i = self.hist_len as i32 - 3;
        while i >= 0 {
            if self.pos_history[i as usize] == self.hash {
                count += 1;
                if count >= 2 {
                    return true;
                }
            }
            i -= 2;
        }
        false
    }

    pub fn game_status(&self) -> GameStatus {
        let stm = self.side_to_move;
        let opp = 1 - stm;

        // Did the opponent's last move land in our den?
        let pc = self.squares[den_sq(stm)];
        if pc != 0 && split_piece(pc).1 == opp {
            return GameStatus::Loss;
        }
        if self.piece_count[stm] == 0 {
            return GameStatus::Loss;
        }
        if self.piece_count[opp] == 0 {
            return GameStatus::Win;
        }
        GameStatus::Ongoing
    }

    #[inline(always)]
    pub fn history_len(&self) -> usize {
        self.hist_len
    }

    #[inline(always)]
    pub fn search_ply(&self) -> usize {
        self.ply
    }

    pub fn display(&self) -> String {
        let t = board::tables();
        let mut out = String::new();
        for row in (0..board::BOARD_H).rev() {
            out.push_str(&format!("  {} ", row + 1));
            for col in 0..board::BOARD_W {
                let sq = make_sq(row, col);
                let ch = if self.squares[sq] != 0 {
                    let (rank, color) = split_piece(self.squares[sq]);
                    piece_char(rank, color)
                } else {
                    match t.terrain[sq] {
                        board::WATER => '~',
                        board::TRAP_LIGHT => '^',
                        board::TRAP_DARK => 'v',
                        board::DEN_LIGHT => '*',
                        board::DEN_DARK => '#',
                        _ => '.',
                    }
                };
                out.push(' ');
                out.push(ch);
            }
            out.push('\n');
        }
        out.push_str("    ");
        for col in 0..board::BOARD_W {
            out.push(' ');
            out.push((b'a' + col as u8) as char);
        }
        out.push_str(&format!(
            "\n\n  {} to move\n  FEN: {}\n",
            if self.side_to_move == LIGHT { "Light" } else { "Dark" },
            self.to_fen()
        ));
        out
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}

#[inline(always)]
pub fn split_piece(pc: i8) -> (usize, usize) {
    debug_assert!(pc != 0);
    if pc > 0 {
        (pc as usize, LIGHT)
    } else {
        ((-pc) as usize, DARK)
    }
}

/// Index into a Light-oriented table: Dark sees the board point-reflected.
#[inline(always)]
pub fn oriented_sq(sq: usize, color: usize) -> usize {
    if color == LIGHT {
        sq
    } else {
        NUM_SQ - 1 - sq
    }
}
