use thiserror::Error;

/// Errors surfaced at the protocol boundary. The command loop reports or
/// ignores these; the search core never produces them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown piece character '{0}'")]
    BadPieceChar(char),
    #[error("malformed board field in fen '{0}'")]
    BadBoard(String),
    #[error("duplicate piece '{0}' in fen")]
    DuplicatePiece(char),
    #[error("missing or invalid side-to-move field")]
    BadSideToMove,
    #[error("malformed square '{0}'")]
    BadSquare(String),
    #[error("malformed move '{0}'")]
    BadMove(String),
    #[error("illegal move '{0}'")]
    IllegalMove(String),
}
