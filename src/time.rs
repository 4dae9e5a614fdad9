use crate::state::LIGHT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeControl {
    Infinite,
    MoveTime(u64),
    GameTime { wtime: u64, btime: u64 },
}

impl TimeControl {
    /// Budget for the upcoming move in milliseconds; `None` means think
    /// until told to stop. With only clock times given we spend about a
    /// thirtieth of what is left, never less than 100 ms.
    pub fn allocation_ms(self, side: usize) -> Option<u64> {
        match self {
            TimeControl::Infinite => None,
            TimeControl::MoveTime(ms) => Some(ms.max(1)),
            TimeControl::GameTime { wtime, btime } => {
                let remaining = if side == LIGHT { wtime } else { btime };
                Some((remaining / 30).max(100))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DARK;

    #[test]
    fn movetime_passes_through() {
        assert_eq!(TimeControl::MoveTime(2500).allocation_ms(LIGHT), Some(2500));
        assert_eq!(TimeControl::MoveTime(0).allocation_ms(LIGHT), Some(1));
    }

    #[test]
    fn game_time_takes_a_slice() {
        let tc = TimeControl::GameTime {
            wtime: 60_000,
            btime: 3_000,
        };
        assert_eq!(tc.allocation_ms(LIGHT), Some(2000));
        assert_eq!(tc.allocation_ms(DARK), Some(100)); // floor kicks in
    }

    #[test]
    fn infinite_has_no_budget() {
        assert_eq!(TimeControl::Infinite.allocation_ms(LIGHT), None);
    }
}
