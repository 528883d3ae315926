//! Battle resolution - positional comparison of two move sequences

use serde::{Deserialize, Serialize};

use super::attack::{Attack, Dominance};

/// Who took the battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The first sequence won more rounds
    A,
    /// The second sequence won more rounds
    B,
    Tie,
}

/// Outcome of a resolved battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    pub wins_a: u32,
    pub wins_b: u32,
    pub verdict: Verdict,
}

impl BattleResult {
    /// The same result seen from the other side
    pub fn flipped(self) -> Self {
        let verdict = match self.verdict {
            Verdict::A => Verdict::B,
            Verdict::B => Verdict::A,
            Verdict::Tie => Verdict::Tie,
        };
        Self {
            wins_a: self.wins_b,
            wins_b: self.wins_a,
            verdict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Move sequences differ in length ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
}

/// Resolve a battle round by round.
///
/// The i-th move of `moves_a` meets the i-th move of `moves_b`; moves are
/// never reordered or matched by kind.
pub fn resolve_battle(moves_a: &[Attack], moves_b: &[Attack]) -> Result<BattleResult, ResolveError> {
    if moves_a.len() != moves_b.len() {
        return Err(ResolveError::LengthMismatch {
            left: moves_a.len(),
            right: moves_b.len(),
        });
    }

    let (wins_a, wins_b) = moves_a
        .iter()
        .zip(moves_b)
        .fold((0, 0), |(a, b), (mine, theirs)| match mine.against(*theirs) {
            Dominance::Wins => (a + 1, b),
            Dominance::Loses => (a, b + 1),
            Dominance::Ties => (a, b),
        });

    let verdict = if wins_a > wins_b {
        Verdict::A
    } else if wins_b > wins_a {
        Verdict::B
    } else {
        Verdict::Tie
    };

    Ok(BattleResult {
        wins_a,
        wins_b,
        verdict,
    })
}
