use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::{CellKind, Content};

/// Why a candidate grid could not be compared with its goal.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ShapeMismatch {
    #[error("goal has {goal} rows but candidate has {candidate}")]
    RowCount { goal: usize, candidate: usize },
    #[error("row {row} has {goal} cells in goal but {candidate} in candidate")]
    RowLength {
        row: usize,
        goal: usize,
        candidate: usize,
    },
    #[error("goal is a {goal} grid but candidate is {candidate}")]
    CellKind { goal: CellKind, candidate: CellKind },
}

/// Check whether `candidate` matches `goal` cell for cell.
///
/// An absent goal or candidate is never complete. Grids of a different shape
/// are an error rather than merely incomplete.
pub fn check_completion(
    goal: Option<&Content>,
    candidate: Option<&Content>,
) -> Result<bool, ShapeMismatch> {
    let (Some(goal), Some(candidate)) = (goal, candidate) else {
        return Ok(false);
    };

    if goal.row_count() != candidate.row_count() {
        return Err(ShapeMismatch::RowCount {
            goal: goal.row_count(),
            candidate: candidate.row_count(),
        });
    }

    for (row, (g, c)) in goal.rows().iter().zip(candidate.rows()).enumerate() {
        if g.len() != c.len() {
            return Err(ShapeMismatch::RowLength {
                row,
                goal: g.len(),
                candidate: c.len(),
            });
        }
    }

    // A blank grid has no kind and compares against either.
    if let (Some(g), Some(c)) = (goal.kind(), candidate.kind()) {
        if g != c {
            return Err(ShapeMismatch::CellKind {
                goal: g,
                candidate: c,
            });
        }
    }

    Ok(goal.cells().eq(candidate.cells()))
}
