use serde::{Deserialize, Serialize};

use crate::clue::Clues;
use crate::completion::ShapeMismatch;
use crate::content::Content;

/// Puzzle as submitted by its author (create and update).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleIn {
    pub name: String,
    /// Author supplied rating, stored as given.
    pub difficulty: i32,
    pub content: Content,
}

/// Puzzle as served to solvers: clues and shape, never the solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleOut {
    pub id: i64,
    pub name: String,
    pub difficulty: i32,
    pub creator_id: Option<i64>,
    pub rows_count: usize,
    pub cols_count: usize,
    pub clues: Clues,
}

/// The solution grid, only returned to the puzzle's creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleSolution {
    pub id: i64,
    pub content: Content,
}

/// Listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzlePreview {
    pub id: i64,
    pub name: String,
    pub difficulty: i32,
    pub rows_count: usize,
    pub cols_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressIn {
    #[serde(default)]
    pub current_content: Option<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressOut {
    pub is_completed: bool,
    pub current_content: Option<Content>,
}

/// Registration and account update payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIn {
    pub pseudo: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOut {
    pub id: i64,
    pub pseudo: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub pseudo: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<ShapeMismatch>,
}
