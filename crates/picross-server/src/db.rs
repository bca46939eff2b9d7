use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{Row, SqliteExecutor, SqlitePool};

use picross_core::{Clues, Content, GameProgress};

/// Create all tables if they don't exist.
pub async fn init_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            pseudo TEXT UNIQUE NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // Clues are derived from content and always written in the same statement.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS puzzles (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            difficulty INTEGER NOT NULL DEFAULT 0,
            content TEXT NOT NULL,
            clues TEXT NOT NULL,
            creator_id INTEGER,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (creator_id) REFERENCES users(id) ON DELETE SET NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_puzzles_name ON puzzles(name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_puzzles_difficulty ON puzzles(difficulty)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS game_progress (
            puzzle_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            current_content TEXT,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (puzzle_id, user_id),
            FOREIGN KEY (puzzle_id) REFERENCES puzzles(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub pseudo: String,
    pub email: String,
    pub password_hash: String,
}

fn user_from_row(r: &SqliteRow) -> Result<UserRow, sqlx::Error> {
    Ok(UserRow {
        id: r.try_get("id")?,
        pseudo: r.try_get("pseudo")?,
        email: r.try_get("email")?,
        password_hash: r.try_get("password_hash")?,
    })
}

/// Insert a new user. Returns the local user id.
pub async fn insert_user(
    ex: impl SqliteExecutor<'_>,
    pseudo: &str,
    email: &str,
    password_hash: &str,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        "INSERT INTO users (pseudo, email, password_hash)
         VALUES (?1, ?2, ?3)
         RETURNING id",
    )
    .bind(pseudo)
    .bind(email)
    .bind(password_hash)
    .fetch_one(ex)
    .await?;

    row.try_get("id")
}

pub async fn get_user(
    ex: impl SqliteExecutor<'_>,
    id: i64,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query("SELECT id, pseudo, email, password_hash FROM users WHERE id = ?1")
        .bind(id)
        .fetch_optional(ex)
        .await?
        .as_ref()
        .map(user_from_row)
        .transpose()
}

pub async fn get_user_by_pseudo(
    ex: impl SqliteExecutor<'_>,
    pseudo: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query("SELECT id, pseudo, email, password_hash FROM users WHERE pseudo = ?1")
        .bind(pseudo)
        .fetch_optional(ex)
        .await?
        .as_ref()
        .map(user_from_row)
        .transpose()
}

pub async fn list_users(ex: impl SqliteExecutor<'_>) -> Result<Vec<UserRow>, sqlx::Error> {
    sqlx::query("SELECT id, pseudo, email, password_hash FROM users ORDER BY id")
        .fetch_all(ex)
        .await?
        .iter()
        .map(user_from_row)
        .collect()
}

/// Overwrite every user field. Returns false when no such user exists.
pub async fn update_user(
    ex: impl SqliteExecutor<'_>,
    id: i64,
    pseudo: &str,
    email: &str,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET pseudo = ?1, email = ?2, password_hash = ?3 WHERE id = ?4",
    )
    .bind(pseudo)
    .bind(email)
    .bind(password_hash)
    .bind(id)
    .execute(ex)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_user(ex: impl SqliteExecutor<'_>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?1")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone)]
pub struct PuzzleRow {
    pub id: i64,
    pub name: String,
    pub difficulty: i32,
    pub content: Content,
    pub clues: Clues,
    pub creator_id: Option<i64>,
}

fn puzzle_from_row(r: &SqliteRow) -> Result<PuzzleRow, sqlx::Error> {
    Ok(PuzzleRow {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        difficulty: r.try_get("difficulty")?,
        content: r.try_get::<Json<Content>, _>("content")?.0,
        clues: r.try_get::<Json<Clues>, _>("clues")?.0,
        creator_id: r.try_get("creator_id")?,
    })
}

const PUZZLE_COLUMNS: &str = "id, name, difficulty, content, clues, creator_id";

/// Store a new puzzle with the clues derived from its content.
pub async fn insert_puzzle(
    ex: impl SqliteExecutor<'_>,
    name: &str,
    difficulty: i32,
    content: &Content,
    clues: &Clues,
    creator_id: i64,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        "INSERT INTO puzzles (name, difficulty, content, clues, creator_id)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING id",
    )
    .bind(name)
    .bind(difficulty)
    .bind(Json(content))
    .bind(Json(clues))
    .bind(creator_id)
    .fetch_one(ex)
    .await?;

    row.try_get("id")
}

pub async fn get_puzzle(
    ex: impl SqliteExecutor<'_>,
    id: i64,
) -> Result<Option<PuzzleRow>, sqlx::Error> {
    sqlx::query(&format!("SELECT {PUZZLE_COLUMNS} FROM puzzles WHERE id = ?1"))
        .bind(id)
        .fetch_optional(ex)
        .await?
        .as_ref()
        .map(puzzle_from_row)
        .transpose()
}

pub async fn list_puzzles(ex: impl SqliteExecutor<'_>) -> Result<Vec<PuzzleRow>, sqlx::Error> {
    sqlx::query(&format!("SELECT {PUZZLE_COLUMNS} FROM puzzles ORDER BY id"))
        .fetch_all(ex)
        .await?
        .iter()
        .map(puzzle_from_row)
        .collect()
}

pub async fn list_puzzles_by_creator(
    ex: impl SqliteExecutor<'_>,
    creator_id: i64,
) -> Result<Vec<PuzzleRow>, sqlx::Error> {
    sqlx::query(&format!(
        "SELECT {PUZZLE_COLUMNS} FROM puzzles WHERE creator_id = ?1 ORDER BY id"
    ))
    .bind(creator_id)
    .fetch_all(ex)
    .await?
    .iter()
    .map(puzzle_from_row)
    .collect()
}

/// Replace a puzzle's authored fields together with its clues.
pub async fn update_puzzle(
    ex: impl SqliteExecutor<'_>,
    id: i64,
    name: &str,
    difficulty: i32,
    content: &Content,
    clues: &Clues,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE puzzles SET name = ?1, difficulty = ?2, content = ?3, clues = ?4 WHERE id = ?5",
    )
    .bind(name)
    .bind(difficulty)
    .bind(Json(content))
    .bind(Json(clues))
    .bind(id)
    .execute(ex)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_puzzle(ex: impl SqliteExecutor<'_>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM puzzles WHERE id = ?1")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// The solution grid of a puzzle, `None` if the puzzle does not exist.
pub async fn load_goal_content(
    ex: impl SqliteExecutor<'_>,
    puzzle_id: i64,
) -> Result<Option<Content>, sqlx::Error> {
    let row = sqlx::query("SELECT content FROM puzzles WHERE id = ?1")
        .bind(puzzle_id)
        .fetch_optional(ex)
        .await?;

    row.map(|r| r.try_get::<Json<Content>, _>("content").map(|j| j.0))
        .transpose()
}

pub async fn get_progress(
    ex: impl SqliteExecutor<'_>,
    puzzle_id: i64,
    user_id: i64,
) -> Result<Option<GameProgress>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT current_content, is_completed FROM game_progress
         WHERE puzzle_id = ?1 AND user_id = ?2",
    )
    .bind(puzzle_id)
    .bind(user_id)
    .fetch_optional(ex)
    .await?;

    row.map(|r| -> Result<GameProgress, sqlx::Error> {
        let content = r
            .try_get::<Option<Json<Content>>, _>("current_content")?
            .map(|j| j.0);
        Ok(GameProgress::restore(content, r.try_get("is_completed")?))
    })
    .transpose()
}

pub async fn insert_progress(
    ex: impl SqliteExecutor<'_>,
    puzzle_id: i64,
    user_id: i64,
    progress: &GameProgress,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO game_progress (puzzle_id, user_id, current_content, is_completed)
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(puzzle_id)
    .bind(user_id)
    .bind(progress.current_content().map(Json))
    .bind(progress.is_completed())
    .execute(ex)
    .await?;

    Ok(())
}

pub async fn update_progress(
    ex: impl SqliteExecutor<'_>,
    puzzle_id: i64,
    user_id: i64,
    progress: &GameProgress,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE game_progress
         SET current_content = ?1, is_completed = ?2, updated_at = CURRENT_TIMESTAMP
         WHERE puzzle_id = ?3 AND user_id = ?4",
    )
    .bind(progress.current_content().map(Json))
    .bind(progress.is_completed())
    .bind(puzzle_id)
    .bind(user_id)
    .execute(ex)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_progress(
    ex: impl SqliteExecutor<'_>,
    puzzle_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM game_progress WHERE puzzle_id = ?1 AND user_id = ?2")
        .bind(puzzle_id)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}
