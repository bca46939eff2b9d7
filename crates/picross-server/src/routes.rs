use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use tracing::{debug, info};

use picross_core::GameProgress;
use picross_core::protocol::{
    LoginRequest, ProgressIn, ProgressOut, PuzzleIn, PuzzleOut, PuzzlePreview, PuzzleSolution,
    TokenResponse, UserIn, UserOut,
};

use crate::db::{self, PuzzleRow, UserRow};
use crate::error::ApiError;
use crate::security::{self, CurrentUser};
use crate::state::AppState;

type AppResult<T> = Result<T, ApiError>;

/// bcrypt is slow on purpose, keep it off the async workers.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

async fn hash_password(state: &AppState, password: String) -> AppResult<String> {
    let cost = state.config.auth.password_cost;
    Ok(blocking(move || security::hash_password(&password, cost)).await??)
}

fn user_out(row: UserRow) -> UserOut {
    UserOut {
        id: row.id,
        pseudo: row.pseudo,
        email: row.email,
    }
}

fn puzzle_preview(row: &PuzzleRow) -> PuzzlePreview {
    let dims = row.content.dimensions();
    PuzzlePreview {
        id: row.id,
        name: row.name.clone(),
        difficulty: row.difficulty,
        rows_count: dims.rows_count,
        cols_count: dims.cols_count,
    }
}

fn puzzle_out(row: PuzzleRow) -> PuzzleOut {
    let dims = row.content.dimensions();
    PuzzleOut {
        id: row.id,
        name: row.name,
        difficulty: row.difficulty,
        creator_id: row.creator_id,
        rows_count: dims.rows_count,
        cols_count: dims.cols_count,
        clues: row.clues,
    }
}

fn progress_out(progress: GameProgress) -> ProgressOut {
    let (current_content, is_completed) = progress.into_parts();
    ProgressOut {
        is_completed,
        current_content,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_unique_violation())
}

fn puzzle_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("No puzzle found for given id ({id})."))
}

fn ensure_creator(puzzle: &PuzzleRow, user: &CurrentUser) -> AppResult<()> {
    if puzzle.creator_id == Some(user.id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Only the puzzle's creator can do this.".into()))
    }
}

// ── Health ──────────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

// ── Auth ────────────────────────────────────────────────────────────────

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = db::get_user_by_pseudo(&state.db, &req.pseudo).await?;
    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let password = req.password;
    let verified = blocking(move || {
        stored.is_some_and(|hash| security::verify_password(&password, &hash))
    })
    .await?;
    let user = user
        .filter(|_| verified)
        .ok_or_else(|| ApiError::Unauthorized("Incorrect pseudo or password".into()))?;

    let token = security::create_access_token(user.id, &user.pseudo, &state.config.auth)?;
    let cookie = security::session_cookie(&token, &state.config.auth);

    info!(user_id = user.id, pseudo = %user.pseudo, "user logged in");

    Ok((
        [(SET_COOKIE, cookie)],
        Json(TokenResponse {
            access_token: token,
            token_type: "bearer".to_string(),
        }),
    ))
}

// ── Users ───────────────────────────────────────────────────────────────

pub async fn list_users(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<UserOut>>> {
    let users = db::list_users(&state.db).await?;
    Ok(Json(users.into_iter().map(user_out).collect()))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(input): Json<UserIn>,
) -> AppResult<impl IntoResponse> {
    let hash = hash_password(&state, input.password).await?;
    let id = db::insert_user(&state.db, &input.pseudo, &input.email, &hash)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Pseudo or email already taken.".into())
            } else {
                e.into()
            }
        })?;

    info!(user_id = id, pseudo = %input.pseudo, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(UserOut {
            id,
            pseudo: input.pseudo,
            email: input.email,
        }),
    ))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<UserOut>> {
    let user = db::get_user(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No user found for given id ({id}).")))?;
    Ok(Json(user_out(user)))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<UserIn>,
) -> AppResult<Json<UserOut>> {
    if user.id != id {
        return Err(ApiError::Forbidden("Users can only update themselves.".into()));
    }

    let hash = hash_password(&state, input.password).await?;
    let updated = db::update_user(&state.db, id, &input.pseudo, &input.email, &hash)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Pseudo or email already taken.".into())
            } else {
                e.into()
            }
        })?;
    if !updated {
        return Err(ApiError::NotFound(format!("No user found for given id ({id}).")));
    }

    Ok(Json(UserOut {
        id,
        pseudo: input.pseudo,
        email: input.email,
    }))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if user.id != id {
        return Err(ApiError::Forbidden("Users can only delete themselves.".into()));
    }
    if !db::delete_user(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("No user found for given id ({id}).")));
    }

    info!(user_id = id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_puzzles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<PuzzlePreview>>> {
    if db::get_user(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("No user found for given id ({id}).")));
    }
    let puzzles = db::list_puzzles_by_creator(&state.db, id).await?;
    Ok(Json(puzzles.iter().map(puzzle_preview).collect()))
}

// ── Puzzles ─────────────────────────────────────────────────────────────

pub async fn list_puzzles(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<PuzzlePreview>>> {
    let puzzles = db::list_puzzles(&state.db).await?;
    Ok(Json(puzzles.iter().map(puzzle_preview).collect()))
}

pub async fn create_puzzle(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(input): Json<PuzzleIn>,
) -> AppResult<impl IntoResponse> {
    let clues = input.content.clues();
    let id = db::insert_puzzle(
        &state.db,
        &input.name,
        input.difficulty,
        &input.content,
        &clues,
        user.id,
    )
    .await?;

    info!(puzzle_id = id, creator = user.id, "puzzle created");

    let row = PuzzleRow {
        id,
        name: input.name,
        difficulty: input.difficulty,
        content: input.content,
        clues,
        creator_id: Some(user.id),
    };
    Ok((StatusCode::CREATED, Json(puzzle_out(row))))
}

pub async fn get_puzzle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<PuzzleOut>> {
    let puzzle = db::get_puzzle(&state.db, id)
        .await?
        .ok_or_else(|| puzzle_not_found(id))?;
    Ok(Json(puzzle_out(puzzle)))
}

pub async fn get_solution(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<PuzzleSolution>> {
    let puzzle = db::get_puzzle(&state.db, id)
        .await?
        .ok_or_else(|| puzzle_not_found(id))?;
    ensure_creator(&puzzle, &user)?;
    Ok(Json(PuzzleSolution {
        id,
        content: puzzle.content,
    }))
}

pub async fn update_puzzle(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<PuzzleIn>,
) -> AppResult<Json<PuzzleOut>> {
    let mut tx = state.db.begin().await?;

    let existing = db::get_puzzle(&mut *tx, id)
        .await?
        .ok_or_else(|| puzzle_not_found(id))?;
    ensure_creator(&existing, &user)?;

    let clues = input.content.clues();
    db::update_puzzle(
        &mut *tx,
        id,
        &input.name,
        input.difficulty,
        &input.content,
        &clues,
    )
    .await?;
    tx.commit().await?;

    debug!(puzzle_id = id, "puzzle content replaced, clues recomputed");

    Ok(Json(puzzle_out(PuzzleRow {
        id,
        name: input.name,
        difficulty: input.difficulty,
        content: input.content,
        clues,
        creator_id: existing.creator_id,
    })))
}

pub async fn delete_puzzle(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let mut tx = state.db.begin().await?;
    let puzzle = db::get_puzzle(&mut *tx, id)
        .await?
        .ok_or_else(|| puzzle_not_found(id))?;
    ensure_creator(&puzzle, &user)?;
    db::delete_puzzle(&mut *tx, id).await?;
    tx.commit().await?;

    info!(puzzle_id = id, "puzzle deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Game progress ───────────────────────────────────────────────────────

fn no_progress(puzzle_id: i64) -> ApiError {
    ApiError::NotFound(format!(
        "Current user has no game progress for given puzzle ({puzzle_id})."
    ))
}

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(puzzle_id): Path<i64>,
) -> AppResult<Json<ProgressOut>> {
    let progress = db::get_progress(&state.db, puzzle_id, user.id)
        .await?
        .ok_or_else(|| no_progress(puzzle_id))?;
    Ok(Json(progress_out(progress)))
}

pub async fn create_progress(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(puzzle_id): Path<i64>,
    Json(input): Json<ProgressIn>,
) -> AppResult<impl IntoResponse> {
    // Goal read and progress write share one transaction so completion is
    // judged against the content that is stored when we commit.
    let mut tx = state.db.begin().await?;

    if db::get_progress(&mut *tx, puzzle_id, user.id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "Game progress already exists hence cannot be created.".into(),
        ));
    }
    let goal = db::load_goal_content(&mut *tx, puzzle_id)
        .await?
        .ok_or_else(|| puzzle_not_found(puzzle_id))?;

    let mut progress = GameProgress::default();
    let status = progress.submit(Some(&goal), input.current_content)?;
    db::insert_progress(&mut *tx, puzzle_id, user.id, &progress).await?;
    tx.commit().await?;

    info!(
        puzzle_id,
        user_id = user.id,
        pseudo = %user.pseudo,
        ?status,
        "progress created"
    );

    Ok((StatusCode::CREATED, Json(progress_out(progress))))
}

pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(puzzle_id): Path<i64>,
    Json(input): Json<ProgressIn>,
) -> AppResult<Json<ProgressOut>> {
    let mut tx = state.db.begin().await?;

    let mut progress = db::get_progress(&mut *tx, puzzle_id, user.id)
        .await?
        .ok_or_else(|| no_progress(puzzle_id))?;
    let goal = db::load_goal_content(&mut *tx, puzzle_id)
        .await?
        .ok_or_else(|| puzzle_not_found(puzzle_id))?;

    let status = progress.submit(Some(&goal), input.current_content)?;
    db::update_progress(&mut *tx, puzzle_id, user.id, &progress).await?;
    tx.commit().await?;

    info!(
        puzzle_id,
        user_id = user.id,
        pseudo = %user.pseudo,
        ?status,
        "progress updated"
    );

    Ok(Json(progress_out(progress)))
}

pub async fn delete_progress(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(puzzle_id): Path<i64>,
) -> AppResult<StatusCode> {
    if !db::delete_progress(&state.db, puzzle_id, user.id).await? {
        return Err(no_progress(puzzle_id));
    }
    Ok(StatusCode::NO_CONTENT)
}
