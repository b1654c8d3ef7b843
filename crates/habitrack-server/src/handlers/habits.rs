use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::handlers::check_name;
use crate::obs::DbOp;
use crate::store::queries::{self, Habit};

#[derive(Debug, Deserialize)]
pub struct CreateHabit {
    pub name: String,
    pub owner_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct MarkHabit {
    pub mark_habit: bool,
}

#[derive(Debug, Deserialize)]
pub struct RenameHabit {
    pub new_name: String,
}

pub async fn get(
    State(state): State<AppState>,
    Path(habit_id): Path<i64>,
) -> Result<Json<Habit>, ApiError> {
    let habit = state
        .store()
        .call(DbOp::Read, move |c| queries::get_habit(c, habit_id))
        .await?;
    Ok(Json(habit))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateHabit>,
) -> Result<(StatusCode, Json<Habit>), ApiError> {
    check_name("name", &body.name)?;

    let habit = state
        .store()
        .call(DbOp::Write, move |c| queries::create_habit(c, body.name.trim(), body.owner_id))
        .await?;
    Ok((StatusCode::CREATED, Json(habit)))
}

/// `{"mark_habit": true}` bumps the streak; `false` just returns the habit.
pub async fn mark(
    State(state): State<AppState>,
    Path(habit_id): Path<i64>,
    Json(body): Json<MarkHabit>,
) -> Result<Json<Habit>, ApiError> {
    let habit = if body.mark_habit {
        state
            .store()
            .call(DbOp::Write, move |c| queries::mark_habit(c, habit_id))
            .await?
    } else {
        state
            .store()
            .call(DbOp::Read, move |c| queries::get_habit(c, habit_id))
            .await?
    };
    Ok(Json(habit))
}

pub async fn rename(
    State(state): State<AppState>,
    Path(habit_id): Path<i64>,
    Json(body): Json<RenameHabit>,
) -> Result<Json<Value>, ApiError> {
    check_name("new_name", &body.new_name)?;

    let (old_name, habit) = state
        .store()
        .call(DbOp::Write, move |c| queries::rename_habit(c, habit_id, body.new_name.trim()))
        .await?;
    Ok(Json(json!({ "old_name": old_name, "habit": habit })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(habit_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let habit = state
        .store()
        .call(DbOp::Write, move |c| queries::delete_habit(c, habit_id))
        .await?;
    Ok(Json(json!({ "habit": habit, "message": "deleted" })))
}
