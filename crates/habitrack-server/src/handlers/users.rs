use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::handlers::{check_email, check_name};
use crate::obs::DbOp;
use crate::store::queries::{self, User};

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.store().call(DbOp::Read, queries::list_users).await?;
    Ok(Json(users))
}

pub async fn get(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .store()
        .call(DbOp::Read, move |c| queries::get_user(c, user_id))
        .await?;
    Ok(Json(user))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    check_name("name", &body.name)?;
    check_email(&body.email)?;

    let user = state
        .store()
        .call(DbOp::Write, move |c| queries::create_user(c, body.name.trim(), &body.email))
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}
