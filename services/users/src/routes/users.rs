//! User resource handlers

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::WithRejection;
use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{ApiResponse, DeletedUser, ListQuery, ListSpec, Pagination, UserPayload},
    state::AppState,
    validation,
};

/// Window for the "recent users" statistic
const RECENT_DAYS: i64 = 30;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_users).post(create_user).fallback(super::not_found),
        )
        .route(
            "/estadisticas/resumen",
            get(user_stats).fallback(super::not_found),
        )
        .route(
            "/:id",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .fallback(super::not_found),
        )
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId)
}

/// List users, optionally paginated, sorted and filtered
///
/// Without `page` and `limit` the body is a bare array, which is what the
/// browser form expects.
pub async fn list_users(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> ApiResult<Response> {
    let spec = ListSpec::from_query(&query);
    let (users, total) = state.users.list(&spec).await?;

    if !spec.paginated {
        return Ok(Json(users).into_response());
    }

    let pagination = Pagination::new(&spec, total);
    Ok(Json(ApiResponse::paginated(users, pagination)).into_response())
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;

    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(ApiResponse::ok(user)))
}

/// Create a new user
pub async fn create_user(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<UserPayload>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let new_user = validation::validate_new_user(&payload).map_err(ApiError::Validation)?;

    if state
        .users
        .find_by_email(&new_user.email, None)
        .await?
        .is_some()
    {
        return Err(ApiError::duplicate_email());
    }

    let user = state.users.create(&new_user).await?;
    info!("User {} registered", user.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Usuario creado exitosamente", user)),
    ))
}

/// Partially update a user; absent fields are left untouched
pub async fn update_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<UserPayload>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;

    // Every successful update moves fechaActualizacion forward.
    let changes =
        validation::validate_changes(&payload, Utc::now()).map_err(ApiError::Validation)?;

    if let Some(email) = &changes.email {
        if state.users.find_by_email(email, Some(id)).await?.is_some() {
            return Err(ApiError::Duplicate {
                field: "email",
                message: "Ya existe otro usuario con este correo electrónico".to_string(),
            });
        }
    }

    let user = state
        .users
        .update(id, &changes)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(ApiResponse::with_message(
        "Usuario actualizado exitosamente",
        user,
    )))
}

/// Delete a user
pub async fn delete_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;

    let user = state.users.delete(id).await?.ok_or(ApiError::NotFound)?;

    Ok(Json(ApiResponse::with_message(
        "Usuario eliminado exitosamente",
        DeletedUser::from(user),
    )))
}

/// Aggregate statistics over all users
pub async fn user_stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let recent_since = Utc::now() - Duration::days(RECENT_DAYS);
    let stats = state.users.stats(recent_since).await?;

    Ok(Json(ApiResponse::ok(stats)))
}
