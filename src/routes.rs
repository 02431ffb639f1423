use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use tower_http::{
    LatencyUnit,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::database::{
    Database, FriendAdded, FriendPayload, FriendsPayload, Message, User, UserPayload,
};
use crate::err::{ServerError, StorageContext};
use crate::extract::{ValidJson, ValidPath};

#[derive(Clone)]
pub struct AppState {
    db: Arc<dyn Database>,
}

/// Builds the full API router on top of `db`.
pub fn app(db: Arc<dyn Database>) -> Router {
    let state = AppState { db };
    Router::new()
        .route("/", get(root))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route(
            "/users/{id}/friends",
            get(list_friends).post(add_friend).put(replace_friends),
        )
        .route("/users/{id}/friends/{friend_id}", delete(remove_friend))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Micros),
                )
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
}

async fn root() -> &'static str {
    "Welcome to the REST API server for User entity!"
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ServerError> {
    let users = state
        .db
        .list_users()
        .await
        .context("Error retrieving users")?;
    Ok(Json(users))
}

async fn create_user(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<UserPayload>,
) -> Result<(StatusCode, Json<User>), ServerError> {
    let new_user = payload.validate()?;
    let user = state
        .db
        .create_user(new_user)
        .await
        .context("Error adding user")?;
    tracing::info!(id = user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<User>, ServerError> {
    let user = state
        .db
        .get_user(id)
        .await
        .context("Error retrieving user")?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(payload): ValidJson<UserPayload>,
) -> Result<Json<User>, ServerError> {
    let new_user = payload.validate()?;
    let user = state
        .db
        .update_user(id, new_user)
        .await
        .context("Error updating user")?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, ServerError> {
    state
        .db
        .delete_user(id)
        .await
        .context("Error deleting user")?;
    tracing::info!(id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn add_friend(
    State(state): State<AppState>,
    ValidPath(user_id): ValidPath<i64>,
    ValidJson(payload): ValidJson<FriendPayload>,
) -> Result<(StatusCode, Json<FriendAdded>), ServerError> {
    let friend_id = payload.validate(user_id)?;
    let friendship_id = state
        .db
        .add_friend(user_id, friend_id)
        .await
        .context("Error adding friend")?;
    Ok((
        StatusCode::CREATED,
        Json(FriendAdded {
            message: "Friend added successfully",
            friendship_id,
        }),
    ))
}

async fn list_friends(
    State(state): State<AppState>,
    ValidPath(user_id): ValidPath<i64>,
) -> Result<Json<Vec<User>>, ServerError> {
    let friends = state
        .db
        .list_friends(user_id)
        .await
        .context("Error retrieving friends")?;
    Ok(Json(friends))
}

async fn replace_friends(
    State(state): State<AppState>,
    ValidPath(user_id): ValidPath<i64>,
    ValidJson(payload): ValidJson<FriendsPayload>,
) -> Result<Json<Message>, ServerError> {
    let friend_ids = payload.validate(user_id)?;
    state
        .db
        .replace_friends(user_id, friend_ids)
        .await
        .context("Error updating friends")?;
    Ok(Json(Message {
        message: "Friends list updated successfully",
    }))
}

async fn remove_friend(
    State(state): State<AppState>,
    ValidPath((user_id, friend_id)): ValidPath<(i64, i64)>,
) -> Result<Json<Message>, ServerError> {
    state
        .db
        .remove_friend(user_id, friend_id)
        .await
        .context("Error deleting friend")?;
    Ok(Json(Message {
        message: "Friend removed successfully",
    }))
}
