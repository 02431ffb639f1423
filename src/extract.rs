//! Extractors that report malformed input in the crate's error body shape.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::database::{FriendPayload, FriendsPayload, UserPayload};
use crate::err::ServerError;

/// Message returned when a body of this type cannot be decoded at all.
pub trait JsonBody: DeserializeOwned {
    const REJECTION: &'static str;
}

impl JsonBody for UserPayload {
    const REJECTION: &'static str = "Name and age are required";
}

impl JsonBody for FriendPayload {
    const REJECTION: &'static str = "Friend ID is required";
}

impl JsonBody for FriendsPayload {
    const REJECTION: &'static str = "Friends should be an array of user IDs";
}

/// `Json<T>` whose rejection is a `ServerError::Validation`.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: JsonBody + Send,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => {
                tracing::debug!("Body rejected: {}", rejection.body_text());
                Err(ServerError::validation(T::REJECTION))
            }
        }
    }
}

/// `Path<T>` whose rejection is a `ServerError::Validation`.
pub struct ValidPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|_| ServerError::validation("Invalid id"))?;
        Ok(ValidPath(value))
    }
}
