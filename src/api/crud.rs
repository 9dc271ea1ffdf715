//! Generic collection/item handlers shared by every demo.
//!
//! `GET /{path}` lists, `POST /{path}` creates, `GET|PUT /{path}/:id` fetch and
//! patch, and `DELETE /{path}/:id` is mounted only when asked for.

use std::marker::PhantomData;
use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Path, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::get;
use axum::{Json, Router};
use eyre::eyre;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::collection::Collection;
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::record::Record;

/// A collection shared across requests
pub type Shared<T> = Arc<dyn Collection<T>>;

/// JSON body extractor whose failures are reported as validation errors (400)
pub struct Payload<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(ValidationErrors::single("_schema", rejection.body_text())))?;

        serde_json::from_value(value)
            .map(Payload)
            .map_err(|e| ApiError::Validation(ValidationErrors::single("_schema", e.to_string())))
    }
}

/// Integer `:id` path segment of a `T` record.
///
/// A segment that does not parse as an `i64` is rejected as Not-Found for `T`.
pub struct Id<T> {
    pub id: i64,
    record: PhantomData<fn() -> T>,
}

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for Id<T>
where
    T: Record,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::Internal(eyre!("id path segment: {}", rejection.body_text())))?;

        match raw.parse::<i64>() {
            Ok(id) => Ok(Id {
                id,
                record: PhantomData,
            }),
            Err(_) => {
                debug!(kind = T::kind(), raw = %raw, "non-integer id");
                Err(ApiError::NotFound { kind: T::kind(), id: raw })
            }
        }
    }
}

/// Build the collection and item routes for one record type
pub fn routes<T: Record>(collection: Shared<T>, path: &str, with_delete: bool) -> Router {
    let item = if with_delete {
        get(fetch::<T>).put(update::<T>).delete(remove::<T>)
    } else {
        get(fetch::<T>).put(update::<T>)
    };

    Router::new()
        .route(path, get(list::<T>).post(create::<T>))
        .route(&format!("{}/:id", path), item)
        .with_state(collection)
}

pub async fn list<T: Record>(State(collection): State<Shared<T>>) -> ApiResult<Json<Vec<T>>> {
    debug!(collection = T::collection_name(), "list");
    Ok(Json(collection.list()?))
}

pub async fn create<T: Record>(
    State(collection): State<Shared<T>>,
    Payload(draft): Payload<T::Draft>,
) -> ApiResult<(StatusCode, Json<T>)> {
    let record = collection.create(draft)?;
    info!(collection = T::collection_name(), id = record.id(), "created");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn fetch<T: Record>(State(collection): State<Shared<T>>, Id { id, .. }: Id<T>) -> ApiResult<Json<T>> {
    debug!(collection = T::collection_name(), id, "fetch");
    Ok(Json(collection.fetch(id)?))
}

pub async fn update<T: Record>(
    State(collection): State<Shared<T>>,
    Id { id, .. }: Id<T>,
    Payload(patch): Payload<T::Patch>,
) -> ApiResult<Json<T>> {
    let record = collection.update(id, patch)?;
    info!(collection = T::collection_name(), id, "updated");
    Ok(Json(record))
}

pub async fn remove<T: Record>(
    State(collection): State<Shared<T>>,
    Id { id, .. }: Id<T>,
) -> ApiResult<Json<Value>> {
    collection.delete(id)?;
    info!(collection = T::collection_name(), id, "deleted");
    Ok(Json(json!({ "message": format!("{} deleted", T::kind()) })))
}
