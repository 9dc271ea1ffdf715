//! User signup and per-user clothes, persisted in SQLite.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::Redirect;
use axum::routing::{any, get, post};
use axum::{Json, Router};
use eyre::eyre;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::crud::{Id, Payload, Shared};
use crate::collection::StoreError;
use crate::error::{ApiError, ApiResult};
use crate::filter::Filter;
use crate::models::{Clothes, ClothesDraft, User, UserOut};
use crate::password::PasswordHasher;
use crate::record::IndexValue;
use crate::signup::SignupRequest;
use crate::store::{SqliteCollection, Store};

pub const EMAIL_TAKEN: &str = "Email already exists, please sign in instead!";

#[derive(Clone)]
struct Wardrobe {
    users: Shared<User>,
    clothes: Shared<Clothes>,
    hasher: PasswordHasher,
}

impl Wardrobe {
    fn clothes_of(&self, user_id: i64) -> ApiResult<Vec<Clothes>> {
        Ok(self.clothes.find(&[Filter::eq("user_id", IndexValue::Int(user_id))])?)
    }
}

/// `POST /register/`, `GET /users/:id/`, and `GET|POST /users/:id/clothes/`.
///
/// The same paths without the trailing slash answer with a permanent redirect.
pub fn router(store: Arc<Mutex<Store>>, hasher: PasswordHasher) -> Router {
    let state = Wardrobe {
        users: Arc::new(SqliteCollection::<User>::new(Arc::clone(&store))),
        clothes: Arc::new(SqliteCollection::<Clothes>::new(store)),
        hasher,
    };

    Router::new()
        .route("/register/", post(register))
        .route("/users/:id/", get(user))
        .route("/users/:id/clothes/", get(list_clothes).post(add_clothes))
        .route("/register", any(add_trailing_slash))
        .route("/users/:id", any(add_trailing_slash))
        .route("/users/:id/clothes", any(add_trailing_slash))
        .with_state(state)
}

// 308 keeps the method and body
async fn add_trailing_slash(uri: Uri) -> Redirect {
    let target = match uri.query() {
        Some(query) => format!("{}/?{}", uri.path(), query),
        None => format!("{}/", uri.path()),
    };
    Redirect::permanent(&target)
}

async fn register(
    State(wardrobe): State<Wardrobe>,
    Payload(payload): Payload<Value>,
) -> ApiResult<(StatusCode, Json<UserOut>)> {
    let request = SignupRequest::parse(&payload)?;
    debug!(email = %request.email, "signup validated");

    // Hundreds of milliseconds at the default iteration count
    let hasher = wardrobe.hasher;
    let draft = tokio::task::spawn_blocking(move || request.into_draft(&hasher))
        .await
        .map_err(|e| ApiError::Internal(eyre!("password hashing task failed: {}", e)))?;

    let user = match wardrobe.users.create(draft) {
        Ok(user) => user,
        Err(StoreError::Conflict { field, .. }) if field == "email" => {
            warn!("signup rejected: email already registered");
            return Err(ApiError::Conflict(EMAIL_TAKEN.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserOut::new(user, Vec::new()))))
}

async fn user(State(wardrobe): State<Wardrobe>, Id { id, .. }: Id<User>) -> ApiResult<Json<UserOut>> {
    let user = wardrobe.users.fetch(id)?;
    let clothes = wardrobe.clothes_of(user.id)?;
    Ok(Json(UserOut::new(user, clothes)))
}

async fn list_clothes(
    State(wardrobe): State<Wardrobe>,
    Id { id, .. }: Id<User>,
) -> ApiResult<Json<Vec<Clothes>>> {
    let user = wardrobe.users.fetch(id)?;
    Ok(Json(wardrobe.clothes_of(user.id)?))
}

async fn add_clothes(
    State(wardrobe): State<Wardrobe>,
    Id { id, .. }: Id<User>,
    Payload(mut draft): Payload<ClothesDraft>,
) -> ApiResult<(StatusCode, Json<Clothes>)> {
    let user = wardrobe.users.fetch(id)?;
    draft.user_id = Some(user.id);

    let clothes = wardrobe.clothes.create(draft)?;
    info!(user_id = user.id, id = clothes.id, "clothes added");
    Ok((StatusCode::CREATED, Json(clothes)))
}
