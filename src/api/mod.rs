//! HTTP surface for the demo services. Uses axum for routing.
//!
//! | demo        | backend   | routes                                           |
//! |-------------|-----------|--------------------------------------------------|
//! | `bookshelf` | in-memory | `/books`, `/books/:id`                           |
//! | `people`    | in-memory | `/people`, `/people/:id`                         |
//! | `library`   | SQLite    | `/books`, `/books/:id` (+ DELETE), `/readers`, `/readers/:id` |
//! | `wardrobe`  | SQLite    | `/register/`, `/users/:id/`, `/users/:id/clothes/` |
//!
//! Every demo also answers `GET /health`.

pub mod crud;
pub mod library;
pub mod wardrobe;

use std::sync::{Arc, Mutex};

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::info;

use crate::memory::MemoryCollection;
use crate::models::{Book, Person, bookshelf_seed, people_seed};
use crate::password::PasswordHasher;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Demo {
    /// In-memory books, seeded with five titles
    Bookshelf,
    /// In-memory people, seeded with four entries
    People,
    /// SQLite-backed books and readers
    Library,
    /// SQLite-backed users (signup) and their clothes
    Wardrobe,
}

impl Demo {
    pub fn name(self) -> &'static str {
        match self {
            Demo::Bookshelf => "bookshelf",
            Demo::People => "people",
            Demo::Library => "library",
            Demo::Wardrobe => "wardrobe",
        }
    }

    pub fn needs_store(self) -> bool {
        matches!(self, Demo::Library | Demo::Wardrobe)
    }
}

impl std::fmt::Display for Demo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub fn bookshelf_app() -> Router {
    let books = Arc::new(MemoryCollection::<Book>::seeded(bookshelf_seed()));
    crud::routes::<Book>(books, "/books", false).merge(health(Demo::Bookshelf))
}

pub fn people_app() -> Router {
    let people = Arc::new(MemoryCollection::<Person>::seeded(people_seed()));
    crud::routes::<Person>(people, "/people", false).merge(health(Demo::People))
}

pub fn library_app(store: Arc<Mutex<Store>>) -> Router {
    library::router(store).merge(health(Demo::Library))
}

pub fn wardrobe_app(store: Arc<Mutex<Store>>, hasher: PasswordHasher) -> Router {
    wardrobe::router(store, hasher).merge(health(Demo::Wardrobe))
}

/// `GET /health` returns `{ "ok": true, "demo": "<name>" }`.
fn health(demo: Demo) -> Router {
    Router::new().route(
        "/health",
        get(move || async move { Json::<Value>(json!({ "ok": true, "demo": demo.name() })) }),
    )
}

/// Serve a router at the given address (e.g. `"127.0.0.1:5000"`) until Ctrl-C.
pub async fn serve(app: Router, addr: &str) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
}
