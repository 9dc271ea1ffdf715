//! Books lent to readers, persisted in SQLite.

use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use tracing::debug;

use super::crud::{self, Id, Shared};
use crate::error::ApiResult;
use crate::filter::Filter;
use crate::models::{Book, Reader, ReaderOut, ReaderPatch};
use crate::record::IndexValue;
use crate::store::{SqliteCollection, Store};

#[derive(Clone)]
struct Library {
    books: Shared<Book>,
    readers: Shared<Reader>,
}

/// `/books` with full CRUD including delete, `/readers` with create/list/fetch/update
pub fn router(store: Arc<Mutex<Store>>) -> Router {
    let books: Shared<Book> = Arc::new(SqliteCollection::<Book>::new(Arc::clone(&store)));
    let readers: Shared<Reader> = Arc::new(SqliteCollection::<Reader>::new(store));

    let reader_routes = Router::new()
        .route("/readers", get(crud::list::<Reader>).post(crud::create::<Reader>))
        .with_state(Arc::clone(&readers))
        .merge(
            Router::new()
                .route("/readers/:id", get(reader_with_books).put(update_reader))
                .with_state(Library {
                    books: Arc::clone(&books),
                    readers,
                }),
        );

    crud::routes(books, "/books", true).merge(reader_routes)
}

async fn reader_with_books(
    State(library): State<Library>,
    Id { id, .. }: Id<Reader>,
) -> ApiResult<Json<ReaderOut>> {
    debug!(id, "fetch reader with books");
    let reader = library.readers.fetch(id)?;
    let books = library
        .books
        .find(&[Filter::eq("reader_id", IndexValue::Int(reader.id))])?;
    Ok(Json(ReaderOut { reader, books }))
}

async fn update_reader(
    State(library): State<Library>,
    id: Id<Reader>,
    payload: crud::Payload<ReaderPatch>,
) -> ApiResult<Json<Reader>> {
    crud::update::<Reader>(State(library.readers), id, payload).await
}
