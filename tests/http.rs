//! HTTP integration tests.
//!
//! Starts an axum server per demo and exercises it with reqwest.

use std::sync::{Arc, Mutex};

use axum::Router;
use recordstore::api;
use recordstore::{PasswordHasher, Store};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Bind to port 0 and return the actual address.
async fn start_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn open_store(temp: &TempDir) -> Arc<Mutex<Store>> {
    Arc::new(Mutex::new(Store::open(temp.path()).unwrap()))
}

async fn library() -> (String, TempDir) {
    let temp = TempDir::new().unwrap();
    let base = start_server(api::library_app(open_store(&temp))).await;
    (base, temp)
}

async fn wardrobe() -> (String, TempDir) {
    let temp = TempDir::new().unwrap();
    let base = start_server(api::wardrobe_app(open_store(&temp), PasswordHasher::new(1000))).await;
    (base, temp)
}

fn signup(email: &str, password: &str) -> Value {
    json!({ "email": email, "full_name": "Ana Petrova", "password": password })
}

// ============================================================================
// bookshelf (in-memory)
// ============================================================================

#[tokio::test]
async fn bookshelf_lists_seeded_books_in_order() {
    let base = start_server(api::bookshelf_app()).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/books")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(body.len(), 5);
    assert_eq!(body[0], json!({ "id": 1, "title": "Title 1", "author": "Author 1" }));
    assert_eq!(body[4]["id"], 5);
}

#[tokio::test]
async fn bookshelf_create_fetch_and_patch() {
    let base = start_server(api::bookshelf_app()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/books"))
        .json(&json!({ "title": "A", "author": "B" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["id"], 6);

    let resp = client
        .put(format!("{base}/books/6"))
        .json(&json!({ "title": "C" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let fetched: Value = client
        .get(format!("{base}/books/6"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, json!({ "id": 6, "title": "C", "author": "B" }));

    let second: Value = client
        .post(format!("{base}/books"))
        .json(&json!({ "title": "D", "author": "E" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["id"], 7);
}

#[tokio::test]
async fn bookshelf_missing_book_is_404() {
    let base = start_server(api::bookshelf_app()).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/books/99")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Book 99 not found");

    let resp = client
        .put(format!("{base}/books/99"))
        .json(&json!({ "title": "X" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bookshelf_non_integer_id_is_json_404() {
    let base = start_server(api::bookshelf_app()).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/books/abc")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["content-type"], "application/json");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Book abc not found" }));

    let resp = client
        .get(format!("{base}/books/99999999999999999999"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Book 99999999999999999999 not found");

    let resp = client
        .put(format!("{base}/books/abc"))
        .json(&json!({ "title": "X" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bookshelf_enforces_book_field_lengths() {
    let base = start_server(api::bookshelf_app()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/books"))
        .json(&json!({ "title": "A", "author": "a".repeat(51) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["author"].is_array());
}

#[tokio::test]
async fn bookshelf_has_no_delete() {
    let base = start_server(api::bookshelf_app()).await;
    let client = reqwest::Client::new();

    let resp = client.delete(format!("{base}/books/1")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let resp = client.get(format!("{base}/books/1")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn bookshelf_rejects_bad_payloads() {
    let base = start_server(api::bookshelf_app()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/books"))
        .json(&json!({ "title": "Only a title" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["_schema"].is_array());

    let resp = client
        .post(format!("{base}/books"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let books: Vec<Value> = client.get(format!("{base}/books")).send().await.unwrap().json().await.unwrap();
    assert_eq!(books.len(), 5);
}

// ============================================================================
// people (in-memory)
// ============================================================================

#[tokio::test]
async fn people_have_distinct_ids_and_partial_updates() {
    let base = start_server(api::people_app()).await;
    let client = reqwest::Client::new();

    let people: Vec<Value> = client.get(format!("{base}/people")).send().await.unwrap().json().await.unwrap();
    let ids: Vec<i64> = people.iter().map(|p| p["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);

    let created: Value = client
        .post(format!("{base}/people"))
        .json(&json!({ "name": "Lia", "age": 22, "superpower": "Naps anywhere" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["id"], 5);

    let updated: Value = client
        .put(format!("{base}/people/5"))
        .json(&json!({ "age": 23 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["age"], 23);
    assert_eq!(updated["name"], "Lia");
    assert_eq!(updated["superpower"], "Naps anywhere");
}

#[tokio::test]
async fn health_names_the_demo() {
    let base = start_server(api::people_app()).await;
    let body: Value = reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({ "ok": true, "demo": "people" }));
}

// ============================================================================
// library (SQLite)
// ============================================================================

#[tokio::test]
async fn library_full_crud() {
    let (base, _temp) = library().await;
    let client = reqwest::Client::new();

    let list: Vec<Value> = client.get(format!("{base}/books")).send().await.unwrap().json().await.unwrap();
    assert!(list.is_empty());

    let resp = client
        .post(format!("{base}/books"))
        .json(&json!({ "title": "A", "author": "B" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(id, 1);

    let resp = client
        .put(format!("{base}/books/{id}"))
        .json(&json!({ "title": "C" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let fetched: Value = client
        .get(format!("{base}/books/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, json!({ "id": 1, "title": "C", "author": "B" }));

    let resp = client.delete(format!("{base}/books/{id}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Book deleted" }));

    let resp = client.get(format!("{base}/books/{id}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client.delete(format!("{base}/books/{id}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let next: Value = client
        .post(format!("{base}/books"))
        .json(&json!({ "title": "D", "author": "E" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(next["id"].as_i64().unwrap() > id);
}

#[tokio::test]
async fn library_title_length_enforced() {
    let (base, _temp) = library().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/books"))
        .json(&json!({ "title": "t".repeat(101), "author": "B" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["title"].is_array());
}

#[tokio::test]
async fn library_readers_and_their_books() {
    let (base, _temp) = library().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/books"))
        .json(&json!({ "title": "A", "author": "B", "reader_id": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["reader_id"].is_array());

    let reader: Value = client
        .post(format!("{base}/readers"))
        .json(&json!({ "name": "Lia" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let reader_id = reader["id"].as_i64().unwrap();

    for title in ["Dune", "Emma"] {
        let resp = client
            .post(format!("{base}/books"))
            .json(&json!({ "title": title, "author": "X", "reader_id": reader_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let fetched: Value = client
        .get(format!("{base}/readers/{reader_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["name"], "Lia");
    let titles: Vec<&str> = fetched["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Dune", "Emma"]);

    // Returning a book detaches it from the reader
    let resp = client
        .put(format!("{base}/books/1"))
        .json(&json!({ "reader_id": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let fetched: Value = client
        .get(format!("{base}/readers/{reader_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["books"].as_array().unwrap().len(), 1);

    let resp = client.get(format!("{base}/readers/42")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// wardrobe (SQLite + signup)
// ============================================================================

#[tokio::test]
async fn wardrobe_signup_and_fetch() {
    let (base, _temp) = wardrobe().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/register/"))
        .json(&signup("ana@example.com", "Str0ng!pass"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: Value = resp.json().await.unwrap();
    assert_eq!(user["email"], "ana@example.com");
    assert_eq!(user["full_name"], "Ana Petrova");
    assert!(user.get("password").is_none());
    let mut keys: Vec<&str> = user.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["clothes", "created_on", "email", "full_name", "id", "updated_on"]);
    let id = user["id"].as_i64().unwrap();

    let resp = client
        .post(format!("{base}/users/{id}/clothes/"))
        .json(&json!({ "name": "Raincoat", "color": "yellow", "size": "m", "photo": "raincoat.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base}/users/{id}/clothes/"))
        .json(&json!({ "name": "Tee", "photo": "tee.png" }))
        .send()
        .await
        .unwrap();
    let tee: Value = resp.json().await.unwrap();
    assert_eq!(tee["color"], "white");
    assert_eq!(tee["size"], "s");

    let fetched: Value = client
        .get(format!("{base}/users/{id}/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let clothes = fetched["clothes"].as_array().unwrap();
    assert_eq!(clothes.len(), 2);
    assert_eq!(clothes[0]["name"], "Raincoat");
    assert!(fetched.get("password").is_none());
    assert_eq!(fetched["created_on"], user["created_on"]);
    assert_eq!(fetched["updated_on"], user["updated_on"]);
}

#[tokio::test]
async fn wardrobe_rejects_password_without_digit() {
    let (base, temp) = wardrobe().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/register/"))
        .json(&signup("ana@example.com", "NoDigits!here"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "password": ["Not a valid password."] }));

    let store = Store::open(temp.path()).unwrap();
    let users: Vec<recordstore::models::User> = store.list(&[]).unwrap();
    assert!(users.is_empty());
}

#[tokio::test]
async fn wardrobe_reports_every_invalid_field() {
    let (base, _temp) = wardrobe().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/register/"))
        .json(&json!({ "email": "not-an-email", "full_name": "Madonna", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["email"].is_array());
    assert!(body["full_name"].is_array());
    assert_eq!(body["password"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn wardrobe_duplicate_email_conflicts() {
    let (base, _temp) = wardrobe().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/register/"))
        .json(&signup("ana@example.com", "Str0ng!pass"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base}/register/"))
        .json(&signup("ana@example.com", "Oth3r!pass"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], api::wardrobe::EMAIL_TAKEN);
}

#[tokio::test]
async fn wardrobe_missing_user_is_404() {
    let (base, _temp) = wardrobe().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/users/7/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .post(format!("{base}/users/7/clothes/"))
        .json(&json!({ "name": "Tee", "photo": "tee.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = client.get(format!("{base}/users/abc/clothes/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "User abc not found");
}

#[tokio::test]
async fn wardrobe_paths_without_trailing_slash_redirect() {
    let (base, _temp) = wardrobe().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/register"))
        .json(&signup("ana@example.com", "Str0ng!pass"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: Value = resp.json().await.unwrap();
    let id = user["id"].as_i64().unwrap();

    let resp = client.get(format!("{base}/users/{id}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched["email"], "ana@example.com");

    let no_follow = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let resp = no_follow.get(format!("{base}/users/{id}/clothes")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(resp.headers()["location"], format!("/users/{id}/clothes/").as_str());
}
