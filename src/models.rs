// Data models served by the demo services

use crate::collection::{StoreError, StoreResult};
use crate::record::{IndexValue, Record, Reference};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Distinguish an absent key (`None`) from an explicit `null` (`Some(None)`)
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_len(field: &str, value: &str, max: usize) -> StoreResult<()> {
    if value.chars().count() > max {
        return Err(StoreError::Invalid {
            field: field.to_string(),
            message: format!("Longer than maximum length {}.", max),
        });
    }
    Ok(())
}

// ============================================================================
// Books and readers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub reader_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub reader_id: Option<Option<i64>>,
}

impl Record for Book {
    type Draft = BookDraft;
    type Patch = BookPatch;

    fn id(&self) -> i64 {
        self.id
    }

    fn collection_name() -> &'static str {
        "books"
    }

    fn kind() -> &'static str {
        "Book"
    }

    fn from_draft(id: i64, draft: BookDraft) -> Self {
        Self {
            id,
            title: draft.title,
            author: draft.author,
            reader_id: draft.reader_id,
        }
    }

    fn apply(&mut self, patch: BookPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(reader_id) = patch.reader_id {
            self.reader_id = reader_id;
        }
    }

    fn validate(&self) -> StoreResult<()> {
        check_len("title", &self.title, 100)?;
        check_len("author", &self.author, 50)
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        if let Some(reader_id) = self.reader_id {
            fields.insert("reader_id".to_string(), IndexValue::Int(reader_id));
        }
        fields
    }

    fn references(&self) -> Vec<Reference> {
        self.reader_id
            .map(|id| Reference {
                field: "reader_id",
                collection: Reader::collection_name(),
                id,
            })
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reader {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReaderDraft {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReaderPatch {
    pub name: Option<String>,
}

impl Record for Reader {
    type Draft = ReaderDraft;
    type Patch = ReaderPatch;

    fn id(&self) -> i64 {
        self.id
    }

    fn collection_name() -> &'static str {
        "readers"
    }

    fn kind() -> &'static str {
        "Reader"
    }

    fn from_draft(id: i64, draft: ReaderDraft) -> Self {
        Self { id, name: draft.name }
    }

    fn apply(&mut self, patch: ReaderPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
    }

    fn validate(&self) -> StoreResult<()> {
        check_len("name", &self.name, 100)
    }
}

/// A reader together with the books that reference it
#[derive(Debug, Clone, Serialize)]
pub struct ReaderOut {
    #[serde(flatten)]
    pub reader: Reader,
    pub books: Vec<Book>,
}

// ============================================================================
// People
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub superpower: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonDraft {
    pub name: String,
    pub age: i64,
    pub superpower: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub superpower: Option<String>,
}

impl Record for Person {
    type Draft = PersonDraft;
    type Patch = PersonPatch;

    fn id(&self) -> i64 {
        self.id
    }

    fn collection_name() -> &'static str {
        "people"
    }

    fn kind() -> &'static str {
        "Person"
    }

    fn from_draft(id: i64, draft: PersonDraft) -> Self {
        Self {
            id,
            name: draft.name,
            age: draft.age,
            superpower: draft.superpower,
        }
    }

    fn apply(&mut self, patch: PersonPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(superpower) = patch.superpower {
            self.superpower = superpower;
        }
    }

    fn validate(&self) -> StoreResult<()> {
        if self.age < 0 {
            return Err(StoreError::Invalid {
                field: "age".to_string(),
                message: "Must be greater than or equal to 0.".to_string(),
            });
        }
        Ok(())
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("age".to_string(), IndexValue::Int(self.age));
        fields
    }
}

// ============================================================================
// Users and clothes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// Salted hash, never the raw password
    pub password: String,
    pub full_name: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// A signup that already passed validation and carries a hashed password
#[derive(Debug, Clone, Deserialize)]
pub struct UserDraft {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    pub full_name: Option<String>,
}

impl Record for User {
    type Draft = UserDraft;
    type Patch = UserPatch;

    fn id(&self) -> i64 {
        self.id
    }

    fn collection_name() -> &'static str {
        "users"
    }

    fn kind() -> &'static str {
        "User"
    }

    fn from_draft(id: i64, draft: UserDraft) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: draft.email,
            password: draft.password,
            full_name: draft.full_name,
            created_on: now,
            updated_on: now,
        }
    }

    fn apply(&mut self, patch: UserPatch) {
        if let Some(full_name) = patch.full_name {
            self.full_name = full_name;
        }
        self.updated_on = Utc::now();
    }

    fn validate(&self) -> StoreResult<()> {
        check_len("email", &self.email, 120)?;
        check_len("full_name", &self.full_name, 255)
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("email".to_string(), IndexValue::String(self.email.clone()));
        fields
    }

    fn unique_fields() -> &'static [&'static str] {
        &["email"]
    }
}

/// Public view of a user: no password, clothes embedded
#[derive(Debug, Clone, Serialize)]
pub struct UserOut {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub clothes: Vec<Clothes>,
}

impl UserOut {
    pub fn new(user: User, clothes: Vec<Clothes>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            created_on: user.created_on,
            updated_on: user.updated_on,
            clothes,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Pink,
    Black,
    #[default]
    White,
    Yellow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Xs,
    #[default]
    S,
    M,
    L,
    Xl,
    Xxl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clothes {
    pub id: i64,
    pub name: String,
    pub color: Color,
    pub size: Size,
    pub photo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClothesDraft {
    pub name: String,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub size: Size,
    pub photo: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClothesPatch {
    pub name: Option<String>,
    pub color: Option<Color>,
    pub size: Option<Size>,
    pub photo: Option<String>,
}

impl Record for Clothes {
    type Draft = ClothesDraft;
    type Patch = ClothesPatch;

    fn id(&self) -> i64 {
        self.id
    }

    fn collection_name() -> &'static str {
        "clothes"
    }

    fn kind() -> &'static str {
        "Clothes"
    }

    fn from_draft(id: i64, draft: ClothesDraft) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: draft.name,
            color: draft.color,
            size: draft.size,
            photo: draft.photo,
            user_id: draft.user_id,
            created_on: now,
            updated_on: now,
        }
    }

    fn apply(&mut self, patch: ClothesPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(photo) = patch.photo {
            self.photo = photo;
        }
        self.updated_on = Utc::now();
    }

    fn validate(&self) -> StoreResult<()> {
        check_len("name", &self.name, 255)?;
        check_len("photo", &self.photo, 255)
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        if let Some(user_id) = self.user_id {
            fields.insert("user_id".to_string(), IndexValue::Int(user_id));
        }
        fields
    }

    fn references(&self) -> Vec<Reference> {
        self.user_id
            .map(|id| Reference {
                field: "user_id",
                collection: User::collection_name(),
                id,
            })
            .into_iter()
            .collect()
    }
}

// ============================================================================
// Seed data for the in-memory demos
// ============================================================================

pub fn bookshelf_seed() -> Vec<BookDraft> {
    (1..=5)
        .map(|n| BookDraft {
            title: format!("Title {}", n),
            author: format!("Author {}", n),
            reader_id: None,
        })
        .collect()
}

pub fn people_seed() -> Vec<PersonDraft> {
    [
        ("Mira Dobreva", 33, "Untangles any integration"),
        ("Ivo Stanchev", 30, "Reads stack traces like prose"),
        ("Petya Koleva", 27, "Ships on Fridays without fear"),
        ("Nikola Rusev", 29, "Never loses an argument with a compiler"),
    ]
    .into_iter()
    .map(|(name, age, superpower)| PersonDraft {
        name: name.to_string(),
        age,
        superpower: superpower.to_string(),
    })
    .collect()
}
