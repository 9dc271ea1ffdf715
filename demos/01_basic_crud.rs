//! Example 01: Basic CRUD Operations
//!
//! This example demonstrates create, read, update, list, and delete against
//! the SQLite-backed store, using the library demo's book and reader records.
//!
//! Run with: cargo run --example 01_basic_crud

use eyre::Result;
use recordstore::models::{Book, BookDraft, BookPatch, Reader, ReaderDraft};
use recordstore::{Filter, IndexValue, Store};

fn main() -> Result<()> {
    // Create a temporary directory for this example
    let temp_dir = tempfile::tempdir()?;
    let store_path = temp_dir.path().to_path_buf();

    println!("RecordStore Basic CRUD Example");
    println!("==============================\n");
    println!("Store path: {}\n", store_path.display());

    // Open (or create) the store; the schema is migrated on open
    let mut store = Store::open(&store_path)?;
    println!("Store opened successfully.\n");

    // CREATE: the store assigns identifiers
    println!("1. CREATE - Adding a reader and a book...");
    let reader: Reader = store.create(ReaderDraft {
        name: "Lia".to_string(),
    })?;
    let book: Book = store.create(BookDraft {
        title: "Dune".to_string(),
        author: "Frank Herbert".to_string(),
        reader_id: Some(reader.id),
    })?;
    println!("   Created reader {} and book {}\n", reader.id, book.id);

    // READ
    println!("2. READ - Retrieving the book...");
    match store.get::<Book>(book.id)? {
        Some(book) => println!("   Found: {} by {}", book.title, book.author),
        None => println!("   Book not found!"),
    }
    println!();

    // UPDATE: only the supplied fields change
    println!("3. UPDATE - Renaming the book...");
    let updated: Book = store.update(
        book.id,
        BookPatch {
            title: Some("Dune Messiah".to_string()),
            ..Default::default()
        },
    )?;
    println!("   New title: {} (author still {})\n", updated.title, updated.author);

    // LIST: everything, then only the reader's books
    println!("4. LIST - Showing books...");
    let all: Vec<Book> = store.list(&[])?;
    println!("   Total books: {}", all.len());
    let borrowed: Vec<Book> = store.list(&[Filter::eq("reader_id", IndexValue::Int(reader.id))])?;
    println!("   Borrowed by {}: {}", reader.name, borrowed.len());
    println!();

    // DELETE
    println!("5. DELETE - Removing the book...");
    store.delete::<Book>(book.id)?;
    let deleted: Option<Book> = store.get(book.id)?;
    println!("   Verification: Book exists = {}\n", deleted.is_some());

    println!("Example complete!");
    Ok(())
}
