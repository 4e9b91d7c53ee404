//! In-memory book store with sequential integer ids.

use async_trait::async_trait;
use bookshelf_core::{Book, BookFields, BookId, BookQueue, Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::store::{parse_offset_token, BookPage, BookStore};

#[derive(Default)]
struct State {
    next_id: u64,
    books: BTreeMap<u64, BookFields>,
}

/// Process-local store. Page tokens are decimal offsets.
pub struct MemoryStore {
    state: RwLock<State>,
    queue: Arc<dyn BookQueue>,
}

impl MemoryStore {
    pub fn new(queue: Arc<dyn BookQueue>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            queue,
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn after_write(&self, id: &BookId, queue_book: bool) {
        if queue_book {
            self.queue.queue_book(id);
        }
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list(&self, limit: usize, token: Option<&str>) -> Result<BookPage> {
        let offset = parse_offset_token(token)?;
        let state = self.state.read();

        let mut books: Vec<Book> = state
            .books
            .iter()
            .map(|(id, fields)| Book::new(*id, fields.clone()))
            .collect();
        books.sort_by(|a, b| a.fields.title.cmp(&b.fields.title));

        let total = books.len();
        let items: Vec<Book> = books.into_iter().skip(offset).take(limit).collect();
        let end = offset + items.len();
        let next_page_token = (end < total).then(|| end.to_string());

        Ok(BookPage {
            items,
            next_page_token,
        })
    }

    async fn create(&self, fields: BookFields, queue_book: bool) -> Result<Book> {
        let book = {
            let mut state = self.state.write();
            state.next_id += 1;
            let id = state.next_id;
            state.books.insert(id, fields.clone());
            Book::new(id, fields)
        };

        debug!(book_id = %book.id, "Created book");
        self.after_write(&book.id, queue_book);
        Ok(book)
    }

    async fn read(&self, id: &BookId) -> Result<Book> {
        let key = id.as_u64().ok_or_else(|| Error::BookNotFound(id.clone()))?;
        self.state
            .read()
            .books
            .get(&key)
            .map(|fields| Book::new(key, fields.clone()))
            .ok_or_else(|| Error::BookNotFound(id.clone()))
    }

    async fn update(&self, id: &BookId, fields: BookFields, queue_book: bool) -> Result<Book> {
        let key = id.as_u64().ok_or_else(|| Error::BookNotFound(id.clone()))?;
        {
            let mut state = self.state.write();
            let slot = state
                .books
                .get_mut(&key)
                .ok_or_else(|| Error::BookNotFound(id.clone()))?;
            *slot = fields.clone();
        }

        let book = Book::new(key, fields);
        self.after_write(&book.id, queue_book);
        Ok(book)
    }

    async fn delete(&self, id: &BookId) -> Result<()> {
        if let Some(key) = id.as_u64() {
            self.state.write().books.remove(&key);
        }
        Ok(())
    }
}
