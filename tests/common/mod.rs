//! In-memory stores and broker wiring both services together without
//! Postgres or Redis

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use library_services::{
    borrowing::ALREADY_BORROWED,
    config::{AppConfig, ServiceRole},
    error::{AppError, AppResult},
    events::{EventPublisher, EventSource, InboundMessage, Topic},
    models::{
        Book, BookFilter, BorrowEntry, BorrowedBook, CatalogBook, NewBook, NewBorrowEntry, NewUser,
        UpdateUser, User,
    },
    repository::{AdminStore, AdminTx, FrontendStore, FrontendTx, StoreTx},
    services::{AdminServices, FrontendServices},
    sync::{AdminHandler, FrontendHandler, PollSummary, Reconciler},
    AppState,
};

// ---------------------------------------------------------------------------
// Admin store

#[derive(Debug, Clone, Default)]
pub struct AdminData {
    pub books: Vec<Book>,
    pub users: Vec<User>,
    pub entries: Vec<BorrowEntry>,
    next_id: i32,
}

impl AdminData {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryAdminStore {
    data: Arc<Mutex<AdminData>>,
}

impl MemoryAdminStore {
    pub fn snapshot(&self) -> AdminData {
        self.data.lock().unwrap().clone()
    }

    /// Insert a borrow entry directly, bypassing the services
    pub fn seed_entry(&self, book_id: i32, user_id: i32, date_borrowed: NaiveDate, return_date: NaiveDate) -> i32 {
        let mut data = self.data.lock().unwrap();
        let id = data.next_id();
        data.entries.push(BorrowEntry {
            id,
            book_id,
            user_id,
            date_borrowed,
            return_date,
            is_returned: false,
        });
        id
    }

    /// Move the due date of an entry
    pub fn backdate(&self, entry_id: i32, return_date: NaiveDate) {
        let mut data = self.data.lock().unwrap();
        if let Some(entry) = data.entries.iter_mut().find(|e| e.id == entry_id) {
            entry.return_date = return_date;
        }
    }
}

#[async_trait]
impl AdminStore for MemoryAdminStore {
    async fn begin(&self) -> AppResult<Box<dyn AdminTx>> {
        let data = self.data.lock().unwrap().clone();
        Ok(Box::new(MemoryAdminTx {
            shared: self.data.clone(),
            data,
        }))
    }

    async fn book_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.snapshot().books.into_iter().find(|b| b.id == id))
    }

    async fn book_by_title(&self, title: &str) -> AppResult<Option<Book>> {
        Ok(self.snapshot().books.into_iter().find(|b| b.title == title))
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        Ok(self.snapshot().books)
    }

    async fn list_borrowed_books(&self) -> AppResult<Vec<BorrowedBook>> {
        let data = self.snapshot();
        Ok(data
            .entries
            .iter()
            .filter(|e| !e.is_returned)
            .filter_map(|e| data.books.iter().find(|b| b.id == e.book_id).map(|b| borrowed(b, e)))
            .collect())
    }

    async fn list_due_entries(&self, as_of: NaiveDate) -> AppResult<Vec<BorrowEntry>> {
        Ok(self
            .snapshot()
            .entries
            .into_iter()
            .filter(|e| !e.is_returned && e.return_date <= as_of)
            .collect())
    }

    async fn user_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.snapshot().users.into_iter().find(|u| u.id == id))
    }

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.snapshot().users.into_iter().find(|u| u.email == email))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.snapshot().users)
    }

    async fn list_user_loans(&self, include_returned: bool) -> AppResult<Vec<(User, BorrowedBook)>> {
        let data = self.snapshot();
        let mut loans = Vec::new();
        for user in &data.users {
            for entry in data.entries.iter().filter(|e| e.user_id == user.id) {
                if entry.is_returned && !include_returned {
                    continue;
                }
                if let Some(book) = data.books.iter().find(|b| b.id == entry.book_id) {
                    loans.push((user.clone(), borrowed(book, entry)));
                }
            }
        }
        Ok(loans)
    }
}

fn borrowed(book: &Book, entry: &BorrowEntry) -> BorrowedBook {
    BorrowedBook {
        id: book.id,
        title: book.title.clone(),
        publisher: book.publisher.clone(),
        category: book.category.clone(),
        date_borrowed: entry.date_borrowed,
        return_date: entry.return_date,
        is_returned: entry.is_returned,
    }
}

/// Works on a private copy, swapped in on commit
pub struct MemoryAdminTx {
    shared: Arc<Mutex<AdminData>>,
    data: AdminData,
}

#[async_trait]
impl AdminTx for MemoryAdminTx {
    async fn insert_book(&mut self, book: &NewBook) -> AppResult<Book> {
        if self.data.books.iter().any(|b| b.title == book.title) {
            return Err(AppError::Conflict(format!("Book with title '{}' already exists", book.title)));
        }
        let created = Book {
            id: self.data.next_id(),
            title: book.title.clone(),
            publisher: book.publisher.clone(),
            category: book.category.clone(),
        };
        self.data.books.push(created.clone());
        Ok(created)
    }

    async fn book_by_id(&mut self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.data.books.iter().find(|b| b.id == id).cloned())
    }

    async fn book_by_title(&mut self, title: &str) -> AppResult<Option<Book>> {
        Ok(self.data.books.iter().find(|b| b.title == title).cloned())
    }

    async fn delete_book(&mut self, id: i32) -> AppResult<Option<Book>> {
        let Some(index) = self.data.books.iter().position(|b| b.id == id) else {
            return Ok(None);
        };
        self.data.entries.retain(|e| e.book_id != id);
        Ok(Some(self.data.books.remove(index)))
    }

    async fn open_entry_for_book(&mut self, book_id: i32) -> AppResult<Option<BorrowEntry>> {
        Ok(self
            .data
            .entries
            .iter()
            .find(|e| e.book_id == book_id && !e.is_returned)
            .cloned())
    }

    async fn entry_by_id(&mut self, id: i32) -> AppResult<Option<BorrowEntry>> {
        Ok(self.data.entries.iter().find(|e| e.id == id).cloned())
    }

    async fn insert_entry(&mut self, entry: &NewBorrowEntry) -> AppResult<BorrowEntry> {
        if self
            .data
            .entries
            .iter()
            .any(|e| e.book_id == entry.book_id && !e.is_returned)
        {
            return Err(AppError::Conflict(ALREADY_BORROWED.to_string()));
        }
        let created = BorrowEntry {
            id: self.data.next_id(),
            book_id: entry.book_id,
            user_id: entry.user_id,
            date_borrowed: entry.date_borrowed,
            return_date: entry.return_date,
            is_returned: false,
        };
        self.data.entries.push(created.clone());
        Ok(created)
    }

    async fn mark_returned(&mut self, id: i32) -> AppResult<Option<BorrowEntry>> {
        Ok(self.data.entries.iter_mut().find(|e| e.id == id).map(|e| {
            e.is_returned = true;
            e.clone()
        }))
    }

    async fn user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        Ok(self.data.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&mut self, user: &NewUser) -> AppResult<User> {
        insert_user(&mut self.data.users, self.data.next_id + 1, user).map(|u| {
            self.data.next_id += 1;
            u
        })
    }

    async fn update_user(&mut self, id: i32, changes: &UpdateUser) -> AppResult<Option<User>> {
        update_user(&mut self.data.users, id, changes)
    }
}

#[async_trait]
impl StoreTx for MemoryAdminTx {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        *self.shared.lock().unwrap() = self.data;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

fn insert_user(users: &mut Vec<User>, id: i32, user: &NewUser) -> AppResult<User> {
    if users.iter().any(|u| u.email == user.email) {
        return Err(AppError::Conflict(format!("User with email '{}' already exists", user.email)));
    }
    let created = User {
        id,
        email: user.email.clone(),
        firstname: user.firstname.clone(),
        lastname: user.lastname.clone(),
        joined_on: user.joined_on,
    };
    users.push(created.clone());
    Ok(created)
}

/// Copy the present fields of `changes` onto `user`
fn apply_update(changes: &UpdateUser, user: &mut User) {
    if let Some(ref email) = changes.email {
        user.email = email.clone();
    }
    if let Some(ref firstname) = changes.firstname {
        user.firstname = firstname.clone();
    }
    if let Some(ref lastname) = changes.lastname {
        user.lastname = lastname.clone();
    }
}

/// Substring match on every present filter value, like the SQL search
fn filter_matches(filter: &BookFilter, book: &CatalogBook) -> bool {
    let contains = |wanted: &Option<String>, value: &str| wanted.as_deref().map(|f| value.contains(f)).unwrap_or(true);
    contains(&filter.title, &book.title)
        && contains(&filter.category, &book.category)
        && contains(&filter.publisher, &book.publisher)
}

fn update_user(users: &mut [User], id: i32, changes: &UpdateUser) -> AppResult<Option<User>> {
    if let Some(ref email) = changes.email {
        if users.iter().any(|u| u.id != id && u.email == *email) {
            return Err(AppError::Conflict(format!("User with email '{}' already exists", email)));
        }
    }
    Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
        apply_update(changes, u);
        u.clone()
    }))
}

// ---------------------------------------------------------------------------
// Frontend store

#[derive(Debug, Clone, Default)]
pub struct FrontendData {
    pub books: Vec<CatalogBook>,
    pub users: Vec<User>,
    next_id: i32,
}

#[derive(Clone, Default)]
pub struct MemoryFrontendStore {
    data: Arc<Mutex<FrontendData>>,
}

impl MemoryFrontendStore {
    pub fn snapshot(&self) -> FrontendData {
        self.data.lock().unwrap().clone()
    }

    pub fn book(&self, title: &str) -> Option<CatalogBook> {
        self.snapshot().books.into_iter().find(|b| b.title == title)
    }
}

#[async_trait]
impl FrontendStore for MemoryFrontendStore {
    async fn begin(&self) -> AppResult<Box<dyn FrontendTx>> {
        let data = self.data.lock().unwrap().clone();
        Ok(Box::new(MemoryFrontendTx {
            shared: self.data.clone(),
            data,
        }))
    }

    async fn book_by_id(&self, id: i32) -> AppResult<Option<CatalogBook>> {
        Ok(self.snapshot().books.into_iter().find(|b| b.id == id))
    }

    async fn book_by_title(&self, title: &str) -> AppResult<Option<CatalogBook>> {
        Ok(self.book(title))
    }

    async fn list_available_books(&self) -> AppResult<Vec<CatalogBook>> {
        Ok(self.snapshot().books.into_iter().filter(|b| !b.is_borrowed).collect())
    }

    async fn search_available_books(&self, filter: &BookFilter) -> AppResult<Vec<CatalogBook>> {
        Ok(self
            .snapshot()
            .books
            .into_iter()
            .filter(|b| !b.is_borrowed && filter_matches(filter, b))
            .collect())
    }

    async fn user_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.snapshot().users.into_iter().find(|u| u.id == id))
    }

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.snapshot().users.into_iter().find(|u| u.email == email))
    }
}

pub struct MemoryFrontendTx {
    shared: Arc<Mutex<FrontendData>>,
    data: FrontendData,
}

#[async_trait]
impl FrontendTx for MemoryFrontendTx {
    async fn insert_book(&mut self, book: &NewBook) -> AppResult<CatalogBook> {
        if self.data.books.iter().any(|b| b.title == book.title) {
            return Err(AppError::Conflict(format!("Book with title '{}' already exists", book.title)));
        }
        self.data.next_id += 1;
        let created = CatalogBook {
            id: self.data.next_id,
            title: book.title.clone(),
            publisher: book.publisher.clone(),
            category: book.category.clone(),
            is_borrowed: false,
        };
        self.data.books.push(created.clone());
        Ok(created)
    }

    async fn book_by_id(&mut self, id: i32) -> AppResult<Option<CatalogBook>> {
        Ok(self.data.books.iter().find(|b| b.id == id).cloned())
    }

    async fn book_by_title(&mut self, title: &str) -> AppResult<Option<CatalogBook>> {
        Ok(self.data.books.iter().find(|b| b.title == title).cloned())
    }

    async fn set_borrowed(&mut self, id: i32, is_borrowed: bool) -> AppResult<Option<CatalogBook>> {
        Ok(self.data.books.iter_mut().find(|b| b.id == id).map(|b| {
            b.is_borrowed = is_borrowed;
            b.clone()
        }))
    }

    async fn delete_book(&mut self, id: i32) -> AppResult<Option<CatalogBook>> {
        let index = self.data.books.iter().position(|b| b.id == id);
        Ok(index.map(|i| self.data.books.remove(i)))
    }

    async fn user_by_id(&mut self, id: i32) -> AppResult<Option<User>> {
        Ok(self.data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&mut self, user: &NewUser) -> AppResult<User> {
        insert_user(&mut self.data.users, self.data.next_id + 1, user).map(|u| {
            self.data.next_id += 1;
            u
        })
    }

    async fn update_user(&mut self, id: i32, changes: &UpdateUser) -> AppResult<Option<User>> {
        update_user(&mut self.data.users, id, changes)
    }
}

#[async_trait]
impl StoreTx for MemoryFrontendTx {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        *self.shared.lock().unwrap() = self.data;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Broker

/// Append-only topic logs; every subscription keeps its own cursor per topic
#[derive(Default)]
pub struct MemoryBroker {
    logs: Mutex<HashMap<Topic, Vec<String>>>,
}

impl MemoryBroker {
    /// Every message value published on `topic`, oldest first
    pub fn published(&self, topic: Topic) -> Vec<String> {
        self.logs.lock().unwrap().get(&topic).cloned().unwrap_or_default()
    }

    /// Decoded records of every message published on `topic`
    pub fn records(&self, topic: Topic) -> Vec<serde_json::Value> {
        self.published(topic)
            .iter()
            .flat_map(|p| match serde_json::from_str::<serde_json::Value>(p) {
                Ok(serde_json::Value::Array(records)) => records,
                _ => Vec::new(),
            })
            .collect()
    }

    /// Put a raw message value on a topic
    pub fn inject(&self, topic: Topic, payload: &str) {
        self.logs
            .lock()
            .unwrap()
            .entry(topic)
            .or_default()
            .push(payload.to_string());
    }

    pub fn subscribe(self: &Arc<Self>, topics: &[Topic]) -> MemorySubscription {
        MemorySubscription {
            broker: self.clone(),
            topics: topics.to_vec(),
            cursors: Mutex::new(HashMap::new()),
            acked: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EventPublisher for MemoryBroker {
    async fn publish(&self, topic: Topic, payload: String) -> AppResult<()> {
        self.inject(topic, &payload);
        Ok(())
    }
}

pub struct MemorySubscription {
    broker: Arc<MemoryBroker>,
    topics: Vec<Topic>,
    cursors: Mutex<HashMap<Topic, usize>>,
    pub acked: Mutex<Vec<String>>,
}

#[async_trait]
impl EventSource for MemorySubscription {
    async fn poll(&self, _max_wait: Duration) -> AppResult<Vec<InboundMessage>> {
        let logs = self.broker.logs.lock().unwrap();
        let mut cursors = self.cursors.lock().unwrap();
        let mut messages = Vec::new();
        for topic in &self.topics {
            let log = logs.get(topic).map(Vec::as_slice).unwrap_or_default();
            let cursor = cursors.entry(*topic).or_insert(0);
            for (offset, payload) in log.iter().enumerate().skip(*cursor) {
                messages.push(InboundMessage {
                    topic: *topic,
                    id: format!("{}-{}", topic, offset),
                    payload: payload.clone(),
                });
            }
            *cursor = log.len();
        }
        Ok(messages)
    }

    async fn ack(&self, message: &InboundMessage) -> AppResult<()> {
        self.acked.lock().unwrap().push(message.id.clone());
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Both services wired together

pub struct Library {
    pub broker: Arc<MemoryBroker>,
    pub admin_store: MemoryAdminStore,
    pub frontend_store: MemoryFrontendStore,
    pub admin: AdminServices,
    pub frontend: FrontendServices,
    pub admin_sync: Reconciler,
    pub frontend_sync: Reconciler,
}

impl Library {
    pub fn new() -> Self {
        let broker = Arc::new(MemoryBroker::default());
        let admin_store = MemoryAdminStore::default();
        let frontend_store = MemoryFrontendStore::default();

        let admin = AdminServices::new(Arc::new(admin_store.clone()), broker.clone());
        let frontend = FrontendServices::new(Arc::new(frontend_store.clone()), broker.clone());

        let admin_sync = Reconciler::new(
            ServiceRole::Admin,
            Arc::new(broker.subscribe(Topic::inbound(ServiceRole::Admin))),
            Arc::new(AdminHandler::new(admin.clone())),
            Duration::from_millis(10),
            Duration::ZERO,
        );
        let frontend_sync = Reconciler::new(
            ServiceRole::Frontend,
            Arc::new(broker.subscribe(Topic::inbound(ServiceRole::Frontend))),
            Arc::new(FrontendHandler::new(frontend.clone())),
            Duration::from_millis(10),
            Duration::ZERO,
        );

        Self {
            broker,
            admin_store,
            frontend_store,
            admin,
            frontend,
            admin_sync,
            frontend_sync,
        }
    }

    /// One poll on each side: admin first, then frontend
    pub async fn sync(&self) -> (PollSummary, PollSummary) {
        let admin = self.admin_sync.poll_once().await;
        let frontend = self.frontend_sync.poll_once().await;
        (admin, frontend)
    }

    pub fn admin_state(&self) -> AppState<AdminServices> {
        AppState::new(Arc::new(AppConfig::default()), self.admin.clone())
    }

    pub fn frontend_state(&self) -> AppState<FrontendServices> {
        AppState::new(Arc::new(AppConfig::default()), self.frontend.clone())
    }
}
