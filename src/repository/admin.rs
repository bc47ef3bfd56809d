//! Admin inventory repository: books, mirrored users and borrow entries

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres, Row, Transaction};

use super::{conflict_on_unique, StoreTx};
use crate::{
    borrowing::ALREADY_BORROWED,
    error::AppResult,
    models::{Book, BorrowEntry, BorrowedBook, NewBook, NewBorrowEntry, NewUser, UpdateUser, User},
};

/// Read access to the admin database, plus transactions for writes
#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn AdminTx>>;

    async fn book_by_id(&self, id: i32) -> AppResult<Option<Book>>;
    async fn book_by_title(&self, title: &str) -> AppResult<Option<Book>>;
    async fn list_books(&self) -> AppResult<Vec<Book>>;
    /// Books with an unreturned entry, joined with that entry
    async fn list_borrowed_books(&self) -> AppResult<Vec<BorrowedBook>>;
    /// Unreturned entries whose due date is on or before `as_of`
    async fn list_due_entries(&self, as_of: NaiveDate) -> AppResult<Vec<BorrowEntry>>;

    async fn user_by_id(&self, id: i32) -> AppResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    /// Every (user, borrowed book) pair, grouped by user
    async fn list_user_loans(&self, include_returned: bool) -> AppResult<Vec<(User, BorrowedBook)>>;
}

/// Write transaction on the admin database. Dropped without commit means rolled back.
#[async_trait]
pub trait AdminTx: StoreTx {
    async fn insert_book(&mut self, book: &NewBook) -> AppResult<Book>;
    /// Lock and fetch a book
    async fn book_by_id(&mut self, id: i32) -> AppResult<Option<Book>>;
    /// Lock and fetch a book by its exact (normalized) title
    async fn book_by_title(&mut self, title: &str) -> AppResult<Option<Book>>;
    async fn delete_book(&mut self, id: i32) -> AppResult<Option<Book>>;

    async fn open_entry_for_book(&mut self, book_id: i32) -> AppResult<Option<BorrowEntry>>;
    async fn entry_by_id(&mut self, id: i32) -> AppResult<Option<BorrowEntry>>;
    async fn insert_entry(&mut self, entry: &NewBorrowEntry) -> AppResult<BorrowEntry>;
    async fn mark_returned(&mut self, id: i32) -> AppResult<Option<BorrowEntry>>;

    async fn user_by_email(&mut self, email: &str) -> AppResult<Option<User>>;
    async fn insert_user(&mut self, user: &NewUser) -> AppResult<User>;
    async fn update_user(&mut self, id: i32, changes: &UpdateUser) -> AppResult<Option<User>>;
}

#[derive(Clone)]
pub struct PgAdminStore {
    pool: Pool<Postgres>,
}

impl PgAdminStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminStore for PgAdminStore {
    async fn begin(&self) -> AppResult<Box<dyn AdminTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgAdminTx { tx }))
    }

    async fn book_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT id, title, publisher, category FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn book_by_title(&self, title: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT id, title, publisher, category FROM books WHERE title = $1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT id, title, publisher, category FROM books ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn list_borrowed_books(&self) -> AppResult<Vec<BorrowedBook>> {
        let books = sqlx::query_as::<_, BorrowedBook>(
            r#"
            SELECT b.id, b.title, b.publisher, b.category,
                   e.date_borrowed, e.return_date, e.is_returned
            FROM books b
            JOIN borrow_entries e ON e.book_id = b.id
            WHERE NOT e.is_returned
            ORDER BY e.return_date, b.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn list_due_entries(&self, as_of: NaiveDate) -> AppResult<Vec<BorrowEntry>> {
        let entries = sqlx::query_as::<_, BorrowEntry>(
            r#"
            SELECT * FROM borrow_entries
            WHERE NOT is_returned AND return_date <= $1
            ORDER BY return_date, id
            "#,
        )
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn user_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn list_user_loans(&self, include_returned: bool) -> AppResult<Vec<(User, BorrowedBook)>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id AS user_id, u.email, u.firstname, u.lastname, u.joined_on,
                   b.id AS book_id, b.title, b.publisher, b.category,
                   e.date_borrowed, e.return_date, e.is_returned
            FROM users u
            JOIN borrow_entries e ON e.user_id = u.id
            JOIN books b ON b.id = e.book_id
            WHERE $1 OR NOT e.is_returned
            ORDER BY u.id, e.date_borrowed, e.id
            "#,
        )
        .bind(include_returned)
        .fetch_all(&self.pool)
        .await?;

        let loans = rows
            .into_iter()
            .map(|row| {
                let user = User {
                    id: row.get("user_id"),
                    email: row.get("email"),
                    firstname: row.get("firstname"),
                    lastname: row.get("lastname"),
                    joined_on: row.get("joined_on"),
                };
                let book = BorrowedBook {
                    id: row.get("book_id"),
                    title: row.get("title"),
                    publisher: row.get("publisher"),
                    category: row.get("category"),
                    date_borrowed: row.get("date_borrowed"),
                    return_date: row.get("return_date"),
                    is_returned: row.get("is_returned"),
                };
                (user, book)
            })
            .collect();

        Ok(loans)
    }
}

pub struct PgAdminTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AdminTx for PgAdminTx {
    async fn insert_book(&mut self, book: &NewBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, publisher, category)
            VALUES ($1, $2, $3)
            RETURNING id, title, publisher, category
            "#,
        )
        .bind(&book.title)
        .bind(&book.publisher)
        .bind(&book.category)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Book with title '{}' already exists", book.title)))?;
        Ok(created)
    }

    async fn book_by_id(&mut self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT id, title, publisher, category FROM books WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(book)
    }

    async fn book_by_title(&mut self, title: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT id, title, publisher, category FROM books WHERE title = $1 FOR UPDATE",
        )
        .bind(title)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(book)
    }

    async fn delete_book(&mut self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            "DELETE FROM books WHERE id = $1 RETURNING id, title, publisher, category",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(book)
    }

    async fn open_entry_for_book(&mut self, book_id: i32) -> AppResult<Option<BorrowEntry>> {
        let entry = sqlx::query_as::<_, BorrowEntry>(
            "SELECT * FROM borrow_entries WHERE book_id = $1 AND NOT is_returned",
        )
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(entry)
    }

    async fn entry_by_id(&mut self, id: i32) -> AppResult<Option<BorrowEntry>> {
        let entry = sqlx::query_as::<_, BorrowEntry>("SELECT * FROM borrow_entries WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(entry)
    }

    async fn insert_entry(&mut self, entry: &NewBorrowEntry) -> AppResult<BorrowEntry> {
        let created = sqlx::query_as::<_, BorrowEntry>(
            r#"
            INSERT INTO borrow_entries (book_id, user_id, date_borrowed, return_date, is_returned)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING *
            "#,
        )
        .bind(entry.book_id)
        .bind(entry.user_id)
        .bind(entry.date_borrowed)
        .bind(entry.return_date)
        .fetch_one(&mut *self.tx)
        .await
        // The partial unique index allows a single open entry per book
        .map_err(|e| conflict_on_unique(e, || ALREADY_BORROWED.to_string()))?;
        Ok(created)
    }

    async fn mark_returned(&mut self, id: i32) -> AppResult<Option<BorrowEntry>> {
        let entry = sqlx::query_as::<_, BorrowEntry>(
            "UPDATE borrow_entries SET is_returned = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(entry)
    }

    async fn user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 FOR UPDATE")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn insert_user(&mut self, user: &NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, firstname, lastname, joined_on)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(user.joined_on)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("User with email '{}' already exists", user.email)))?;
        Ok(created)
    }

    async fn update_user(&mut self, id: i32, changes: &UpdateUser) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                firstname = COALESCE($3, firstname),
                lastname = COALESCE($4, lastname)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.firstname)
        .bind(&changes.lastname)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| {
            conflict_on_unique(e, || {
                format!("User with email '{}' already exists", changes.email.as_deref().unwrap_or_default())
            })
        })?;
        Ok(user)
    }
}

#[async_trait]
impl StoreTx for PgAdminTx {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
