//! Frontend catalog repository: cached books and user accounts

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use super::{conflict_on_unique, StoreTx};
use crate::{
    error::AppResult,
    models::{BookFilter, CatalogBook, NewBook, NewUser, UpdateUser, User},
};

#[async_trait]
pub trait FrontendStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn FrontendTx>>;

    async fn book_by_id(&self, id: i32) -> AppResult<Option<CatalogBook>>;
    async fn book_by_title(&self, title: &str) -> AppResult<Option<CatalogBook>>;
    /// Books whose cached flag says available
    async fn list_available_books(&self) -> AppResult<Vec<CatalogBook>>;
    /// Available books matching every present filter (substring, normalized filter expected)
    async fn search_available_books(&self, filter: &BookFilter) -> AppResult<Vec<CatalogBook>>;

    async fn user_by_id(&self, id: i32) -> AppResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>>;
}

/// Write transaction on the frontend database. Dropped without commit means rolled back.
#[async_trait]
pub trait FrontendTx: StoreTx {
    async fn insert_book(&mut self, book: &NewBook) -> AppResult<CatalogBook>;
    /// Lock and fetch a book
    async fn book_by_id(&mut self, id: i32) -> AppResult<Option<CatalogBook>>;
    async fn book_by_title(&mut self, title: &str) -> AppResult<Option<CatalogBook>>;
    async fn set_borrowed(&mut self, id: i32, is_borrowed: bool) -> AppResult<Option<CatalogBook>>;
    async fn delete_book(&mut self, id: i32) -> AppResult<Option<CatalogBook>>;

    /// Lock and fetch a user
    async fn user_by_id(&mut self, id: i32) -> AppResult<Option<User>>;
    async fn insert_user(&mut self, user: &NewUser) -> AppResult<User>;
    async fn update_user(&mut self, id: i32, changes: &UpdateUser) -> AppResult<Option<User>>;
}

#[derive(Clone)]
pub struct PgFrontendStore {
    pool: Pool<Postgres>,
}

impl PgFrontendStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FrontendStore for PgFrontendStore {
    async fn begin(&self) -> AppResult<Box<dyn FrontendTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgFrontendTx { tx }))
    }

    async fn book_by_id(&self, id: i32) -> AppResult<Option<CatalogBook>> {
        let book = sqlx::query_as::<_, CatalogBook>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn book_by_title(&self, title: &str) -> AppResult<Option<CatalogBook>> {
        let book = sqlx::query_as::<_, CatalogBook>("SELECT * FROM books WHERE title = $1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn list_available_books(&self) -> AppResult<Vec<CatalogBook>> {
        let books = sqlx::query_as::<_, CatalogBook>("SELECT * FROM books WHERE NOT is_borrowed ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn search_available_books(&self, filter: &BookFilter) -> AppResult<Vec<CatalogBook>> {
        // strpos keeps user input from being read as LIKE wildcards
        let books = sqlx::query_as::<_, CatalogBook>(
            r#"
            SELECT * FROM books
            WHERE NOT is_borrowed
              AND ($1::text IS NULL OR strpos(title, $1) > 0)
              AND ($2::text IS NULL OR strpos(category, $2) > 0)
              AND ($3::text IS NULL OR strpos(publisher, $3) > 0)
            ORDER BY id
            "#,
        )
        .bind(&filter.title)
        .bind(&filter.category)
        .bind(&filter.publisher)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
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
}

pub struct PgFrontendTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl FrontendTx for PgFrontendTx {
    async fn insert_book(&mut self, book: &NewBook) -> AppResult<CatalogBook> {
        let created = sqlx::query_as::<_, CatalogBook>(
            r#"
            INSERT INTO books (title, publisher, category, is_borrowed)
            VALUES ($1, $2, $3, FALSE)
            RETURNING *
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

    async fn book_by_id(&mut self, id: i32) -> AppResult<Option<CatalogBook>> {
        let book = sqlx::query_as::<_, CatalogBook>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(book)
    }

    async fn book_by_title(&mut self, title: &str) -> AppResult<Option<CatalogBook>> {
        let book = sqlx::query_as::<_, CatalogBook>("SELECT * FROM books WHERE title = $1 FOR UPDATE")
            .bind(title)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(book)
    }

    async fn set_borrowed(&mut self, id: i32, is_borrowed: bool) -> AppResult<Option<CatalogBook>> {
        let book = sqlx::query_as::<_, CatalogBook>(
            "UPDATE books SET is_borrowed = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_borrowed)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(book)
    }

    async fn delete_book(&mut self, id: i32) -> AppResult<Option<CatalogBook>> {
        let book = sqlx::query_as::<_, CatalogBook>("DELETE FROM books WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(book)
    }

    async fn user_by_id(&mut self, id: i32) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
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
impl StoreTx for PgFrontendTx {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
