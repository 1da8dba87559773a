//! Data access for the `book` table.
//!
//! Every method runs in its own [`UnitOfWork`]; returning early with `?`
//! drops the unit of work, which rolls the transaction back.

use bookshelf_db::{Database, DbError, UnitOfWork};
use sqlx::{QueryBuilder, Sqlite};
use thiserror::Error;

use super::models::{Book, BookChange, BookCreate, BookResponse, SearchQuery};

pub const CREATE_BOOK_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS book (
        id     INTEGER PRIMARY KEY AUTOINCREMENT,
        title  TEXT    NOT NULL CHECK (title <> ''),
        author TEXT    NOT NULL CHECK (author <> ''),
        year   INTEGER
    );
"#;

const BOOK_COLUMNS: &str = "id, title, author, year";

pub type DaoResult<T> = Result<T, DaoError>;

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("book {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<sqlx::Error> for DaoError {
    fn from(value: sqlx::Error) -> Self {
        Self::Storage(DbError::Sqlx(value))
    }
}

/// One page of a listing together with the size of the whole table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<BookResponse>,
    pub total: i64,
}

#[derive(Clone, Debug)]
pub struct BookDao {
    db: Database,
}

impl BookDao {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Books `(page - 1) * limit .. page * limit` in id order.
    #[tracing::instrument(skip(self))]
    pub async fn list_paginated(&self, page: u32, limit: u32) -> DaoResult<Page> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);

        let mut uow = self.db.begin().await?;

        let books: Vec<Book> = sqlx::query_as(
            "SELECT id, title, author, year FROM book ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(uow.conn())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book")
            .fetch_one(uow.conn())
            .await?;

        uow.commit().await?;

        tracing::debug!(returned = books.len(), total, "listed books");

        Ok(Page {
            items: books.into_iter().map(BookResponse::from).collect(),
            total,
        })
    }

    #[tracing::instrument(skip(self, book_data), fields(title = %book_data.title))]
    pub async fn create(&self, book_data: BookCreate) -> DaoResult<BookResponse> {
        let mut uow = self.db.begin().await?;

        let book: Book = sqlx::query_as(
            "INSERT INTO book (title, author, year) VALUES (?, ?, ?) \
             RETURNING id, title, author, year",
        )
        .bind(book_data.title)
        .bind(book_data.author)
        .bind(book_data.year)
        .fetch_one(uow.conn())
        .await?;

        uow.commit().await?;

        tracing::info!(id = book.id, "book created");

        Ok(book.into())
    }

    /// Returns `false` when no book had this id.
    #[tracing::instrument(skip(self))]
    pub async fn delete_by_id(&self, book_id: i64) -> DaoResult<bool> {
        let mut uow = self.db.begin().await?;

        let result = sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(book_id)
            .execute(uow.conn())
            .await?;

        uow.commit().await?;

        let deleted = result.rows_affected() > 0;
        tracing::info!(deleted, "book delete");

        Ok(deleted)
    }

    /// Applies `changes` to the book and returns the stored result.
    #[tracing::instrument(skip(self, changes), fields(fields = changes.len()))]
    pub async fn update_by_id(
        &self,
        book_id: i64,
        changes: Vec<BookChange>,
    ) -> DaoResult<BookResponse> {
        let mut uow = self.db.begin().await?;

        let Some(current) = find_by_id(&mut uow, book_id).await? else {
            return Err(DaoError::NotFound(book_id));
        };

        if changes.is_empty() {
            uow.commit().await?;
            return Ok(current.into());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE book SET ");
        {
            let mut assignments = builder.separated(", ");
            for change in changes {
                assignments.push(format!("{} = ", change.column()));
                match change {
                    BookChange::Title(title) => assignments.push_bind_unseparated(title),
                    BookChange::Author(author) => assignments.push_bind_unseparated(author),
                    BookChange::Year(year) => assignments.push_bind_unseparated(year),
                };
            }
        }
        builder
            .push(" WHERE id = ")
            .push_bind(book_id)
            .push(format!(" RETURNING {BOOK_COLUMNS}"));

        let book: Book = builder.build_query_as().fetch_one(uow.conn()).await?;

        uow.commit().await?;

        tracing::info!(id = book.id, "book updated");

        Ok(book.into())
    }

    /// Books matching every supplied criterion, in id order.
    ///
    /// Title and author match as case-insensitive substrings (ASCII case
    /// folding, as SQLite's `LIKE` does); year matches exactly.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: SearchQuery) -> DaoResult<Vec<BookResponse>> {
        let query = query.normalized();

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM book WHERE 1 = 1"));

        if let Some(title) = query.title {
            builder
                .push(" AND title LIKE ")
                .push_bind(contains_pattern(&title))
                .push(" ESCAPE '\\'");
        }
        if let Some(author) = query.author {
            builder
                .push(" AND author LIKE ")
                .push_bind(contains_pattern(&author))
                .push(" ESCAPE '\\'");
        }
        if let Some(year) = query.year {
            builder.push(" AND year = ").push_bind(year);
        }
        builder.push(" ORDER BY id");

        let mut uow = self.db.begin().await?;
        let books: Vec<Book> = builder.build_query_as().fetch_all(uow.conn()).await?;
        uow.commit().await?;

        tracing::debug!(found = books.len(), "searched books");

        Ok(books.into_iter().map(BookResponse::from).collect())
    }
}

async fn find_by_id(uow: &mut UnitOfWork, book_id: i64) -> DaoResult<Option<Book>> {
    let book: Option<Book> =
        sqlx::query_as("SELECT id, title, author, year FROM book WHERE id = ?")
            .bind(book_id)
            .fetch_optional(uow.conn())
            .await?;

    Ok(book)
}

/// `%needle%` with LIKE wildcards in the needle taken literally.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_db::ConnectOptions;

    async fn dao() -> BookDao {
        let db = Database::connect(&ConnectOptions {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
        .unwrap();
        db.execute_schema(CREATE_BOOK_TABLE).await.unwrap();
        BookDao::new(db)
    }

    fn new_book(title: &str, author: &str, year: Option<i64>) -> BookCreate {
        BookCreate {
            title: title.to_string(),
            author: author.to_string(),
            year,
        }
    }

    async fn seed(dao: &BookDao, count: usize) {
        for n in 1..=count {
            dao.create(new_book(&format!("Book {n}"), "Anon", None))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_echoes_fields() {
        let dao = dao().await;

        let book = dao
            .create(new_book("Dune", "Herbert", Some(1965)))
            .await
            .unwrap();

        assert_eq!(
            book,
            BookResponse {
                id: 1,
                title: "Dune".to_string(),
                author: "Herbert".to_string(),
                year: Some(1965),
            }
        );
    }

    #[tokio::test]
    async fn create_rejects_empty_title_at_storage() {
        let dao = dao().await;

        let err = dao.create(new_book("", "Herbert", None)).await.unwrap_err();

        assert!(matches!(err, DaoError::Storage(_)));
    }

    #[tokio::test]
    async fn list_returns_requested_window() {
        let dao = dao().await;
        seed(&dao, 25).await;

        let page = dao.list_paginated(2, 10).await.unwrap();

        assert_eq!(page.total, 25);
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.items.first().unwrap().id, 11);
        assert_eq!(page.items.last().unwrap().id, 20);

        let tail = dao.list_paginated(3, 10).await.unwrap();
        assert_eq!(
            tail.items.iter().map(|book| book.id).collect::<Vec<_>>(),
            (21..=25).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn list_past_the_end_is_empty() {
        let dao = dao().await;
        seed(&dao, 3).await;

        let page = dao.list_paginated(5, 10).await.unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn create_then_search_by_exact_title() {
        let dao = dao().await;
        seed(&dao, 2).await;
        let created = dao
            .create(new_book("Dune", "Herbert", Some(1965)))
            .await
            .unwrap();

        let found = dao
            .search(SearchQuery {
                title: Some("Dune".to_string()),
                ..SearchQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(found, vec![created]);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let dao = dao().await;
        let hobbit = dao
            .create(new_book("The Hobbit", "J.R.R. Tolkien", Some(1937)))
            .await
            .unwrap();
        dao.create(new_book("Dune", "Frank Herbert", Some(1965)))
            .await
            .unwrap();

        let by_title = dao
            .search(SearchQuery {
                title: Some("the".to_string()),
                ..SearchQuery::default()
            })
            .await
            .unwrap();
        let by_author = dao
            .search(SearchQuery {
                author: Some("TOLK".to_string()),
                ..SearchQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(by_title, vec![hobbit.clone()]);
        assert_eq!(by_author, vec![hobbit]);
    }

    #[tokio::test]
    async fn search_combines_criteria() {
        let dao = dao().await;
        dao.create(new_book("Dune", "Herbert", Some(1965)))
            .await
            .unwrap();
        let messiah = dao
            .create(new_book("Dune Messiah", "Herbert", Some(1969)))
            .await
            .unwrap();

        let found = dao
            .search(SearchQuery {
                title: Some("dune".to_string()),
                author: Some("herb".to_string()),
                year: Some(1969),
            })
            .await
            .unwrap();

        assert_eq!(found, vec![messiah]);
    }

    #[tokio::test]
    async fn search_without_criteria_returns_all() {
        let dao = dao().await;
        seed(&dao, 4).await;

        let found = dao.search(SearchQuery::default()).await.unwrap();

        assert_eq!(found.len(), 4);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let dao = dao().await;
        dao.create(new_book("100% Rust", "Ferris", None))
            .await
            .unwrap();
        dao.create(new_book("1000 Rust Tips", "Ferris", None))
            .await
            .unwrap();

        let found = dao
            .search(SearchQuery {
                title: Some("0%".to_string()),
                ..SearchQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "100% Rust");
    }

    #[tokio::test]
    async fn delete_removes_book() {
        let dao = dao().await;
        let book = dao.create(new_book("Dune", "Herbert", None)).await.unwrap();

        assert!(dao.delete_by_id(book.id).await.unwrap());
        assert!(!dao.delete_by_id(book.id).await.unwrap());

        let page = dao.list_paginated(1, 10).await.unwrap();
        assert!(page.items.is_empty());
        let found = dao
            .search(SearchQuery {
                title: Some("Dune".to_string()),
                ..SearchQuery::default()
            })
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let dao = dao().await;
        let book = dao
            .create(new_book("Dune", "Herbert", Some(1965)))
            .await
            .unwrap();

        let updated = dao
            .update_by_id(book.id, vec![BookChange::Year(1999)])
            .await
            .unwrap();

        assert_eq!(
            updated,
            BookResponse {
                year: Some(1999),
                ..book
            }
        );
    }

    #[tokio::test]
    async fn update_multiple_fields() {
        let dao = dao().await;
        let book = dao.create(new_book("Dun", "Herbrt", None)).await.unwrap();

        let updated = dao
            .update_by_id(
                book.id,
                vec![
                    BookChange::Title("Dune".to_string()),
                    BookChange::Author("Herbert".to_string()),
                ],
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Dune");
        assert_eq!(updated.author, "Herbert");
        assert_eq!(updated.year, None);
    }

    #[tokio::test]
    async fn update_missing_book_is_not_found() {
        let dao = dao().await;

        let err = dao
            .update_by_id(42, vec![BookChange::Year(2000)])
            .await
            .unwrap_err();

        assert!(matches!(err, DaoError::NotFound(42)));
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("the"), "%the%");
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
