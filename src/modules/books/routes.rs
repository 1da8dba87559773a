use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use bookshelf_http::{
    extract::{ApiJson, ApiPath, ApiQuery},
    AppError,
};

use super::{
    dao::{BookDao, DaoError},
    models::{BookCreate, BookResponse, BookUpdate, DeleteResponse, ListQuery, SearchQuery},
};

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Routes under `/books`, bound to `dao`.
pub fn router(dao: BookDao) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/", get(list_books).post(create_book))
        .route("/books/search", get(search_books))
        .route("/books/health", get(health_check))
        .route("/books/{book_id}", put(update_book).delete(delete_book))
        .with_state(dao)
}

impl From<DaoError> for AppError {
    fn from(error: DaoError) -> Self {
        match error {
            DaoError::NotFound(book_id) => {
                AppError::not_found(format!("Book with id = {book_id} not found"))
            }
            DaoError::Storage(err) => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(
    State(dao): State<BookDao>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = dao.list_paginated(query.page, query.limit).await?;

    Ok((
        [(TOTAL_COUNT_HEADER, page.total.to_string())],
        Json(page.items),
    ))
}

async fn create_book(
    State(dao): State<BookDao>,
    ApiJson(book_data): ApiJson<BookCreate>,
) -> Result<Json<BookResponse>, AppError> {
    let book = dao.create(book_data).await?;
    Ok(Json(book))
}

async fn delete_book(
    State(dao): State<BookDao>,
    ApiPath(book_id): ApiPath<i64>,
) -> Result<Json<DeleteResponse>, AppError> {
    if !dao.delete_by_id(book_id).await? {
        return Err(DaoError::NotFound(book_id).into());
    }

    Ok(Json(DeleteResponse {
        message: format!("Book with id = {book_id} deleted"),
    }))
}

async fn update_book(
    State(dao): State<BookDao>,
    ApiPath(book_id): ApiPath<i64>,
    ApiJson(book_update): ApiJson<BookUpdate>,
) -> Result<Json<BookResponse>, AppError> {
    let changes = book_update.into_changes();
    if changes.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }

    let book = dao.update_by_id(book_id, changes).await?;
    Ok(Json(book))
}

async fn search_books(
    State(dao): State<BookDao>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<BookResponse>>, AppError> {
    let books = dao.search(query).await?;
    Ok(Json(books))
}
