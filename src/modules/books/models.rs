use serde::{Deserialize, Serialize};
use validator::Validate;

/// Persisted book row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub year: Option<i64>,
}

/// Book as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookResponse {
    /// Identifier assigned by storage
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Publication year, `null` when unknown
    pub year: Option<i64>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            year: book.year,
        }
    }
}

/// Request model for creating a new book.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BookCreate {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub author: String,
    #[serde(default)]
    pub year: Option<i64>,
}

/// Request model for a partial update. `null`, missing and unrecognized
/// fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BookUpdate {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub author: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
}

impl BookUpdate {
    /// Field assignments for every supplied value, in column order.
    pub fn into_changes(self) -> Vec<BookChange> {
        let mut changes = Vec::with_capacity(3);

        if let Some(title) = self.title {
            changes.push(BookChange::Title(title));
        }
        if let Some(author) = self.author {
            changes.push(BookChange::Author(author));
        }
        if let Some(year) = self.year {
            changes.push(BookChange::Year(year));
        }

        changes
    }
}

/// A single column assignment applied by an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookChange {
    Title(String),
    Author(String),
    Year(i64),
}

impl BookChange {
    pub fn column(&self) -> &'static str {
        match self {
            BookChange::Title(_) => "title",
            BookChange::Author(_) => "author",
            BookChange::Year(_) => "year",
        }
    }
}

/// `?page=&limit=` for the listing endpoint.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListQuery {
    #[serde(default = "ListQuery::default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "ListQuery::default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
}

impl ListQuery {
    fn default_page() -> u32 {
        1
    }

    fn default_limit() -> u32 {
        10
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: Self::default_page(),
            limit: Self::default_limit(),
        }
    }
}

/// `?title=&author=&year=` for the search endpoint.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<i64>,
}

impl SearchQuery {
    /// Drops empty text criteria, which match everything anyway.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.filter(|title| !title.is_empty()),
            author: self.author.filter(|author| !author.is_empty()),
            year: self.year,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_keeps_only_supplied_fields() {
        let update: BookUpdate = serde_json::from_str(r#"{"year": 1999, "title": null}"#).unwrap();
        assert_eq!(update.into_changes(), vec![BookChange::Year(1999)]);
    }

    #[test]
    fn empty_update_has_no_changes() {
        let update: BookUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.into_changes().is_empty());
    }

    #[test]
    fn update_ignores_unrecognized_fields() {
        let update: BookUpdate =
            serde_json::from_str(r#"{"year": 1999, "isbn": "123"}"#).unwrap();
        assert_eq!(update.into_changes(), vec![BookChange::Year(1999)]);
    }

    #[test]
    fn create_requires_non_empty_title_and_author() {
        let create: BookCreate =
            serde_json::from_str(r#"{"title": "", "author": "Herbert"}"#).unwrap();
        let errors = create.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert!(!errors.field_errors().contains_key("author"));
    }

    #[test]
    fn create_year_is_optional() {
        let create: BookCreate =
            serde_json::from_str(r#"{"title": "Dune", "author": "Herbert"}"#).unwrap();
        assert!(create.validate().is_ok());
        assert_eq!(create.year, None);
    }

    #[test]
    fn list_query_bounds() {
        assert!(ListQuery::default().validate().is_ok());
        assert!(ListQuery { page: 0, limit: 10 }.validate().is_err());
        assert!(ListQuery { page: 1, limit: 0 }.validate().is_err());
        assert!(ListQuery { page: 1, limit: 101 }.validate().is_err());
        assert!(ListQuery { page: 7, limit: 100 }.validate().is_ok());
    }

    #[test]
    fn search_query_ignores_empty_text() {
        let query = SearchQuery {
            title: Some(String::new()),
            author: Some("tolkien".to_string()),
            year: None,
        }
        .normalized();

        assert_eq!(query.title, None);
        assert_eq!(query.author.as_deref(), Some("tolkien"));
    }

    #[test]
    fn change_columns_match_table() {
        assert_eq!(BookChange::Title("a".into()).column(), "title");
        assert_eq!(BookChange::Author("b".into()).column(), "author");
        assert_eq!(BookChange::Year(1).column(), "year");
    }
}
