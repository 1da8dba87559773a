pub mod dao;
pub mod models;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_db::Database;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use dao::BookDao;

/// Book catalog module: CRUD and search over the `book` table
pub struct BooksModule {
    dao: BookDao,
}

impl BooksModule {
    pub fn new(db: Database) -> Self {
        Self {
            dao: BookDao::new(db),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.dao.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: dao::CREATE_BOOK_TABLE,
        }]
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let table_ready = ctx.db.table_exists("book").await?;
        if !table_ready {
            anyhow::bail!("table 'book' is missing after schema initialization");
        }

        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(db: Database) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(db))
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let book_id_param = json!({
        "name": "book_id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    });

    json!({
        "paths": {
            "/books": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        {
                            "name": "page",
                            "in": "query",
                            "description": "Page number",
                            "schema": { "type": "integer", "minimum": 1, "default": 1 }
                        },
                        {
                            "name": "limit",
                            "in": "query",
                            "description": "Books per page",
                            "schema": { "type": "integer", "minimum": 1, "maximum": 100, "default": 10 }
                        }
                    ],
                    "responses": {
                        "200": {
                            "description": "Page of books; X-Total-Count carries the table size",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "422": error_response("Page or limit out of range")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BookCreate" }
                            }
                        }
                    },
                    "responses": {
                        "200": book_response("Created book"),
                        "422": error_response("Invalid body"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/books/search": {
                "get": {
                    "summary": "Search books by title, author and year",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "title", "in": "query", "description": "Part of the title", "schema": { "type": "string" } },
                        { "name": "author", "in": "query", "description": "Part of the author name", "schema": { "type": "string" } },
                        { "name": "year", "in": "query", "description": "Publication year", "schema": { "type": "integer" } }
                    ],
                    "responses": {
                        "200": {
                            "description": "Matching books",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "/books/{book_id}": {
                "put": {
                    "summary": "Update a book",
                    "tags": ["Books"],
                    "parameters": [book_id_param.clone()],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BookUpdate" }
                            }
                        }
                    },
                    "responses": {
                        "200": book_response("Updated book"),
                        "400": error_response("No fields to update"),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [book_id_param],
                    "responses": {
                        "200": {
                            "description": "Book deleted",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": { "message": { "type": "string" } },
                                        "required": ["message"]
                                    }
                                }
                            }
                        },
                        "404": error_response("Book not found")
                    }
                }
            },
            "/books/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "year": { "type": "integer", "nullable": true }
                    },
                    "required": ["id", "title", "author", "year"]
                },
                "BookCreate": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "minLength": 1 },
                        "author": { "type": "string", "minLength": 1 },
                        "year": { "type": "integer", "nullable": true }
                    },
                    "required": ["title", "author"]
                },
                "BookUpdate": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "minLength": 1, "nullable": true },
                        "author": { "type": "string", "minLength": 1, "nullable": true },
                        "year": { "type": "integer", "nullable": true }
                    }
                }
            }
        }
    })
}
