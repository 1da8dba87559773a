//! Bookshelf application library
//!
//! Wires the books module into the kernel registry, prepares storage and
//! runs the HTTP server.

pub mod modules;

use anyhow::Context;
use axum::Router;
use bookshelf_db::Database;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// A bootstrapped application: storage is open and the schema exists.
pub struct Application {
    settings: Settings,
    db: Database,
    registry: ModuleRegistry,
}

/// Open the database, register modules, and create any missing tables.
pub async fn bootstrap(settings: Settings) -> anyhow::Result<Application> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "bookshelf bootstrap starting"
    );

    let db = Database::connect(&settings.database.to_options())
        .await
        .context("failed to open database")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &db);

    let ctx = InitCtx {
        settings: &settings,
        db: &db,
    };
    registry.init_modules(&ctx).await?;
    registry.apply_schema(&db).await?;

    tracing::info!(modules = registry.module_count(), "bookshelf bootstrap complete");

    Ok(Application {
        settings,
        db,
        registry,
    })
}

impl Application {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The full HTTP router, without binding a socket.
    pub fn router(&self) -> Router {
        bookshelf_http::build_router(&self.registry, &self.settings)
    }

    /// Start modules and serve HTTP until a shutdown signal arrives.
    pub async fn serve(self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.db,
        };
        self.registry.start_modules(&ctx).await?;

        let served = bookshelf_http::start_server(&self.registry, &self.settings).await;

        self.shutdown().await?;

        served
    }

    /// Stop modules and close the database.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.registry.stop_modules().await?;
        self.db.close().await;
        Ok(())
    }
}
