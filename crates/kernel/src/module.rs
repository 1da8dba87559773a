use async_trait::async_trait;
use axum::Router;

use bookshelf_db::Database;

/// Shared handles passed to every lifecycle hook.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub db: &'a Database,
}

/// Schema statement contributed by a module.
///
/// `up` must be idempotent (`CREATE TABLE IF NOT EXISTS ...`): it runs on
/// every startup and nothing records whether it ran before.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// A feature slice of the service: its routes, its tables and its lifecycle.
#[async_trait]
pub trait Module: Sync + Send {
    /// Registry key, also used in log fields.
    fn name(&self) -> &'static str;

    /// Runs once at bootstrap, before any table exists.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes.
    /// Paths are absolute; the router is merged into the application as is.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` and `components.schemas`) merged into the served document.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Tables and indexes this module needs. Applied in id order.
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Runs after the schema is applied and before the listener binds.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs on shutdown, in reverse registration order.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
