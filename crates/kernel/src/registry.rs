use anyhow::Context;
use std::sync::Arc;

use bookshelf_db::Database;

use crate::module::{InitCtx, Migration, Module};

/// Module registry driving the lifecycle of every registered module.
///
/// Modules are initialized and started in registration order and stopped in
/// reverse order.
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module with the registry
    pub fn register(&mut self, module: Arc<dyn Module>) {
        tracing::debug!(module = module.name(), "module registered");
        self.modules.push(module);
    }

    /// Get all registered modules in registration order
    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Initialize modules in registration order
    pub async fn init_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Start modules in registration order
    pub async fn start_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        for module in &self.modules {
            tracing::info!(module = module.name(), "starting module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop modules in reverse registration order
    pub async fn stop_modules(&self) -> anyhow::Result<()> {
        tracing::info!("stopping {} modules", self.modules.len());

        for module in self.modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Collect schema statements from all modules, keyed by module name.
    ///
    /// Sorted by module name then statement id so the order does not depend
    /// on registration order.
    pub fn collect_migrations(&self) -> Vec<(String, Migration)> {
        let mut migrations = Vec::new();

        for module in &self.modules {
            for migration in module.migrations() {
                migrations.push((module.name().to_string(), migration));
            }
        }

        migrations.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(b.1.id)));

        migrations
    }

    /// Create any missing tables declared by registered modules.
    pub async fn apply_schema(&self, db: &Database) -> anyhow::Result<()> {
        let migrations = self.collect_migrations();

        tracing::info!(count = migrations.len(), "applying module schema");

        for (module_name, migration) in migrations {
            db.execute_schema(migration.up)
                .await
                .with_context(|| {
                    format!(
                        "failed to apply schema '{}' of module '{}'",
                        migration.id, module_name
                    )
                })?;

            tracing::debug!(module = %module_name, id = migration.id, "schema applied");
        }

        Ok(())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DatabaseSettings, Settings};
    use std::sync::Mutex;

    struct TestModule {
        name: &'static str,
        events: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(format!("init:{}", self.name));
            Ok(())
        }

        fn migrations(&self) -> Vec<Migration> {
            vec![
                Migration {
                    id: "002_index",
                    up: "CREATE INDEX IF NOT EXISTS widget_label ON widget (label);",
                },
                Migration {
                    id: "001_init",
                    up: "CREATE TABLE IF NOT EXISTS widget (id INTEGER PRIMARY KEY, label TEXT);",
                },
            ]
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(format!("stop:{}", self.name));
            Ok(())
        }
    }

    async fn memory_db() -> Database {
        Database::connect(&DatabaseSettings::in_memory().to_options())
            .await
            .unwrap()
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.modules().is_empty());
        assert!(registry.collect_migrations().is_empty());
    }

    #[test]
    fn test_migrations_are_sorted_by_id() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule {
            name: "widgets",
            events: Arc::default(),
        }));

        let ids: Vec<_> = registry
            .collect_migrations()
            .into_iter()
            .map(|(_, migration)| migration.id)
            .collect();

        assert_eq!(ids, vec!["001_init", "002_index"]);
        assert!(registry.get_module("widgets").is_some());
        assert!(registry.get_module("gadgets").is_none());
    }

    #[tokio::test]
    async fn test_module_lifecycle_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule {
            name: "first",
            events: events.clone(),
        }));
        registry.register(Arc::new(TestModule {
            name: "second",
            events: events.clone(),
        }));

        let settings = Settings::default();
        let db = memory_db().await;
        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };

        registry.init_modules(&ctx).await.unwrap();
        registry.start_modules(&ctx).await.unwrap();
        registry.stop_modules().await.unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["init:first", "init:second", "stop:second", "stop:first"]
        );
    }

    #[tokio::test]
    async fn test_apply_schema_is_idempotent() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule {
            name: "widgets",
            events: Arc::default(),
        }));
        let db = memory_db().await;

        registry.apply_schema(&db).await.unwrap();
        registry.apply_schema(&db).await.unwrap();

        assert!(db.table_exists("widget").await.unwrap());
    }
}
