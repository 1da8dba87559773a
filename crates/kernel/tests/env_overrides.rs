//! Environment variables are process-wide, so these cases live in their own
//! test binary and run one after another inside a single test.

use bookshelf_kernel::settings::Settings;

/// Sets variables for the lifetime of the guard and clears them on drop.
struct EnvGuard {
    keys: Vec<&'static str>,
}

impl EnvGuard {
    fn set(vars: &[(&'static str, &str)]) -> Self {
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        Self {
            keys: vars.iter().map(|(key, _)| *key).collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn bookshelf_variables_override_config_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("base.toml"),
        "[server]\nport = 9100\nhost = \"127.0.0.1\"\n\n[database]\nurl = \"sqlite://base.sqlite3\"\n",
    )
    .unwrap();

    {
        let _env = EnvGuard::set(&[
            ("BOOKSHELF_SERVER__PORT", "9300"),
            ("BOOKSHELF_DATABASE__URL", "sqlite://from-env.sqlite3"),
            ("BOOKSHELF_DATABASE__MAX_CONNECTIONS", "2"),
        ]);

        let settings = Settings::load_from(dir.path(), "local").unwrap();

        assert_eq!(settings.server.port, 9300);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.database.url, "sqlite://from-env.sqlite3");
        assert_eq!(settings.database.max_connections, 2);
    }

    // Once the variables are gone the file values apply again.
    let settings = Settings::load_from(dir.path(), "local").unwrap();
    assert_eq!(settings.server.port, 9100);
    assert_eq!(settings.database.url, "sqlite://base.sqlite3");
}
