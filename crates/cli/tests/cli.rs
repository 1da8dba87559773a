use assert_cmd::Command;

#[test]
fn help_lists_subcommands() {
    let output = Command::cargo_bin("bookshelf-cli")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("init-db"));
}

#[test]
fn init_db_creates_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("books.sqlite3");
    std::fs::write(
        dir.path().join("base.toml"),
        format!("[database]\nurl = \"sqlite://{}\"\n", db_path.display()),
    )
    .unwrap();

    Command::cargo_bin("bookshelf-cli")
        .unwrap()
        .env_remove("BOOKSHELF_DATABASE__URL")
        .env("RUST_LOG", "warn")
        .current_dir(dir.path())
        .args(["--config-dir", dir.path().to_str().unwrap(), "init-db"])
        .assert()
        .success();

    assert!(db_path.exists());

    // A second run against the existing schema is a no-op.
    Command::cargo_bin("bookshelf-cli")
        .unwrap()
        .env_remove("BOOKSHELF_DATABASE__URL")
        .env("RUST_LOG", "warn")
        .current_dir(dir.path())
        .args(["--config-dir", dir.path().to_str().unwrap(), "init-db"])
        .assert()
        .success();
}

#[test]
fn unknown_environment_fails() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("bookshelf-cli")
        .unwrap()
        .current_dir(dir.path())
        .args(["--env", "moon", "init-db"])
        .assert()
        .failure();
}
