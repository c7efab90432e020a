use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

fn shelf(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("shelf").unwrap();
    cmd.env("SHELF_CONFIG_DIR", dir.path())
        .env_remove("SHELF_ENV")
        .env_remove("RUST_LOG")
        .arg("--data-file")
        .arg(dir.path().join("books.json"));
    cmd
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

fn failure_stderr(cmd: &mut Command) -> String {
    let output = cmd.assert().failure().get_output().stderr.clone();
    String::from_utf8_lossy(&output).into_owned()
}

fn books_on_disk(path: &Path) -> Value {
    let catalog: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    catalog["books"].clone()
}

#[test]
fn stats_seed_a_missing_catalog() {
    let dir = TempDir::new().unwrap();
    let stats = json_output(shelf(&dir).arg("stats"));

    assert_eq!(stats["totalBooks"], 3);
    assert_eq!(stats["borrowedBooks"], 1);
    assert_eq!(stats["availableBooks"], 2);
    assert!(dir.path().join("books.json").exists());
}

#[test]
fn add_then_borrow_then_return() {
    let dir = TempDir::new().unwrap();

    let added = json_output(shelf(&dir).args([
        "add",
        "--title",
        "Hyperion",
        "--author",
        "Dan Simmons",
        "--year",
        "1989",
        "--genre",
        "Science Fiction",
    ]));
    assert_eq!(added["id"], "4");
    assert_eq!(added["isAvailable"], true);

    let borrowed = json_output(shelf(&dir).args([
        "borrow",
        "4",
        "--borrower",
        "Bob Smith",
        "--due",
        "2099-01-15",
        "--email",
        "bob@example.com",
    ]));
    assert_eq!(borrowed["isAvailable"], false);
    assert_eq!(borrowed["borrower"], "Bob Smith");
    assert_eq!(borrowed["readerEmail"], "bob@example.com");

    let returned = json_output(shelf(&dir).args(["return", "4"]));
    assert_eq!(returned["isAvailable"], true);
    assert!(returned.get("borrower").map_or(true, Value::is_null));

    let books = books_on_disk(&dir.path().join("books.json"));
    assert_eq!(books.as_array().unwrap().len(), 4);
}

#[test]
fn logs_go_to_stderr_and_leave_stdout_parseable() {
    let dir = TempDir::new().unwrap();
    let output = shelf(&dir)
        .env("RUST_LOG", "info")
        .arg("stats")
        .assert()
        .success()
        .get_output()
        .clone();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("shelf CLI bootstrap"), "{stderr}");
    let stats: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["totalBooks"], 3);
}

#[test]
fn list_filters_borrowed_books() {
    let dir = TempDir::new().unwrap();
    let books = json_output(shelf(&dir).args(["list", "--filter", "borrowed"]));

    let books = books.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "Dune");
}

#[test]
fn update_requires_a_field() {
    let dir = TempDir::new().unwrap();
    let stderr = failure_stderr(shelf(&dir).args(["update", "1"]));
    assert!(stderr.contains("no fields to update"), "{stderr}");
}

#[test]
fn unknown_book_fails_with_message() {
    let dir = TempDir::new().unwrap();
    let stderr = failure_stderr(shelf(&dir).args(["show", "42"]));
    assert!(stderr.contains("book 42 not found"), "{stderr}");
}

#[test]
fn delete_removes_the_record() {
    let dir = TempDir::new().unwrap();
    json_output(shelf(&dir).args(["delete", "1"]));

    let books = books_on_disk(&dir.path().join("books.json"));
    let ids: Vec<_> = books
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["2", "3"]);

    shelf(&dir).args(["delete", "1"]).assert().failure();
}

#[test]
fn unknown_sort_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    shelf(&dir)
        .args(["list", "--sort", "popularity"])
        .assert()
        .failure();
}
