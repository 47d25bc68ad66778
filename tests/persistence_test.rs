#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

fn run(db_path: &std::path::Path, args: &[&str]) -> String {
    let output = Command::new(cargo_bin!("budget-ledger"))
        .args(args)
        .arg("--db-path")
        .arg(db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "{args:?} failed");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. Budget survives the process that set it
    run(&db_path, &["budget", "set", "food", "1000"]);
    assert!(run(&db_path, &["budget", "list"]).contains("food,1000"));

    // 2. Import enforces the stored budget
    let imported = run(&db_path, &["import", "tests/fixtures/transactions.csv"]);
    assert!(imported.contains(r#""accepted":3"#));

    // 3. Spending carries over: 200 already spent, so 900 is refused and 800 fits
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut csv, b"category,amount\nfood,900\nfood,800\n").unwrap();
    let csv_path = csv.path().to_string_lossy().into_owned();
    let second = run(&db_path, &["import", &csv_path, "--workers", "1"]);
    assert!(second.contains(r#""accepted":1"#));
    assert!(second.contains(r#""rejected":1"#));

    let listed = run(&db_path, &["list"]);
    assert_eq!(listed.lines().count(), 1 + 4);
}
