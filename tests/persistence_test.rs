#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;

fn run(db_path: &std::path::Path, args: &[&str]) -> std::process::Output {
    Command::new(cargo_bin!("member-payments"))
        .arg("--db-path")
        .arg(db_path)
        .args(args)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: create a payment
    let created = run(
        &db_path,
        &[
            "create",
            "--title",
            "t",
            "--description",
            "d",
            "--category",
            "FEDERATE",
            "--amount",
            "10",
            "--user",
            "X",
        ],
    );
    assert!(created.status.success());
    let id = common::ids_from_output(&created.stdout).remove(0);

    // 2. Second run: settle it using the same DB path
    let paid = run(&db_path, &["pay", &id, "--at", "2024-12-10T10:20"]);
    assert!(paid.status.success());
    let stdout = String::from_utf8_lossy(&paid.stdout);
    assert!(stdout.contains(",PAID,X,"));
    assert!(stdout.ends_with(",2024-12-10T10:20:00\n"));

    // 3. Third run: a second settlement conflicts with the persisted state
    let again = run(&db_path, &["pay", &id, "--at", "2024-12-11T09:00"]);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("have not UNPAID state"));

    // 4. The member's list still holds exactly one payment
    let listed = run(&db_path, &["list", "--user", "X"]);
    assert!(listed.status.success());
    assert_eq!(common::ids_from_output(&listed.stdout), vec![id]);
}
