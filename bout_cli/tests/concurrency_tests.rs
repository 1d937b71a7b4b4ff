//! Concurrency tests for the bout binary.
//!
//! These tests verify that multiple processes can safely:
//! - Save workouts to the same library simultaneously (file locking)
//! - Read the library while it is being written

use assert_cmd::Command;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("bout"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_concurrent_saves_are_not_lost() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(i * 2));
                cli()
                    .args(["workouts", "save"])
                    .arg(format!("workout-{}", i))
                    .args(["--preset", "30", "--data-dir"])
                    .arg(&data_dir)
                    .timeout(Duration::from_secs(10))
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let contents =
        std::fs::read_to_string(data_dir.join("workouts.json")).expect("Failed to read library");
    let parsed: serde_json::Value =
        serde_json::from_str(&contents).expect("Library is not valid JSON");
    let count = parsed["workouts"].as_array().map_or(0, |w| w.len());
    assert_eq!(count, 10, "Expected 10 saved workouts, got {}", count);
}

#[test]
fn test_reads_during_writes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    cli()
        .args(["workouts", "save", "base", "--preset", "30", "--data-dir"])
        .arg(&data_dir)
        .assert()
        .success();

    let writer_dir = data_dir.clone();
    let writer = thread::spawn(move || {
        for i in 0..5 {
            cli()
                .args(["workouts", "add-block", "base", "heavy_bag", "--data-dir"])
                .arg(&writer_dir)
                .assert()
                .success();
            thread::sleep(Duration::from_millis(i));
        }
    });

    for _ in 0..5 {
        cli()
            .args(["workouts", "show", "base", "--data-dir"])
            .arg(&data_dir)
            .assert()
            .success();
    }

    writer.join().expect("Writer thread panicked");

    let contents = std::fs::read_to_string(data_dir.join("workouts.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed["workouts"][0]["blocks"].as_array().unwrap().len(), 11);
}
