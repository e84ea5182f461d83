//! End-to-end test of reader -> collapser -> writer, against real Parquet
//! files in a temporary directory. Mirrors the scenarios in the design docs
//! (insert/update collapse, insert/delete elision, routing across days,
//! updates against a pre-existing file).

use std::io::Cursor;

use cdc_collapser::Collapser;
use cdc_reader::EventReader;
use cdc_writer::day_file::load_existing;
use cdc_writer::writer::write_all;

fn run_batch(input: &str, base_dir: &std::path::Path) {
    let reader = EventReader::new(Cursor::new(input.as_bytes()), "metrics", "readings");
    let mut collapser = Collapser::new();
    for event in reader {
        collapser.apply(event.expect("test input is well-formed"));
    }

    let day_effects = collapser.into_day_effects();
    let base_dir = base_dir.to_path_buf();
    let summary = tokio_test_block_on(write_all(day_effects, None, move |day| {
        base_dir.join(format!("{day}.parquet"))
    }));
    summary.expect("write_all should succeed against a scratch directory");
}

fn tokio_test_block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build a current-thread runtime for the test")
        .block_on(fut)
}

#[test]
fn insert_then_update_same_day_collapses_to_the_latest_value() {
    let dir = tempfile::tempdir().unwrap();
    let input = "\
INSERT INTO `metrics`.`readings`
SET
@1=1
@3='2025-01-02 03:04:05'
@4=10.0
@6=1735787045
UPDATE `metrics`.`readings`
SET
@1=1
@3='2025-01-02 03:05:00'
@4=11.0
@6=1735787100
";
    run_batch(input, dir.path());

    let path = dir.path().join("2025-01-02.parquet");
    let rows = load_existing(&path).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[&1];
    assert_eq!(row.date_time, "2025-01-02 03:05:00");
    assert_eq!(row.value, Some(11.0));
}

#[test]
fn insert_then_delete_same_day_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = "\
INSERT INTO `metrics`.`readings`
SET
@1=2
@3='2025-01-02 00:00:00'
@4=NULL
@6=1
DELETE FROM `metrics`.`readings`
WHERE
@1=2
@3='2025-01-02 00:00:01'
";
    run_batch(input, dir.path());

    let path = dir.path().join("2025-01-02.parquet");
    assert!(!path.exists());
}

#[test]
fn update_then_delete_removes_a_row_that_preexisted_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("2025-01-03.parquet");

    // Pre-state: a file that already holds pk=7 from a previous batch.
    let seed = "\
INSERT INTO `metrics`.`readings`
SET
@1=7
@3='2025-01-03 09:00:00'
@4=1.0
@6=1
";
    run_batch(seed, dir.path());
    assert!(path.exists());

    let input = "\
UPDATE `metrics`.`readings`
SET
@1=7
@3='2025-01-03 10:00:00'
@4=2.0
@6=2
DELETE FROM `metrics`.`readings`
WHERE
@1=7
@3='2025-01-03 11:00:00'
";
    run_batch(input, dir.path());

    // That was the only row for the day, so the file must be gone.
    assert!(!path.exists());
}

#[test]
fn update_against_a_pk_never_seen_in_the_day_is_a_silent_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let input = "\
UPDATE `metrics`.`readings`
SET
@1=99
@3='2025-01-04 12:00:00'
@4=5.0
@6=1
";
    run_batch(input, dir.path());

    let path = dir.path().join("2025-01-04.parquet");
    assert!(!path.exists());
}

#[test]
fn events_route_to_the_file_named_after_their_own_day() {
    let dir = tempfile::tempdir().unwrap();
    let input = "\
INSERT INTO `metrics`.`readings`
SET
@1=1
@3='2025-01-05 23:59:59'
@4=1.0
@6=1
INSERT INTO `metrics`.`readings`
SET
@1=2
@3='2025-01-06 00:00:00'
@4=2.0
@6=2
";
    run_batch(input, dir.path());

    let day5 = load_existing(&dir.path().join("2025-01-05.parquet")).unwrap();
    let day6 = load_existing(&dir.path().join("2025-01-06.parquet")).unwrap();
    assert_eq!(day5.len(), 1);
    assert!(day5.contains_key(&1));
    assert_eq!(day6.len(), 1);
    assert!(day6.contains_key(&2));
}

#[test]
fn a_null_value_round_trips_as_null_not_zero() {
    let dir = tempfile::tempdir().unwrap();
    let input = "\
INSERT INTO `metrics`.`readings`
SET
@1=3
@3='2025-01-07 00:00:00'
@4=NULL
@6=1
";
    run_batch(input, dir.path());

    let rows = load_existing(&dir.path().join("2025-01-07.parquet")).unwrap();
    assert_eq!(rows[&3].value, None);
}

#[test]
fn replaying_the_same_batch_twice_converges_to_the_same_state() {
    let dir = tempfile::tempdir().unwrap();
    let input = "\
INSERT INTO `metrics`.`readings`
SET
@1=1
@3='2025-01-08 00:00:00'
@4=1.0
@6=1
UPDATE `metrics`.`readings`
SET
@1=1
@3='2025-01-08 00:00:01'
@4=2.0
@6=2
";
    run_batch(input, dir.path());
    let first = load_existing(&dir.path().join("2025-01-08.parquet")).unwrap();

    run_batch(input, dir.path());
    let second = load_existing(&dir.path().join("2025-01-08.parquet")).unwrap();

    assert_eq!(first, second);
}
