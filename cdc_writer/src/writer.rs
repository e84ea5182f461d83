use std::path::PathBuf;
use std::sync::Arc;

use cdc_collapser::DayEffects;
use common::err::CResult;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::day_file::{load_existing, write_rows};
use crate::row::StoredRow;

/// Outcome of writing one day's effects to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOutcome {
    pub day: String,
    pub rows_written: usize,
    pub file_removed: bool,
}

/// Totals across every day a batch touched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub days_written: usize,
    pub days_removed: usize,
    pub rows_written: usize,
}

impl WriteSummary {
    fn record(&mut self, outcome: &DayOutcome) {
        if outcome.file_removed {
            self.days_removed += 1;
        } else {
            self.days_written += 1;
        }
        self.rows_written += outcome.rows_written;
    }
}

/// Applies one day's effects to the rows currently on disk at `path`.
///
/// Order matters: deletes first, then updates (only against keys that
/// survive the deletes and already exist on disk), then inserts (which
/// always win, creating or replacing the row). The result is sorted by
/// `id` ascending so reruns over the same input produce byte-identical
/// files.
pub fn apply_effects(
    mut existing: std::collections::HashMap<i64, StoredRow>,
    effects: &DayEffects,
) -> Vec<StoredRow> {
    for pk in &effects.deletes {
        existing.remove(pk);
    }
    for (pk, row) in &effects.updates {
        if existing.contains_key(pk) {
            existing.insert(*pk, StoredRow::from_collapsed(*pk, row));
        }
    }
    for (pk, row) in &effects.inserts {
        existing.insert(*pk, StoredRow::from_collapsed(*pk, row));
    }

    let mut rows: Vec<StoredRow> = existing.into_values().collect();
    rows.sort_by_key(|r| r.id);
    rows
}

fn write_one_day(path: PathBuf, day: String, effects: DayEffects) -> CResult<DayOutcome> {
    let existing = load_existing(&path)?;
    let rows = apply_effects(existing, &effects);
    let rows_written = rows.len();
    write_rows(&path, &rows)?;

    Ok(DayOutcome {
        day,
        rows_written,
        file_removed: rows_written == 0,
    })
}

/// Writes every touched day's effects to disk, bounded to at most `workers`
/// concurrent day files (defaulting to `min(days touched, num_cpus)`).
pub async fn write_all<F>(
    day_effects: std::collections::HashMap<String, DayEffects>,
    workers: Option<usize>,
    day_path: F,
) -> CResult<WriteSummary>
where
    F: Fn(&str) -> PathBuf,
{
    // A day whose net batch effect is empty must not touch disk at all
    // (the existing file, if any, may be corrupted and that is not this
    // batch's problem to surface).
    let day_effects: std::collections::HashMap<String, DayEffects> = day_effects
        .into_iter()
        .filter(|(_, effects)| !effects.is_empty())
        .collect();

    let days_touched = day_effects.len();
    if days_touched == 0 {
        return Ok(WriteSummary::default());
    }

    let pool_size = workers
        .unwrap_or_else(|| days_touched.min(num_cpus::get()))
        .max(1);
    let semaphore = Arc::new(Semaphore::new(pool_size));

    info!(days = days_touched, workers = pool_size, "writing day partitions");

    let mut join_set = JoinSet::new();
    for (day, effects) in day_effects {
        let path = day_path(&day);
        let semaphore = semaphore.clone();
        join_set.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore is never closed while tasks are outstanding");
            tokio::task::spawn_blocking(move || write_one_day(path, day, effects))
                .await
                .expect("day-writer task panicked")
        });
    }

    let mut summary = WriteSummary::default();
    while let Some(result) = join_set.join_next().await {
        let outcome = result.expect("day-writer task panicked")?;
        if outcome.file_removed {
            warn!(day = %outcome.day, "day partition is now empty, file removed");
        }
        summary.record(&outcome);
    }

    Ok(summary)
}
