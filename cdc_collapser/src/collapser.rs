use std::collections::{HashMap, HashSet};

use cdc_reader::{EventKind, RowEvent};

/// The reduced effect of a batch on one row, independent of how it will be
/// stored: just the fields an event carries.
#[derive(Debug, Clone, PartialEq)]
pub struct CollapsedRow {
    pub date_time: String,
    pub value: Option<f64>,
    pub ts: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Insert,
    Update,
}

#[derive(Default)]
struct DayState {
    upserts: HashMap<i64, (CollapsedRow, Origin)>,
    deletes: HashSet<i64>,
}

/// The reduced effect of a batch on one day: what to delete, what to insert
/// (upsert), and what to update (only if the key already exists on disk).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DayEffects {
    pub inserts: HashMap<i64, CollapsedRow>,
    pub updates: HashMap<i64, CollapsedRow>,
    pub deletes: HashSet<i64>,
}

impl DayEffects {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Reduces a stream of [`RowEvent`]s into a minimal per-`(day, pk)` effect
/// set. See the reduction table in the module-level design notes for the
/// exact rules; this type is pure in-memory state, there is no I/O here.
#[derive(Default)]
pub struct Collapser {
    days: HashMap<String, DayState>,
}

impl Collapser {
    pub fn new() -> Self {
        Collapser::default()
    }

    /// Applies one event to the collapsed state. The day routed to is always
    /// the event's own `dt`, never any day previously recorded for this `pk`.
    pub fn apply(&mut self, event: RowEvent) {
        let day = event.day().to_string();
        let state = self.days.entry(day).or_default();

        let row = CollapsedRow {
            date_time: event.dt,
            value: event.val,
            ts: event.ts,
        };

        match event.kind {
            EventKind::Insert => {
                state.deletes.remove(&event.pk);
                state.upserts.insert(event.pk, (row, Origin::Insert));
            }
            EventKind::Update => {
                state.deletes.remove(&event.pk);
                let origin = match state.upserts.get(&event.pk) {
                    Some((_, Origin::Insert)) => Origin::Insert,
                    _ => Origin::Update,
                };
                state.upserts.insert(event.pk, (row, origin));
            }
            EventKind::Delete => match state.upserts.remove(&event.pk) {
                Some((_, Origin::Insert)) => {
                    // The row never left this batch alive on disk; nothing to delete.
                }
                Some((_, Origin::Update)) => {
                    state.deletes.insert(event.pk);
                }
                None => {
                    state.deletes.insert(event.pk);
                }
            },
        }
    }

    /// Days touched by the batch so far, in no particular order.
    pub fn touched_days(&self) -> impl Iterator<Item = &str> {
        self.days.keys().map(|d| d.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Consumes the collapsed state, splitting each day's upserts into
    /// `inserts` and `updates` for the writer.
    pub fn into_day_effects(self) -> HashMap<String, DayEffects> {
        self.days
            .into_iter()
            .map(|(day, state)| {
                let mut effects = DayEffects {
                    deletes: state.deletes,
                    ..Default::default()
                };
                for (pk, (row, origin)) in state.upserts {
                    match origin {
                        Origin::Insert => {
                            effects.inserts.insert(pk, row);
                        }
                        Origin::Update => {
                            effects.updates.insert(pk, row);
                        }
                    }
                }
                (day, effects)
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn insert(pk: i64, dt: &str, val: Option<f64>, ts: u64) -> RowEvent {
        RowEvent {
            kind: EventKind::Insert,
            pk,
            dt: dt.to_string(),
            val,
            ts,
        }
    }

    fn update(pk: i64, dt: &str, val: Option<f64>, ts: u64) -> RowEvent {
        RowEvent {
            kind: EventKind::Update,
            pk,
            dt: dt.to_string(),
            val,
            ts,
        }
    }

    fn delete(pk: i64, dt: &str) -> RowEvent {
        RowEvent {
            kind: EventKind::Delete,
            pk,
            dt: dt.to_string(),
            val: None,
            ts: 0,
        }
    }

    #[test]
    fn insert_then_update_collapses_to_a_single_insert_with_the_latest_value() {
        let mut c = Collapser::new();
        c.apply(insert(1, "2025-01-02 03:04:05", Some(10.0), 1735787045));
        c.apply(update(1, "2025-01-02 03:05:00", Some(11.0), 1735787100));

        let days = c.into_day_effects();
        let day = &days["2025-01-02"];
        assert_eq!(day.inserts.len(), 1);
        assert!(day.updates.is_empty());
        assert!(day.deletes.is_empty());
        assert_eq!(day.inserts[&1].value, Some(11.0));
    }

    #[test]
    fn insert_then_delete_is_a_no_op_for_that_day() {
        let mut c = Collapser::new();
        c.apply(insert(2, "2025-01-02 00:00:00", None, 1));
        c.apply(delete(2, "2025-01-02 00:00:01"));

        let days = c.into_day_effects();
        assert!(days["2025-01-02"].is_empty());
    }

    #[test]
    fn update_then_delete_still_emits_a_delete() {
        let mut c = Collapser::new();
        c.apply(update(7, "2025-01-03 10:00:00", Some(2.0), 100));
        c.apply(delete(7, "2025-01-03 11:00:00"));

        let days = c.into_day_effects();
        let day = &days["2025-01-03"];
        assert!(day.inserts.is_empty());
        assert!(day.updates.is_empty());
        assert!(day.deletes.contains(&7));
    }

    #[test]
    fn a_bare_delete_with_no_prior_state_records_a_delete() {
        let mut c = Collapser::new();
        c.apply(delete(99, "2025-01-04 12:00:00"));

        let days = c.into_day_effects();
        assert!(days["2025-01-04"].deletes.contains(&99));
    }

    #[test]
    fn events_for_the_same_pk_on_different_days_are_tracked_independently() {
        let mut c = Collapser::new();
        c.apply(insert(1, "2025-01-05 23:59:59", Some(1.0), 1));
        c.apply(insert(1, "2025-01-06 00:00:00", Some(2.0), 2));

        let days = c.into_day_effects();
        assert_eq!(days["2025-01-05"].inserts[&1].value, Some(1.0));
        assert_eq!(days["2025-01-06"].inserts[&1].value, Some(2.0));
    }

    #[test]
    fn delete_after_insert_following_a_deletion_in_the_batch_drops_the_delete() {
        let mut c = Collapser::new();
        c.apply(delete(5, "2025-01-02 00:00:00"));
        c.apply(insert(5, "2025-01-02 00:00:01", Some(1.0), 1));

        let days = c.into_day_effects();
        let day = &days["2025-01-02"];
        assert!(day.deletes.is_empty());
        assert_eq!(day.inserts[&5].value, Some(1.0));
    }

    #[test]
    fn update_reclaims_a_pk_that_was_pending_delete_in_the_same_batch() {
        let mut c = Collapser::new();
        c.apply(delete(6, "2025-01-02 00:00:00"));
        c.apply(update(6, "2025-01-02 00:00:01", Some(9.0), 1));

        let days = c.into_day_effects();
        let day = &days["2025-01-02"];
        assert!(day.deletes.is_empty());
        assert_eq!(day.updates[&6].value, Some(9.0));
    }

    #[test]
    fn touched_days_reflects_every_day_seen() {
        let mut c = Collapser::new();
        c.apply(insert(1, "2025-01-05 00:00:00", Some(1.0), 1));
        c.apply(delete(2, "2025-01-06 00:00:00"));

        let mut days: Vec<_> = c.touched_days().collect();
        days.sort();
        assert_eq!(days, vec!["2025-01-05", "2025-01-06"]);
    }
}
