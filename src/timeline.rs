//! Personal-best-over-time table.
//!
//! Dated runs are applied in date order (stable on ties) to a running
//! snapshot holding one cell per identity. A cell only changes when a
//! strictly faster run arrives for that identity, so equal times keep the
//! earlier run. One row is emitted per calendar day from the first dated
//! run through the last one; days without runs repeat the previous row.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::model::{NormalizedRun, RunDetail};

pub type DetailMap = BTreeMap<String, RunDetail>;

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineRow {
    pub date: NaiveDate,
    /// Run id per identity column, `None` until the identity has a record.
    pub cells: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    /// Column keys, in order of first appearance among the sorted runs.
    pub identities: Vec<String>,
    pub rows: Vec<TimelineRow>,
}

impl Timeline {
    pub fn column(&self, identity: &str) -> Option<usize> {
        self.identities.iter().position(|i| i == identity)
    }

    pub fn row(&self, date: NaiveDate) -> Option<&TimelineRow> {
        self.rows.iter().find(|r| r.date == date)
    }

    pub fn cell(&self, date: NaiveDate, identity: &str) -> Option<&str> {
        let col = self.column(identity)?;
        self.row(date)?.cells.get(col)?.as_deref()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub timeline: Timeline,
    /// Attributes of every run id referenced somewhere in the timeline.
    pub details: DetailMap,
}

/// Dated runs only, ordered by performed date; input order breaks ties.
pub fn sort_dated(runs: &[NormalizedRun]) -> Vec<(&NormalizedRun, NaiveDate)> {
    let mut dated = runs
        .iter()
        .filter_map(|run| run.performed_date.map(|date| (run, date)))
        .collect::<Vec<_>>();
    dated.sort_by_key(|(_, date)| *date);
    dated
}

/// Returns `None` when no run has a resolvable date.
pub fn aggregate(runs: &[NormalizedRun]) -> Option<Aggregation> {
    let dated = sort_dated(runs);
    let first = dated.first()?.1;
    let last = dated.last()?.1;

    let mut identities = Vec::new();
    let mut columns: HashMap<&str, usize> = HashMap::new();
    for &(run, _) in &dated {
        if !columns.contains_key(run.identity.as_str()) {
            columns.insert(run.identity.as_str(), identities.len());
            identities.push(run.identity.clone());
        }
    }

    let span = (last - first).num_days().max(0) as usize + 1;
    let mut snapshot: Vec<Option<&NormalizedRun>> = vec![None; identities.len()];
    let mut changed: Vec<usize> = Vec::new();
    let mut details = DetailMap::new();
    let mut rows = Vec::with_capacity(span);

    let mut pending = dated.into_iter().peekable();
    let mut day = first;
    while day <= last {
        while let Some((run, _)) = pending.next_if(|(_, date)| *date <= day) {
            let col = columns[run.identity.as_str()];
            let improves = match snapshot[col] {
                None => true,
                Some(incumbent) => run.elapsed_seconds < incumbent.elapsed_seconds,
            };
            if improves {
                snapshot[col] = Some(run);
                changed.push(col);
            }
        }

        // A run replaced again before its row was emitted never reaches the table.
        for col in changed.drain(..) {
            if let Some(run) = snapshot[col] {
                details.insert(run.id.clone(), run.detail());
            }
        }

        rows.push(TimelineRow {
            date: day,
            cells: snapshot.iter().map(|c| c.map(|r| r.id.clone())).collect(),
        });

        if pending.peek().is_none() {
            break;
        }
        let Some(next) = day.succ_opt() else {
            break;
        };
        day = next;
    }

    Some(Aggregation {
        timeline: Timeline { identities, rows },
        details,
    })
}
