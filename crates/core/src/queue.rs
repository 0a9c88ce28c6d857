//! Queue ordering rules.
//!
//! Every job carries two independent orderings:
//!
//! - the authority position, assigned `max + 1` per printer at creation;
//! - the local position, assigned `max + 1` per printer when the agent
//!   marks the job downloaded, then freely reassignable by the operator.
//!
//! Positions are sort keys, not unique constraints. Duplicates from a
//! concurrent `max + 1` are tolerated and broken by the tie-break rules in
//! [`display_cmp`].

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::{DbId, Timestamp};

/// Which ordering a queue view sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueDimension {
    Authority,
    Local,
}

/// Anything that can appear in a queue view.
pub trait Queued {
    fn priority(&self) -> i32;
    fn position(&self, dimension: QueueDimension) -> Option<i32>;
    fn created_at(&self) -> Timestamp;
}

/// Display order: priority descending, then position ascending (unset
/// positions last), then creation time ascending.
pub fn display_cmp<T: Queued>(a: &T, b: &T, dimension: QueueDimension) -> Ordering {
    b.priority()
        .cmp(&a.priority())
        .then_with(|| cmp_position(a.position(dimension), b.position(dimension)))
        .then_with(|| a.created_at().cmp(&b.created_at()))
}

fn cmp_position(a: Option<i32>, b: Option<i32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort a queue view in place. The sort is stable.
pub fn sort_for_display<T: Queued>(items: &mut [T], dimension: QueueDimension) {
    items.sort_by(|a, b| display_cmp(a, b, dimension));
}

/// Next position after the current maximum in scope (`1` for an empty scope).
pub fn next_position(current_max: Option<i32>) -> i32 {
    current_max.unwrap_or(0) + 1
}

/// Assign local positions for a reorder request.
///
/// `ordered_ids` is the operator's requested order; `eligible` are the ids
/// currently in a reorderable local state for the printer. Each eligible id
/// receives its 1-based index within `ordered_ids`; ids that are not
/// eligible are skipped without shifting the others. Repeated ids keep
/// their first position.
pub fn plan_reorder(ordered_ids: &[DbId], eligible: &HashSet<DbId>) -> Vec<(DbId, i32)> {
    let mut seen = HashSet::new();
    ordered_ids
        .iter()
        .enumerate()
        .filter(|(_, id)| eligible.contains(id) && seen.insert(**id))
        .map(|(index, id)| (*id, index as i32 + 1))
        .collect()
}
