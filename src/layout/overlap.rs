use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::calendar::CalendarEvent;

/// Horizontal gap reserved between columns, in percent of the day lane.
pub const COLUMN_GAP_PCT: f64 = 4.0;

/// Horizontal placement of one event among the day's overlapping events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutAssignment {
    pub left: f64,
    pub width: f64,
}

pub const FULL_WIDTH: LayoutAssignment = LayoutAssignment {
    left: 0.0,
    width: 100.0,
};

/// Column/width assignment for one day's events so simultaneous events never
/// visually overlap. All-day events belong to the header band and always get
/// the full width, as does any timed event that overlaps nothing.
///
/// Overlap graph on strict interval intersection, connected components via
/// explicit-stack DFS, then greedy interval coloring per component. Holds no
/// state; safe to recompute on every render.
pub fn assign_columns(events: &[CalendarEvent]) -> HashMap<String, LayoutAssignment> {
    let mut out: HashMap<String, LayoutAssignment> = events
        .iter()
        .map(|e| (e.id.clone(), FULL_WIDTH))
        .collect();

    let intervals: Vec<(usize, DateTime<Utc>, DateTime<Utc>)> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_all_day())
        .map(|(i, e)| (i, e.start_instant(), e.end_instant()))
        .collect();

    let n = intervals.len();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for a in 0..n {
        for b in (a + 1)..n {
            // Touching endpoints are not a collision.
            if intervals[a].1 < intervals[b].2 && intervals[b].1 < intervals[a].2 {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }
    }

    let mut visited = vec![false; n];
    for root in 0..n {
        if visited[root] || adjacency[root].is_empty() {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![root];
        visited[root] = true;
        while let Some(node) = stack.pop() {
            component.push(node);
            for &next in &adjacency[node] {
                if !visited[next] {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }

        component.sort_by(|&a, &b| {
            intervals[a]
                .1
                .cmp(&intervals[b].1)
                .then_with(|| events[intervals[a].0].id.cmp(&events[intervals[b].0].id))
        });

        // Greedy interval coloring: lowest column whose previous occupant has
        // already ended, tracking each column's running end instant.
        let mut column_ends: Vec<DateTime<Utc>> = Vec::new();
        let mut placements: Vec<(usize, usize)> = Vec::new();
        for &member in &component {
            let (event_index, start, end) = intervals[member];
            let column = match column_ends.iter().position(|&col_end| col_end <= start) {
                Some(free) => {
                    column_ends[free] = end;
                    free
                }
                None => {
                    column_ends.push(end);
                    column_ends.len() - 1
                }
            };
            placements.push((event_index, column));
        }

        let columns = column_ends.len() as f64;
        let width = (100.0 - COLUMN_GAP_PCT * (columns - 1.0)) / columns;
        for (event_index, column) in placements {
            out.insert(
                events[event_index].id.clone(),
                LayoutAssignment {
                    left: column as f64 * (width + COLUMN_GAP_PCT),
                    width,
                },
            );
        }
    }

    out
}
