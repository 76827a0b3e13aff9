//! Coverage analysis of a channel's timeline.
//!
//! An island is a maximal run of entries in which every entry starts no
//! later than the furthest end seen so far in the run. Touching entries
//! (one ends exactly when the next starts) belong to the same island.
//! Everything here is pure; [`crate::queries::schedule_entries::find_islands`]
//! feeds it from the store.

use chrono::{DateTime, Duration, Utc};
use playout_common::EntryId;
use serde::{Deserialize, Serialize};

use crate::models::ScheduleEntry;

/// The part of an entry that matters for coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySpan {
    pub id: EntryId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<&ScheduleEntry> for EntrySpan {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            id: entry.id,
            start: entry.scheduled_start,
            end: entry.scheduled_end,
        }
    }
}

/// A contiguous, gap-free run of entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Island {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub entries: Vec<EntryId>,
}

/// Uncovered time between two adjacent islands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub seconds: i64,
}

/// Coverage summary of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleHealth {
    pub islands: Vec<Island>,
    pub gaps: Vec<Gap>,
    /// Nothing is scheduled at all; the whole timeline is one open gap.
    pub unscheduled: bool,
}

impl ScheduleHealth {
    pub fn from_islands(islands: Vec<Island>) -> Self {
        let gaps = gaps(&islands);
        Self {
            unscheduled: islands.is_empty(),
            islands,
            gaps,
        }
    }
}

/// Group entries into islands, ordered by start.
pub fn find_islands(mut spans: Vec<EntrySpan>) -> Vec<Island> {
    spans.sort_by(|a, b| (a.start, a.end, a.id).cmp(&(b.start, b.end, b.id)));

    let mut islands: Vec<Island> = Vec::new();
    for span in spans {
        match islands.last_mut() {
            Some(current) if current.end >= span.start => {
                current.end = current.end.max(span.end);
                current.entries.push(span.id);
            }
            _ => islands.push(Island {
                start: span.start,
                end: span.end,
                entries: vec![span.id],
            }),
        }
    }
    islands
}

/// Length of the hole between two islands, never negative.
pub fn gap_between(prev: &Island, next: &Island) -> Duration {
    (next.start - prev.end).max(Duration::zero())
}

/// Gaps between each pair of adjacent islands.
pub fn gaps(islands: &[Island]) -> Vec<Gap> {
    islands
        .windows(2)
        .map(|pair| Gap {
            start: pair[0].end,
            end: pair[1].start,
            seconds: gap_between(&pair[0], &pair[1]).num_seconds(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minute as i64)
    }

    fn span(id: i64, start: u32, end: u32) -> EntrySpan {
        EntrySpan {
            id: EntryId::from(id),
            start: at(start),
            end: at(end),
        }
    }

    #[test]
    fn test_no_entries_no_islands() {
        assert!(find_islands(Vec::new()).is_empty());
        let health = ScheduleHealth::from_islands(Vec::new());
        assert!(health.unscheduled);
        assert!(health.gaps.is_empty());
    }

    #[test]
    fn test_contiguous_entries_form_one_island() {
        let islands = find_islands(vec![span(1, 0, 30), span(2, 30, 60), span(3, 60, 90)]);
        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].start, at(0));
        assert_eq!(islands[0].end, at(90));
        assert_eq!(
            islands[0].entries,
            vec![EntryId::from(1), EntryId::from(2), EntryId::from(3)]
        );
    }

    #[test]
    fn test_gaps_split_islands() {
        let islands = find_islands(vec![
            span(1, 0, 30),
            span(2, 30, 60),
            span(3, 75, 90),
            span(4, 120, 150),
        ]);
        assert_eq!(islands.len(), 3);

        let gaps = gaps(&islands);
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].seconds, 15 * 60);
        assert_eq!(gaps[0].start, at(60));
        assert_eq!(gaps[0].end, at(75));
        assert_eq!(gaps[1].seconds, 30 * 60);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let islands = find_islands(vec![span(3, 100, 110), span(1, 0, 10), span(2, 10, 20)]);
        assert_eq!(islands.len(), 2);
        assert_eq!(islands[0].entries, vec![EntryId::from(1), EntryId::from(2)]);
        assert_eq!(islands[1].entries, vec![EntryId::from(3)]);
    }

    #[test]
    fn test_long_entry_keeps_island_open() {
        // The second entry ends early, but the first one still covers the third.
        let islands = find_islands(vec![span(1, 0, 120), span(2, 10, 20), span(3, 60, 90)]);
        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].end, at(120));
    }

    #[test]
    fn test_identical_spans_share_an_island() {
        let islands = find_islands(vec![span(2, 0, 30), span(1, 0, 30), span(3, 45, 60)]);
        assert_eq!(islands.len(), 2);
        assert_eq!(islands[0].entries, vec![EntryId::from(1), EntryId::from(2)]);
        assert_eq!(islands[0].start, at(0));
        assert_eq!(islands[0].end, at(30));
        assert_eq!(gaps(&islands)[0].seconds, 15 * 60);
    }

    #[test]
    fn test_same_start_takes_furthest_end() {
        let islands = find_islands(vec![span(1, 0, 60), span(2, 0, 20), span(3, 40, 50)]);
        assert_eq!(islands.len(), 1);
        assert_eq!(
            islands[0].entries,
            vec![EntryId::from(2), EntryId::from(1), EntryId::from(3)]
        );
        assert_eq!(islands[0].end, at(60));
    }

    #[test]
    fn test_gap_between_never_negative() {
        let a = Island {
            start: at(0),
            end: at(60),
            entries: vec![],
        };
        let b = Island {
            start: at(30),
            end: at(90),
            entries: vec![],
        };
        assert_eq!(gap_between(&a, &b), Duration::zero());
        assert_eq!(gap_between(&b, &a), Duration::zero());
    }
}
