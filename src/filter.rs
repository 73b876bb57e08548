//! Row selection by trip-id prefix and stop id.

use std::collections::BTreeSet;

use tracing::info;

use crate::error::PipelineError;
use crate::row::StopTimeRow;

/// Which rows of `stop_times.txt` to keep.
///
/// An empty `stop_ids` set disables stop filtering. `trip_prefixes` is
/// ordered: when `normalize_trip_ids` is set, a row's `trip_id` is rewritten to
/// the first prefix it matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub stop_ids: BTreeSet<String>,
    pub trip_prefixes: Vec<String>,
    pub normalize_trip_ids: bool,
}

impl FilterCriteria {
    /// First configured prefix that `trip_id` starts with.
    pub fn matched_prefix(&self, trip_id: &str) -> Option<&str> {
        self.trip_prefixes
            .iter()
            .map(String::as_str)
            .find(|p| trip_id.starts_with(p))
    }

    pub fn matches(&self, row: &StopTimeRow) -> bool {
        self.matched_prefix(row.trip_id()).is_some()
            && (self.stop_ids.is_empty() || self.stop_ids.contains(row.stop_id()))
    }

    /// Returns `row` if it passes, normalized when configured.
    pub fn apply(&self, mut row: StopTimeRow) -> Option<StopTimeRow> {
        if !self.matches(&row) {
            return None;
        }
        if self.normalize_trip_ids {
            if let Some(prefix) = self.matched_prefix(row.trip_id()) {
                row.set("trip_id", prefix);
            }
        }
        Some(row)
    }
}

/// Keeps the rows that match `criteria`, in input order.
///
/// Stops at the first row error.
pub fn filter_rows<I>(rows: I, criteria: &FilterCriteria) -> Result<Vec<StopTimeRow>, PipelineError>
where
    I: IntoIterator<Item = Result<StopTimeRow, PipelineError>>,
{
    let mut kept = Vec::new();
    let mut scanned = 0usize;
    for row in rows {
        scanned += 1;
        if let Some(row) = criteria.apply(row?) {
            kept.push(row);
        }
    }
    info!(scanned, kept = kept.len(), "Filtered stop times");
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(trip_id: &str, stop_id: &str) -> StopTimeRow {
        StopTimeRow::from_record(
            ["trip_id", "arrival_time", "stop_id"],
            [trip_id, "08:00:00", stop_id],
        )
    }

    fn criteria(stops: &[&str], normalize: bool) -> FilterCriteria {
        FilterCriteria {
            stop_ids: stops.iter().map(|s| s.to_string()).collect(),
            trip_prefixes: vec!["5A_34_1".to_string(), "5A_34".to_string(), "86A_18_2".to_string()],
            normalize_trip_ids: normalize,
        }
    }

    #[test]
    fn test_first_matching_prefix_wins() {
        let c = criteria(&[], true);
        assert_eq!(c.matched_prefix("5A_34_1_046AB_3"), Some("5A_34_1"));
        assert_eq!(c.matched_prefix("5A_34_2_046AB_3"), Some("5A_34"));
        assert_eq!(c.matched_prefix("C3_1"), None);
    }

    #[test]
    fn test_membership_matches_predicate() {
        let c = criteria(&["2010", "2011"], false);
        let table = vec![
            row("86A_18_2_040AM_1", "2010"),
            row("86A_18_2_040AM_1", "9999"),
            row("C3_12", "2010"),
            row("5A_34_2_046AB_9", "2011"),
            row("x86A_18_2", "2011"),
        ];

        let kept = filter_rows(table.clone().into_iter().map(Ok), &c).unwrap();

        for r in &table {
            let has_prefix = c.trip_prefixes.iter().any(|p| r.trip_id().starts_with(p.as_str()));
            let has_stop = c.stop_ids.contains(r.stop_id());
            assert_eq!(kept.contains(r), has_prefix && has_stop);
        }
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].stop_id(), "2010");
        assert_eq!(kept[1].stop_id(), "2011");
    }

    #[test]
    fn test_empty_stop_set_keeps_all_stops() {
        let c = criteria(&[], false);
        let kept = filter_rows(
            vec![Ok(row("86A_18_2_x", "1")), Ok(row("86A_18_2_y", "2"))],
            &c,
        )
        .unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].trip_id(), "86A_18_2_x");
    }

    #[test]
    fn test_normalization_rewrites_trip_id_only() {
        let c = criteria(&["2010"], true);
        let kept = filter_rows(vec![Ok(row("86A_18_2_040AM_77", "2010"))], &c).unwrap();
        assert_eq!(kept[0].trip_id(), "86A_18_2");
        assert_eq!(kept[0].arrival_time(), "08:00:00");
    }

    #[test]
    fn test_no_matches_is_empty() {
        let c = criteria(&["2010"], false);
        let kept = filter_rows(vec![Ok(row("C3_1", "2010"))], &c).unwrap();
        assert!(kept.is_empty());
    }

    #[test]
    fn test_row_error_aborts() {
        let c = criteria(&[], false);
        let rows = vec![
            Ok(row("86A_18_2_x", "1")),
            Err(PipelineError::MalformedTable("bad".into())),
        ];
        assert!(filter_rows(rows, &c).is_err());
    }
}
