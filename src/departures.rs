//! Upcoming arrivals at one stop, read back from the cached output file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{NaiveTime, Timelike};
use tracing::debug;

use crate::error::PipelineError;
use crate::persist::OutputFormat;
use crate::row::StopTimeRow;

/// Loads every row of a previously persisted output file.
pub fn load_rows(path: &Path, format: OutputFormat) -> Result<Vec<StopTimeRow>, PipelineError> {
    let read_failed = |source: std::io::Error| PipelineError::ReadFailed {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_failed)?;
    let rows: Vec<StopTimeRow> = match format {
        OutputFormat::Json => serde_json::from_reader(BufReader::new(file))
            .map_err(|e| read_failed(e.into()))?,
        OutputFormat::Csv => {
            let mut reader = csv::Reader::from_reader(file);
            let headers = reader.headers().map_err(|e| read_failed(e.into()))?.clone();
            reader
                .records()
                .map(|r| r.map(|r| StopTimeRow::from_record(headers.iter(), r.iter())))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| read_failed(e.into()))?
        }
    };
    debug!(path = %path.display(), rows = rows.len(), "Loaded cached stop times");
    Ok(rows)
}

/// Parses a GTFS `HH:MM:SS` arrival time.
///
/// Hours past 23 (service running after midnight) do not parse.
pub fn parse_arrival(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S").ok()
}

/// The earliest `limit` arrival times strictly after `now` for `stop_id` on
/// trips starting with one of `prefixes`, ascending.
///
/// Rows with an unparseable `arrival_time` are skipped.
pub fn next_departures(
    rows: &[StopTimeRow],
    stop_id: &str,
    prefixes: &[String],
    now: NaiveTime,
    limit: usize,
) -> Vec<NaiveTime> {
    let mut times: Vec<NaiveTime> = rows
        .iter()
        .filter(|r| r.stop_id() == stop_id)
        .filter(|r| prefixes.iter().any(|p| r.trip_id().starts_with(p.as_str())))
        .filter_map(|r| parse_arrival(r.arrival_time()))
        .filter(|t| *t > now)
        .collect();
    times.sort();
    times.truncate(limit);
    times
}

/// [`next_departures`] over the file at `path`.
pub fn next_departures_in_file(
    path: &Path,
    format: OutputFormat,
    stop_id: &str,
    prefixes: &[String],
    now: NaiveTime,
    limit: usize,
) -> Result<Vec<NaiveTime>, PipelineError> {
    let rows = load_rows(path, format)?;
    Ok(next_departures(&rows, stop_id, prefixes, now, limit))
}

/// Whole minutes from `now` until `time`, ignoring seconds.
pub fn minutes_until(now: NaiveTime, time: NaiveTime) -> i64 {
    let minute_of_day = |t: NaiveTime| i64::from(t.hour() * 60 + t.minute());
    minute_of_day(time) - minute_of_day(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::persist;
    use std::env;
    use std::fs;

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn row(trip_id: &str, stop_id: &str, arrival: &str) -> StopTimeRow {
        StopTimeRow::from_record(
            ["trip_id", "arrival_time", "departure_time", "stop_id"],
            [trip_id, arrival, arrival, stop_id],
        )
    }

    fn prefixes() -> Vec<String> {
        vec!["86A_18_2_040AM".to_string()]
    }

    #[test]
    fn test_ascending_order() {
        let rows = vec![
            row("86A_18_2_040AM", "2010", "08:00:00"),
            row("86A_18_2_040AM", "2010", "07:30:00"),
            row("86A_18_2_040AM", "2010", "09:15:00"),
        ];
        let times = next_departures(&rows, "2010", &prefixes(), at(7, 0, 0), 3);
        assert_eq!(times, vec![at(7, 30, 0), at(8, 0, 0), at(9, 15, 0)]);
    }

    #[test]
    fn test_past_times_excluded() {
        let rows = vec![
            row("86A_18_2_040AM", "2010", "06:45:00"),
            row("86A_18_2_040AM", "2010", "07:00:00"),
            row("86A_18_2_040AM", "2010", "07:10:00"),
        ];
        let times = next_departures(&rows, "2010", &prefixes(), at(7, 0, 0), 3);
        assert_eq!(times, vec![at(7, 10, 0)]);
    }

    #[test]
    fn test_limit_and_other_stops_and_trips() {
        let rows = vec![
            row("86A_18_2_040AM", "2010", "10:00:00"),
            row("86A_18_2_040AM", "2010", "11:00:00"),
            row("86A_18_2_040AM", "2010", "12:00:00"),
            row("86A_18_2_040AM", "2010", "13:00:00"),
            row("86A_18_2_040AM", "2011", "09:00:00"),
            row("5A_34_2_046AB", "2010", "09:30:00"),
        ];
        let times = next_departures(&rows, "2010", &prefixes(), at(8, 0, 0), 3);
        assert_eq!(times, vec![at(10, 0, 0), at(11, 0, 0), at(12, 0, 0)]);
    }

    #[test]
    fn test_unparseable_times_skipped() {
        let rows = vec![
            row("86A_18_2_040AM", "2010", "25:30:00"),
            row("86A_18_2_040AM", "2010", ""),
            row("86A_18_2_040AM", "2010", "8h15"),
            row("86A_18_2_040AM", "2010", "20:15:00"),
        ];
        let times = next_departures(&rows, "2010", &prefixes(), at(7, 0, 0), 3);
        assert_eq!(times, vec![at(20, 15, 0)]);
    }

    #[test]
    fn test_minutes_until_ignores_seconds() {
        assert_eq!(minutes_until(at(7, 0, 59), at(7, 12, 0)), 12);
        assert_eq!(minutes_until(at(23, 50, 0), at(23, 59, 59)), 9);
    }

    #[test]
    fn test_reads_back_both_formats() {
        let rows = vec![
            row("86A_18_2_040AM_3", "2010", "08:00:00"),
            row("86A_18_2_040AM_4", "2010", "07:30:00"),
        ];
        for (name, format) in [
            ("nextbus_test_departures.json", OutputFormat::Json),
            ("nextbus_test_departures.csv", OutputFormat::Csv),
        ] {
            let path = env::temp_dir().join(name);
            persist(&rows, &path, format).unwrap();

            let times =
                next_departures_in_file(&path, format, "2010", &prefixes(), at(7, 0, 0), 3).unwrap();
            assert_eq!(times, vec![at(7, 30, 0), at(8, 0, 0)]);

            fs::remove_file(&path).unwrap();
        }
    }

    #[test]
    fn test_missing_file_is_read_failed() {
        let path = env::temp_dir().join("nextbus_test_departures_missing.json");
        let _ = fs::remove_file(&path);
        let err = load_rows(&path, OutputFormat::Json).unwrap_err();
        assert!(matches!(err, PipelineError::ReadFailed { .. }));
    }
}
