//! In-memory extraction of one CSV member from a GTFS ZIP archive.

use std::io::{Cursor, Read};

use csv::{StringRecord, StringRecordsIntoIter};
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::PipelineError;
use crate::row::StopTimeRow;

/// Single-pass iterator over the data lines of an extracted table.
///
/// Each item pairs one CSV record with the table header. A malformed record
/// ends the run with [`PipelineError::MalformedTable`].
pub struct StopTimeRows {
    headers: StringRecord,
    records: StringRecordsIntoIter<Cursor<Vec<u8>>>,
}

impl StopTimeRows {
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }
}

impl Iterator for StopTimeRows {
    type Item = Result<StopTimeRow, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(
            record
                .map(|r| StopTimeRow::from_record(self.headers.iter(), r.iter()))
                .map_err(|e| PipelineError::MalformedTable(e.to_string())),
        )
    }
}

/// Opens `zip_bytes` as an archive and exposes `member` as a header-first CSV table.
pub fn extract(zip_bytes: &[u8], member: &str) -> Result<StopTimeRows, PipelineError> {
    let mut archive = ZipArchive::new(Cursor::new(zip_bytes))
        .map_err(|e| PipelineError::InvalidArchive(e.to_string()))?;

    let mut file = archive.by_name(member).map_err(|e| match e {
        ZipError::FileNotFound => PipelineError::MemberNotFound(member.to_string()),
        other => PipelineError::InvalidArchive(other.to_string()),
    })?;

    let mut raw = Vec::new();
    file.read_to_end(&mut raw)
        .map_err(|e| PipelineError::InvalidArchive(e.to_string()))?;
    let text = String::from_utf8(raw)
        .map_err(|e| PipelineError::MalformedTable(format!("{member} is not UTF-8: {e}")))?;
    debug!(member, bytes = text.len(), "Archive member extracted");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(Cursor::new(text.into_bytes()));
    let headers = reader
        .headers()
        .map_err(|e| PipelineError::MalformedTable(e.to_string()))?
        .clone();

    Ok(StopTimeRows {
        headers,
        records: reader.into_records(),
    })
}
