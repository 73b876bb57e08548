//! Writes filtered rows to the cached output file.
//!
//! Supports pretty-printed JSON (an array of row objects) and header-first CSV.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::row::StopTimeRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Csv => f.write_str("csv"),
        }
    }
}

/// Overwrites `path` with `rows` in `format`.
///
/// An empty `rows` is refused with [`PipelineError::NothingToPersist`] and
/// leaves any existing file untouched. Rows are written to a sibling staging
/// file that replaces `path` only once fully written, so a failed write also
/// keeps the previous file. Missing parent directories are created.
#[tracing::instrument(skip_all, fields(rows = rows.len(), path = %path.display(), %format))]
pub fn persist(rows: &[StopTimeRow], path: &Path, format: OutputFormat) -> Result<(), PipelineError> {
    if rows.is_empty() {
        warn!("No stop times to save");
        return Err(PipelineError::NothingToPersist(path.to_path_buf()));
    }

    let write_failed = |source: std::io::Error| PipelineError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_failed)?;
    }

    let staging = staging_path(path);
    let result = File::create(&staging)
        .and_then(|file| match format {
            OutputFormat::Json => write_json(rows, file),
            OutputFormat::Csv => write_csv(rows, file),
        })
        .and_then(|()| std::fs::rename(&staging, path));
    if let Err(e) = result {
        let _ = std::fs::remove_file(&staging);
        return Err(write_failed(e));
    }

    info!("Stop times saved");
    Ok(())
}

/// `<file name>.tmp` next to `path`.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "stop_times".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_json(rows: &[StopTimeRow], file: File) -> std::io::Result<()> {
    let mut writer = BufWriter::new(file);
    let mut ser =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    rows.serialize(&mut ser)?;
    writer.flush()
}

fn write_csv(rows: &[StopTimeRow], file: File) -> std::io::Result<()> {
    let header: Vec<&str> = rows[0].columns().collect();
    debug!(columns = header.len(), "Writing CSV header");

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&header)?;
    for row in rows {
        writer.write_record(header.iter().map(|col| row.get(col).unwrap_or_default()))?;
    }
    writer.flush()
}
