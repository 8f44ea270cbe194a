use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::{info, warn};

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))
        }
        _ => Ok(()),
    }
}

/// Replace `path` with a CSV of `rows`.
///
/// Rows go to a sibling `.tmp` file which is renamed over the target once
/// fully flushed, so a reader sees either the old table or the new one. On
/// failure the staging file is removed and the target is left untouched.
pub fn write_csv_atomic<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let tmp = staging_path(path);
    let written = write_rows(&tmp, rows)
        .and_then(|()| std::fs::rename(&tmp, path).map_err(|e| PipelineError::io(path, e)));
    if let Err(e) = written {
        if tmp.exists() {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                warn!(path = %tmp.display(), error = %cleanup, "Could not remove staging file");
            }
        }
        return Err(e);
    }
    info!(path = %path.display(), rows = rows.len(), "Wrote output table");
    Ok(())
}

fn write_rows<T: Serialize>(tmp: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(tmp)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(|e| PipelineError::io(tmp, e))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|e| PipelineError::io(path, e))?;
    info!(path = %path.display(), "Wrote JSON report");
    Ok(())
}

/// Render the first `max_rows` rows as a markdown table.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}\n", title);
    println!("{}\n", render_table(rows, max_rows));
}
