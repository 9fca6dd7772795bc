//! CSV export of completion history.

use crate::{CompletionEvent, Error, Result};
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    habit_id: String,
    user_id: String,
    completed_on: String,
    recorded_at: String,
    notes: Option<String>,
}

impl From<&CompletionEvent> for CsvRow {
    fn from(event: &CompletionEvent) -> Self {
        CsvRow {
            id: event.id.to_string(),
            habit_id: event.habit_id.clone(),
            user_id: event.user_id.clone(),
            completed_on: event.completed_on.format("%Y-%m-%d").to_string(),
            recorded_at: event.recorded_at.to_rfc3339(),
            notes: event.notes.clone(),
        }
    }
}

/// Write completions to a CSV file, oldest first
///
/// The file is written to a temp file, synced and renamed into place, so
/// a reader never sees a half-written export. Returns the number of rows.
pub fn export_completions_csv(events: &[CompletionEvent], path: &Path) -> Result<usize> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut sorted: Vec<&CompletionEvent> = events.iter().collect();
    sorted.sort_by(|a, b| {
        a.completed_on
            .cmp(&b.completed_on)
            .then_with(|| a.habit_id.cmp(&b.habit_id))
    });

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(temp.as_file());

        if sorted.is_empty() {
            // serde only emits headers alongside the first record
            writer.write_record([
                "id",
                "habit_id",
                "user_id",
                "completed_on",
                "recorded_at",
                "notes",
            ])?;
        }
        for event in &sorted {
            writer.serialize(CsvRow::from(*event))?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} completions to {:?}", sorted.len(), path);
    Ok(sorted.len())
}
