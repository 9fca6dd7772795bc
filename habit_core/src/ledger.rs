//! Append-only completion ledger.
//!
//! Every mark and un-mark is appended to a JSONL (JSON Lines) file with
//! file locking. The live set of completions is the fold of all entries.

use crate::{CompletionEvent, Error, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// What a ledger line does to the completion set
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOp {
    Completed,
    Removed,
}

/// A single ledger line
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub op: LedgerOp,
    pub event: CompletionEvent,
}

/// Sink for ledger entries
pub trait LedgerSink {
    fn append(&mut self, entry: &LedgerEntry) -> Result<()>;
}

/// Entry counts before and after a compaction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactionStats {
    pub before: usize,
    pub after: usize,
}

/// JSONL-based ledger with file locking
pub struct JsonlLedger {
    path: PathBuf,
}

impl JsonlLedger {
    /// Create a new JSONL ledger for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl LedgerSink for JsonlLedger {
    fn append(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(entry)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!(
            "Appended {:?} for habit {} on {} to ledger",
            entry.op,
            entry.event.habit_id,
            entry.event.completed_on
        );
        Ok(())
    }
}

/// Read all entries from a ledger file
///
/// Unparseable or invalid lines are logged and skipped.
pub fn read_entries(path: &Path) -> Result<Vec<LedgerEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<LedgerEntry>(&line) {
            Ok(entry) => match entry.event.validate() {
                Ok(()) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Skipping invalid ledger entry at line {}: {}", line_num + 1, e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to parse ledger entry at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} entries from ledger", entries.len());
    Ok(entries)
}

/// Replay entries into the live completion set
///
/// A completion for a (habit, user, day) that is already live is ignored,
/// so the result never holds two events for the same key. Events come back
/// ordered by day, then habit, then user.
pub fn fold_entries(entries: Vec<LedgerEntry>) -> Vec<CompletionEvent> {
    let mut live: HashMap<(String, String, NaiveDate), CompletionEvent> = HashMap::new();

    for entry in entries {
        let key = (
            entry.event.habit_id.clone(),
            entry.event.user_id.clone(),
            entry.event.completed_on,
        );
        match entry.op {
            LedgerOp::Completed => {
                live.entry(key).or_insert(entry.event);
            }
            LedgerOp::Removed => {
                live.remove(&key);
            }
        }
    }

    let mut events: Vec<CompletionEvent> = live.into_values().collect();
    events.sort_by(|a, b| {
        a.completed_on
            .cmp(&b.completed_on)
            .then_with(|| a.habit_id.cmp(&b.habit_id))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    events
}

/// Rewrite the ledger as one `Completed` line per live completion
///
/// Removed pairs, duplicates and unreadable lines are dropped. The new file
/// is written beside the old one and renamed into place. Callers must keep
/// other writers out while this runs.
pub fn compact(path: &Path) -> Result<CompactionStats> {
    if !path.exists() {
        return Ok(CompactionStats::default());
    }

    let entries = read_entries(path)?;
    let before = entries.len();
    let live = fold_entries(entries);
    let after = live.len();

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        for event in live {
            let entry = LedgerEntry {
                op: LedgerOp::Completed,
                event,
            };
            serde_json::to_writer(&mut writer, &entry)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Compacted ledger {:?}: {} -> {} entries", path, before, after);
    Ok(CompactionStats { before, after })
}

/// Whether the live set holds a completion for this key
pub fn is_live(
    events: &[CompletionEvent],
    habit_id: &str,
    user_id: &str,
    date: NaiveDate,
) -> bool {
    events.iter().any(|e| e.key() == (habit_id, user_id, date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn entry(op: LedgerOp, habit: &str, date: &str) -> LedgerEntry {
        LedgerEntry {
            op,
            event: CompletionEvent::new(habit, "alice", d(date), Utc::now()),
        }
    }

    #[test]
    fn test_append_and_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ledger").join("completions.jsonl");

        let mut ledger = JsonlLedger::new(&path);
        ledger.append(&entry(LedgerOp::Completed, "read", "2024-01-01")).unwrap();
        ledger.append(&entry(LedgerOp::Completed, "run", "2024-01-01")).unwrap();

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].event.habit_id, "run");
    }

    #[test]
    fn test_read_missing_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let entries = read_entries(&temp_dir.path().join("nope.jsonl")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("completions.jsonl");

        let mut ledger = JsonlLedger::new(&path);
        ledger.append(&entry(LedgerOp::Completed, "read", "2024-01-01")).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{ not json }}").unwrap();
        drop(file);

        ledger.append(&entry(LedgerOp::Completed, "", "2024-01-02")).unwrap();
        ledger.append(&entry(LedgerOp::Completed, "run", "2024-01-03")).unwrap();

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_fold_applies_removals_and_dedupes() {
        let entries = vec![
            entry(LedgerOp::Completed, "read", "2024-01-01"),
            entry(LedgerOp::Completed, "read", "2024-01-01"),
            entry(LedgerOp::Completed, "run", "2024-01-01"),
            entry(LedgerOp::Removed, "run", "2024-01-01"),
            entry(LedgerOp::Removed, "walk", "2024-01-05"),
            entry(LedgerOp::Completed, "run", "2024-01-02"),
        ];

        let live = fold_entries(entries);
        assert_eq!(live.len(), 2);
        assert!(is_live(&live, "read", "alice", d("2024-01-01")));
        assert!(!is_live(&live, "run", "alice", d("2024-01-01")));
        assert!(is_live(&live, "run", "alice", d("2024-01-02")));
    }

    #[test]
    fn test_fold_orders_by_day() {
        let entries = vec![
            entry(LedgerOp::Completed, "run", "2024-01-03"),
            entry(LedgerOp::Completed, "read", "2024-01-01"),
            entry(LedgerOp::Completed, "read", "2024-01-03"),
        ];

        let live = fold_entries(entries);
        let order: Vec<(&str, NaiveDate)> = live
            .iter()
            .map(|e| (e.habit_id.as_str(), e.completed_on))
            .collect();
        assert_eq!(
            order,
            vec![
                ("read", d("2024-01-01")),
                ("read", d("2024-01-03")),
                ("run", d("2024-01-03")),
            ]
        );
    }

    #[test]
    fn test_compact_keeps_only_live_completions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("completions.jsonl");

        let mut ledger = JsonlLedger::new(&path);
        ledger.append(&entry(LedgerOp::Completed, "read", "2024-01-01")).unwrap();
        ledger.append(&entry(LedgerOp::Completed, "run", "2024-01-01")).unwrap();
        ledger.append(&entry(LedgerOp::Removed, "run", "2024-01-01")).unwrap();
        ledger.append(&entry(LedgerOp::Completed, "read", "2024-01-01")).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{ not json }}").unwrap();
        drop(file);

        let stats = compact(&path).unwrap();
        assert_eq!(stats, CompactionStats { before: 4, after: 1 });

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].op, LedgerOp::Completed);
        assert_eq!(entries[0].event.habit_id, "read");

        // Appending after a compaction still works
        ledger.append(&entry(LedgerOp::Completed, "run", "2024-01-02")).unwrap();
        assert_eq!(fold_entries(read_entries(&path).unwrap()).len(), 2);
    }

    #[test]
    fn test_compact_missing_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let stats = compact(&temp_dir.path().join("nope.jsonl")).unwrap();
        assert_eq!(stats, CompactionStats::default());
    }
}
