//! Append-only JSON Lines summary store.
//!
//! Each line is one `StoredSession` record. Writes append a single line and
//! flush, so a crash leaves at most one truncated trailing line, which
//! `list` skips with a warning. The next write terminates that partial line
//! before appending, so it never merges with a good record.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{info, warn};

use signa_models::SessionSummary;

use crate::error::{StoreError, StoreResult};
use crate::metrics;
use crate::store::{validate_user, SummaryStore};

/// One persisted line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub user_id: String,
    pub saved_at: DateTime<Utc>,
    pub summary: SessionSummary,
}

/// Summaries appended to a local file.
#[derive(Debug)]
pub struct JsonLinesSummaryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesSummaryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: &StoredSession) -> StoreResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;

        // A crash mid-write leaves a partial line; end it first.
        if file.metadata().await?.len() > 0 {
            file.seek(SeekFrom::End(-1)).await?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                warn!(path = %self.path.display(), "Terminating truncated trailing record");
                line.insert(0, b'\n');
            }
        }
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_all(&self) -> StoreResult<Vec<StoredSession>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<&str> = contents.lines().collect();
        let last = lines.len().saturating_sub(1);
        let mut records = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredSession>(line) {
                Ok(record) => records.push(record),
                // Cut short by a crash; earlier lines were terminated by the next write.
                Err(e) if i == last || e.is_eof() => {
                    warn!(path = %self.path.display(), line = i + 1, error = %e, "Skipping truncated record");
                }
                Err(e) => {
                    return Err(StoreError::CorruptRecord {
                        line: i + 1,
                        message: e.to_string(),
                    })
                }
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl SummaryStore for JsonLinesSummaryStore {
    async fn save(&self, user_id: &str, summary: &SessionSummary) -> StoreResult<()> {
        let started = Instant::now();
        let result = match validate_user(user_id) {
            Ok(()) => {
                let record = StoredSession {
                    user_id: user_id.to_string(),
                    saved_at: Utc::now(),
                    summary: summary.clone(),
                };
                self.append(&record).await
            }
            Err(e) => Err(e),
        };
        metrics::record_operation(self.backend(), "save", result.is_ok(), started.elapsed());

        if result.is_ok() {
            info!(
                user_id,
                session_id = %summary.session_id,
                path = %self.path.display(),
                "Appended session summary"
            );
        }
        result
    }

    async fn list(&self, user_id: &str) -> StoreResult<Vec<SessionSummary>> {
        validate_user(user_id)?;
        let started = Instant::now();
        let result = self.read_all().await;
        metrics::record_operation(self.backend(), "list", result.is_ok(), started.elapsed());

        Ok(result?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.summary)
            .collect())
    }

    fn backend(&self) -> &'static str {
        "jsonl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signa_models::{SessionId, SignCount};
    use tempfile::TempDir;

    fn summary(label: &str, count: u64) -> SessionSummary {
        SessionSummary {
            session_id: SessionId::new(),
            user_id: None,
            top_signs: vec![SignCount::new(label, count)],
            started_at: None,
            ended_at: Utc::now(),
            seconds_elapsed: 0.0,
        }
    }

    #[tokio::test]
    async fn test_missing_file_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = JsonLinesSummaryStore::new(dir.path().join("none.jsonl"));
        assert!(store.list("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_and_filter_by_user() {
        let dir = TempDir::new().unwrap();
        let store = JsonLinesSummaryStore::new(dir.path().join("nested/sessions.jsonl"));

        store.save("u1", &summary("A", 4)).await.unwrap();
        store.save("u2", &summary("B", 1)).await.unwrap();
        store.save("u1", &summary("C", 2)).await.unwrap();

        let u1 = store.list("u1").await.unwrap();
        let labels: Vec<&str> = u1.iter().map(|s| s.top_signs[0].label.as_str()).collect();
        assert_eq!(labels, vec!["A", "C"]);

        let contents = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.contains("\"userId\":\"u2\""));
    }

    #[tokio::test]
    async fn test_truncated_tail_is_skipped() {
        let dir = TempDir::new().unwrap();
        let store = JsonLinesSummaryStore::new(dir.path().join("s.jsonl"));
        store.save("u1", &summary("A", 1)).await.unwrap();

        let mut file = OpenOptions::new().append(true).open(store.path()).await.unwrap();
        file.write_all(b"{\"userId\":\"u1\",\"sav").await.unwrap();
        file.flush().await.unwrap();

        assert_eq!(store.list("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_saves_after_truncated_tail_are_kept() {
        let dir = TempDir::new().unwrap();
        let store = JsonLinesSummaryStore::new(dir.path().join("s.jsonl"));
        store.save("u1", &summary("A", 1)).await.unwrap();

        let mut file = OpenOptions::new().append(true).open(store.path()).await.unwrap();
        file.write_all(b"{\"userId\":\"u1\",\"sav").await.unwrap();
        file.flush().await.unwrap();

        store.save("u1", &summary("B", 1)).await.unwrap();
        let listed = store.list("u1").await.unwrap();
        let labels: Vec<&str> = listed.iter().map(|s| s.top_signs[0].label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B"]);

        // The partial line now sits between good records.
        store.save("u1", &summary("C", 1)).await.unwrap();
        let listed = store.list("u1").await.unwrap();
        let labels: Vec<&str> = listed.iter().map(|s| s.top_signs[0].label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);

        let contents = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(contents.lines().count(), 4);
        assert!(contents.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_corrupt_middle_line_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.jsonl");
        tokio::fs::write(&path, "garbage\n").await.unwrap();
        let store = JsonLinesSummaryStore::new(&path);
        store.save("u1", &summary("A", 1)).await.unwrap();

        let err = store.list("u1").await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptRecord { line: 1, .. }));
    }
}
