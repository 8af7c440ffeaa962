use crate::journal::{Journal, LedgerEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Append-only event log. Each line holds one batch as a JSON array, so a
/// batch is either readable in full or a torn tail.
pub struct FileJournal {
    path: PathBuf,
    writer: Mutex<Writer>,
}

struct Writer {
    file: File,
    /// End of the last batch known to be complete on disk.
    committed_len: u64,
}

impl FileJournal {
    pub async fn open(path: PathBuf) -> Result<Self> {
        // Create file if doesn't exist, append if exists
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open journal {}", path.display()))?;

        let contents = tokio::fs::read(&path).await?;
        let committed_len = contents
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1) as u64;

        // A crash mid-append leaves an unterminated line; later batches must
        // not be glued onto it
        if committed_len < contents.len() as u64 {
            tracing::warn!(
                path = %path.display(),
                discarded = contents.len() as u64 - committed_len,
                "Discarding torn journal tail"
            );
            file.set_len(committed_len).await?;
        }

        Ok(Self {
            path,
            writer: Mutex::new(Writer { file, committed_len }),
        })
    }
}

async fn write_line(file: &mut File, line: &[u8]) -> Result<()> {
    file.write_all(line).await?;
    file.flush().await?;
    file.sync_data().await?;
    Ok(())
}

#[async_trait]
impl Journal for FileJournal {
    async fn append(&self, events: &[LedgerEvent]) -> Result<()> {
        // Serialize the whole batch before touching the file
        let mut line = serde_json::to_vec(events)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        let committed_len = writer.committed_len;

        if writer.file.metadata().await?.len() != committed_len {
            tracing::warn!(committed_len, "Truncating bytes past the last complete batch");
            writer.file.set_len(committed_len).await?;
        }

        match write_line(&mut writer.file, &line).await {
            Ok(()) => {
                writer.committed_len += line.len() as u64;
                Ok(())
            }
            Err(e) => {
                // A failed batch must not survive a restart, whole or in part
                if let Err(rollback) = writer.file.set_len(committed_len).await {
                    tracing::error!(error = %rollback, "Failed to roll back partial journal write");
                }
                Err(e)
            }
        }
    }

    async fn replay(&self) -> Result<Vec<LedgerEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let mut events = Vec::new();
        let mut line_no = 0usize;
        let mut torn: Option<(usize, serde_json::Error)> = None;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            if let Some((bad_line, e)) = torn.take() {
                anyhow::bail!("journal corrupted at line {}: {}", bad_line, e);
            }
            match serde_json::from_str::<Vec<LedgerEvent>>(&line) {
                Ok(batch) => events.extend(batch),
                Err(e) => torn = Some((line_no, e)),
            }
        }

        // Only the last line may be unreadable: an append interrupted mid-write
        if let Some((bad_line, e)) = torn {
            tracing::warn!(line = bad_line, error = %e, "Ignoring torn journal tail");
        }

        Ok(events)
    }
}
