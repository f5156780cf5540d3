//! Interaction log
//!
//! Every completed call is durably appended as one CSV row. The header is
//! written exactly once, when the log file is first created. Rows are never
//! rewritten or removed.

use crate::error::ChatbotError;
use crate::models::Interaction;
use crate::Result;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub const LOG_HEADER: [&str; 3] = ["User Input", "Chatbot Response", "Timestamp"];

/// Append-only sink for interactions
#[async_trait::async_trait]
pub trait LogStore: Send + Sync {
    async fn record(&self, interaction: &Interaction) -> Result<()>;
}

//
// ================= CSV file =================
//

pub struct CsvLogStore {
    path: PathBuf,
    // Serializes the open-check-append sequence within this process
    lock: Arc<Mutex<()>>,
}

impl CsvLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every data row (header skipped)
    pub fn read_all(&self) -> Result<Vec<Interaction>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(Interaction {
                user_input: record.get(0).unwrap_or_default().to_string(),
                response: record.get(1).unwrap_or_default().to_string(),
                timestamp: record.get(2).unwrap_or_default().to_string(),
            });
        }
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl LogStore for CsvLogStore {
    async fn record(&self, interaction: &Interaction) -> Result<()> {
        let guard = self.lock.clone().lock_owned().await;
        let path = self.path.clone();
        let interaction = interaction.clone();

        // The blocking task owns the guard and runs to completion even if
        // this future is dropped, so a row is never half written.
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            append_row(&path, &interaction)
        })
        .await
        .map_err(|e| ChatbotError::LogWriteError(format!("Log append task failed: {}", e)))?
    }
}

fn append_row(path: &Path, interaction: &Interaction) -> Result<()> {
    let (mut file, created) = match OpenOptions::new().append(true).create_new(true).open(path) {
        Ok(file) => (file, true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            (OpenOptions::new().append(true).open(path)?, false)
        }
        Err(e) => return Err(e.into()),
    };

    let bytes = encode_rows(interaction, created)?;
    file.write_all(&bytes)?;
    file.flush()?;
    Ok(())
}

/// Encode the row (and header, for a new file) into one buffer
fn encode_rows(interaction: &Interaction, with_header: bool) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    if with_header {
        writer.write_record(LOG_HEADER)?;
    }
    writer.write_record([
        interaction.user_input.as_str(),
        interaction.response.as_str(),
        interaction.timestamp.as_str(),
    ])?;

    writer
        .into_inner()
        .map_err(|e| ChatbotError::LogWriteError(format!("Failed to encode log row: {}", e)))
}

//
// ================= In-memory =================
//

/// Log store for development and tests
#[derive(Default)]
pub struct InMemoryLogStore {
    rows: Arc<RwLock<Vec<Interaction>>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rows(&self) -> Vec<Interaction> {
        self.rows.read().await.clone()
    }
}

#[async_trait::async_trait]
impl LogStore for InMemoryLogStore {
    async fn record(&self, interaction: &Interaction) -> Result<()> {
        self.rows.write().await.push(interaction.clone());
        Ok(())
    }
}
