//! Downstream publication of scan results.

use crate::error::PublishError;
use crate::results::ProductResult;
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Accepts one result per call. Implementations must be safe to call from
/// several scan tasks at once.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn publish(&self, result: &ProductResult) -> Result<(), PublishError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Writes each result as one line of camelCase JSON
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl JsonLinesSink<BufWriter<File>> {
    /// Creates (or truncates) a file to write results to
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> ResultSink for JsonLinesSink<W> {
    async fn publish(&self, result: &ProductResult) -> Result<(), PublishError> {
        let line = serde_json::to_string(result)?;
        let mut writer = lock(&self.writer);
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Hands results to an async consumer
pub struct ChannelSink {
    sender: mpsc::Sender<ProductResult>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<ProductResult>) -> Self {
        Self { sender }
    }

    /// A sink plus the receiver that yields what it publishes
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ProductResult>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn publish(&self, result: &ProductResult) -> Result<(), PublishError> {
        self.sender
            .send(result.clone())
            .await
            .map_err(|_| PublishError::Transport("result channel closed".to_string()))
    }
}

/// Keeps published results in memory
#[derive(Default)]
pub struct MemorySink {
    results: Mutex<Vec<ProductResult>>,
    reject: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that fails every publish
    pub fn rejecting() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn results(&self) -> Vec<ProductResult> {
        lock(&self.results).clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn publish(&self, result: &ProductResult) -> Result<(), PublishError> {
        if self.reject {
            return Err(PublishError::Transport("sink is rejecting results".to_string()));
        }
        lock(&self.results).push(result.clone());
        Ok(())
    }
}
