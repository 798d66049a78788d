//! Transaction log sinks
//!
//! The transaction log is append-only and line-oriented: one rendered
//! `VerificationTransaction` per line, never JSON-wrapped. A line is visible
//! once `append` returns.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::transaction::VerificationTransaction;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// Append-only sink for verification transactions.
pub trait TransactionLog: Send + Sync {
    fn append(&self, transaction: &VerificationTransaction) -> io::Result<()>;

    /// Flush everything appended so far to durable storage.
    fn sync(&self) -> io::Result<()>;
}

/// File-backed transaction log. Each append is flushed and synced.
pub struct FileTransactionLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileTransactionLog {
    /// Open or create the log; existing lines are kept.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TransactionLog for FileTransactionLog {
    fn append(&self, transaction: &VerificationTransaction) -> io::Result<()> {
        let mut writer = lock(&self.writer);
        writeln!(writer, "{}", transaction.to_log_line())?;
        writer.flush()?;
        writer.get_ref().sync_data()
    }

    fn sync(&self) -> io::Result<()> {
        let mut writer = lock(&self.writer);
        writer.flush()?;
        writer.get_ref().sync_all()
    }
}

/// Transaction log on standard output.
#[derive(Debug, Default)]
pub struct StdoutTransactionLog;

impl TransactionLog for StdoutTransactionLog {
    fn append(&self, transaction: &VerificationTransaction) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", transaction.to_log_line())?;
        out.flush()
    }

    fn sync(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// In-memory transaction log for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransactionLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.lines).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.lines).is_empty()
    }
}

impl TransactionLog for MemoryTransactionLog {
    fn append(&self, transaction: &VerificationTransaction) -> io::Result<()> {
        lock(&self.lines).push(transaction.to_log_line());
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}
