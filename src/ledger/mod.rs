/// Fjall-based persistence layer for tasks and credit accounts
///
/// This module provides durable storage for salon's task state. It uses
/// Fjall (an embedded LSM key-value store) to persist:
///
/// - Task rows (status, provider request, results)
/// - Provider job index (provider job id -> task_no, for webhooks)
/// - Credit accounts (per-user balances)
///
/// ## Architecture
///
/// All partitions share one keyspace so task fan-out and status
/// transitions can be committed as atomic write batches. Rows are stored
/// as JSON under string-prefixed keys (see `partitions`).
///
/// ## Usage
///
/// ```rust,ignore
/// use salon::ledger::{self, CreditLedger, TaskStore};
///
/// let keyspace = ledger::open_keyspace("data/ledger")?;
/// let tasks = TaskStore::attach(&keyspace)?;
/// let credits = CreditLedger::attach(&keyspace)?;
/// ```

pub mod credits;
pub mod error;
pub mod partitions;
pub mod store;

pub use credits::{CreditAccount, CreditLedger, CreditReceipt};
pub use error::{LedgerError, Result};
pub use store::{StoreStats, TaskStore};

use std::path::Path;

use fjall::{Config, Keyspace};
use tracing::info;

/// Open or create the Fjall keyspace backing all ledger partitions
pub fn open_keyspace<P: AsRef<Path>>(path: P) -> Result<Keyspace> {
    let path = path.as_ref();
    info!("Opening Fjall keyspace at: {}", path.display());

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let keyspace = Config::new(path).open()?;
    Ok(keyspace)
}
