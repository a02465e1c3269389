//! The completion ledger: a durable key-value table of per-item outcomes.
//!
//! Keys are the items' stable media paths. Writing a key supersedes its
//! prior entry (last write wins); a key whose current entry is a success is
//! permanently skipped by future runs. Every write is synced before control
//! returns, so a crash between two items never loses the record of the one
//! just completed.

use chrono::Local;
use log::info;
use rocksdb::Options as rdbOptions;
use rocksdb::{WriteOptions, DB};
use std::path::Path;

use crate::error::Result;
use crate::types::{LedgerEntry, Outcome};

pub struct Ledger {
    db: DB,
}

impl Ledger {
    /// Initialize and open the ledger database
    pub fn open(path: &Path) -> Result<Self> {
        let mut options = rdbOptions::default();
        options.create_if_missing(true);

        let db = DB::open(&options, path)?;
        info!("Completion ledger opened at {}", path.display());
        Ok(Self { db })
    }

    /// Record an outcome for an item key, superseding any prior entry.
    ///
    /// The write is flushed durably before returning.
    pub fn record(&self, key: &Path, outcome: Outcome, detail: &str) -> Result<()> {
        let entry = LedgerEntry {
            outcome,
            detail: detail.to_string(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        let value = serde_json::to_vec(&entry)?;

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        self.db
            .put_opt(key.to_string_lossy().as_bytes(), value, &write_opts)?;
        Ok(())
    }

    /// Whether the current entry for a key is a success
    pub fn is_done(&self, key: &Path) -> Result<bool> {
        Ok(matches!(
            self.entry(key)?,
            Some(LedgerEntry {
                outcome: Outcome::Success,
                ..
            })
        ))
    }

    /// The current entry for a key, if any
    pub fn entry(&self, key: &Path) -> Result<Option<LedgerEntry>> {
        match self.db.get(key.to_string_lossy().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}
