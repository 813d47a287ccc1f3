//! In-memory ledger with platform transaction semantics.
//!
//! Used by tests and the simulator in place of a peer's state database.
//! Reproduces the behaviour chaincode relies on:
//!
//! - Reads observe committed state, never the transaction's own pending writes
//! - Writes are buffered and applied atomically at commit
//! - Commit fails with a read conflict if any key (or scanned range) the
//!   transaction read has changed since it was read
//! - Dropping an uncommitted transaction discards its writes

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use sollytch_ledger_types::TxTimestamp;

use crate::keys;
use crate::stub::{ChaincodeStub, StateEntry, StubError};

#[derive(Debug, Clone)]
struct VersionedValue {
    value: Vec<u8>,
    /// Commit height at which the value was written.
    height: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: BTreeMap<String, VersionedValue>,
    height: u64,
}

impl LedgerState {
    fn version_of(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|v| v.height)
    }

    fn scan(&self, start: Bound<&str>, end: Bound<&str>) -> Vec<(String, u64, Vec<u8>)> {
        self.entries
            .range::<str, _>((start, end))
            .map(|(k, v)| (k.clone(), v.height, v.value.clone()))
            .collect()
    }
}

fn bounds_str(bound: &Bound<String>) -> Bound<&str> {
    bound.as_ref().map(String::as_str)
}

/// A range scan recorded for phantom detection at commit.
#[derive(Debug)]
struct RangeRead {
    start: Bound<String>,
    end: Bound<String>,
    composite: bool,
    observed: Vec<(String, u64)>,
}

#[derive(Debug, Default)]
struct ReadSet {
    keys: HashMap<String, Option<u64>>,
    ranges: Vec<RangeRead>,
}

/// Shared in-memory ledger. Cloning yields another handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Transaction identifier.
    pub tx_id: String,
    /// Ledger height after the commit.
    pub height: u64,
    /// Number of keys written.
    pub writes: usize,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a transaction whose clock reads `timestamp`.
    pub fn begin(&self, tx_id: impl Into<String>, timestamp: TxTimestamp) -> MemoryTransaction {
        self.open(tx_id.into(), Some(timestamp))
    }

    /// Starts a transaction that carries no timestamp.
    ///
    /// Any operation that needs the clock fails.
    pub fn begin_without_clock(&self, tx_id: impl Into<String>) -> MemoryTransaction {
        self.open(tx_id.into(), None)
    }

    fn open(&self, tx_id: String, timestamp: Option<TxTimestamp>) -> MemoryTransaction {
        debug!(tx_id = %tx_id, "Transaction started");
        MemoryTransaction {
            ledger: self.clone(),
            tx_id,
            timestamp,
            reads: Mutex::new(ReadSet::default()),
            writes: BTreeMap::new(),
            finished: false,
        }
    }

    /// Returns the committed value at `key`.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.state.read().entries.get(key).map(|v| v.value.clone())
    }

    /// Writes `value` at `key` outside any transaction.
    ///
    /// Seeds fixtures, including deliberately malformed state.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        let mut state = self.state.write();
        state.height += 1;
        let height = state.height;
        state.entries.insert(key.into(), VersionedValue { value: value.into(), height });
    }

    /// All committed keys in byte order, composite keys included.
    pub fn keys(&self) -> Vec<String> {
        self.state.read().entries.keys().cloned().collect()
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether the ledger holds no keys.
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Number of commits applied so far.
    pub fn height(&self) -> u64 {
        self.state.read().height
    }
}

/// One transaction against a [`MemoryLedger`].
#[derive(Debug)]
pub struct MemoryTransaction {
    ledger: MemoryLedger,
    tx_id: String,
    timestamp: Option<TxTimestamp>,
    reads: Mutex<ReadSet>,
    writes: BTreeMap<String, Vec<u8>>,
    finished: bool,
}

impl MemoryTransaction {
    /// Buffered writes, in key order.
    pub fn pending_writes(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.writes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Validates the read set and applies buffered writes atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StubError::ReadConflict`] if a key or range read by this
    /// transaction changed since it was read. Nothing is applied in that case.
    pub fn commit(mut self) -> Result<CommitReceipt, StubError> {
        self.finished = true;
        let reads = std::mem::take(&mut *self.reads.lock());
        let writes = std::mem::take(&mut self.writes);

        let mut state = self.ledger.state.write();

        for (key, observed) in &reads.keys {
            if state.version_of(key) != *observed {
                debug!(tx_id = %self.tx_id, key = %key.escape_debug(), "Read conflict");
                return Err(StubError::ReadConflict { key: key.escape_debug().to_string() });
            }
        }
        for range in &reads.ranges {
            let current: Vec<(String, u64)> = state
                .scan(bounds_str(&range.start), bounds_str(&range.end))
                .into_iter()
                .filter(|(k, _, _)| keys::is_composite_key(k) == range.composite)
                .map(|(k, h, _)| (k, h))
                .collect();
            if current != range.observed {
                let key = match &range.start {
                    Bound::Included(start) => start.escape_debug().to_string(),
                    _ => String::new(),
                };
                debug!(tx_id = %self.tx_id, range_start = %key, "Phantom read conflict");
                return Err(StubError::ReadConflict { key });
            }
        }

        let count = writes.len();
        if count > 0 {
            state.height += 1;
            let height = state.height;
            for (key, value) in writes {
                state.entries.insert(key, VersionedValue { value, height });
            }
        }

        debug!(tx_id = %self.tx_id, writes = count, height = state.height, "Transaction committed");
        Ok(CommitReceipt { tx_id: self.tx_id.clone(), height: state.height, writes: count })
    }

    fn record_range(
        &self,
        start: Bound<String>,
        end: Bound<String>,
        composite: bool,
    ) -> Vec<StateEntry> {
        let rows = self
            .ledger
            .state
            .read()
            .scan(bounds_str(&start), bounds_str(&end));
        let rows: Vec<_> =
            rows.into_iter().filter(|(k, _, _)| keys::is_composite_key(k) == composite).collect();

        let observed = rows.iter().map(|(k, h, _)| (k.clone(), *h)).collect();
        self.reads.lock().ranges.push(RangeRead { start, end, composite, observed });

        rows.into_iter().map(|(key, _, value)| StateEntry { key, value }).collect()
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            debug!(tx_id = %self.tx_id, discarded = self.writes.len(), "Transaction rolled back");
        }
    }
}

impl ChaincodeStub for MemoryTransaction {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn tx_timestamp(&self) -> Result<TxTimestamp, StubError> {
        self.timestamp.ok_or_else(|| StubError::Clock {
            message: format!("transaction {} has no timestamp", self.tx_id),
        })
    }

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StubError> {
        let state = self.ledger.state.read();
        let entry = state.entries.get(key);
        self.reads
            .lock()
            .keys
            .entry(key.to_string())
            .or_insert_with(|| entry.map(|v| v.height));
        Ok(entry.map(|v| v.value.clone()))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StubError> {
        if key.is_empty() {
            return Err(StubError::InvalidKey {
                key: String::new(),
                reason: "key must not be empty".to_string(),
            });
        }
        self.writes.insert(key.to_string(), value);
        Ok(())
    }

    fn get_state_by_range(&self, start: &str, end: &str) -> Result<Vec<StateEntry>, StubError> {
        let lower =
            if start.is_empty() { Bound::Unbounded } else { Bound::Included(start.to_string()) };
        let upper =
            if end.is_empty() { Bound::Unbounded } else { Bound::Excluded(end.to_string()) };
        Ok(self.record_range(lower, upper, false))
    }

    fn get_state_by_partial_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> Result<Vec<StateEntry>, StubError> {
        let (start, end) = keys::partial_key_range(object_type, attributes)?;
        Ok(self.record_range(Bound::Included(start), Bound::Excluded(end), true))
    }
}
