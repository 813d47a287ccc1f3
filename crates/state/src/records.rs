//! Test record storage.
//!
//! Records are keyed by test id. The store owns `version`, `created_at` and
//! `last_updated_at`; whatever the caller put in those fields is overwritten.

use tracing::{debug, info};

use sollytch_ledger_types::{ChaincodeError, DocType, Labels, Purpose, Result, TestRecord};

use crate::document::{Stored, decode_document, doc_type_of, read_document, write_document};
use crate::stub::ChaincodeStub;
use crate::versioning::{advance_timestamp, current_timestamp, next_version};

/// Versioned CRUD for [`TestRecord`] documents.
pub struct RecordStore;

fn not_found(id: &str) -> ChaincodeError {
    ChaincodeError::NotFound { kind: DocType::Test, key: id.to_string() }
}

fn foreign(id: &str, kind: DocType) -> ChaincodeError {
    ChaincodeError::invalid_argument(format!("key {id} holds a {kind}, not a test record"))
}

fn bind_id(id: &str, record: &mut TestRecord) -> Result<()> {
    if !record.test_id.is_empty() && record.test_id != id {
        return Err(ChaincodeError::invalid_argument(format!(
            "payload test_id {} does not match key {id}",
            record.test_id
        )));
    }
    record.test_id = id.to_string();
    Ok(())
}

fn carry_labels(stored: &Labels, incoming: &mut Labels) {
    for purpose in Purpose::ALL {
        if incoming.get(purpose).is_empty() {
            incoming.set(purpose, stored.get(purpose).to_string());
        }
    }
}

impl RecordStore {
    /// Fails unless `id` is free for a new record.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::AlreadyExists`] if a record is stored under
    /// `id`, or [`ChaincodeError::InvalidArgument`] if another kind is.
    pub fn ensure_vacant<S: ChaincodeStub + ?Sized>(stub: &S, id: &str) -> Result<()> {
        match read_document::<TestRecord, _>(stub, id)? {
            Stored::Absent => Ok(()),
            Stored::Present(_) => {
                Err(ChaincodeError::AlreadyExists { kind: DocType::Test, key: id.to_string() })
            },
            Stored::Foreign(kind) => Err(foreign(id, kind)),
        }
    }

    /// Stores a new record under `id` at [`sollytch_ledger_types::INITIAL_VERSION`].
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::AlreadyExists`] if `id` is taken,
    /// [`ChaincodeError::InvalidArgument`] if the payload's `test_id`
    /// disagrees with `id`, or [`ChaincodeError::Upstream`] on platform failure.
    pub fn create<S: ChaincodeStub + ?Sized>(
        stub: &mut S,
        id: &str,
        mut record: TestRecord,
    ) -> Result<TestRecord> {
        bind_id(id, &mut record)?;
        Self::ensure_vacant(stub, id)?;

        let now = current_timestamp(stub)?;
        record.version = next_version(None);
        record.created_at = now.clone();
        record.last_updated_at = now;

        write_document(stub, id, &record)?;
        info!(test_id = %id, version = record.version, "Test record created");
        Ok(record)
    }

    /// Replaces the record under `id`, bumping its version.
    ///
    /// `created_at` is kept from the stored record. Labels left empty in the
    /// new payload keep their stored values.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::NotFound`] if no record exists,
    /// [`ChaincodeError::InvalidArgument`] on an id mismatch or a transaction
    /// time not after the stored `last_updated_at`, or
    /// [`ChaincodeError::Upstream`] on platform failure.
    pub fn update<S: ChaincodeStub + ?Sized>(
        stub: &mut S,
        id: &str,
        mut record: TestRecord,
    ) -> Result<TestRecord> {
        bind_id(id, &mut record)?;
        let stored = match read_document::<TestRecord, _>(stub, id)? {
            Stored::Present(stored) => stored,
            Stored::Absent => return Err(not_found(id)),
            Stored::Foreign(kind) => return Err(foreign(id, kind)),
        };

        let mut labels = record.labels();
        carry_labels(&stored.labels(), &mut labels);
        record.apply_labels(labels);

        record.version = next_version(Some(stored.version));
        record.created_at = stored.created_at;
        record.last_updated_at = advance_timestamp(stub, &stored.last_updated_at)?;

        write_document(stub, id, &record)?;
        info!(test_id = %id, version = record.version, "Test record updated");
        Ok(record)
    }

    /// Returns the record under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::NotFound`] if no record exists there, or
    /// [`ChaincodeError::Corrupt`] if the stored value cannot be decoded.
    pub fn get<S: ChaincodeStub + ?Sized>(stub: &S, id: &str) -> Result<TestRecord> {
        read_document::<TestRecord, _>(stub, id)?.present().ok_or_else(|| not_found(id))
    }

    /// Returns every test record in key order.
    ///
    /// Models and images sharing the key space are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::Corrupt`] if any stored value cannot be
    /// decoded. No partial list is returned.
    pub fn list_all<S: ChaincodeStub + ?Sized>(stub: &S) -> Result<Vec<TestRecord>> {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        for entry in stub.get_state_by_range("", "")? {
            if doc_type_of(&entry.key, &entry.value)? != DocType::Test {
                skipped += 1;
                continue;
            }
            let stored = decode_document::<TestRecord>(&entry.key, &entry.value)?;
            if let Stored::Present(record) = stored {
                records.push(record);
            }
        }
        debug!(count = records.len(), skipped, "Listed test records");
        Ok(records)
    }
}
