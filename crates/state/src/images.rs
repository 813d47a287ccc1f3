//! Image integrity records linked to a parent entity.
//!
//! An image is stored under its own id; its parent relation lives in the
//! secondary index. The index entry is written once, on the image's first
//! write, in the same transaction.

use tracing::info;

use sollytch_ledger_types::{ChaincodeError, DocType, ImageAsset, Result};

use crate::document::{Stored, read_document, write_document};
use crate::indexes::IndexManager;
use crate::stub::ChaincodeStub;
use crate::versioning::{advance_timestamp, current_timestamp, next_version};

/// Versioned storage for [`ImageAsset`] documents.
#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    index: IndexManager,
}

fn not_found(id: &str) -> ChaincodeError {
    ChaincodeError::NotFound { kind: DocType::Image, key: id.to_string() }
}

impl ImageStore {
    /// Creates a store whose parent index uses `index`.
    pub fn new(index: IndexManager) -> Self {
        Self { index }
    }

    /// Records `hash` for `image_id` under `parent_id`.
    ///
    /// The first write creates the image at version 1 and indexes it under its
    /// parent. Later writes replace the hash and bump the version without
    /// touching the index. `captured_at` is the time of the first write.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::InvalidArgument`] if the image exists under a
    /// different parent, the transaction time is not after its last update,
    /// or the key holds another kind of document, or
    /// [`ChaincodeError::Upstream`] on platform failure.
    pub fn store<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &mut S,
        image_id: &str,
        parent_id: &str,
        hash: &str,
    ) -> Result<ImageAsset> {
        let existing = match read_document::<ImageAsset, _>(stub, image_id)? {
            Stored::Absent => None,
            Stored::Present(asset) => Some(asset),
            Stored::Foreign(kind) => {
                return Err(ChaincodeError::invalid_argument(format!(
                    "key {image_id} holds a {kind}, not an image asset"
                )));
            },
        };
        let asset = match existing {
            Some(mut asset) => {
                if asset.parent_id != parent_id {
                    return Err(ChaincodeError::invalid_argument(format!(
                        "image {image_id} belongs to parent {}, not {parent_id}",
                        asset.parent_id
                    )));
                }
                asset.version = next_version(Some(asset.version));
                asset.hash = hash.to_string();
                asset.last_updated_at = advance_timestamp(stub, &asset.last_updated_at)?;
                write_document(stub, image_id, &asset)?;
                asset
            },
            None => {
                let now = current_timestamp(stub)?;
                let asset = ImageAsset {
                    image_id: image_id.to_string(),
                    parent_id: parent_id.to_string(),
                    hash: hash.to_string(),
                    captured_at: now.clone(),
                    created_at: now.clone(),
                    last_updated_at: now,
                    version: next_version(None),
                };
                write_document(stub, image_id, &asset)?;
                self.index.index_child(stub, parent_id, image_id)?;
                asset
            },
        };

        info!(
            image_id = %image_id,
            parent_id = %parent_id,
            version = asset.version,
            "Image stored"
        );
        Ok(asset)
    }

    /// Returns the image stored under `image_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::NotFound`] if no image exists there, or
    /// [`ChaincodeError::Corrupt`] if the stored value cannot be decoded.
    pub fn get<S: ChaincodeStub + ?Sized>(&self, stub: &S, image_id: &str) -> Result<ImageAsset> {
        read_document::<ImageAsset, _>(stub, image_id)?
            .present()
            .ok_or_else(|| not_found(image_id))
    }

    /// Whether an image is stored under `image_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::Corrupt`] if the stored value cannot be decoded.
    pub fn exists<S: ChaincodeStub + ?Sized>(&self, stub: &S, image_id: &str) -> Result<bool> {
        Ok(matches!(read_document::<ImageAsset, _>(stub, image_id)?, Stored::Present(_)))
    }

    /// Every image indexed under `parent_id`, in image-id byte order.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::Corrupt`] if an index entry points at a
    /// missing image, at another kind of document, or at an image recorded
    /// under a different parent.
    pub fn list_by_parent<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        parent_id: &str,
    ) -> Result<Vec<ImageAsset>> {
        let ids = self.index.child_ids(stub, parent_id)?;
        let mut images = Vec::with_capacity(ids.len());
        for image_id in ids {
            let asset = match read_document::<ImageAsset, _>(stub, &image_id)? {
                Stored::Present(asset) => asset,
                Stored::Absent => {
                    return Err(ChaincodeError::corrupt(
                        image_id,
                        format!("indexed under parent {parent_id} but not stored"),
                    ));
                },
                Stored::Foreign(kind) => {
                    return Err(ChaincodeError::corrupt(
                        image_id,
                        format!("indexed under parent {parent_id} but holds a {kind}"),
                    ));
                },
            };
            if asset.parent_id != parent_id {
                return Err(ChaincodeError::corrupt(
                    image_id,
                    format!("indexed under parent {parent_id} but records {}", asset.parent_id),
                ));
            }
            images.push(asset);
        }
        Ok(images)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use sollytch_ledger_types::{ErrorCode, TxTimestamp};

    use super::*;
    use crate::MemoryLedger;

    fn store(
        ledger: &MemoryLedger,
        seconds: i64,
        image: &str,
        parent: &str,
    ) -> Result<ImageAsset> {
        let mut tx = ledger.begin(format!("tx-{seconds}"), TxTimestamp::new(seconds, 0));
        let asset = ImageStore::default().store(&mut tx, image, parent, "abcd")?;
        tx.commit()?;
        Ok(asset)
    }

    #[test]
    fn test_first_store_creates_and_indexes() {
        let ledger = MemoryLedger::new();
        let asset = store(&ledger, 5, "img-1", "T1").unwrap();
        assert_eq!(asset.version, 1);
        assert_eq!(asset.captured_at, "1970-01-01T00:00:05.000000000Z");
        assert_eq!(asset.created_at, asset.captured_at);
        assert_eq!(ledger.len(), 2, "image document plus one index entry");
    }

    #[test]
    fn test_restore_bumps_version_without_new_index_entry() {
        let ledger = MemoryLedger::new();
        let first = store(&ledger, 1, "img-1", "T1").unwrap();

        let mut tx = ledger.begin("tx-2", TxTimestamp::new(2, 0));
        let second = ImageStore::default().store(&mut tx, "img-1", "T1", "ffee").unwrap();
        tx.commit().unwrap();

        assert_eq!(second.version, 2);
        assert_eq!(second.hash, "ffee");
        assert_eq!(second.captured_at, first.captured_at);
        assert!(second.last_updated_at > first.last_updated_at);
        assert_eq!(ledger.len(), 2);

        let tx = ledger.begin("read", TxTimestamp::new(3, 0));
        assert_eq!(ImageStore::default().list_by_parent(&tx, "T1").unwrap(), vec![second]);
    }

    #[test]
    fn test_restore_rejects_clock_not_after_last_update() {
        let ledger = MemoryLedger::new();
        let first = store(&ledger, 10, "img-1", "T1").unwrap();

        for seconds in [3, 10] {
            let err = store(&ledger, seconds, "img-1", "T1").unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidArgument);
        }

        let tx = ledger.begin("read", TxTimestamp::new(11, 0));
        assert_eq!(ImageStore::default().get(&tx, "img-1").unwrap(), first);
    }

    #[test]
    fn test_parent_change_rejected() {
        let ledger = MemoryLedger::new();
        store(&ledger, 1, "img-1", "T1").unwrap();
        let err = store(&ledger, 2, "img-1", "T2").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_list_by_parent_returns_exactly_its_images() {
        let ledger = MemoryLedger::new();
        store(&ledger, 1, "img-2", "T1").unwrap();
        store(&ledger, 2, "img-1", "T1").unwrap();
        store(&ledger, 3, "img-9", "T2").unwrap();

        let tx = ledger.begin("read", TxTimestamp::new(4, 0));
        let images = ImageStore::default();
        let ids: Vec<_> =
            images.list_by_parent(&tx, "T1").unwrap().into_iter().map(|a| a.image_id).collect();
        assert_eq!(ids, vec!["img-1", "img-2"]);
        assert!(images.list_by_parent(&tx, "T3").unwrap().is_empty());
    }

    #[test]
    fn test_get_and_exists() {
        let ledger = MemoryLedger::new();
        store(&ledger, 1, "img-1", "T1").unwrap();

        let tx = ledger.begin("read", TxTimestamp::new(2, 0));
        let images = ImageStore::default();
        assert_eq!(images.get(&tx, "img-1").unwrap().parent_id, "T1");
        assert!(images.exists(&tx, "img-1").unwrap());
        assert!(!images.exists(&tx, "img-2").unwrap());
        assert_eq!(images.get(&tx, "img-2").unwrap_err().code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_dangling_index_entry_is_corrupt() {
        let ledger = MemoryLedger::new();
        let mut tx = ledger.begin("tx1", TxTimestamp::new(1, 0));
        IndexManager::default().index_child(&mut tx, "T1", "ghost").unwrap();
        tx.commit().unwrap();

        let tx = ledger.begin("read", TxTimestamp::new(2, 0));
        let err = ImageStore::default().list_by_parent(&tx, "T1").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Corrupt);
        assert!(err.to_string().contains("ghost"));
    }
}
