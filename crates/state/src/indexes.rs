//! Parent → child secondary index.
//!
//! Each relation is one composite key `(namespace, parent, child)` holding a
//! single `0x00` byte. The key alone carries the relation; enumerating the
//! children of a parent is a partial composite-key scan on `(namespace, parent)`.
//!
//! Entries are written in the same transaction as the child entity and never
//! removed, since entities are never deleted.

use tracing::debug;

use sollytch_ledger_types::{ChaincodeError, Result};

use crate::stub::ChaincodeStub;

/// Value stored at every index key.
pub const INDEX_SENTINEL: [u8; 1] = [0x00];

/// Default composite-key namespace for the image index.
pub const PARENT_IMAGE_NAMESPACE: &str = "parent~image";

/// Manages one parent → child index namespace.
#[derive(Debug, Clone)]
pub struct IndexManager {
    namespace: String,
}

impl Default for IndexManager {
    fn default() -> Self {
        Self::new(PARENT_IMAGE_NAMESPACE)
    }
}

impl IndexManager {
    /// Creates a manager for `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into() }
    }

    /// Records that `child` belongs to `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::InvalidArgument`] if either id contains a
    /// reserved delimiter, or [`ChaincodeError::Upstream`] on platform failure.
    pub fn index_child<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &mut S,
        parent: &str,
        child: &str,
    ) -> Result<()> {
        let key = stub.create_composite_key(&self.namespace, &[parent, child])?;
        stub.put_state(&key, INDEX_SENTINEL.to_vec())?;
        debug!(
            namespace = %self.namespace,
            parent = %parent,
            child = %child,
            "Index entry written"
        );
        Ok(())
    }

    /// Child ids recorded under `parent`, in key byte order.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::Corrupt`] if an index key does not have
    /// exactly `(parent, child)` attributes, or [`ChaincodeError::Upstream`]
    /// on platform failure.
    pub fn child_ids<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        parent: &str,
    ) -> Result<Vec<String>> {
        let entries = stub.get_state_by_partial_composite_key(&self.namespace, &[parent])?;
        let mut children = Vec::with_capacity(entries.len());
        for entry in entries {
            let (_, mut attributes) = stub.split_composite_key(&entry.key)?;
            if attributes.len() != 2 {
                return Err(ChaincodeError::corrupt(
                    entry.key.escape_debug().to_string(),
                    format!("index key has {} attributes, expected 2", attributes.len()),
                ));
            }
            children.extend(attributes.pop());
        }
        debug!(
            namespace = %self.namespace,
            parent = %parent,
            count = children.len(),
            "Index scanned"
        );
        Ok(children)
    }
}
