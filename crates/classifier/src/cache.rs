//! In-process classifier cache keyed by `(purpose, version)`.
//!
//! A cached tree is only served for the exact model version the ledger holds
//! at read time, so a newer `storeModel` always wins.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use sollytch_ledger_types::Purpose;

use crate::tree::DecisionTree;

/// One decoded tree per purpose, tagged with its model version.
#[derive(Debug, Default)]
pub struct ClassifierCache {
    entries: Mutex<HashMap<Purpose, (u64, Arc<DecisionTree>)>>,
}

impl ClassifierCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The tree cached for `purpose`, if it was decoded from `version`.
    pub fn get(&self, purpose: Purpose, version: u64) -> Option<Arc<DecisionTree>> {
        self.entries
            .lock()
            .get(&purpose)
            .filter(|(cached, _)| *cached == version)
            .map(|(_, tree)| Arc::clone(tree))
    }

    /// Caches `tree` for `purpose`, replacing any other version.
    pub fn insert(&self, purpose: Purpose, version: u64, tree: Arc<DecisionTree>) {
        self.entries.lock().insert(purpose, (version, tree));
    }

    /// Number of cached purposes.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::tree::NodeSpec;

    fn tree(label: &str) -> Arc<DecisionTree> {
        Arc::new(DecisionTree::from_spec("qc_status", NodeSpec::leaf(label)))
    }

    #[test]
    fn test_hit_requires_matching_version() {
        let cache = ClassifierCache::new();
        assert!(cache.is_empty());
        cache.insert(Purpose::QcStatus, 1, tree("ok"));

        assert!(cache.get(Purpose::QcStatus, 1).is_some());
        assert!(cache.get(Purpose::QcStatus, 2).is_none());
        assert!(cache.get(Purpose::ResultClass, 1).is_none());
    }

    #[test]
    fn test_insert_replaces_older_version() {
        let cache = ClassifierCache::new();
        cache.insert(Purpose::QcStatus, 1, tree("old"));
        cache.insert(Purpose::QcStatus, 2, tree("new"));

        assert_eq!(cache.len(), 1);
        assert!(cache.get(Purpose::QcStatus, 1).is_none());
        assert_eq!(*cache.get(Purpose::QcStatus, 2).unwrap(), *tree("new"));
    }
}
