//! Classifier models stored as ledger state.
//!
//! Each purpose key holds one model document whose `modelData` is the base64
//! text of a postcard-encoded [`DecisionTree`]. Storing a model never inspects
//! the payload; a malformed payload surfaces as `Corrupt` on first load.

use std::sync::Arc;

use tracing::{debug, info};

use sollytch_ledger_state::document::{read_document, write_document};
use sollytch_ledger_state::versioning::{current_timestamp, next_version};
use sollytch_ledger_state::{ChaincodeStub, Stored};
use sollytch_ledger_types::codec::decode_base64;
use sollytch_ledger_types::error::UpstreamSnafu;
use sollytch_ledger_types::{
    ChaincodeError, ClassifierConfig, ClassifierModel, DocType, ModelInfo, Purpose, Result,
};

use crate::cache::ClassifierCache;
use crate::staging::StagedArtifact;
use crate::tree::DecisionTree;

/// A decoded, validated classifier ready for inference.
#[derive(Debug, Clone)]
pub struct LoadedClassifier {
    /// Purpose the classifier predicts.
    pub purpose: Purpose,
    /// Model version it was decoded from.
    pub version: u64,
    /// The tree.
    pub tree: Arc<DecisionTree>,
}

/// Parses a purpose key against the allow-list.
///
/// # Errors
///
/// Returns [`ChaincodeError::InvalidArgument`] for an empty or unknown key.
pub fn parse_purpose(key: &str) -> Result<Purpose> {
    if key.is_empty() {
        return Err(ChaincodeError::invalid_argument("model key must not be empty"));
    }
    Purpose::from_key(key).ok_or_else(|| {
        ChaincodeError::invalid_argument(format!(
            "unknown model key {key}, expected one of acao_recomendada, result_class, qc_status"
        ))
    })
}

/// Stores and loads classifier models.
#[derive(Debug, Clone, Default)]
pub struct ModelRepository {
    config: ClassifierConfig,
    cache: Option<Arc<ClassifierCache>>,
}

impl ModelRepository {
    /// Creates a repository; a cache is attached when the config enables one.
    pub fn new(config: ClassifierConfig) -> Self {
        let cache = config.cache_enabled.then(|| Arc::new(ClassifierCache::new()));
        Self { config, cache }
    }

    /// The attached cache, if any.
    pub fn cache(&self) -> Option<&ClassifierCache> {
        self.cache.as_deref()
    }

    /// Stores `payload` as the next version of the `purpose_key` model.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::InvalidArgument`] if the key is not in the
    /// allow-list or the payload is empty, [`ChaincodeError::Corrupt`] if the
    /// key holds something other than a model, or [`ChaincodeError::Upstream`]
    /// on platform failure.
    pub fn store<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &mut S,
        purpose_key: &str,
        payload: &str,
    ) -> Result<ClassifierModel> {
        let purpose = parse_purpose(purpose_key)?;
        if payload.is_empty() {
            return Err(ChaincodeError::invalid_argument("model data must not be empty"));
        }

        let existing = match read_document::<ClassifierModel, _>(stub, purpose.key())? {
            Stored::Absent => None,
            Stored::Present(model) => Some(model.version),
            Stored::Foreign(kind) => {
                return Err(ChaincodeError::corrupt(
                    purpose.key(),
                    format!("model key holds a {kind}"),
                ));
            },
        };

        let model = ClassifierModel {
            purpose,
            version: next_version(existing),
            updated_at: current_timestamp(stub)?,
            payload: payload.to_string(),
        };
        write_document(stub, purpose.key(), &model)?;

        info!(purpose = %purpose, version = model.version, len = payload.len(), "Model stored");
        Ok(model)
    }

    /// Metadata of the current `purpose_key` model.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::InvalidArgument`] for an unknown key,
    /// [`ChaincodeError::NotFound`] if no model is stored, or
    /// [`ChaincodeError::Corrupt`] if the document cannot be decoded.
    pub fn info<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        purpose_key: &str,
    ) -> Result<ModelInfo> {
        let purpose = parse_purpose(purpose_key)?;
        Ok(ModelInfo::from(&self.read(stub, purpose)?))
    }

    fn read<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        purpose: Purpose,
    ) -> Result<ClassifierModel> {
        let key = purpose.key();
        match read_document::<ClassifierModel, _>(stub, key)? {
            Stored::Present(model) => Ok(model),
            Stored::Absent => {
                Err(ChaincodeError::NotFound { kind: DocType::Model, key: key.to_string() })
            },
            Stored::Foreign(kind) => {
                Err(ChaincodeError::corrupt(key, format!("model key holds a {kind}")))
            },
        }
    }

    /// Loads the current classifier for `purpose`.
    ///
    /// The decoded bytes are staged to a temporary file, which the runtime
    /// reads back; the file is removed before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::NotFound`] if no model is stored,
    /// [`ChaincodeError::Corrupt`] if the document, base64 text or tree cannot
    /// be decoded, the tree fails validation or predicts another attribute,
    /// or [`ChaincodeError::Upstream`] if the artifact cannot be staged.
    pub fn load<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        purpose: Purpose,
    ) -> Result<LoadedClassifier> {
        let model = self.read(stub, purpose)?;
        let key = purpose.key();

        if let Some(tree) = self.cache.as_ref().and_then(|c| c.get(purpose, model.version)) {
            debug!(purpose = %purpose, version = model.version, "Classifier cache hit");
            return Ok(LoadedClassifier { purpose, version: model.version, tree });
        }

        let bytes =
            decode_base64(&model.payload).map_err(|err| ChaincodeError::corrupt(key, err))?;
        let staged = StagedArtifact::stage(purpose, &bytes, self.config.staging_dir.as_deref())
            .map_err(|err| {
                UpstreamSnafu { message: format!("cannot stage classifier {key}: {err}") }.build()
            })?;
        let tree = DecisionTree::load_file(staged.path())
            .map_err(|err| ChaincodeError::corrupt(key, err))?;
        drop(staged);

        let depth = tree
            .validate(self.config.max_tree_depth)
            .map_err(|err| ChaincodeError::corrupt(key, err))?;
        if tree.class_attribute() != key {
            return Err(ChaincodeError::corrupt(
                key,
                format!("classifier predicts {}, not {key}", tree.class_attribute()),
            ));
        }

        let tree = Arc::new(tree);
        if let Some(cache) = &self.cache {
            cache.insert(purpose, model.version, Arc::clone(&tree));
        }
        debug!(purpose = %purpose, version = model.version, depth, "Classifier loaded");
        Ok(LoadedClassifier { purpose, version: model.version, tree })
    }
}
