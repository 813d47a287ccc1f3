//! The custody contract.
//!
//! [`Contract::invoke`] is the single entry point the platform calls. It checks
//! the function name and argument count, validates arguments before touching
//! state, runs the operation against the injected [`ChaincodeStub`] and folds
//! the outcome into a [`Response`]. Any error leaves the transaction's writes
//! to be discarded by the platform.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use sollytch_ledger_classifier::{ClassificationPipeline, FeatureRow, ModelRepository};
use sollytch_ledger_state::{ChaincodeStub, ImageStore, IndexManager, RecordStore};
use sollytch_ledger_types::codec::{decode_json, encode_json};
use sollytch_ledger_types::validation::{
    validate_hash_hex, validate_identifier, validate_model_payload, validate_payload,
};
use sollytch_ledger_types::{
    ChaincodeConfig, ChaincodeError, ImageAsset, ModelInfo, Result, TestRecord,
};

use crate::function::Function;
use crate::response::Response;

fn to_json<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>> {
    encode_json(value).map_err(|err| ChaincodeError::corrupt(key, err))
}

/// The custody contract: test records, classifier models and image assets.
#[derive(Debug, Clone)]
pub struct Contract {
    config: ChaincodeConfig,
    images: ImageStore,
    pipeline: ClassificationPipeline,
}

impl Default for Contract {
    fn default() -> Self {
        Self::new(ChaincodeConfig::default())
    }
}

impl Contract {
    /// Creates a contract from a validated configuration.
    pub fn new(config: ChaincodeConfig) -> Self {
        let index = IndexManager::new(config.image_index_namespace.clone());
        let repository = ModelRepository::new(config.classifier.clone());
        Self {
            images: ImageStore::new(index),
            pipeline: ClassificationPipeline::new(repository),
            config,
        }
    }

    /// Runs `function` with positional `args` inside the transaction `stub`.
    #[instrument(skip_all, fields(function = %function, tx_id = %stub.tx_id(), argc = args.len()))]
    pub fn invoke<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &mut S,
        function: &str,
        args: &[String],
    ) -> Response {
        let response = Response::from(self.dispatch(stub, function, args));
        if response.is_ok() {
            debug!(len = response.payload.len(), "Invocation succeeded");
        } else {
            warn!(status = response.status, message = %response.message, "Invocation failed");
        }
        response
    }

    fn dispatch<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &mut S,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        let function = Function::from_name(function).ok_or_else(|| {
            ChaincodeError::invalid_argument(format!("unknown function {function:?}"))
        })?;
        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            let expected = if min == max { min.to_string() } else { format!("{min} to {max}") };
            return Err(ChaincodeError::invalid_argument(format!(
                "{function} expects {expected} arguments, got {}",
                args.len()
            )));
        }
        let arg = |i: usize| args.get(i).map_or("", String::as_str);

        match function {
            Function::StoreModel => to_json(arg(0), &self.store_model(stub, arg(0), arg(1))?),
            Function::GetModelInfo => to_json(arg(0), &self.get_model_info(stub, arg(0))?),
            Function::StoreTest => {
                let row = args.get(2).map(String::as_str);
                to_json(arg(0), &self.store_test(stub, arg(0), arg(1), row)?)
            },
            Function::UpdateTest => to_json(arg(0), &self.update_test(stub, arg(0), arg(1))?),
            Function::QueryTest => to_json(arg(0), &self.query_test(stub, arg(0))?),
            Function::GetAllTests => to_json("", &self.get_all_tests(stub)?),
            Function::StoreImage => {
                to_json(arg(0), &self.store_image(stub, arg(0), arg(1), arg(2))?)
            },
            Function::GetImage => to_json(arg(0), &self.get_image(stub, arg(0))?),
            Function::ImageExists => {
                Ok(self.image_exists(stub, arg(0))?.to_string().into_bytes())
            },
            Function::GetImagesByParent => {
                to_json(arg(0), &self.get_images_by_parent(stub, arg(0))?)
            },
        }
    }

    fn parse_record(&self, field: &str, payload: &str) -> Result<TestRecord> {
        validate_payload(field, payload, &self.config.validation)?;
        decode_json(payload.as_bytes()).map_err(|err| {
            ChaincodeError::invalid_argument(format!("{field} is not a test record: {err}"))
        })
    }

    /// Stores `model_data` as the next version of the `purpose` model.
    ///
    /// The payload is kept as submitted; it is only decoded when loaded.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::InvalidArgument`] for an unknown purpose or
    /// an empty or oversized payload.
    pub fn store_model<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &mut S,
        purpose: &str,
        model_data: &str,
    ) -> Result<ModelInfo> {
        validate_model_payload(model_data, &self.config.validation)?;
        let model = self.pipeline.repository().store(stub, purpose, model_data)?;
        Ok(ModelInfo::from(&model))
    }

    /// Metadata of the current `purpose` model.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::NotFound`] if no model is stored.
    pub fn get_model_info<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        purpose: &str,
    ) -> Result<ModelInfo> {
        self.pipeline.repository().info(stub, purpose)
    }

    /// Creates the test record `test_id` from a JSON payload.
    ///
    /// With a feature row, the record is labelled by the classification
    /// pipeline before it is stored; labels in the payload are replaced.
    /// Without one, the payload's labels are stored as-is. An empty row counts
    /// as no row.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::InvalidArgument`] for a bad id, payload or
    /// feature value, [`ChaincodeError::SchemaMismatch`] for a feature row of
    /// the wrong shape, [`ChaincodeError::AlreadyExists`] if the id is taken,
    /// or the pipeline's error if any classifier cannot run. Nothing is
    /// written on error.
    pub fn store_test<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &mut S,
        test_id: &str,
        payload: &str,
        feature_row: Option<&str>,
    ) -> Result<TestRecord> {
        validate_identifier("test_id", test_id, &self.config.validation)?;
        let mut record = self.parse_record("payload", payload)?;
        let row = match feature_row.map(str::trim).filter(|row| !row.is_empty()) {
            Some(raw) => {
                validate_payload("feature_row", raw, &self.config.validation)?;
                Some(FeatureRow::parse(raw)?)
            },
            None => None,
        };

        RecordStore::ensure_vacant(stub, test_id)?;
        if let Some(row) = row {
            let labels = self.pipeline.classify(stub, &row)?;
            record.apply_labels(labels);
        }
        RecordStore::create(stub, test_id, record)
    }

    /// Replaces the test record `test_id` with a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::InvalidArgument`] for a bad id or payload, or
    /// [`ChaincodeError::NotFound`] if no record exists.
    pub fn update_test<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &mut S,
        test_id: &str,
        payload: &str,
    ) -> Result<TestRecord> {
        validate_identifier("test_id", test_id, &self.config.validation)?;
        let record = self.parse_record("payload", payload)?;
        RecordStore::update(stub, test_id, record)
    }

    /// The test record `test_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::NotFound`] if no record exists.
    pub fn query_test<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        test_id: &str,
    ) -> Result<TestRecord> {
        validate_identifier("test_id", test_id, &self.config.validation)?;
        RecordStore::get(stub, test_id)
    }

    /// Every test record, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::Corrupt`] if any stored value is undecodable.
    pub fn get_all_tests<S: ChaincodeStub + ?Sized>(&self, stub: &S) -> Result<Vec<TestRecord>> {
        RecordStore::list_all(stub)
    }

    /// Records the content hash of an image belonging to `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::InvalidArgument`] for a bad id or hash, or if
    /// the image already belongs to another parent.
    pub fn store_image<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &mut S,
        image_id: &str,
        parent_id: &str,
        hash_hex: &str,
    ) -> Result<ImageAsset> {
        validate_identifier("image_id", image_id, &self.config.validation)?;
        validate_identifier("parent_id", parent_id, &self.config.validation)?;
        let hash = validate_hash_hex(hash_hex, &self.config.validation)?;
        self.images.store(stub, image_id, parent_id, &hash)
    }

    /// The image `image_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::NotFound`] if no image exists.
    pub fn get_image<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        image_id: &str,
    ) -> Result<ImageAsset> {
        validate_identifier("image_id", image_id, &self.config.validation)?;
        self.images.get(stub, image_id)
    }

    /// Whether the image `image_id` exists.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::InvalidArgument`] for a bad id.
    pub fn image_exists<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        image_id: &str,
    ) -> Result<bool> {
        validate_identifier("image_id", image_id, &self.config.validation)?;
        self.images.exists(stub, image_id)
    }

    /// Every image stored under `parent_id`, in image-id order.
    ///
    /// # Errors
    ///
    /// Returns [`ChaincodeError::Corrupt`] if the index points at a missing or
    /// mismatched image.
    pub fn get_images_by_parent<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        parent_id: &str,
    ) -> Result<Vec<ImageAsset>> {
        validate_identifier("parent_id", parent_id, &self.config.validation)?;
        self.images.list_by_parent(stub, parent_id)
    }
}
