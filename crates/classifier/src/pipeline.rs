//! Classification pipeline.
//!
//! Runs the three classifiers in [`Purpose::ALL`] order over one feature row.
//! The first failure aborts the run, so callers either get all three labels or
//! none.

use tracing::debug;

use sollytch_ledger_state::ChaincodeStub;
use sollytch_ledger_types::{ChaincodeError, Labels, Purpose, Result};

use crate::dataset::Dataset;
use crate::features::FeatureRow;
use crate::repository::ModelRepository;

/// Loads classifiers and labels feature rows.
#[derive(Debug, Clone, Default)]
pub struct ClassificationPipeline {
    repository: ModelRepository,
}

impl ClassificationPipeline {
    /// Creates a pipeline reading models through `repository`.
    pub fn new(repository: ModelRepository) -> Self {
        Self { repository }
    }

    /// The model repository.
    pub fn repository(&self) -> &ModelRepository {
        &self.repository
    }

    /// Predicts all three labels for `row`.
    ///
    /// # Errors
    ///
    /// Returns the first error from loading a classifier or running it:
    /// [`ChaincodeError::NotFound`] for a missing model,
    /// [`ChaincodeError::Corrupt`] for a model that cannot be decoded or
    /// evaluated against the feature columns.
    pub fn classify<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        row: &FeatureRow,
    ) -> Result<Labels> {
        let mut labels = Labels::default();
        for purpose in Purpose::ALL {
            let label = self.predict(stub, row, purpose)?;
            labels.set(purpose, label);
        }
        debug!(
            action = %labels.action,
            result_class = %labels.result_class,
            qc_status = %labels.qc_status,
            "Classified"
        );
        Ok(labels)
    }

    fn predict<S: ChaincodeStub + ?Sized>(
        &self,
        stub: &S,
        row: &FeatureRow,
        purpose: Purpose,
    ) -> Result<String> {
        let classifier = self.repository.load(stub, purpose)?;
        let key = purpose.key();

        let table = row.encode(purpose);
        let dataset = Dataset::parse(&table)
            .map_err(|err| ChaincodeError::SchemaMismatch { message: err.to_string() })?;
        let predictions =
            classifier.tree.predict(&dataset).map_err(|err| ChaincodeError::corrupt(key, err))?;

        let label = predictions
            .into_iter()
            .next()
            .ok_or_else(|| ChaincodeError::corrupt(key, "classifier produced no prediction"))?;
        debug!(purpose = %purpose, version = classifier.version, label = %label, "Predicted");
        Ok(label)
    }
}
