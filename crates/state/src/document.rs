//! Typed ledger documents.
//!
//! Every value written by the chaincode is a JSON object carrying a `docType`
//! discriminator next to the entity's own fields. Tests, models and images
//! share one key space; the discriminator lets a full range scan tell them
//! apart and lets a typed read notice that a key holds another kind.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use sollytch_ledger_types::codec::{decode_json, encode_json};
use sollytch_ledger_types::{
    ChaincodeError, ClassifierModel, DocType, ImageAsset, Result, TestRecord,
};

use crate::stub::ChaincodeStub;

/// An entity stored as a ledger document.
pub trait Document: Serialize + DeserializeOwned {
    /// Discriminator written alongside the entity.
    const DOC_TYPE: DocType;
}

impl Document for TestRecord {
    const DOC_TYPE: DocType = DocType::Test;
}

impl Document for ClassifierModel {
    const DOC_TYPE: DocType = DocType::Model;
}

impl Document for ImageAsset {
    const DOC_TYPE: DocType = DocType::Image;
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    #[serde(rename = "docType")]
    doc_type: DocType,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Deserialize)]
struct Header {
    #[serde(rename = "docType")]
    doc_type: DocType,
}

/// What a typed read found at a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Stored<T> {
    /// Nothing is stored at the key.
    Absent,
    /// A document of the requested kind.
    Present(T),
    /// A document of a different kind.
    Foreign(DocType),
}

impl<T> Stored<T> {
    /// The document, if one of the requested kind is present.
    pub fn present(self) -> Option<T> {
        match self {
            Self::Present(doc) => Some(doc),
            Self::Absent | Self::Foreign(_) => None,
        }
    }
}

/// Reads the discriminator of a stored value.
///
/// # Errors
///
/// Returns [`ChaincodeError::Corrupt`] if the value is not a JSON object with
/// a known `docType`.
pub fn doc_type_of(key: &str, bytes: &[u8]) -> Result<DocType> {
    decode_json::<Header>(bytes)
        .map(|header| header.doc_type)
        .map_err(|e| ChaincodeError::corrupt(key, e))
}

/// Decodes a stored value as `T`.
///
/// # Errors
///
/// Returns [`ChaincodeError::Corrupt`] if the value cannot be decoded.
pub fn decode_document<T: Document>(key: &str, bytes: &[u8]) -> Result<Stored<T>> {
    let doc_type = doc_type_of(key, bytes)?;
    if doc_type != T::DOC_TYPE {
        return Ok(Stored::Foreign(doc_type));
    }
    decode_json::<T>(bytes).map(Stored::Present).map_err(|e| ChaincodeError::corrupt(key, e))
}

/// Reads and decodes the document at `key`.
///
/// # Errors
///
/// Returns [`ChaincodeError::Corrupt`] if a stored value cannot be decoded, or
/// [`ChaincodeError::Upstream`] if the state store fails.
pub fn read_document<T: Document, S: ChaincodeStub + ?Sized>(
    stub: &S,
    key: &str,
) -> Result<Stored<T>> {
    match stub.get_state(key)? {
        None => Ok(Stored::Absent),
        Some(bytes) => decode_document(key, &bytes),
    }
}

/// Encodes `doc` with its discriminator and buffers the write at `key`.
///
/// # Errors
///
/// Returns [`ChaincodeError::InvalidArgument`] if the document cannot be
/// encoded, or [`ChaincodeError::Upstream`] if the state store fails.
pub fn write_document<T: Document, S: ChaincodeStub + ?Sized>(
    stub: &mut S,
    key: &str,
    doc: &T,
) -> Result<()> {
    let bytes = encode_json(&Envelope { doc_type: T::DOC_TYPE, body: doc })
        .map_err(|e| ChaincodeError::invalid_argument(format!("cannot encode document: {e}")))?;
    stub.put_state(key, bytes)?;
    Ok(())
}
