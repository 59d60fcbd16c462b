//! Composite keys.
//!
//! Local identifiers (peptide ids, protein ids, spectrum ids) are only
//! unique within the upload that produced them. Every lookup in this crate
//! therefore goes through [`ScopedId`], which pairs the local id with its
//! [`UploadId`]; there is no API that accepts a bare local id.

use serde::{Serialize, Serializer};
use std::fmt;

/// Identifier of one processed dataset submission (`upload.id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UploadId(i64);

impl UploadId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for UploadId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serializes an [`UploadId`] as a JSON string.
///
/// The network viewer groups matches, peptides and proteins by upload using
/// string keys, so those sections carry the upload id as text while the
/// metadata section keeps it numeric.
pub fn upload_id_as_text<S: Serializer>(id: &UploadId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

/// A local identifier scoped to the upload it belongs to.
///
/// Ordering is by upload first, so a sorted collection of keys is already
/// grouped per upload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopedId<T> {
    pub upload_id: UploadId,
    pub local_id: T,
}

impl<T> ScopedId<T> {
    pub fn new(upload_id: UploadId, local_id: T) -> Self {
        Self {
            upload_id,
            local_id,
        }
    }
}

impl<T: fmt::Display> fmt::Display for ScopedId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.upload_id, self.local_id)
    }
}

/// `modifiedpeptide` rows are keyed by an integer id within an upload.
pub type PeptideKey = ScopedId<i64>;

/// `dbsequence` rows are keyed by the mzIdentML `DBSequence` id.
pub type ProteinKey = ScopedId<String>;

/// Exact lookup key for one spectrum's peaklist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SpectrumKey {
    pub spectrum_id: String,
    pub spectra_data_ref: String,
    pub upload_id: UploadId,
}

impl fmt::Display for SpectrumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "spectrum {} (spectra data {}, upload {})",
            self.spectrum_id, self.spectra_data_ref, self.upload_id
        )
    }
}
