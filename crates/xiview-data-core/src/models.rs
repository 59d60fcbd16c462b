//! Data models for the network document.
//!
//! Field names on the wire follow the compact keys the xiVIEW network
//! viewer reads (`pi1`, `sc`, `linkSite`, ...). Rust-side names are
//! descriptive; `#[serde(rename)]` maps between the two.
//!
//! JSON-valued columns (scores, provenance, search parameters, modification
//! arrays) are passed through as [`serde_json::Value`] untouched.

use serde::Serialize;
use serde_json::Value;

use crate::keys::{upload_id_as_text, PeptideKey, ProteinKey, UploadId};

/// One `upload` row: a processed mzIdentML submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadRecord {
    pub id: UploadId,
    pub project_id: String,
    pub identification_file_name: String,
    pub provider: Value,
    pub audits: Value,
    pub samples: Value,
    pub bib: Value,
    pub spectra_formats: Value,
    pub contains_crosslinks: Option<bool>,
    pub warnings: Value,
}

/// One `analysiscollection` row, tying a protocol and spectra data to an
/// identification list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisCollectionRecord {
    pub upload_id: UploadId,
    pub spectrum_identification_list_ref: String,
    pub spectrum_identification_protocol_ref: String,
    pub spectra_data_ref: String,
}

/// One `spectrumidentificationprotocol` row: the search configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolRecord {
    pub id: String,
    pub upload_id: UploadId,
    pub frag_tol: Value,
    pub search_params: Value,
    pub analysis_software: Value,
    pub threshold: Value,
}

/// Descriptive records for the resolved uploads.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    #[serde(rename = "mzIdentML_files")]
    pub uploads: Vec<UploadRecord>,
    pub analysis_collections: Vec<AnalysisCollectionRecord>,
    pub spectrum_identification_protocols: Vec<ProtocolRecord>,
}

/// A passing cross-link spectrum match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub id: String,
    #[serde(rename = "pi1")]
    pub pep1_id: i64,
    #[serde(rename = "pi2")]
    pub pep2_id: Option<i64>,
    #[serde(rename = "sc")]
    pub scores: Value,
    #[serde(rename = "si", serialize_with = "upload_id_as_text")]
    pub upload_id: UploadId,
    #[serde(rename = "c_mz")]
    pub calc_mz: Option<f64>,
    #[serde(rename = "pc_c")]
    pub charge_state: Option<i64>,
    #[serde(rename = "pc_mz")]
    pub exp_mz: Option<f64>,
    #[serde(rename = "sp")]
    pub spectrum_id: String,
    #[serde(rename = "sd_ref")]
    pub spectra_data_ref: String,
    #[serde(rename = "pass")]
    pub pass_threshold: bool,
    #[serde(rename = "r")]
    pub rank: Option<i64>,
    #[serde(rename = "sil")]
    pub sil_id: Option<String>,
}

impl MatchRecord {
    /// Peptides this match references, scoped to the match's own upload.
    pub fn peptide_keys(&self) -> impl Iterator<Item = PeptideKey> + '_ {
        std::iter::once(self.pep1_id)
            .chain(self.pep2_id)
            .map(|id| PeptideKey::new(self.upload_id, id))
    }
}

/// A modified peptide with its protein evidence aggregated into parallel
/// arrays (one entry per `peptideevidence` row).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeptideRecord {
    pub id: i64,
    #[serde(rename = "u_id", serialize_with = "upload_id_as_text")]
    pub upload_id: UploadId,
    #[serde(rename = "base_seq")]
    pub base_sequence: String,
    #[serde(rename = "prt")]
    pub protein_refs: Vec<String>,
    #[serde(rename = "pos")]
    pub positions: Vec<Option<i64>>,
    pub is_decoy: Vec<Option<bool>>,
    #[serde(rename = "linkSite")]
    pub link_site: Option<i64>,
    #[serde(rename = "mod_accs")]
    pub mod_accessions: Value,
    #[serde(rename = "mod_pos")]
    pub mod_positions: Value,
    #[serde(rename = "mod_masses")]
    pub mod_masses: Value,
    #[serde(rename = "cl_modmass")]
    pub crosslinker_modmass: Option<f64>,
}

impl PeptideRecord {
    pub fn key(&self) -> PeptideKey {
        PeptideKey::new(self.upload_id, self.id)
    }

    /// Proteins this peptide is evidenced in, scoped to its upload.
    pub fn protein_keys(&self) -> impl Iterator<Item = ProteinKey> + '_ {
        self.protein_refs
            .iter()
            .map(|id| ProteinKey::new(self.upload_id, id.clone()))
    }
}

/// A `dbsequence` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProteinRecord {
    pub id: String,
    pub name: Option<String>,
    pub accession: String,
    pub sequence: Option<String>,
    #[serde(rename = "search_id", serialize_with = "upload_id_as_text")]
    pub upload_id: UploadId,
    pub description: Option<String>,
}

impl ProteinRecord {
    pub fn key(&self) -> ProteinKey {
        ProteinKey::new(self.upload_id, self.id.clone())
    }
}

/// The assembled document: metadata, matches, peptides, proteins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkData {
    pub metadata: Metadata,
    pub matches: Vec<MatchRecord>,
    pub peptides: Vec<PeptideRecord>,
    pub proteins: Vec<ProteinRecord>,
}

/// Undecoded peak data as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpectrum {
    pub intensity: Vec<u8>,
    pub mz: Vec<u8>,
}

/// Decoded peak data for one spectrum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Peaklist {
    pub intensity: Vec<f64>,
    pub mz: Vec<f64>,
}
