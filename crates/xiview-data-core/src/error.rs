//! Errors surfaced by the fetch operations.
//!
//! Storage plumbing returns [`anyhow::Error`]; the fetch entry points wrap
//! it in [`FetchError`] so callers can tell a storage failure from a missing
//! spectrum or a malformed blob.

use std::fmt;

use thiserror::Error;

use crate::keys::SpectrumKey;

/// Pipeline position of a fetch operation.
///
/// An assembly moves through these in order; a storage failure in any of
/// them aborts the request and is reported with the stage it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    FetchingMetadata,
    FetchingMatches,
    FetchingPeptides,
    FetchingProteins,
    Assembled,
    FetchingSpectrum,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Resolving => "resolving uploads",
            Stage::FetchingMetadata => "fetching metadata",
            Stage::FetchingMatches => "fetching matches",
            Stage::FetchingPeptides => "fetching peptides",
            Stage::FetchingProteins => "fetching proteins",
            Stage::Assembled => "finishing",
            Stage::FetchingSpectrum => "fetching spectrum",
        };
        f.write_str(s)
    }
}

/// A peaklist blob whose length is not a whole number of values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{column} blob has {len} bytes, not a multiple of 8")]
pub struct DecodeError {
    pub column: &'static str,
    pub len: usize,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("storage failure while {stage}")]
    Storage {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("no peaklist for {0}")]
    SpectrumNotFound(SpectrumKey),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl FetchError {
    /// Adapter for `map_err` that tags a storage error with its stage.
    pub fn storage(stage: Stage) -> impl FnOnce(anyhow::Error) -> FetchError {
        move |source| FetchError::Storage { stage, source }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            FetchError::Storage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
