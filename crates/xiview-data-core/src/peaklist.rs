//! Peaklist blob codec.
//!
//! Spectrum peak arrays are stored as packed little-endian IEEE-754 `f64`
//! values, 8 bytes each, with no header. The byte order is fixed and does
//! not depend on the host.
//!
//! # Example
//!
//! ```rust
//! use xiview_data_core::peaklist::{decode, encode};
//!
//! let mz = vec![101.07, 202.14, 303.21];
//! let blob = encode(&mz);
//! assert_eq!(blob.len(), 24); // 3 × 8 bytes
//! assert_eq!(decode("mz", &blob).unwrap(), mz);
//! ```

use crate::error::DecodeError;
use crate::models::{Peaklist, RawSpectrum};

/// Width of one packed value.
pub const VALUE_WIDTH: usize = 8;

/// Encode values as a packed little-endian `f64` blob.
pub fn encode(values: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * VALUE_WIDTH);
    for &v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a packed little-endian `f64` blob.
///
/// `column` names the source column in the error when the blob length is
/// not a multiple of [`VALUE_WIDTH`].
pub fn decode(column: &'static str, blob: &[u8]) -> Result<Vec<f64>, DecodeError> {
    if blob.len() % VALUE_WIDTH != 0 {
        return Err(DecodeError {
            column,
            len: blob.len(),
        });
    }
    Ok(blob
        .chunks_exact(VALUE_WIDTH)
        .map(|chunk| {
            let mut raw = [0u8; VALUE_WIDTH];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect())
}

/// Decode both arrays of a stored spectrum.
///
/// The two arrays are not required to have the same length.
pub fn decode_spectrum(raw: &RawSpectrum) -> Result<Peaklist, DecodeError> {
    Ok(Peaklist {
        intensity: decode("intensity", &raw.intensity)?,
        mz: decode("mz", &raw.mz)?,
    })
}
