//! Portable state blob for `EqSettings`.
//!
//! Layout: `{"version": 1, "settings": { ...EqSettings... }}` as JSON.
//! Restores are fail-closed: on any error the caller's settings are left
//! exactly as they were.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::settings::{EqSettings, ParamId};

pub const STATE_VERSION: u32 = 1;

#[derive(Debug)]
pub enum StateError {
    /// Not JSON, or not shaped like a settings blob.
    Malformed(serde_json::Error),
    /// Written by a format revision this build does not read.
    UnsupportedVersion(u32),
    /// A continuous parameter is NaN or infinite.
    InvalidValue(ParamId),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::Malformed(e) => write!(f, "malformed state blob: {e}"),
            StateError::UnsupportedVersion(v) => {
                write!(f, "unsupported state version {v} (expected {STATE_VERSION})")
            }
            StateError::InvalidValue(id) => write!(f, "non-finite value for '{}'", id.id()),
        }
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StateError::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StateError {
    fn from(e: serde_json::Error) -> Self {
        StateError::Malformed(e)
    }
}

#[derive(Serialize)]
struct BlobOut<'a> {
    version: u32,
    settings: &'a EqSettings,
}

#[derive(Deserialize)]
struct BlobIn {
    version: u32,
    settings: serde_json::Value,
}

pub fn serialize(settings: &EqSettings) -> Result<Vec<u8>, StateError> {
    if let Some(id) = settings.first_non_finite() {
        return Err(StateError::InvalidValue(id));
    }
    let blob = BlobOut {
        version: STATE_VERSION,
        settings,
    };
    Ok(serde_json::to_vec(&blob)?)
}

/// Parse and validate a blob. Finite out-of-range values are clamped into
/// their declared ranges.
pub fn deserialize(bytes: &[u8]) -> Result<EqSettings, StateError> {
    let blob: BlobIn = serde_json::from_slice(bytes)?;
    if blob.version != STATE_VERSION {
        return Err(StateError::UnsupportedVersion(blob.version));
    }
    let settings: EqSettings = serde_json::from_value(blob.settings)?;
    if let Some(id) = settings.first_non_finite() {
        return Err(StateError::InvalidValue(id));
    }
    Ok(settings.clamped())
}

impl EqSettings {
    pub fn to_state(&self) -> Result<Vec<u8>, StateError> {
        serialize(self)
    }

    /// Replace `self` with the blob's contents, or leave it untouched.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), StateError> {
        match deserialize(bytes) {
            Ok(restored) => {
                *self = restored;
                Ok(())
            }
            Err(e) => {
                log::warn!("State restore rejected: {e}");
                Err(e)
            }
        }
    }
}
