//! Error kinds for profile storage and display-configuration operations
//!
//! Each operation raises a small closed set of kinds; "no match" outcomes
//! from reconciliation are ordinary `Option` values, never errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to open `{}`: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read `{}`: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write `{}`: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{}`: {source}", path.display())]
    FileParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode profile for `{}`: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The candidate display configuration was rejected by the OS
    /// during the validate phase.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("display configuration buffer size query failed with {code}")]
    BufferSizes { code: i32 },

    /// The buffer-size/query pair kept racing a topology change and the
    /// retry budget ran out.
    #[error("display configuration query failed {attempts} times")]
    Query { attempts: u32 },

    #[error("setting the display configuration failed with {code}")]
    SetDisplayConfig { code: i32 },

    #[error("graphics adapter enumeration failed: {message}")]
    AdapterEnumeration { message: String },
}
