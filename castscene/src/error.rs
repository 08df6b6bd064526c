use std::path::PathBuf;
use thiserror::Error;

use crate::HostError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse notification data: {message}")]
    NotificationParse { message: String },

    #[error(transparent)]
    Host(#[from] HostError),

    #[cfg(feature = "binary")]
    #[error("failed to parse Cast binary: {message}")]
    BinaryParse { message: String },

    #[cfg(feature = "binary")]
    #[error("invalid Cast file magic: {value:#010x}")]
    BinaryInvalidMagic { value: u32 },

    #[cfg(feature = "binary")]
    #[error("unsupported property type '{value}' for property '{property}'")]
    BinaryUnsupportedPropertyType { property: String, value: String },

    #[cfg(feature = "binary")]
    #[error("failed to write Cast binary: {message}")]
    BinaryWrite { message: String },
}
