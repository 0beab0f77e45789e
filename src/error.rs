//! Error types for reading and writing import map manifests.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ManifestError>;

/// A single entry broke one of its construction rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("The importmap entry \"{import_name}\" must have either a \"path\" or \"version\" option.")]
    MissingPathOrVersion { import_name: String },

    #[error("The importmap entry \"{import_name}\" cannot have both a \"path\" and \"version\" option.")]
    BothPathAndVersion { import_name: String },

    #[error("The \"entrypoint\" option can only be used with the \"js\" type. Found \"{import_name}\" with type \"{kind}\".")]
    EntrypointNotJs { import_name: String, kind: String },
}

/// Errors raised while loading or saving the manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("The following keys are not valid for the importmap entry \"{import_name}\": \"{}\". Valid keys are: \"{}\".", .keys.join("\", \""), .allowed.join("\", \""))]
    UnknownOptions {
        import_name: String,
        keys: Vec<String>,
        allowed: Vec<String>,
    },

    #[error("The \"type\" option \"{value}\" of the importmap entry \"{import_name}\" is not valid. Valid types are: \"js\", \"css\".")]
    InvalidModuleType { import_name: String, value: String },

    #[error("The \"{key}\" option of the importmap entry \"{import_name}\" must be {expected}.")]
    InvalidOptionValue {
        import_name: String,
        key: String,
        expected: String,
    },

    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error("Could not parse importmap manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not serialize importmap manifest: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::Io { path: path.into(), source }
    }
}
