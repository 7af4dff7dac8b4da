//! Error types for the artifact model.

use thiserror::Error;

use crate::models::ArtifactId;

/// Errors raised by the artifact model, registries and codec.
///
/// Data problems found while loading a document are not errors: they are
/// logged and reported through [`crate::codec::LoadReport`] instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("recursive commit: a commit is already in progress")]
    RecursiveCommit,

    #[error("write access is required to commit artifact changes")]
    WriteAccessRequired,

    #[error("element '{0}' is not composite and cannot have children")]
    NotComposite(String),

    #[error("cannot change element kind from '{from}' to '{to}'")]
    KindChange { from: String, to: String },

    #[error("artifact root must be of kind 'root', found '{0}'")]
    InvalidRoot(String),

    #[error("unknown artifact: {0}")]
    UnknownArtifact(ArtifactId),

    #[error("artifact already staged: {0}")]
    DuplicateArtifactId(ArtifactId),

    #[error("artifact name already in use: {0}")]
    DuplicateArtifactName(String),

    #[error("artifact name must not be empty")]
    EmptyArtifactName,

    #[error("unknown element type: {0}")]
    UnknownElementType(String),

    #[error("unknown artifact type: {0}")]
    UnknownArtifactType(String),

    #[error("unknown properties provider: {0}")]
    UnknownPropertiesProvider(String),

    #[error("type id already registered: {0}")]
    DuplicateTypeId(String),

    #[error("invalid value '{value}' for attribute '{name}'")]
    InvalidAttribute { name: String, value: String },

    #[error("child index {index} out of bounds ({len} children)")]
    ChildIndexOutOfBounds { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
