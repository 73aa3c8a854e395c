//! Object retrieval for uploaded statements.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::ClientError;
use crate::notification::ObjectIdentity;

const VERSIONS_DIR: &str = ".versions";

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object fetch failed for {location}: {detail}")]
    Transient { location: String, detail: String },

    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

impl From<BlobError> for ClientError {
    fn from(error: BlobError) -> Self {
        match error {
            BlobError::NotFound(location) => ClientError::object_not_found(&location),
            BlobError::Transient { location, detail } => {
                ClientError::object_fetch_failed(&location, &detail)
            }
            BlobError::InvalidKey(key) => ClientError::invalid_object_key(&key),
        }
    }
}

pub trait BlobStore: Send + Sync {
    /// Returns the full content of the named object version.
    fn fetch(&self, identity: &ObjectIdentity) -> Result<Vec<u8>, BlobError>;
}

/// Blob store backed by a local directory tree.
///
/// Unversioned objects live at `<root>/<bucket>/<key>`; versioned objects at
/// `<root>/<bucket>/.versions/<version_id>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_path(&self, identity: &ObjectIdentity) -> Result<PathBuf, BlobError> {
        let bucket = safe_relative(&identity.bucket)?;
        let key = safe_relative(&identity.key)?;

        let mut path = self.root.join(bucket);
        if let Some(version_id) = identity.version_id.as_deref() {
            path.push(VERSIONS_DIR);
            path.push(safe_relative(version_id)?);
        }
        path.push(key);
        Ok(path)
    }

    /// Writes an object into the store, creating parent directories.
    pub fn put(&self, identity: &ObjectIdentity, bytes: &[u8]) -> Result<PathBuf, BlobError> {
        let path = self.object_path(identity)?;
        let transient = |error: std::io::Error| BlobError::Transient {
            location: identity.location(),
            detail: error.to_string(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(transient)?;
        }
        fs::write(&path, bytes).map_err(transient)?;
        Ok(path)
    }
}

impl BlobStore for LocalBlobStore {
    fn fetch(&self, identity: &ObjectIdentity) -> Result<Vec<u8>, BlobError> {
        let path = self.object_path(identity)?;
        debug!(path = %path.display(), "fetching statement object");

        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                Err(BlobError::NotFound(identity.location()))
            }
            Err(error) => Err(BlobError::Transient {
                location: identity.location(),
                detail: error.to_string(),
            }),
        }
    }
}

fn safe_relative(value: &str) -> Result<&Path, BlobError> {
    let path = Path::new(value);
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || path.as_os_str().is_empty() {
        return Err(BlobError::InvalidKey(value.to_string()));
    }
    Ok(path)
}
