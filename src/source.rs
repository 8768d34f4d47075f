use eyre::{Result, eyre};
use std::path::PathBuf;
use thiserror::Error;
use url::Url;
use walkdir::WalkDir;

/// An object found in an archive container.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobItem {
    /// Full object key, `/`-separated.
    pub name: String,
    /// Absolute URL of the object, without credentials.
    pub url: String,
}

impl BlobItem {
    /// Last path segment of the key; this is what the file name parser sees.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// A container of archive objects.
///
/// Implementations enumerate object keys (optionally restricted to a key
/// prefix) and resolve their public URLs. The returned order is the order
/// rows are written to the generated script.
pub trait BlobSource {
    fn list(&self, prefix: Option<&str>) -> Result<Vec<BlobItem>>;
}

/// Storage failures that callers may want to tell apart from other errors.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("storage request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },

    #[error("storage transport error: {0}")]
    Transport(String),

    #[error("malformed listing response: {0}")]
    MalformedListing(String),
}

/// A local directory standing in for a storage container.
///
/// Files are listed recursively; keys are paths relative to the root joined
/// with `/`, sorted, and URLs are `file://` URLs. Symbolic links are not
/// followed.
pub struct LocalDirSource {
    root: PathBuf,
}

impl LocalDirSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { root: path.into() }
    }
}

impl BlobSource for LocalDirSource {
    fn list(&self, prefix: Option<&str>) -> Result<Vec<BlobItem>> {
        if !self.root.is_dir() {
            eyre::bail!("{} is not a directory", self.root.display());
        }
        let root = std::fs::canonicalize(&self.root)?;

        let mut items = Vec::new();
        for entry in WalkDir::new(&root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(&root)?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if prefix.is_some_and(|p| !name.starts_with(p)) {
                continue;
            }

            let url = Url::from_file_path(path)
                .map_err(|_| eyre!("cannot build a file URL for {}", path.display()))?;
            items.push(BlobItem {
                name,
                url: url.to_string(),
            });
        }

        items.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!(root = %root.display(), count = items.len(), "listed local directory");
        Ok(items)
    }
}
