//! Resource loading seam.
//!
//! The engine resolves effective URLs through a [`ResourceLoader`]. The
//! in-repo loader handles `asset://` URLs rooted at the configured asset
//! directory; network schemes are intentionally unsupported here and arrive
//! through a host-supplied loader implementation.

use std::fs;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tracing::trace;

use atlas_bridge::ResourceKind;

use crate::error::{LoadError, LoadResult};

/// URL scheme served from the asset root.
pub const ASSET_SCHEME: &str = "asset://";

/// Resolves one effective URL to resource bytes.
///
/// Implementations are called from multiple fetch worker threads
/// concurrently.
pub trait ResourceLoader: Send + Sync {
    /// Load the resource at `url`.
    fn load(&self, kind: ResourceKind, url: &str) -> LoadResult<Bytes>;
}

/// Loader for `asset://` URLs, rooted at a static asset directory.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    root: PathBuf,
}

impl AssetLoader {
    /// Create a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The asset root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an asset URL to a path under the root.
    ///
    /// Rejects absolute paths and `..` components so a rewritten URL cannot
    /// read outside the asset directory.
    fn resolve(&self, url: &str) -> LoadResult<PathBuf> {
        let Some(relative) = url.strip_prefix(ASSET_SCHEME) else {
            return Err(LoadError::UnsupportedScheme {
                url: url.to_owned(),
            });
        };

        let relative = Path::new(relative);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir));
        if escapes {
            return Err(LoadError::OutsideAssetRoot {
                url: url.to_owned(),
            });
        }

        Ok(self.root.join(relative))
    }
}

impl ResourceLoader for AssetLoader {
    fn load(&self, kind: ResourceKind, url: &str) -> LoadResult<Bytes> {
        let path = self.resolve(url)?;
        trace!(kind = %kind, url, path = %path.display(), "Loading asset");

        match fs::read(&path) {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(LoadError::NotFound {
                    url: url.to_owned(),
                })
            }
            Err(source) => Err(LoadError::Io {
                url: url.to_owned(),
                source,
            }),
        }
    }
}
