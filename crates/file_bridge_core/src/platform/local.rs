//! Filesystem-backed content store addressed by `file://` identifiers.
//!
//! Serves the application's own storage (imports and local copies) and is the storage layer
//! under [`super::DesktopPlatform`]. When constructed with roots, every path is canonicalized and
//! must stay inside one of them, so symlinks cannot escape the scope.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use file_bridge_contract::{
    mime_for_file_name, BridgeError, BridgeResult, GrantAccess, GrantLiveness, GrantScope,
};
use url::Url;

use super::{PlatformFuture, PlatformProvider, ResourceEntry, ResourceKind};

/// Builds the `file://` identifier for an absolute path.
///
/// # Errors
///
/// Returns an `InvalidArgument` error for relative paths.
pub fn file_uri_for_path(path: &Path) -> BridgeResult<String> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| {
            BridgeError::invalid_argument(format!(
                "path `{}` cannot be expressed as a file uri",
                path.display()
            ))
        })
}

/// Maps a `file://` identifier back to a filesystem path.
///
/// # Errors
///
/// Returns a `NotFound` error when `uri` is not a well-formed `file://` identifier.
pub fn path_for_file_uri(uri: &str) -> BridgeResult<PathBuf> {
    let url = Url::parse(uri)
        .map_err(|err| BridgeError::not_found(format!("malformed identifier `{uri}`: {err}")))?;
    if url.scheme() != "file" {
        return Err(BridgeError::not_found(format!(
            "identifier `{uri}` is not a file uri"
        )));
    }
    url.to_file_path()
        .map_err(|()| BridgeError::not_found(format!("identifier `{uri}` has no local path")))
}

/// Rejects names that would address anything other than a direct child entry.
pub(crate) fn validate_entry_name(name: &str) -> BridgeResult<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(BridgeError::invalid_argument(format!(
            "`{name}` is not a valid entry name"
        )));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(BridgeError::invalid_argument(format!(
            "entry name `{name}` must not contain path separators"
        )));
    }
    Ok(())
}

/// Writes `data` to `dir/name` through a temporary sibling and an atomic rename.
///
/// The staged file is removed if anything fails before the rename, so readers only ever observe
/// the previous content or the complete new content.
pub(crate) fn write_atomic(dir: &Path, name: &str, data: &[u8]) -> io::Result<PathBuf> {
    let target = dir.join(name);
    let mut staged = tempfile::Builder::new()
        .prefix(".bridge-")
        .suffix(".partial")
        .tempfile_in(dir)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;
    staged.persist(&target).map_err(|err| err.error)?;
    Ok(target)
}

fn canonicalize(path: &Path) -> BridgeResult<PathBuf> {
    fs::canonicalize(path).map_err(|err| {
        BridgeError::from_io(&err, format!("failed to canonicalize {}", path.display()))
    })
}

#[derive(Debug, Clone)]
/// Filesystem content store, optionally confined to canonical root directories.
pub struct LocalFsProvider {
    roots: Vec<PathBuf>,
}

impl LocalFsProvider {
    /// Creates a provider confined to `roots`. Each root is created if needed and canonicalized.
    pub fn scoped<I, P>(roots: I) -> BridgeResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut canonical = Vec::new();
        for root in roots {
            let root = root.as_ref();
            fs::create_dir_all(root).map_err(|err| {
                BridgeError::from_io(&err, format!("failed to create root {}", root.display()))
            })?;
            canonical.push(canonicalize(root)?);
        }
        Ok(Self { roots: canonical })
    }

    /// Creates a provider that accepts any absolute path.
    pub fn unrestricted() -> Self {
        Self { roots: Vec::new() }
    }

    /// Canonical roots this provider is confined to; empty when unrestricted.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn within_roots(&self, canonical: &Path) -> bool {
        self.roots.is_empty() || self.roots.iter().any(|root| canonical.starts_with(root))
    }

    /// Returns `true` when `uri` is a `file://` identifier inside this provider's roots.
    pub fn owns(&self, uri: &str) -> bool {
        let Ok(path) = path_for_file_uri(uri) else {
            return false;
        };
        let probe = if path.exists() {
            fs::canonicalize(&path).ok()
        } else {
            path.parent().and_then(|parent| fs::canonicalize(parent).ok())
        };
        probe.is_some_and(|canonical| self.within_roots(&canonical))
    }

    fn ensure_existing_within_roots(&self, path: &Path) -> BridgeResult<PathBuf> {
        let canonical = canonicalize(path)?;
        if self.within_roots(&canonical) {
            Ok(canonical)
        } else {
            Err(BridgeError::permission_denied(format!(
                "path `{}` resolves outside scoped roots",
                path.display()
            )))
        }
    }

    pub(crate) fn existing_path(&self, uri: &str) -> BridgeResult<PathBuf> {
        let path = path_for_file_uri(uri)?;
        self.ensure_existing_within_roots(&path)
    }

    fn entry_for(&self, uri: &str, path: &Path) -> BridgeResult<ResourceEntry> {
        let metadata = fs::metadata(path).map_err(|err| {
            BridgeError::from_io(&err, format!("failed to read metadata {}", path.display()))
        })?;
        let name = path
            .file_name()
            .map(|value| value.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let kind = if metadata.is_dir() {
            ResourceKind::Directory
        } else {
            ResourceKind::File
        };
        let mime_type = match kind {
            ResourceKind::Directory => "inode/directory".to_string(),
            ResourceKind::File => mime_for_file_name(&name).to_string(),
        };
        Ok(ResourceEntry {
            uri: uri.to_string(),
            path: path.display().to_string(),
            name,
            size: if metadata.is_file() { metadata.len() } else { 0 },
            mime_type,
            kind,
            writable: !metadata.permissions().readonly(),
            virtual_types: Vec::new(),
        })
    }
}

impl PlatformProvider for LocalFsProvider {
    fn persist_grant<'a>(
        &'a self,
        uri: &'a str,
        _scope: GrantScope,
        _access: GrantAccess,
    ) -> PlatformFuture<'a, BridgeResult<String>> {
        Box::pin(async move {
            Err(BridgeError::permission_denied(format!(
                "local storage does not issue bookmarks for `{uri}`"
            )))
        })
    }

    fn restore_grant<'a>(&'a self, bookmark: &'a str) -> PlatformFuture<'a, BridgeResult<String>> {
        Box::pin(async move {
            Err(BridgeError::not_found(format!(
                "local storage has no bookmark `{bookmark}`"
            )))
        })
    }

    fn release_grant<'a>(
        &'a self,
        _uri: &'a str,
        _bookmark: Option<&'a str>,
    ) -> PlatformFuture<'a, bool> {
        Box::pin(async { false })
    }

    fn check_grant<'a>(
        &'a self,
        _uri: &'a str,
        _scope: GrantScope,
    ) -> PlatformFuture<'a, GrantLiveness> {
        Box::pin(async { GrantLiveness::Valid })
    }

    fn stat<'a>(&'a self, uri: &'a str) -> PlatformFuture<'a, BridgeResult<ResourceEntry>> {
        Box::pin(async move {
            let path = self.existing_path(uri)?;
            self.entry_for(uri, &path)
        })
    }

    fn read<'a>(&'a self, uri: &'a str) -> PlatformFuture<'a, BridgeResult<Vec<u8>>> {
        Box::pin(async move {
            let path = self.existing_path(uri)?;
            fs::read(&path).map_err(|err| {
                BridgeError::from_io(&err, format!("failed to read {}", path.display()))
            })
        })
    }

    fn convert<'a>(
        &'a self,
        uri: &'a str,
        target_mime: &'a str,
    ) -> PlatformFuture<'a, BridgeResult<Vec<u8>>> {
        Box::pin(async move {
            Err(BridgeError::conversion_unsupported(format!(
                "`{uri}` has no virtual representation to convert to {target_mime}"
            )))
        })
    }

    fn write<'a>(
        &'a self,
        uri: &'a str,
        data: &'a [u8],
        _mime_type: Option<&'a str>,
    ) -> PlatformFuture<'a, BridgeResult<()>> {
        Box::pin(async move {
            let path = self.existing_path(uri)?;
            if path.is_dir() {
                return Err(BridgeError::io_failure(format!(
                    "`{}` is a directory",
                    path.display()
                )));
            }
            let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
                return Err(BridgeError::io_failure(format!(
                    "path `{}` has no parent",
                    path.display()
                )));
            };
            write_atomic(dir, &name.to_string_lossy(), data).map_err(|err| {
                BridgeError::from_io(&err, format!("failed to write {}", path.display()))
            })?;
            Ok(())
        })
    }

    fn replace_child<'a>(
        &'a self,
        directory_uri: &'a str,
        name: &'a str,
        _mime_type: &'a str,
        data: &'a [u8],
    ) -> PlatformFuture<'a, BridgeResult<ResourceEntry>> {
        Box::pin(async move {
            validate_entry_name(name)?;
            let dir = self.existing_path(directory_uri)?;
            if !dir.is_dir() {
                return Err(BridgeError::io_failure(format!(
                    "`{}` is not a directory",
                    dir.display()
                )));
            }
            let target = write_atomic(&dir, name, data).map_err(|err| {
                BridgeError::from_io(&err, format!("failed to write {}/{name}", dir.display()))
            })?;
            let uri = file_uri_for_path(&target)?;
            self.entry_for(&uri, &target)
        })
    }
}
