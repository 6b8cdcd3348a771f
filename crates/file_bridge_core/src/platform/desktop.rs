//! Desktop permission model: direct filesystem access with security-scoped bookmarks.
//!
//! A bookmark is an opaque, self-describing token that records the canonical path and grant
//! scope. Restoring one only succeeds while the path still exists. Every read or write runs
//! inside an entered scope, and the provider counts open scopes so callers can verify balance.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use file_bridge_contract::{BridgeError, BridgeResult, GrantAccess, GrantLiveness, GrantScope};
use serde::{Deserialize, Serialize};

use super::local::{file_uri_for_path, path_for_file_uri, LocalFsProvider};
use super::{PlatformFuture, PlatformProvider, ResourceEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookmarkData {
    path: PathBuf,
    scope: GrantScope,
    access: GrantAccess,
}

impl BookmarkData {
    fn encode(&self) -> BridgeResult<String> {
        let raw = serde_json::to_vec(self).map_err(|err| {
            BridgeError::io_failure(format!("failed to serialize bookmark: {err}"))
        })?;
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    fn decode(bookmark: &str) -> BridgeResult<Self> {
        let raw = URL_SAFE_NO_PAD
            .decode(bookmark.trim())
            .map_err(|err| BridgeError::invalid_argument(format!("malformed bookmark: {err}")))?;
        serde_json::from_slice(&raw)
            .map_err(|err| BridgeError::invalid_argument(format!("malformed bookmark: {err}")))
    }
}

/// Canonical form of `path`, resolving through its parent when the entry does not exist yet.
fn canonical_target(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = fs::canonicalize(path) {
        return Some(canonical);
    }
    let name = path.file_name()?;
    let parent = fs::canonicalize(path.parent()?).ok()?;
    Some(parent.join(name))
}

#[derive(Debug)]
/// Desktop platform backed by the local filesystem.
pub struct DesktopPlatform {
    fs: LocalFsProvider,
    scopes: Mutex<HashMap<String, usize>>,
}

impl Default for DesktopPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopPlatform {
    /// Creates a platform with access to any path the user picks.
    pub fn new() -> Self {
        Self::with_provider(LocalFsProvider::unrestricted())
    }

    /// Creates a platform confined to `roots`, for sandboxed hosts.
    pub fn scoped<I, P>(roots: I) -> BridgeResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Ok(Self::with_provider(LocalFsProvider::scoped(roots)?))
    }

    fn with_provider(fs: LocalFsProvider) -> Self {
        Self {
            fs,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Number of access scopes currently entered.
    pub fn active_scopes(&self) -> usize {
        self.scopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

impl PlatformProvider for DesktopPlatform {
    fn persist_grant<'a>(
        &'a self,
        uri: &'a str,
        scope: GrantScope,
        access: GrantAccess,
    ) -> PlatformFuture<'a, BridgeResult<String>> {
        Box::pin(async move {
            let path = self.fs.existing_path(uri)?;
            BookmarkData {
                path,
                scope,
                access,
            }
            .encode()
        })
    }

    fn restore_grant<'a>(&'a self, bookmark: &'a str) -> PlatformFuture<'a, BridgeResult<String>> {
        Box::pin(async move {
            let data = BookmarkData::decode(bookmark)?;
            if !data.path.exists() {
                return Err(BridgeError::not_found(format!(
                    "bookmarked path `{}` no longer exists",
                    data.path.display()
                )));
            }
            let uri = file_uri_for_path(&data.path)?;
            self.fs.existing_path(&uri)?;
            Ok(uri)
        })
    }

    fn release_grant<'a>(
        &'a self,
        _uri: &'a str,
        bookmark: Option<&'a str>,
    ) -> PlatformFuture<'a, bool> {
        // Bookmarks hold no OS-side state; dropping the token is the release.
        Box::pin(async move { bookmark.is_some() })
    }

    fn check_grant<'a>(
        &'a self,
        uri: &'a str,
        _scope: GrantScope,
    ) -> PlatformFuture<'a, GrantLiveness> {
        Box::pin(async move {
            let Ok(path) = path_for_file_uri(uri) else {
                return GrantLiveness::Valid;
            };
            match fs::metadata(&path) {
                Err(err) if err.kind() == io::ErrorKind::PermissionDenied => GrantLiveness::Revoked,
                _ => GrantLiveness::Valid,
            }
        })
    }

    fn enter_scope(&self, uri: &str) -> BridgeResult<()> {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        *scopes.entry(uri.to_string()).or_default() += 1;
        Ok(())
    }

    fn exit_scope(&self, uri: &str) {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = scopes.get_mut(uri) {
            *count -= 1;
            if *count == 0 {
                scopes.remove(uri);
            }
        }
    }

    fn contains(&self, directory_uri: &str, uri: &str) -> bool {
        let (Ok(dir), Ok(path)) = (path_for_file_uri(directory_uri), path_for_file_uri(uri)) else {
            return false;
        };
        if path == dir || !path.starts_with(&dir) {
            return false;
        }
        // Symlinks inside the granted tree must not reach outside it.
        match (fs::canonicalize(&dir), canonical_target(&path)) {
            (Ok(dir), Some(path)) => path != dir && path.starts_with(&dir),
            _ => false,
        }
    }

    fn stat<'a>(&'a self, uri: &'a str) -> PlatformFuture<'a, BridgeResult<ResourceEntry>> {
        self.fs.stat(uri)
    }

    fn read<'a>(&'a self, uri: &'a str) -> PlatformFuture<'a, BridgeResult<Vec<u8>>> {
        self.fs.read(uri)
    }

    fn convert<'a>(
        &'a self,
        uri: &'a str,
        target_mime: &'a str,
    ) -> PlatformFuture<'a, BridgeResult<Vec<u8>>> {
        self.fs.convert(uri, target_mime)
    }

    fn write<'a>(
        &'a self,
        uri: &'a str,
        data: &'a [u8],
        mime_type: Option<&'a str>,
    ) -> PlatformFuture<'a, BridgeResult<()>> {
        self.fs.write(uri, data, mime_type)
    }

    fn replace_child<'a>(
        &'a self,
        directory_uri: &'a str,
        name: &'a str,
        mime_type: &'a str,
        data: &'a [u8],
    ) -> PlatformFuture<'a, BridgeResult<ResourceEntry>> {
        self.fs.replace_child(directory_uri, name, mime_type, data)
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use tempfile::TempDir;

    use super::*;
    use file_bridge_contract::BridgeErrorKind;

    #[test]
    fn bookmarks_restore_while_the_path_exists() {
        let dir = TempDir::new().expect("temp dir");
        let file = dir.path().join("plan.txt");
        fs::write(&file, "plan").expect("write");
        let platform = DesktopPlatform::new();
        let uri = file_uri_for_path(&fs::canonicalize(&file).expect("canonical")).expect("uri");

        let bookmark = block_on(platform.persist_grant(&uri, GrantScope::File, GrantAccess::Read))
            .expect("persist");
        assert_eq!(block_on(platform.restore_grant(&bookmark)).expect("restore"), uri);

        fs::remove_file(&file).expect("remove");
        let err = block_on(platform.restore_grant(&bookmark)).expect_err("stale bookmark");
        assert_eq!(err.kind, BridgeErrorKind::NotFound);

        let err = block_on(platform.restore_grant("%%%")).expect_err("garbage bookmark");
        assert_eq!(err.kind, BridgeErrorKind::InvalidArgument);
    }

    #[test]
    fn scopes_are_counted_per_identifier() {
        let platform = DesktopPlatform::new();
        platform.enter_scope("file:///a").expect("enter");
        platform.enter_scope("file:///a").expect("enter");
        platform.enter_scope("file:///b").expect("enter");
        assert_eq!(platform.active_scopes(), 3);

        platform.exit_scope("file:///a");
        platform.exit_scope("file:///b");
        platform.exit_scope("file:///never-entered");
        assert_eq!(platform.active_scopes(), 1);
        platform.exit_scope("file:///a");
        assert_eq!(platform.active_scopes(), 0);
    }

    #[test]
    fn containment_uses_path_components() {
        let root = TempDir::new().expect("temp dir");
        let root = fs::canonicalize(root.path()).expect("canonical root");
        let docs = root.join("docs");
        fs::create_dir_all(docs.join("a")).expect("mkdir");
        fs::create_dir(root.join("docs2")).expect("mkdir sibling");
        let uri = |path: &Path| file_uri_for_path(path).expect("uri");

        let platform = DesktopPlatform::new();
        let docs_uri = uri(&docs);
        assert!(platform.contains(&docs_uri, &uri(&docs.join("a/b.txt"))));
        assert!(platform.contains(&docs_uri, &uri(&docs.join("new.txt"))));
        assert!(!platform.contains(&docs_uri, &uri(&root.join("docs2/a.txt"))));
        assert!(!platform.contains(&docs_uri, &docs_uri));
        assert!(!platform.contains(&docs_uri, &uri(&docs.join("missing/deeper.txt"))));
        assert!(!platform.contains("content://x/docs", "content://x/docs/a"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_do_not_extend_a_directory_grant() {
        use std::os::unix::fs::symlink;

        let granted = TempDir::new().expect("granted dir");
        let outside = TempDir::new().expect("outside dir");
        let granted_path = fs::canonicalize(granted.path()).expect("canonical");
        fs::write(outside.path().join("secret.txt"), "secret").expect("write outside");
        symlink(outside.path(), granted_path.join("link")).expect("dir symlink");
        symlink(
            outside.path().join("secret.txt"),
            granted_path.join("alias.txt"),
        )
        .expect("file symlink");

        let platform = DesktopPlatform::new();
        let granted_uri = file_uri_for_path(&granted_path).expect("uri");
        let through_dir = file_uri_for_path(&granted_path.join("link/secret.txt")).expect("uri");
        let new_through_dir = file_uri_for_path(&granted_path.join("link/new.txt")).expect("uri");
        let alias = file_uri_for_path(&granted_path.join("alias.txt")).expect("uri");
        assert!(!platform.contains(&granted_uri, &through_dir));
        assert!(!platform.contains(&granted_uri, &new_through_dir));
        assert!(!platform.contains(&granted_uri, &alias));
    }
}
