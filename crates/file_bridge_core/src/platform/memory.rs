//! In-memory content-handle platform and scripted chooser.
//!
//! Models a mobile-style content store: documents are addressed by opaque identifiers, directory
//! children are `{directory}/{name}`, persisted permissions are finite, and some documents are
//! virtual (no byte stream, only conversions). Used by hosts without a native store and by tests,
//! which can revoke grants and remove documents out-of-band. Stalled conversions and failing
//! writes are only available with the `test-support` feature.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use file_bridge_contract::{BridgeError, BridgeResult, GrantAccess, GrantLiveness, GrantScope};
use uuid::Uuid;

use super::local::validate_entry_name;
use super::{
    ChooserOutcome, DirectoryChooserRequest, FileChooserRequest, PlatformFuture, PlatformProvider,
    ResourceChooser, ResourceEntry, ResourceKind,
};

#[derive(Debug, Clone)]
enum Content {
    Bytes(Vec<u8>),
    Virtual(BTreeMap<String, Vec<u8>>),
    #[cfg(any(test, feature = "test-support"))]
    Stalled(Vec<String>),
    Directory,
}

#[derive(Debug, Clone)]
struct Document {
    name: String,
    mime_type: String,
    content: Content,
    writable: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: BTreeMap<String, Document>,
    revoked: BTreeSet<String>,
    persisted: HashMap<String, String>,
    persist_limit: Option<usize>,
    scopes: HashMap<String, usize>,
    fail_writes: bool,
}

impl MemoryState {
    fn is_revoked(&self, uri: &str) -> bool {
        self.revoked.iter().any(|revoked| {
            revoked == uri
                || uri
                    .strip_prefix(revoked.trim_end_matches('/'))
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    fn entry(&self, uri: &str) -> BridgeResult<ResourceEntry> {
        let document = self
            .documents
            .get(uri)
            .ok_or_else(|| BridgeError::not_found(format!("no document for `{uri}`")))?;
        let (kind, size, virtual_types) = match &document.content {
            Content::Bytes(bytes) => (ResourceKind::File, bytes.len() as u64, Vec::new()),
            Content::Virtual(conversions) => {
                (ResourceKind::File, 0, conversions.keys().cloned().collect())
            }
            #[cfg(any(test, feature = "test-support"))]
            Content::Stalled(targets) => (ResourceKind::File, 0, targets.clone()),
            Content::Directory => (ResourceKind::Directory, 0, Vec::new()),
        };
        Ok(ResourceEntry {
            uri: uri.to_string(),
            path: String::new(),
            name: document.name.clone(),
            size,
            mime_type: document.mime_type.clone(),
            kind,
            writable: document.writable,
            virtual_types,
        })
    }
}

#[derive(Debug, Default)]
/// Content-handle platform holding every document in memory.
pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
}

impl MemoryPlatform {
    /// Creates an empty store with no persisted-permission limit.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, uri: &str, name: &str, mime_type: &str, content: Content) {
        self.state().documents.insert(
            uri.to_string(),
            Document {
                name: name.to_string(),
                mime_type: mime_type.to_string(),
                content,
                writable: true,
            },
        );
    }

    /// Adds a writable document with a direct byte stream.
    pub fn add_file(&self, uri: &str, name: &str, mime_type: &str, data: &[u8]) {
        self.insert(uri, name, mime_type, Content::Bytes(data.to_vec()));
    }

    /// Adds a virtual document that converts to each listed `(mime, bytes)` pair.
    pub fn add_virtual_file(
        &self,
        uri: &str,
        name: &str,
        mime_type: &str,
        conversions: &[(&str, &[u8])],
    ) {
        let conversions = conversions
            .iter()
            .map(|(target, bytes)| (target.to_string(), bytes.to_vec()))
            .collect();
        self.insert(uri, name, mime_type, Content::Virtual(conversions));
    }

    /// Adds a virtual document whose conversions never complete.
    #[cfg(any(test, feature = "test-support"))]
    pub fn add_stalled_virtual_file(
        &self,
        uri: &str,
        name: &str,
        mime_type: &str,
        targets: &[&str],
    ) {
        let targets = targets.iter().map(|target| target.to_string()).collect();
        self.insert(uri, name, mime_type, Content::Stalled(targets));
    }

    /// Adds a writable directory.
    pub fn add_directory(&self, uri: &str, name: &str) {
        self.insert(uri, name, "inode/directory", Content::Directory);
    }

    /// Marks a document or directory read-only.
    pub fn set_read_only(&self, uri: &str) {
        if let Some(document) = self.state().documents.get_mut(uri) {
            document.writable = false;
        }
    }

    /// Revokes access to `uri` and everything below it, as a user would from system settings.
    pub fn revoke(&self, uri: &str) {
        self.state().revoked.insert(uri.to_string());
    }

    /// Deletes a document out-of-band.
    pub fn remove(&self, uri: &str) {
        self.state().documents.remove(uri);
    }

    /// Caps the number of persisted permissions the store will hold.
    pub fn set_persist_limit(&self, limit: usize) {
        self.state().persist_limit = Some(limit);
    }

    /// Makes every subsequent write fail with an I/O error.
    #[cfg(any(test, feature = "test-support"))]
    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Current bytes of a document with a direct byte stream.
    pub fn bytes(&self, uri: &str) -> Option<Vec<u8>> {
        match &self.state().documents.get(uri)?.content {
            Content::Bytes(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Number of access scopes currently entered.
    pub fn active_scopes(&self) -> usize {
        self.state().scopes.values().sum()
    }

    /// Number of persisted permissions currently held.
    pub fn persisted_count(&self) -> usize {
        self.state().persisted.len()
    }
}

impl PlatformProvider for MemoryPlatform {
    fn persist_grant<'a>(
        &'a self,
        uri: &'a str,
        _scope: GrantScope,
        _access: GrantAccess,
    ) -> PlatformFuture<'a, BridgeResult<String>> {
        Box::pin(async move {
            let mut state = self.state();
            if !state.documents.contains_key(uri) {
                return Err(BridgeError::not_found(format!("no document for `{uri}`")));
            }
            if state.is_revoked(uri) {
                return Err(BridgeError::permission_denied(format!(
                    "access to `{uri}` was revoked"
                )));
            }
            if let Some((bookmark, _)) = state.persisted.iter().find(|(_, held)| *held == uri) {
                return Ok(bookmark.clone());
            }
            if state
                .persist_limit
                .is_some_and(|limit| state.persisted.len() >= limit)
            {
                return Err(BridgeError::io_failure(
                    "persisted permission limit reached",
                ));
            }
            let bookmark = Uuid::new_v4().to_string();
            state.persisted.insert(bookmark.clone(), uri.to_string());
            Ok(bookmark)
        })
    }

    fn restore_grant<'a>(&'a self, bookmark: &'a str) -> PlatformFuture<'a, BridgeResult<String>> {
        Box::pin(async move {
            let state = self.state();
            let uri = state
                .persisted
                .get(bookmark)
                .cloned()
                .ok_or_else(|| BridgeError::not_found(format!("unknown bookmark `{bookmark}`")))?;
            if !state.documents.contains_key(&uri) {
                return Err(BridgeError::not_found(format!("no document for `{uri}`")));
            }
            if state.is_revoked(&uri) {
                return Err(BridgeError::permission_denied(format!(
                    "access to `{uri}` was revoked"
                )));
            }
            Ok(uri)
        })
    }

    fn release_grant<'a>(
        &'a self,
        uri: &'a str,
        bookmark: Option<&'a str>,
    ) -> PlatformFuture<'a, bool> {
        Box::pin(async move {
            let mut state = self.state();
            match bookmark {
                Some(bookmark) => state.persisted.remove(bookmark).is_some(),
                None => {
                    let before = state.persisted.len();
                    state.persisted.retain(|_, held| held != uri);
                    state.persisted.len() != before
                }
            }
        })
    }

    fn check_grant<'a>(
        &'a self,
        uri: &'a str,
        _scope: GrantScope,
    ) -> PlatformFuture<'a, GrantLiveness> {
        Box::pin(async move {
            if self.state().is_revoked(uri) {
                GrantLiveness::Revoked
            } else {
                GrantLiveness::Valid
            }
        })
    }

    fn enter_scope(&self, uri: &str) -> BridgeResult<()> {
        *self.state().scopes.entry(uri.to_string()).or_default() += 1;
        Ok(())
    }

    fn exit_scope(&self, uri: &str) {
        let mut state = self.state();
        if let Some(count) = state.scopes.get_mut(uri) {
            *count -= 1;
            if *count == 0 {
                state.scopes.remove(uri);
            }
        }
    }

    fn stat<'a>(&'a self, uri: &'a str) -> PlatformFuture<'a, BridgeResult<ResourceEntry>> {
        Box::pin(async move { self.state().entry(uri) })
    }

    fn read<'a>(&'a self, uri: &'a str) -> PlatformFuture<'a, BridgeResult<Vec<u8>>> {
        Box::pin(async move {
            let state = self.state();
            let document = state
                .documents
                .get(uri)
                .ok_or_else(|| BridgeError::not_found(format!("no document for `{uri}`")))?;
            if state.is_revoked(uri) {
                return Err(BridgeError::permission_denied(format!(
                    "access to `{uri}` was revoked"
                )));
            }
            match &document.content {
                Content::Bytes(bytes) => Ok(bytes.clone()),
                Content::Directory => Err(BridgeError::io_failure(format!(
                    "`{uri}` is a directory"
                ))),
                _ => Err(BridgeError::conversion_unsupported(format!(
                    "`{uri}` has no direct byte stream"
                ))),
            }
        })
    }

    fn convert<'a>(
        &'a self,
        uri: &'a str,
        target_mime: &'a str,
    ) -> PlatformFuture<'a, BridgeResult<Vec<u8>>> {
        Box::pin(async move {
            let stalled = {
                let state = self.state();
                let document = state
                    .documents
                    .get(uri)
                    .ok_or_else(|| BridgeError::not_found(format!("no document for `{uri}`")))?;
                if state.is_revoked(uri) {
                    return Err(BridgeError::permission_denied(format!(
                        "access to `{uri}` was revoked"
                    )));
                }
                match &document.content {
                    Content::Virtual(conversions) => {
                        return conversions.get(target_mime).cloned().ok_or_else(|| {
                            BridgeError::conversion_unsupported(format!(
                                "`{uri}` cannot be converted to {target_mime}"
                            ))
                        });
                    }
                    #[cfg(any(test, feature = "test-support"))]
                    Content::Stalled(_) => true,
                    _ => false,
                }
            };
            if stalled {
                futures::future::pending::<()>().await;
            }
            Err(BridgeError::conversion_unsupported(format!(
                "`{uri}` has no virtual representation"
            )))
        })
    }

    fn write<'a>(
        &'a self,
        uri: &'a str,
        data: &'a [u8],
        mime_type: Option<&'a str>,
    ) -> PlatformFuture<'a, BridgeResult<()>> {
        Box::pin(async move {
            let mut state = self.state();
            let fail_writes = state.fail_writes;
            let document = state
                .documents
                .get_mut(uri)
                .ok_or_else(|| BridgeError::not_found(format!("no document for `{uri}`")))?;
            if !document.writable || !matches!(document.content, Content::Bytes(_)) {
                return Err(BridgeError::io_failure(format!("`{uri}` is not writable")));
            }
            if fail_writes {
                return Err(BridgeError::io_failure(format!(
                    "storage rejected write to `{uri}`"
                )));
            }
            document.content = Content::Bytes(data.to_vec());
            if let Some(mime_type) = mime_type {
                document.mime_type = mime_type.to_string();
            }
            Ok(())
        })
    }

    fn replace_child<'a>(
        &'a self,
        directory_uri: &'a str,
        name: &'a str,
        mime_type: &'a str,
        data: &'a [u8],
    ) -> PlatformFuture<'a, BridgeResult<ResourceEntry>> {
        Box::pin(async move {
            validate_entry_name(name)?;
            let mut state = self.state();
            match state.documents.get(directory_uri) {
                Some(Document {
                    content: Content::Directory,
                    writable: true,
                    ..
                }) => {}
                Some(_) => {
                    return Err(BridgeError::io_failure(format!(
                        "`{directory_uri}` is not a writable directory"
                    )))
                }
                None => {
                    return Err(BridgeError::not_found(format!(
                        "no directory for `{directory_uri}`"
                    )))
                }
            }
            if state.fail_writes {
                return Err(BridgeError::io_failure(format!(
                    "storage rejected write to `{directory_uri}`"
                )));
            }
            let uri = format!("{}/{name}", directory_uri.trim_end_matches('/'));
            state.documents.insert(
                uri.clone(),
                Document {
                    name: name.to_string(),
                    mime_type: mime_type.to_string(),
                    content: Content::Bytes(data.to_vec()),
                    writable: true,
                },
            );
            state.entry(&uri)
        })
    }
}

#[derive(Debug, Clone)]
enum ChooserScript {
    Files(Vec<String>),
    Directory(String),
    Cancel,
}

#[derive(Debug, Default)]
struct ChooserState {
    scripts: VecDeque<ChooserScript>,
    file_requests: Vec<FileChooserRequest>,
    directory_requests: Vec<DirectoryChooserRequest>,
}

#[derive(Debug, Default)]
/// Chooser that replays queued selections. An empty queue behaves like a dismissed dialog.
pub struct ScriptedChooser {
    state: Mutex<ChooserState>,
}

impl ScriptedChooser {
    /// Creates a chooser with no queued selections.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ChooserState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a file selection.
    pub fn push_files<I, S>(&self, uris: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let uris = uris.into_iter().map(Into::into).collect();
        self.state().scripts.push_back(ChooserScript::Files(uris));
    }

    /// Queues a directory selection.
    pub fn push_directory(&self, uri: impl Into<String>) {
        self.state()
            .scripts
            .push_back(ChooserScript::Directory(uri.into()));
    }

    /// Queues a dismissed session.
    pub fn push_cancel(&self) {
        self.state().scripts.push_back(ChooserScript::Cancel);
    }

    /// Most recent file chooser request.
    pub fn last_file_request(&self) -> Option<FileChooserRequest> {
        self.state().file_requests.last().cloned()
    }

    /// Most recent directory chooser request.
    pub fn last_directory_request(&self) -> Option<DirectoryChooserRequest> {
        self.state().directory_requests.last().cloned()
    }
}

impl ResourceChooser for ScriptedChooser {
    fn choose_files<'a>(
        &'a self,
        request: &'a FileChooserRequest,
    ) -> PlatformFuture<'a, BridgeResult<ChooserOutcome<Vec<String>>>> {
        Box::pin(async move {
            let mut state = self.state();
            state.file_requests.push(request.clone());
            Ok(match state.scripts.pop_front() {
                Some(ChooserScript::Files(uris)) => ChooserOutcome::Selected(uris),
                Some(ChooserScript::Directory(uri)) => ChooserOutcome::Selected(vec![uri]),
                Some(ChooserScript::Cancel) | None => ChooserOutcome::Cancelled,
            })
        })
    }

    fn choose_directory<'a>(
        &'a self,
        request: &'a DirectoryChooserRequest,
    ) -> PlatformFuture<'a, BridgeResult<ChooserOutcome<String>>> {
        Box::pin(async move {
            let mut state = self.state();
            state.directory_requests.push(request.clone());
            Ok(match state.scripts.pop_front() {
                Some(ChooserScript::Directory(uri)) => ChooserOutcome::Selected(uri),
                Some(ChooserScript::Files(uris)) => match uris.into_iter().next() {
                    Some(uri) => ChooserOutcome::Selected(uri),
                    None => ChooserOutcome::Cancelled,
                },
                Some(ChooserScript::Cancel) | None => ChooserOutcome::Cancelled,
            })
        })
    }
}
