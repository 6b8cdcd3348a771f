//! Collaborator contracts for the OS services the bridge wraps.
//!
//! [`PlatformProvider`] covers the persistent-permission API, the content store, and the
//! directory-entry primitive; [`ResourceChooser`] covers the OS selection UI. Each OS permission
//! model supplies its own implementation and the rest of the bridge only talks to these traits.

use std::future::Future;
use std::pin::Pin;

use file_bridge_contract::{BridgeResult, GrantAccess, GrantLiveness, GrantScope};

pub mod desktop;
pub mod local;
pub mod memory;

pub use desktop::DesktopPlatform;
pub use local::{file_uri_for_path, path_for_file_uri, LocalFsProvider};
pub use memory::{MemoryPlatform, ScriptedChooser};

/// Boxed, Send future returned by platform collaborators.
pub type PlatformFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Kind of resource behind an identifier.
pub enum ResourceKind {
    /// Document with content.
    File,
    /// Container of documents.
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Platform description of one resource, captured at resolution time.
pub struct ResourceEntry {
    /// Identifier the entry was resolved from.
    pub uri: String,
    /// Best-effort filesystem path; empty when the platform exposes none.
    pub path: String,
    /// Display name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type reported by the platform.
    pub mime_type: String,
    /// File or directory.
    pub kind: ResourceKind,
    /// Whether the platform accepts writes to this resource.
    pub writable: bool,
    /// Conversion targets. Non-empty only for virtual documents.
    pub virtual_types: Vec<String>,
}

impl ResourceEntry {
    /// Returns `true` when the document has no direct byte stream.
    pub fn is_virtual(&self) -> bool {
        !self.virtual_types.is_empty()
    }

    /// Returns `true` for directories.
    pub fn is_directory(&self) -> bool {
        self.kind == ResourceKind::Directory
    }

    /// Grant access mode this resource supports.
    pub fn access(&self) -> GrantAccess {
        if self.writable {
            GrantAccess::ReadWrite
        } else {
            GrantAccess::Read
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of an interactive chooser session.
pub enum ChooserOutcome<T> {
    /// The user selected something.
    Selected(T),
    /// The user dismissed the chooser.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Parameters forwarded to the OS file chooser.
pub struct FileChooserRequest {
    /// MIME filter patterns; empty means any type.
    pub allowed_types: Vec<String>,
    /// Allows more than one selection.
    pub allow_multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Parameters forwarded to the OS directory chooser.
pub struct DirectoryChooserRequest {
    /// Identifier or path the chooser should open at.
    pub start_directory: Option<String>,
}

/// OS-level resource chooser. Sessions may block for as long as the user takes.
pub trait ResourceChooser: Send + Sync {
    /// Presents the file chooser and returns the selected identifiers.
    fn choose_files<'a>(
        &'a self,
        request: &'a FileChooserRequest,
    ) -> PlatformFuture<'a, BridgeResult<ChooserOutcome<Vec<String>>>>;

    /// Presents the directory chooser and returns the selected identifier.
    fn choose_directory<'a>(
        &'a self,
        request: &'a DirectoryChooserRequest,
    ) -> PlatformFuture<'a, BridgeResult<ChooserOutcome<String>>>;
}

/// OS permission API and content store for one permission model.
///
/// Implementations never retry; transient failures surface to the caller unchanged.
pub trait PlatformProvider: Send + Sync {
    /// Escalates access to `uri` so it outlives the session, returning the bookmark.
    fn persist_grant<'a>(
        &'a self,
        uri: &'a str,
        scope: GrantScope,
        access: GrantAccess,
    ) -> PlatformFuture<'a, BridgeResult<String>>;

    /// Resolves a previously issued bookmark back to its identifier.
    fn restore_grant<'a>(&'a self, bookmark: &'a str) -> PlatformFuture<'a, BridgeResult<String>>;

    /// Gives a persisted grant back to the OS. Returns `false` when nothing was held.
    fn release_grant<'a>(
        &'a self,
        uri: &'a str,
        bookmark: Option<&'a str>,
    ) -> PlatformFuture<'a, bool>;

    /// Asks the OS whether access to `uri` is still honored.
    fn check_grant<'a>(&'a self, uri: &'a str, scope: GrantScope)
        -> PlatformFuture<'a, GrantLiveness>;

    /// Enters the access scope for `uri`. Every successful call is paired with
    /// [`PlatformProvider::exit_scope`].
    fn enter_scope(&self, uri: &str) -> BridgeResult<()> {
        let _ = uri;
        Ok(())
    }

    /// Leaves the access scope entered by [`PlatformProvider::enter_scope`].
    fn exit_scope(&self, uri: &str) {
        let _ = uri;
    }

    /// Returns `true` when `uri` lies inside the tree rooted at `directory_uri`.
    fn contains(&self, directory_uri: &str, uri: &str) -> bool {
        let prefix = directory_uri.trim_end_matches('/');
        uri.strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
    }

    /// Describes the resource behind `uri`.
    fn stat<'a>(&'a self, uri: &'a str) -> PlatformFuture<'a, BridgeResult<ResourceEntry>>;

    /// Reads the direct byte stream of a document.
    fn read<'a>(&'a self, uri: &'a str) -> PlatformFuture<'a, BridgeResult<Vec<u8>>>;

    /// Materializes a virtual document as `target_mime`. May take unbounded time.
    fn convert<'a>(
        &'a self,
        uri: &'a str,
        target_mime: &'a str,
    ) -> PlatformFuture<'a, BridgeResult<Vec<u8>>>;

    /// Replaces the content of a document.
    fn write<'a>(
        &'a self,
        uri: &'a str,
        data: &'a [u8],
        mime_type: Option<&'a str>,
    ) -> PlatformFuture<'a, BridgeResult<()>>;

    /// Creates `name` inside a directory, replacing any existing entry without exposing a
    /// partially written state, and returns the new entry.
    fn replace_child<'a>(
        &'a self,
        directory_uri: &'a str,
        name: &'a str,
        mime_type: &'a str,
        data: &'a [u8],
    ) -> PlatformFuture<'a, BridgeResult<ResourceEntry>>;
}

/// RAII pairing of [`PlatformProvider::enter_scope`] and [`PlatformProvider::exit_scope`].
///
/// The scope is exited when the guard drops, which includes a cancelled operation whose future
/// was dropped mid-flight.
pub(crate) struct ScopedAccess<'a> {
    platform: &'a dyn PlatformProvider,
    uri: String,
}

impl<'a> ScopedAccess<'a> {
    pub(crate) fn enter(platform: &'a dyn PlatformProvider, uri: &str) -> BridgeResult<Self> {
        platform.enter_scope(uri)?;
        Ok(Self {
            platform,
            uri: uri.to_string(),
        })
    }
}

impl Drop for ScopedAccess<'_> {
    fn drop(&mut self) {
        self.platform.exit_scope(&self.uri);
    }
}
