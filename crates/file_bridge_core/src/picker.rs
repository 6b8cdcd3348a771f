//! Interactive picker sessions and the grants they create.
//!
//! Grants are registered only after the chooser returns, so a session dropped while the dialog
//! is open leaves no trace in the registry.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use file_bridge_contract::{
    is_valid_mime_pattern, mime_matches, BridgeError, BridgeResult, DirectoryInfo, FileInfo,
    GrantScope, PickDirectoryOptions, PickFileOptions, PickMode,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::grants::GrantManager;
use crate::local_copy::{local_copy_name, store_bytes};
use crate::platform::{
    file_uri_for_path, ChooserOutcome, DirectoryChooserRequest, FileChooserRequest,
    PlatformProvider, ResourceChooser, ResourceEntry, ScopedAccess,
};

fn validate_allowed_types(allowed_types: &[String]) -> BridgeResult<()> {
    match allowed_types
        .iter()
        .find(|pattern| !is_valid_mime_pattern(pattern))
    {
        Some(pattern) => Err(BridgeError::invalid_argument(format!(
            "`{pattern}` is not a MIME type pattern"
        ))),
        None => Ok(()),
    }
}

fn matches_allowed(entry: &ResourceEntry, allowed_types: &[String]) -> bool {
    allowed_types.is_empty()
        || allowed_types.iter().any(|pattern| {
            mime_matches(pattern, &entry.mime_type)
                || entry
                    .virtual_types
                    .iter()
                    .any(|target| mime_matches(pattern, target))
        })
}

fn discard_imports(dirs: &[PathBuf]) {
    for dir in dirs {
        match fs::remove_dir_all(dir) {
            Ok(()) => debug!(dir = %dir.display(), "discarded partial import"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(dir = %dir.display(), error = %err, "failed to discard import"),
        }
    }
}

/// One picker interaction against the OS chooser.
pub struct PickerSession<'a> {
    chooser: &'a dyn ResourceChooser,
    platform: &'a dyn PlatformProvider,
    grants: &'a GrantManager,
    imports_dir: &'a Path,
}

impl<'a> PickerSession<'a> {
    /// Creates a session. Import-mode picks are copied beneath `imports_dir`.
    pub fn new(
        chooser: &'a dyn ResourceChooser,
        platform: &'a dyn PlatformProvider,
        grants: &'a GrantManager,
        imports_dir: &'a Path,
    ) -> Self {
        Self {
            chooser,
            platform,
            grants,
            imports_dir,
        }
    }

    /// Runs the file chooser.
    ///
    /// A dismissed chooser yields an empty list. Virtual files are dropped unless
    /// `allow_virtual_files` is set, and selections outside `allowed_types` are dropped even if
    /// the OS chooser let them through.
    pub async fn pick_files(&self, options: &PickFileOptions) -> BridgeResult<Vec<FileInfo>> {
        validate_allowed_types(&options.allowed_types)?;
        let request = FileChooserRequest {
            allowed_types: options.allowed_types.clone(),
            allow_multiple: options.allow_multiple,
        };
        let mut uris = match self.chooser.choose_files(&request).await? {
            ChooserOutcome::Selected(uris) => uris,
            ChooserOutcome::Cancelled => {
                info!("file chooser dismissed");
                return Ok(Vec::new());
            }
        };
        if !options.allow_multiple {
            uris.truncate(1);
        }

        // No grant or import is made until every selection has been checked.
        let mut entries = Vec::with_capacity(uris.len());
        for uri in uris {
            let entry = self.platform.stat(&uri).await?;
            if entry.is_directory() {
                debug!(uri = %uri, "skipping directory returned by file chooser");
                continue;
            }
            if entry.is_virtual() && !options.allow_virtual_files {
                debug!(uri = %uri, "skipping virtual file");
                continue;
            }
            if !matches_allowed(&entry, &options.allowed_types) {
                debug!(uri = %uri, mime_type = %entry.mime_type, "skipping disallowed type");
                continue;
            }
            entries.push(entry);
        }

        let mut picked = Vec::with_capacity(entries.len());
        match options.mode {
            PickMode::Open => {
                for entry in entries {
                    picked.push(self.open(entry, options.request_long_term_access).await);
                }
            }
            PickMode::Import => {
                let mut created = Vec::with_capacity(entries.len());
                for entry in entries {
                    let dir = self.imports_dir.join(Uuid::new_v4().simple().to_string());
                    created.push(dir.clone());
                    match self.import(entry, &dir).await {
                        Ok(info) => picked.push(info),
                        Err(err) => {
                            discard_imports(&created);
                            return Err(err);
                        }
                    }
                }
            }
        }
        info!(count = picked.len(), mode = ?options.mode, "files picked");
        Ok(picked)
    }

    async fn open(&self, entry: ResourceEntry, long_term: bool) -> FileInfo {
        let grant = self
            .grants
            .acquire(
                self.platform,
                &entry.uri,
                GrantScope::File,
                entry.access(),
                long_term,
            )
            .await;
        FileInfo {
            is_virtual: entry.is_virtual(),
            uri: entry.uri,
            path: entry.path,
            name: entry.name,
            size: entry.size,
            mime_type: entry.mime_type,
            bookmark: grant.bookmark.filter(|_| long_term),
            convertible_to_mime_types: entry.virtual_types,
        }
    }

    async fn import(&self, entry: ResourceEntry, dir: &Path) -> BridgeResult<FileInfo> {
        let target = entry.virtual_types.first().cloned();
        let bytes = {
            let _scope = ScopedAccess::enter(self.platform, &entry.uri)?;
            match &target {
                Some(target) => self.platform.convert(&entry.uri, target).await?,
                None => self.platform.read(&entry.uri).await?,
            }
        };
        let name = local_copy_name(None, &entry.name, target.as_deref())?;
        let path = store_bytes(dir, &name, &bytes)?;
        debug!(source = %entry.uri, path = %path.display(), "imported picked file");

        Ok(FileInfo {
            uri: file_uri_for_path(&path)?,
            path: path.display().to_string(),
            name,
            size: bytes.len() as u64,
            mime_type: target.unwrap_or(entry.mime_type),
            is_virtual: false,
            bookmark: None,
            convertible_to_mime_types: Vec::new(),
        })
    }

    /// Runs the directory chooser. A dismissed chooser fails with `Cancelled`.
    pub async fn pick_directory(
        &self,
        options: &PickDirectoryOptions,
    ) -> BridgeResult<DirectoryInfo> {
        let request = DirectoryChooserRequest {
            start_directory: options.start_directory.clone(),
        };
        let uri = match self.chooser.choose_directory(&request).await? {
            ChooserOutcome::Selected(uri) => uri,
            ChooserOutcome::Cancelled => {
                info!("directory chooser dismissed");
                return Err(BridgeError::cancelled());
            }
        };

        let entry = self.platform.stat(&uri).await?;
        if !entry.is_directory() {
            return Err(BridgeError::invalid_argument(format!(
                "`{uri}` is not a directory"
            )));
        }
        let grant = self
            .grants
            .acquire(
                self.platform,
                &entry.uri,
                GrantScope::Directory,
                entry.access(),
                options.request_long_term_access,
            )
            .await;
        info!(uri = %entry.uri, persisted = grant.is_persisted(), "directory picked");
        Ok(DirectoryInfo {
            uri: entry.uri,
            path: entry.path,
            name: entry.name,
            bookmark: grant
                .bookmark
                .filter(|_| options.request_long_term_access),
        })
    }
}
