//! [`FileBridgeService`] implementation over one platform and chooser.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use file_bridge_contract::{
    AccessGrant, BridgeError, BridgeResult, CopyToLocalRequest, DirectoryEntryWritten,
    DirectoryInfo, FileBridgeFuture, FileBridgeService, FileInfo, LocalCopyResult,
    PickDirectoryOptions, PickFileOptions, ReadContentRequest, ReleaseAccessRequest,
    ReleaseAccessResult, TransferPayload, WriteContentRequest, WriteDirectoryEntryRequest,
};
use tracing::{info, info_span, warn, Instrument};

use crate::config::BridgeConfig;
use crate::directory_writer;
use crate::grants::{GrantManager, GrantStore};
use crate::local_copy;
use crate::picker::PickerSession;
use crate::platform::{LocalFsProvider, PlatformProvider, ResourceChooser};
use crate::resolver::Resolver;
use crate::transfer;

/// Attaches operation context to a failure and logs it. Cancellation is logged as an outcome,
/// not a failure.
fn finish<T>(operation: &'static str, target: &str, result: BridgeResult<T>) -> BridgeResult<T> {
    result.map_err(|err| {
        let err = if err.target.is_none() && !target.is_empty() {
            err.with_target(target)
        } else {
            err
        };
        let err = err.with_operation(operation);
        if err.is_cancelled() {
            info!("cancelled by user");
        } else {
            warn!(kind = %err.kind, error = %err.message, "operation failed");
        }
        err
    })
}

/// Native file-access bridge.
///
/// Owns the grant registry and application storage layout; OS access goes through the injected
/// [`PlatformProvider`] and [`ResourceChooser`].
pub struct FileBridge {
    config: BridgeConfig,
    platform: Arc<dyn PlatformProvider>,
    chooser: Arc<dyn ResourceChooser>,
    local: LocalFsProvider,
    grants: GrantManager,
}

impl FileBridge {
    /// Creates the bridge, preparing the storage directories and opening the grant store.
    ///
    /// Persisted grants are not restored until [`FileBridge::restore_persisted_grants`] runs.
    pub fn new(
        config: BridgeConfig,
        platform: Arc<dyn PlatformProvider>,
        chooser: Arc<dyn ResourceChooser>,
    ) -> BridgeResult<Self> {
        for dir in [&config.cache_dir, &config.documents_dir, &config.imports_dir()] {
            fs::create_dir_all(dir).map_err(|err| {
                BridgeError::io_failure(format!("failed to create {}: {err}", dir.display()))
            })?;
        }
        let local = LocalFsProvider::scoped([&config.cache_dir, &config.documents_dir])?;
        let store = config
            .grant_store
            .as_ref()
            .map(GrantStore::open)
            .transpose()?;
        Ok(Self {
            config,
            platform,
            chooser,
            local,
            grants: GrantManager::new(store),
        })
    }

    /// Re-establishes grants persisted by an earlier session and returns how many survived.
    pub async fn restore_persisted_grants(&self) -> usize {
        self.grants
            .restore(self.platform.as_ref())
            .instrument(info_span!("restore_persisted_grants"))
            .await
    }

    /// Bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Grant registry.
    pub fn grants(&self) -> &GrantManager {
        &self.grants
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.grants, self.platform.as_ref(), &self.local)
    }

    fn picker<'a>(&'a self, imports_dir: &'a Path) -> PickerSession<'a> {
        PickerSession::new(
            self.chooser.as_ref(),
            self.platform.as_ref(),
            &self.grants,
            imports_dir,
        )
    }
}

impl FileBridgeService for FileBridge {
    fn pick_file<'a>(
        &'a self,
        options: PickFileOptions,
    ) -> FileBridgeFuture<'a, BridgeResult<Vec<FileInfo>>> {
        let span = info_span!("pick_file", mode = ?options.mode, multiple = options.allow_multiple);
        Box::pin(
            async move {
                let imports_dir = self.config.imports_dir();
                let result = self.picker(&imports_dir).pick_files(&options).await;
                finish("pick_file", "", result)
            }
            .instrument(span),
        )
    }

    fn pick_directory<'a>(
        &'a self,
        options: PickDirectoryOptions,
    ) -> FileBridgeFuture<'a, BridgeResult<DirectoryInfo>> {
        Box::pin(
            async move {
                let imports_dir = self.config.imports_dir();
                let result = self.picker(&imports_dir).pick_directory(&options).await;
                finish("pick_directory", "", result)
            }
            .instrument(info_span!("pick_directory")),
        )
    }

    fn read_content<'a>(
        &'a self,
        request: ReadContentRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<TransferPayload>> {
        let span = info_span!("read_content", uri = %request.uri);
        Box::pin(
            async move {
                let result = transfer::read_content(
                    &self.resolver(),
                    &request,
                    self.config.max_payload_bytes,
                )
                .await;
                finish("read_content", &request.uri, result)
            }
            .instrument(span),
        )
    }

    fn copy_to_local<'a>(
        &'a self,
        request: CopyToLocalRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<LocalCopyResult>> {
        let span = info_span!("copy_to_local", uri = %request.uri);
        Box::pin(
            async move {
                let result =
                    local_copy::copy_to_local(&self.resolver(), &self.config, &request).await;
                finish("copy_to_local", &request.uri, result)
            }
            .instrument(span),
        )
    }

    fn write_content<'a>(
        &'a self,
        request: WriteContentRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<()>> {
        let span = info_span!("write_content", uri = %request.uri);
        Box::pin(
            async move {
                let result = transfer::write_content(&self.resolver(), &request).await;
                finish("write_content", &request.uri, result)
            }
            .instrument(span),
        )
    }

    fn write_directory_entry<'a>(
        &'a self,
        request: WriteDirectoryEntryRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<DirectoryEntryWritten>> {
        let span = info_span!(
            "write_directory_entry",
            directory = %request.directory_uri,
            filename = %request.filename
        );
        Box::pin(
            async move {
                let result =
                    directory_writer::write_directory_entry(&self.resolver(), &request).await;
                finish("write_directory_entry", &request.directory_uri, result)
            }
            .instrument(span),
        )
    }

    fn release_access<'a>(
        &'a self,
        request: ReleaseAccessRequest,
    ) -> FileBridgeFuture<'a, ReleaseAccessResult> {
        let span = info_span!("release_access", requested = request.uris.len());
        Box::pin(
            async move {
                let released_count = self
                    .grants
                    .release(self.platform.as_ref(), &request.uris)
                    .await;
                info!(released_count, "grants released");
                ReleaseAccessResult { released_count }
            }
            .instrument(span),
        )
    }

    fn list_grants<'a>(&'a self) -> FileBridgeFuture<'a, Vec<AccessGrant>> {
        Box::pin(async move { self.grants.persisted() })
    }
}
