//! File bridge service contract.

use std::{future::Future, pin::Pin};

use crate::error::{BridgeError, BridgeResult};
use crate::types::{
    AccessGrant, CopyToLocalRequest, DirectoryEntryWritten, DirectoryInfo, FileInfo,
    LocalCopyResult, PickDirectoryOptions, PickFileOptions, ReadContentRequest,
    ReleaseAccessRequest, ReleaseAccessResult, TransferPayload, WriteContentRequest,
    WriteDirectoryEntryRequest,
};

/// Object-safe boxed future used by [`FileBridgeService`] async methods.
///
/// Futures are `Send` so platform execution layers can fulfil requests on a separate executor.
/// Dropping a future cancels the operation.
pub type FileBridgeFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Request/response surface consumed by a presentation layer.
pub trait FileBridgeService: Send + Sync {
    /// Runs the OS file chooser. A cancelled session yields an empty list.
    fn pick_file<'a>(
        &'a self,
        options: PickFileOptions,
    ) -> FileBridgeFuture<'a, BridgeResult<Vec<FileInfo>>>;

    /// Runs the OS directory chooser. A cancelled session yields a `Cancelled` error.
    fn pick_directory<'a>(
        &'a self,
        options: PickDirectoryOptions,
    ) -> FileBridgeFuture<'a, BridgeResult<DirectoryInfo>>;

    /// Reads a document, converting virtual documents when a target type is supplied.
    fn read_content<'a>(
        &'a self,
        request: ReadContentRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<TransferPayload>>;

    /// Snapshots a document into application-private storage.
    fn copy_to_local<'a>(
        &'a self,
        request: CopyToLocalRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<LocalCopyResult>>;

    /// Overwrites a document with decoded payload bytes.
    fn write_content<'a>(
        &'a self,
        request: WriteContentRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<()>>;

    /// Creates or replaces a named entry inside a granted directory.
    fn write_directory_entry<'a>(
        &'a self,
        request: WriteDirectoryEntryRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<DirectoryEntryWritten>>;

    /// Releases grants. Never fails; unknown identifiers are not counted.
    fn release_access<'a>(
        &'a self,
        request: ReleaseAccessRequest,
    ) -> FileBridgeFuture<'a, ReleaseAccessResult>;

    /// Lists grants persisted beyond the current session.
    fn list_grants<'a>(&'a self) -> FileBridgeFuture<'a, Vec<AccessGrant>>;
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op bridge adapter for hosts without native file access and for baseline tests.
pub struct NoopFileBridgeService;

impl NoopFileBridgeService {
    fn unsupported_error(op: &str) -> BridgeError {
        BridgeError::permission_denied(format!("file bridge unavailable: {op}")).with_operation(op)
    }
}

impl FileBridgeService for NoopFileBridgeService {
    fn pick_file<'a>(
        &'a self,
        _options: PickFileOptions,
    ) -> FileBridgeFuture<'a, BridgeResult<Vec<FileInfo>>> {
        Box::pin(async { Err(Self::unsupported_error("pick_file")) })
    }

    fn pick_directory<'a>(
        &'a self,
        _options: PickDirectoryOptions,
    ) -> FileBridgeFuture<'a, BridgeResult<DirectoryInfo>> {
        Box::pin(async { Err(Self::unsupported_error("pick_directory")) })
    }

    fn read_content<'a>(
        &'a self,
        _request: ReadContentRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<TransferPayload>> {
        Box::pin(async { Err(Self::unsupported_error("read_content")) })
    }

    fn copy_to_local<'a>(
        &'a self,
        _request: CopyToLocalRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<LocalCopyResult>> {
        Box::pin(async { Err(Self::unsupported_error("copy_to_local")) })
    }

    fn write_content<'a>(
        &'a self,
        _request: WriteContentRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<()>> {
        Box::pin(async { Err(Self::unsupported_error("write_content")) })
    }

    fn write_directory_entry<'a>(
        &'a self,
        _request: WriteDirectoryEntryRequest,
    ) -> FileBridgeFuture<'a, BridgeResult<DirectoryEntryWritten>> {
        Box::pin(async { Err(Self::unsupported_error("write_directory_entry")) })
    }

    fn release_access<'a>(
        &'a self,
        _request: ReleaseAccessRequest,
    ) -> FileBridgeFuture<'a, ReleaseAccessResult> {
        Box::pin(async { ReleaseAccessResult::default() })
    }

    fn list_grants<'a>(&'a self) -> FileBridgeFuture<'a, Vec<AccessGrant>> {
        Box::pin(async { Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::error::BridgeErrorKind;

    #[test]
    fn noop_bridge_denies_access_but_releases_cleanly() {
        let bridge = NoopFileBridgeService;
        let bridge_obj: &dyn FileBridgeService = &bridge;

        let err = block_on(bridge_obj.read_content(ReadContentRequest {
            uri: "content://docs/1".to_string(),
            convert_virtual_as_type: None,
        }))
        .expect_err("read should fail");
        assert_eq!(err.kind, BridgeErrorKind::PermissionDenied);
        assert!(err.message.contains("read_content"));

        let released = block_on(bridge_obj.release_access(ReleaseAccessRequest {
            uris: vec!["content://docs/1".to_string()],
        }));
        assert_eq!(released.released_count, 0);
        assert!(block_on(bridge_obj.list_grants()).is_empty());
    }
}
