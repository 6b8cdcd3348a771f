//! Named-entry writes inside a granted directory.

use file_bridge_contract::{
    decode_payload, mime_for_file_name, BridgeError, BridgeErrorKind, BridgeResult,
    DirectoryEntryWritten, GrantScope, WriteDirectoryEntryRequest,
};
use tracing::{debug, warn};

use crate::platform::local::validate_entry_name;
use crate::platform::ScopedAccess;
use crate::resolver::Resolver;

fn as_io_failure(err: BridgeError) -> BridgeError {
    match err.kind {
        BridgeErrorKind::IoFailure | BridgeErrorKind::InvalidArgument => err,
        _ => BridgeError {
            kind: BridgeErrorKind::IoFailure,
            ..err
        },
    }
}

/// Creates or replaces `filename` inside a directory the caller holds a write-capable grant for.
///
/// Every resolution or storage failure surfaces as `IOFailure`; only a malformed name or payload
/// is reported as `InvalidArgument`.
pub async fn write_directory_entry(
    resolver: &Resolver<'_>,
    request: &WriteDirectoryEntryRequest,
) -> BridgeResult<DirectoryEntryWritten> {
    validate_entry_name(&request.filename)?;
    let bytes = decode_payload(&request.data)?;

    let handle = resolver
        .resolve(&request.directory_uri)
        .await
        .map_err(|err| {
            warn!(directory = %request.directory_uri, error = %err, "directory grant unavailable");
            as_io_failure(err)
        })?;
    if !handle.entry.is_directory() || handle.grant.scope != GrantScope::Directory {
        return Err(BridgeError::io_failure(format!(
            "`{}` is not a granted directory",
            request.directory_uri
        )));
    }
    if !handle.is_writable() {
        return Err(BridgeError::io_failure(format!(
            "directory `{}` is not writable",
            request.directory_uri
        )));
    }

    let mime_type = mime_for_file_name(&request.filename);
    let _scope = ScopedAccess::enter(handle.provider, handle.uri()).map_err(as_io_failure)?;
    let entry = handle
        .provider
        .replace_child(handle.uri(), &request.filename, mime_type, &bytes)
        .await
        .map_err(as_io_failure)?;
    debug!(uri = %entry.uri, size = bytes.len(), "directory entry written");

    Ok(DirectoryEntryWritten {
        uri: entry.uri,
        name: entry.name,
        mime_type: mime_type.to_string(),
        size: bytes.len() as u64,
    })
}
