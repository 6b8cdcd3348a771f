//! Content reads and writes across the boundary as encoded payloads.

use file_bridge_contract::{
    decode_payload, BridgeError, BridgeResult, ReadContentRequest, TransferPayload,
    WriteContentRequest,
};
use tracing::debug;

use crate::materializer::materialize;
use crate::platform::ScopedAccess;
use crate::resolver::Resolver;

/// Reads a document as an encoded payload.
///
/// Payloads larger than `max_payload_bytes` fail with `IOFailure`; such documents should be
/// snapshotted with `copy_to_local` instead.
pub async fn read_content(
    resolver: &Resolver<'_>,
    request: &ReadContentRequest,
    max_payload_bytes: Option<u64>,
) -> BridgeResult<TransferPayload> {
    let handle = resolver.resolve(&request.uri).await?;
    let materialized = materialize(&handle, request.convert_virtual_as_type.as_deref()).await?;
    let size = materialized.bytes.len() as u64;
    if let Some(limit) = max_payload_bytes {
        if size > limit {
            return Err(BridgeError::io_failure(format!(
                "document is {size} bytes, over the {limit} byte payload limit; use copy_to_local"
            )));
        }
    }
    Ok(TransferPayload::from_bytes(
        &materialized.bytes,
        materialized.mime_type,
    ))
}

/// Overwrites a document with the decoded payload.
///
/// The payload is decoded before anything is resolved, so malformed input never reaches the
/// platform.
pub async fn write_content(
    resolver: &Resolver<'_>,
    request: &WriteContentRequest,
) -> BridgeResult<()> {
    let bytes = decode_payload(&request.data)?;
    let handle = resolver.resolve(&request.uri).await?;
    if handle.entry.is_directory() {
        return Err(BridgeError::io_failure(format!(
            "`{}` is a directory",
            request.uri
        )));
    }
    if handle.entry.is_virtual() {
        return Err(BridgeError::io_failure(format!(
            "virtual document `{}` cannot be written",
            request.uri
        )));
    }
    if !handle.is_writable() {
        return Err(BridgeError::io_failure(format!(
            "`{}` is not writable",
            request.uri
        )));
    }

    let _scope = ScopedAccess::enter(handle.provider, handle.uri())?;
    handle
        .provider
        .write(handle.uri(), &bytes, request.mime_type.as_deref())
        .await?;
    debug!(uri = %request.uri, size = bytes.len(), "document written");
    Ok(())
}
