//! Typed Tauri command handlers for the file bridge operations.

use file_bridge_contract::{
    dispatch_json, AccessGrant, BridgeError, CopyToLocalRequest, DirectoryEntryWritten,
    DirectoryInfo, FileBridgeService, FileInfo, LocalCopyResult, PickDirectoryOptions,
    PickFileOptions, ReadContentRequest, ReleaseAccessRequest, ReleaseAccessResult,
    TransferPayload, WriteContentRequest, WriteDirectoryEntryRequest,
};
use file_bridge_core::FileBridge;
use tauri::State;

/// Runs the file chooser. Omitted options use the defaults.
#[tauri::command]
pub async fn pick_file(
    bridge: State<'_, FileBridge>,
    options: Option<PickFileOptions>,
) -> Result<Vec<FileInfo>, BridgeError> {
    bridge.pick_file(options.unwrap_or_default()).await
}

/// Runs the folder chooser.
#[tauri::command]
pub async fn pick_directory(
    bridge: State<'_, FileBridge>,
    options: Option<PickDirectoryOptions>,
) -> Result<DirectoryInfo, BridgeError> {
    bridge.pick_directory(options.unwrap_or_default()).await
}

/// Reads a document as a base64 payload.
#[tauri::command]
pub async fn read_content(
    bridge: State<'_, FileBridge>,
    request: ReadContentRequest,
) -> Result<TransferPayload, BridgeError> {
    bridge.read_content(request).await
}

/// Copies a document into application storage.
#[tauri::command]
pub async fn copy_to_local(
    bridge: State<'_, FileBridge>,
    request: CopyToLocalRequest,
) -> Result<LocalCopyResult, BridgeError> {
    bridge.copy_to_local(request).await
}

/// Overwrites a document.
#[tauri::command]
pub async fn write_content(
    bridge: State<'_, FileBridge>,
    request: WriteContentRequest,
) -> Result<(), BridgeError> {
    bridge.write_content(request).await
}

/// Creates or replaces an entry in a granted directory.
#[tauri::command]
pub async fn write_directory_entry(
    bridge: State<'_, FileBridge>,
    request: WriteDirectoryEntryRequest,
) -> Result<DirectoryEntryWritten, BridgeError> {
    bridge.write_directory_entry(request).await
}

/// Releases grants.
#[tauri::command]
pub async fn release_access(
    bridge: State<'_, FileBridge>,
    request: ReleaseAccessRequest,
) -> Result<ReleaseAccessResult, BridgeError> {
    Ok(bridge.release_access(request).await)
}

/// Lists persisted grants.
#[tauri::command]
pub async fn list_grants(bridge: State<'_, FileBridge>) -> Result<Vec<AccessGrant>, BridgeError> {
    Ok(bridge.list_grants().await)
}

/// Handles one JSON envelope request, for callers that exchange raw strings.
#[tauri::command]
pub async fn dispatch(bridge: State<'_, FileBridge>, raw: String) -> Result<String, BridgeError> {
    Ok(dispatch_json(bridge.inner(), &raw).await)
}
