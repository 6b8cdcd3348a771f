//! Snapshots of external documents in application-private storage.

use std::fs;
use std::path::{Path, PathBuf};

use file_bridge_contract::{
    extension_for_mime, BridgeError, BridgeResult, CopyToLocalRequest, LocalCopyResult,
};
use tracing::info;

use crate::config::BridgeConfig;
use crate::materializer::materialize;
use crate::platform::local::{validate_entry_name, write_atomic};
use crate::resolver::Resolver;

const FALLBACK_NAME: &str = "document";

/// Chooses the file name for a local copy.
///
/// An explicit `requested` name is used verbatim after validation. Otherwise the source name is
/// used with separators replaced, and when the bytes were converted the target type's canonical
/// extension is appended unless already present.
pub fn local_copy_name(
    requested: Option<&str>,
    source_name: &str,
    converted_to: Option<&str>,
) -> BridgeResult<String> {
    if let Some(requested) = requested {
        validate_entry_name(requested)?;
        return Ok(requested.to_string());
    }

    let mut name: String = source_name
        .chars()
        .map(|ch| if matches!(ch, '/' | '\\' | '\0') { '_' } else { ch })
        .collect();
    if name.trim().is_empty() || name == "." || name == ".." {
        name = FALLBACK_NAME.to_string();
    }
    if let Some(ext) = converted_to.and_then(extension_for_mime) {
        let suffix = format!(".{ext}");
        if !name.to_ascii_lowercase().ends_with(&suffix) {
            name.push_str(&suffix);
        }
    }
    Ok(name)
}

/// Writes `bytes` to `dir/name`, creating `dir` and replacing any existing file atomically.
pub(crate) fn store_bytes(dir: &Path, name: &str, bytes: &[u8]) -> BridgeResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|err| {
        BridgeError::io_failure(format!("failed to create {}: {err}", dir.display()))
    })?;
    write_atomic(dir, name, bytes).map_err(|err| {
        BridgeError::io_failure(format!("failed to write {}/{name}: {err}", dir.display()))
            .with_target(dir.join(name).display().to_string())
    })
}

/// Copies a document into the requested storage area.
///
/// Nothing is written until the bytes are fully materialized, and the write itself goes through
/// a temporary file, so a failed or cancelled copy leaves no partial file behind.
pub async fn copy_to_local(
    resolver: &Resolver<'_>,
    config: &BridgeConfig,
    request: &CopyToLocalRequest,
) -> BridgeResult<LocalCopyResult> {
    if let Some(filename) = &request.filename {
        validate_entry_name(filename)?;
    }
    let handle = resolver.resolve(&request.uri).await?;
    let materialized = materialize(&handle, request.convert_virtual_as_type.as_deref()).await?;
    let converted_to = materialized
        .converted
        .then_some(materialized.mime_type.as_str());
    let name = local_copy_name(request.filename.as_deref(), &handle.entry.name, converted_to)?;

    let dir = config.dir_for(request.destination);
    let path = store_bytes(dir, &name, &materialized.bytes)?;
    info!(
        uri = %request.uri,
        path = %path.display(),
        size = materialized.bytes.len(),
        "local copy written"
    );
    Ok(LocalCopyResult {
        path: path.display().to_string(),
        name,
        size: materialized.bytes.len() as u64,
        mime_type: materialized.mime_type,
    })
}
