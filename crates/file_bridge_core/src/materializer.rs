//! Direct/virtual classification and on-demand byte materialization.
//!
//! Virtual documents have no byte stream; they are read by converting to one of the MIME types
//! the platform advertises. Conversion results are never cached.

use file_bridge_contract::{BridgeError, BridgeResult};
use tracing::{debug, info};

use crate::platform::{ResourceEntry, ScopedAccess};
use crate::resolver::ResolvedHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
/// How a document's bytes are obtained.
pub enum Materialization {
    /// The document has a direct byte stream.
    Direct,
    /// The document must be converted to one of `convertible_to`.
    Virtual {
        /// Advertised conversion targets.
        convertible_to: Vec<String>,
    },
}

impl Materialization {
    /// Classifies a resolved resource.
    pub fn classify(entry: &ResourceEntry) -> Self {
        if entry.is_virtual() {
            Self::Virtual {
                convertible_to: entry.virtual_types.clone(),
            }
        } else {
            Self::Direct
        }
    }

    /// Picks the conversion target for `requested`.
    ///
    /// Direct documents ignore the request and return `None`. Virtual documents require a
    /// requested type from the advertised set (compared case-insensitively) and return the
    /// platform's spelling of it.
    pub fn select_target(&self, requested: Option<&str>) -> BridgeResult<Option<String>> {
        let Self::Virtual { convertible_to } = self else {
            return Ok(None);
        };
        let Some(requested) = requested.map(str::trim).filter(|value| !value.is_empty()) else {
            return Err(BridgeError::conversion_unsupported(format!(
                "virtual document requires a conversion target; available: {}",
                convertible_to.join(", ")
            )));
        };
        convertible_to
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(requested))
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                BridgeError::conversion_unsupported(format!(
                    "cannot convert to {requested}; available: {}",
                    convertible_to.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Bytes produced for one read.
pub struct Materialized {
    /// Document bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`; the conversion target for converted documents.
    pub mime_type: String,
    /// Whether the bytes came from a conversion.
    pub converted: bool,
}

/// Produces the bytes of a resolved document, converting virtual documents to `requested`.
///
/// The platform access scope is held for the duration of the read or conversion and released
/// even when the returned future is dropped.
pub async fn materialize(
    handle: &ResolvedHandle<'_>,
    requested: Option<&str>,
) -> BridgeResult<Materialized> {
    if handle.entry.is_directory() {
        return Err(BridgeError::io_failure(format!(
            "`{}` is a directory",
            handle.uri()
        )));
    }
    let target = Materialization::classify(&handle.entry).select_target(requested)?;
    let _scope = ScopedAccess::enter(handle.provider, handle.uri())?;

    match target {
        Some(target) => {
            info!(uri = handle.uri(), target = %target, "converting virtual document");
            let bytes = handle.provider.convert(handle.uri(), &target).await?;
            Ok(Materialized {
                bytes,
                mime_type: target,
                converted: true,
            })
        }
        None => {
            let bytes = handle.provider.read(handle.uri()).await?;
            debug!(uri = handle.uri(), size = bytes.len(), "read direct document");
            Ok(Materialized {
                bytes,
                mime_type: handle.entry.mime_type.clone(),
                converted: false,
            })
        }
    }
}
