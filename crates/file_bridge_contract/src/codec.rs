//! Text-safe payload codec for bytes crossing the bridge boundary.
//!
//! The boundary only carries strings, so binary content is base64-encoded (standard alphabet,
//! padded) on the way out and decoded symmetrically on the way in. `size` in a
//! [`TransferPayload`] is always the decoded byte length.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{BridgeError, BridgeResult};
use crate::types::TransferPayload;

/// Encoding label advertised to boundary consumers.
pub const TRANSFER_ENCODING: &str = "base64";

/// Encodes raw bytes into a boundary-safe string.
pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a boundary string back into raw bytes.
///
/// ASCII whitespace (line wrapping inserted by some platform encoders) is ignored.
///
/// # Errors
///
/// Returns an `InvalidArgument` error when `data` is not valid base64.
pub fn decode_payload(data: &str) -> BridgeResult<Vec<u8>> {
    let compact: String = data
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| BridgeError::invalid_argument(format!("payload is not valid base64: {err}")))
}

impl TransferPayload {
    /// Builds a payload from raw bytes, recording the decoded length.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            data: encode_payload(bytes),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
        }
    }

    /// Decodes the payload and checks it against the recorded size.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArgument` error when the data is malformed or its decoded length
    /// disagrees with `size`.
    pub fn decode(&self) -> BridgeResult<Vec<u8>> {
        let bytes = decode_payload(&self.data)?;
        if bytes.len() as u64 != self.size {
            return Err(BridgeError::invalid_argument(format!(
                "payload size mismatch: declared {} bytes, decoded {}",
                self.size,
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}
