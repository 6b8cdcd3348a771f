//! Typed boundary contract for the native file-access bridge.
//!
//! This crate is the API-first boundary between a presentation layer and the platform-facing
//! execution layer. It exposes the handle/grant data model, the error taxonomy, the text-safe
//! payload codec, the extension/MIME table, and the [`FileBridgeService`] trait, while concrete
//! grant management and platform adapters live in `file_bridge_core`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod mime;
pub mod service;
pub mod types;

pub use codec::{decode_payload, encode_payload, TRANSFER_ENCODING};
pub use dispatch::{dispatch, dispatch_json, BridgeRequest, BridgeResponse};
pub use error::{BridgeError, BridgeErrorKind, BridgeResult};
pub use mime::{
    extension_for_mime, extensions_for_pattern, is_valid_mime_pattern, mime_for_file_name,
    mime_matches, GENERIC_BINARY_MIME,
};
pub use service::{FileBridgeFuture, FileBridgeService, NoopFileBridgeService};
pub use types::{
    AccessGrant, CopyToLocalRequest, DirectoryEntryWritten, DirectoryInfo, FileInfo, GrantAccess,
    GrantDurability, GrantLiveness, GrantScope, LocalCopyResult, LocalDestination,
    PickDirectoryOptions, PickFileOptions, PickMode, ReadContentRequest, ReleaseAccessRequest,
    ReleaseAccessResult, TransferPayload, WriteContentRequest, WriteDirectoryEntryRequest,
};
