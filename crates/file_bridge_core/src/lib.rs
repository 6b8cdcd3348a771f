//! Execution layer of the native file-access bridge.
//!
//! [`FileBridge`] implements [`file_bridge_contract::FileBridgeService`] on top of a
//! [`platform::PlatformProvider`] (one per OS permission model) and a
//! [`platform::ResourceChooser`]. The grant registry ([`grants::GrantManager`]) is the only shared
//! mutable state; every other component works on immutable handle values.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod bridge;
pub mod config;
pub mod directory_writer;
pub mod grants;
pub mod local_copy;
pub mod materializer;
pub mod picker;
pub mod platform;
pub mod resolver;
pub mod transfer;

pub use bridge::FileBridge;
pub use config::BridgeConfig;
pub use grants::{GrantManager, GrantStore, GrantStoreError};
pub use materializer::{Materialization, Materialized};
pub use picker::PickerSession;
pub use platform::{
    ChooserOutcome, DesktopPlatform, DirectoryChooserRequest, FileChooserRequest, LocalFsProvider,
    MemoryPlatform, PlatformFuture, PlatformProvider, ResourceChooser, ResourceEntry,
    ResourceKind, ScriptedChooser,
};
pub use resolver::{ResolvedHandle, Resolver};
