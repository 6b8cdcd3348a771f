//! Handle, grant, and request/response types shared across the bridge boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// File handle returned by a picker session.
pub struct FileInfo {
    /// Stable opaque identifier and primary key.
    pub uri: String,
    /// Best-effort filesystem path; empty when the platform exposes none.
    pub path: String,
    /// Display name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type reported by the platform.
    pub mime_type: String,
    /// Whether the document has no direct byte stream.
    pub is_virtual: bool,
    /// Persisted-access token, present only when long-term access was granted and persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
    /// Conversion targets; only populated for virtual files.
    #[serde(default)]
    pub convertible_to_mime_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Directory handle returned by a picker session. Its grant covers the whole subtree.
pub struct DirectoryInfo {
    /// Stable opaque identifier.
    pub uri: String,
    /// Best-effort filesystem path; empty when the platform exposes none.
    pub path: String,
    /// Display name.
    pub name: String,
    /// Persisted-access token, present only when long-term access was granted and persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Resource kind a grant covers.
pub enum GrantScope {
    /// A single document.
    File,
    /// A directory and everything reachable below it.
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Access mode carried by a grant.
pub enum GrantAccess {
    /// Read-only access.
    Read,
    /// Read and write access.
    ReadWrite,
}

impl GrantAccess {
    /// Returns `true` when writes are allowed.
    pub fn can_write(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Whether a grant survives the current session.
pub enum GrantDurability {
    /// Lives until released or until the session ends.
    Ephemeral,
    /// Backed by a platform bookmark or persisted permission.
    Persisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Last observed liveness of a grant.
pub enum GrantLiveness {
    /// The platform still honors the grant.
    Valid,
    /// The platform invalidated the grant out-of-band.
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Permission record owned by the grant manager.
pub struct AccessGrant {
    /// Identifier the grant was issued for.
    pub identifier: String,
    /// Covered resource kind.
    pub scope: GrantScope,
    /// Access mode.
    pub access: GrantAccess,
    /// Session or persisted durability.
    pub durability: GrantDurability,
    /// Last observed liveness.
    pub liveness: GrantLiveness,
    /// Platform bookmark when persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
}

impl AccessGrant {
    /// Builds a valid, ephemeral grant.
    pub fn ephemeral(identifier: impl Into<String>, scope: GrantScope, access: GrantAccess) -> Self {
        Self {
            identifier: identifier.into(),
            scope,
            access,
            durability: GrantDurability::Ephemeral,
            liveness: GrantLiveness::Valid,
            bookmark: None,
        }
    }

    /// Builds a valid grant persisted under `bookmark`.
    pub fn persisted(
        identifier: impl Into<String>,
        scope: GrantScope,
        access: GrantAccess,
        bookmark: impl Into<String>,
    ) -> Self {
        Self {
            durability: GrantDurability::Persisted,
            bookmark: Some(bookmark.into()),
            ..Self::ephemeral(identifier, scope, access)
        }
    }

    /// Returns `true` when the grant outlives the session.
    pub fn is_persisted(&self) -> bool {
        self.durability == GrantDurability::Persisted
    }

    /// Returns `true` unless the grant was seen revoked.
    pub fn is_live(&self) -> bool {
        self.liveness == GrantLiveness::Valid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// How picked files relate to their source.
pub enum PickMode {
    /// The bridge copies the file into application storage; the handle is independent of the
    /// source's lifecycle.
    Import,
    /// The handle tracks the original resource and needs a live grant for every access.
    #[default]
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// Options for `pick_file`.
pub struct PickFileOptions {
    /// MIME filter patterns such as `image/*`; empty means any type.
    pub allowed_types: Vec<String>,
    /// Allows selecting more than one file.
    pub allow_multiple: bool,
    /// Import or open semantics.
    pub mode: PickMode,
    /// Escalates the grant to persisted durability when the platform allows it.
    pub request_long_term_access: bool,
    /// Keeps virtual files in the result set instead of dropping them.
    pub allow_virtual_files: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// Options for `pick_directory`.
pub struct PickDirectoryOptions {
    /// Identifier or path the chooser should start in.
    pub start_directory: Option<String>,
    /// Escalates the grant to persisted durability when the platform allows it.
    pub request_long_term_access: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Request for `read_content`.
pub struct ReadContentRequest {
    /// Identifier to read.
    pub uri: String,
    /// Conversion target for virtual files.
    #[serde(default)]
    pub convert_virtual_as_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Bytes in flight across the boundary. Exists only for the duration of one call.
pub struct TransferPayload {
    /// Base64-encoded bytes.
    pub data: String,
    /// MIME type of the decoded bytes.
    pub mime_type: String,
    /// Decoded byte length.
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Application-private storage area for local copies.
pub enum LocalDestination {
    /// Evictable cache storage.
    #[default]
    Cache,
    /// Durable documents storage.
    Documents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Request for `copy_to_local`.
pub struct CopyToLocalRequest {
    /// Identifier to copy.
    pub uri: String,
    /// Storage area to copy into.
    #[serde(default)]
    pub destination: LocalDestination,
    /// File name to use instead of the handle's own name.
    #[serde(default)]
    pub filename: Option<String>,
    /// Conversion target for virtual files.
    #[serde(default)]
    pub convert_virtual_as_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Result of `copy_to_local`.
pub struct LocalCopyResult {
    /// Absolute path of the local copy.
    pub path: String,
    /// File name of the local copy.
    pub name: String,
    /// Bytes written.
    pub size: u64,
    /// MIME type of the written bytes.
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Request for `write_content`.
pub struct WriteContentRequest {
    /// Identifier to overwrite.
    pub uri: String,
    /// Base64-encoded bytes.
    pub data: String,
    /// MIME type hint for the written bytes.
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Request for `write_directory_entry`.
pub struct WriteDirectoryEntryRequest {
    /// Granted directory identifier.
    pub directory_uri: String,
    /// Entry name inside the directory.
    pub filename: String,
    /// Base64-encoded bytes.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Entry created or replaced by `write_directory_entry`.
pub struct DirectoryEntryWritten {
    /// Identifier of the entry.
    pub uri: String,
    /// Entry name.
    pub name: String,
    /// MIME type derived from the name's extension.
    pub mime_type: String,
    /// Bytes written.
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Request for `release_access`.
pub struct ReleaseAccessRequest {
    /// Identifiers whose grants should be released.
    #[serde(default)]
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Result of `release_access`.
pub struct ReleaseAccessResult {
    /// Number of requested identifiers that were actually released.
    pub released_count: usize,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn file_info_uses_camel_case_and_omits_missing_bookmark() {
        let info = FileInfo {
            uri: "content://docs/document/7".to_string(),
            path: String::new(),
            name: "notes.txt".to_string(),
            size: 5,
            mime_type: "text/plain".to_string(),
            is_virtual: false,
            bookmark: None,
            convertible_to_mime_types: Vec::new(),
        };

        let value = serde_json::to_value(&info).expect("serialize");
        assert_eq!(
            value,
            json!({
                "uri": "content://docs/document/7",
                "path": "",
                "name": "notes.txt",
                "size": 5,
                "mimeType": "text/plain",
                "isVirtual": false,
                "convertibleToMimeTypes": []
            })
        );
    }

    #[test]
    fn pick_options_default_missing_fields() {
        let options: PickFileOptions =
            serde_json::from_value(json!({"allowMultiple": true, "mode": "import"}))
                .expect("deserialize");
        assert_eq!(
            options,
            PickFileOptions {
                allowed_types: Vec::new(),
                allow_multiple: true,
                mode: PickMode::Import,
                request_long_term_access: false,
                allow_virtual_files: false,
            }
        );

        let dir: PickDirectoryOptions = serde_json::from_value(json!({})).expect("deserialize");
        assert_eq!(dir, PickDirectoryOptions::default());
    }

    #[test]
    fn copy_request_defaults_to_cache_destination() {
        let request: CopyToLocalRequest =
            serde_json::from_value(json!({"uri": "content://docs/document/1"}))
                .expect("deserialize");
        assert_eq!(request.destination, LocalDestination::Cache);
        assert_eq!(request.filename, None);

        assert_eq!(
            serde_json::to_string(&LocalDestination::Documents).expect("serialize"),
            "\"documents\""
        );
    }

    #[test]
    fn grant_constructors_set_durability_and_bookmark() {
        let ephemeral = AccessGrant::ephemeral("u", GrantScope::File, GrantAccess::Read);
        assert!(!ephemeral.is_persisted());
        assert!(ephemeral.is_live());
        assert_eq!(ephemeral.bookmark, None);

        let persisted =
            AccessGrant::persisted("u", GrantScope::Directory, GrantAccess::ReadWrite, "bm-1");
        assert!(persisted.is_persisted());
        assert_eq!(persisted.bookmark.as_deref(), Some("bm-1"));
        assert!(persisted.access.can_write());

        let value = serde_json::to_value(&persisted).expect("serialize");
        assert_eq!(value["scope"], "directory");
        assert_eq!(value["access"], "read-write");
        assert_eq!(value["durability"], "persisted");
    }
}
