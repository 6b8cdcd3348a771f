//! Identifier to platform-handle resolution with per-call liveness checks.

use file_bridge_contract::{
    AccessGrant, BridgeError, BridgeResult, GrantAccess, GrantLiveness, GrantScope,
};
use tracing::debug;
use url::Url;

use crate::grants::GrantManager;
use crate::platform::{LocalFsProvider, PlatformProvider, ResourceEntry};

/// A resolved identifier: the grant that authorizes it, the resource it names, and the
/// provider that serves it.
pub struct ResolvedHandle<'a> {
    /// Grant covering the identifier.
    pub grant: AccessGrant,
    /// Resource description captured during resolution.
    pub entry: ResourceEntry,
    /// Provider serving the resource.
    pub provider: &'a dyn PlatformProvider,
}

impl ResolvedHandle<'_> {
    /// Identifier the handle was resolved from.
    pub fn uri(&self) -> &str {
        &self.entry.uri
    }

    /// Returns `true` when both the grant and the resource accept writes.
    pub fn is_writable(&self) -> bool {
        self.grant.access.can_write() && self.entry.writable
    }
}

#[derive(Clone, Copy)]
/// Resolves identifiers against the grant registry and the platform.
pub struct Resolver<'a> {
    grants: &'a GrantManager,
    platform: &'a dyn PlatformProvider,
    local: &'a LocalFsProvider,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver. `local` serves identifiers inside application storage.
    pub fn new(
        grants: &'a GrantManager,
        platform: &'a dyn PlatformProvider,
        local: &'a LocalFsProvider,
    ) -> Self {
        Self {
            grants,
            platform,
            local,
        }
    }

    /// Resolves `uri` to a live handle.
    ///
    /// # Errors
    ///
    /// * `NotFound` when `uri` is malformed or the resource no longer exists.
    /// * `PermissionDenied` when no grant covers `uri` or the platform revoked it.
    pub async fn resolve(&self, uri: &str) -> BridgeResult<ResolvedHandle<'a>> {
        Url::parse(uri)
            .map_err(|err| BridgeError::not_found(format!("malformed identifier `{uri}`: {err}")))?;

        if self.local.owns(uri) {
            let entry = self.local.stat(uri).await?;
            let scope = if entry.is_directory() {
                GrantScope::Directory
            } else {
                GrantScope::File
            };
            debug!(uri, "resolved inside application storage");
            return Ok(ResolvedHandle {
                grant: AccessGrant::ephemeral(uri, scope, GrantAccess::ReadWrite),
                entry,
                provider: self.local,
            });
        }

        let grant = self
            .grants
            .resolve_covering(self.platform, uri)
            .ok_or_else(|| BridgeError::permission_denied(format!("no grant covers `{uri}`")))?;
        if !grant.is_live() {
            return Err(BridgeError::permission_denied(format!(
                "grant for `{}` was revoked",
                grant.identifier
            )));
        }
        if self.platform.check_grant(&grant.identifier, grant.scope).await
            == GrantLiveness::Revoked
        {
            self.grants.mark_revoked(&grant.identifier);
            return Err(BridgeError::permission_denied(format!(
                "grant for `{}` was revoked",
                grant.identifier
            )));
        }

        let entry = self.platform.stat(uri).await?;
        Ok(ResolvedHandle {
            grant,
            entry,
            provider: self.platform,
        })
    }
}
