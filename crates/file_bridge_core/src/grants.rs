//! Grant registry: the single authority on which identifiers the bridge may touch.
//!
//! Grants live in a mutex-guarded map keyed by identifier. The lock is never held across an
//! `.await`, so platform calls run outside it and concurrent releases of the same identifier are
//! decided by whichever removal wins the lock. Persisted grants are mirrored to an optional JSON
//! store so they can be restored in a later session.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use file_bridge_contract::{
    AccessGrant, BridgeError, GrantAccess, GrantDurability, GrantLiveness, GrantScope,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::platform::local::write_atomic;
use crate::platform::PlatformProvider;

/// Failures reading or writing the persisted grant store.
#[derive(Debug, Error)]
pub enum GrantStoreError {
    /// The store file exists but could not be read.
    #[error("failed to read grant store {path}: {source}")]
    Read {
        /// Store file.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The store file is not a valid grant map.
    #[error("failed to parse grant store {path}: {source}")]
    Parse {
        /// Store file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// The grant map could not be serialized.
    #[error("failed to serialize grant store: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The store file could not be replaced.
    #[error("failed to write grant store {path}: {source}")]
    Write {
        /// Store file.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
}

impl From<GrantStoreError> for BridgeError {
    fn from(err: GrantStoreError) -> Self {
        BridgeError::io_failure(err.to_string())
    }
}

type GrantMap = BTreeMap<String, AccessGrant>;

#[derive(Debug, Clone)]
/// Persisted grants backed by a single JSON map file.
pub struct GrantStore {
    file: PathBuf,
}

impl GrantStore {
    /// Opens the store at `file`, creating its parent directory.
    pub fn open(file: impl Into<PathBuf>) -> Result<Self, GrantStoreError> {
        let file = file.into();
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|source| GrantStoreError::Write {
                path: file.clone(),
                source,
            })?;
        }
        Ok(Self { file })
    }

    /// Store file location.
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Loads every stored grant. A missing or empty file is an empty store.
    pub fn load(&self) -> Result<Vec<AccessGrant>, GrantStoreError> {
        if !self.file.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.file).map_err(|source| GrantStoreError::Read {
            path: self.file.clone(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let map: GrantMap = serde_json::from_str(&raw).map_err(|source| GrantStoreError::Parse {
            path: self.file.clone(),
            source,
        })?;
        Ok(map.into_values().collect())
    }

    /// Replaces the stored grants with `grants`.
    pub fn save<'a>(
        &self,
        grants: impl IntoIterator<Item = &'a AccessGrant>,
    ) -> Result<(), GrantStoreError> {
        let map: GrantMap = grants
            .into_iter()
            .map(|grant| (grant.identifier.clone(), grant.clone()))
            .collect();
        let serialized = serde_json::to_vec_pretty(&map)?;
        let write_err = |source| GrantStoreError::Write {
            path: self.file.clone(),
            source,
        };
        let dir = self
            .file
            .parent()
            .ok_or_else(|| write_err(io::Error::other("store file has no parent")))?;
        let name = self
            .file
            .file_name()
            .ok_or_else(|| write_err(io::Error::other("store file has no name")))?;
        write_atomic(dir, &name.to_string_lossy(), &serialized).map_err(write_err)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
/// Registry of live grants, optionally mirrored to a [`GrantStore`].
pub struct GrantManager {
    grants: Mutex<HashMap<String, AccessGrant>>,
    store: Option<GrantStore>,
}

impl GrantManager {
    /// Creates an empty registry.
    pub fn new(store: Option<GrantStore>) -> Self {
        Self {
            grants: Mutex::new(HashMap::new()),
            store,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, AccessGrant>> {
        self.grants.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sync_store(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let persisted = self.persisted();
        if let Err(err) = store.save(&persisted) {
            warn!(error = %err, "failed to mirror persisted grants");
        }
    }

    /// Records a grant for `identifier`, escalating it to persisted durability when requested.
    ///
    /// Escalation failures, such as an exhausted persisted-permission quota, are logged and the
    /// grant stays ephemeral without a bookmark. A live persisted grant for the same identifier
    /// keeps its durability in the registry; a revoked one is replaced outright.
    pub async fn acquire(
        &self,
        platform: &dyn PlatformProvider,
        identifier: &str,
        scope: GrantScope,
        access: GrantAccess,
        long_term: bool,
    ) -> AccessGrant {
        let mut grant = AccessGrant::ephemeral(identifier, scope, access);
        if long_term {
            match platform.persist_grant(identifier, scope, access).await {
                Ok(bookmark) => grant = AccessGrant::persisted(identifier, scope, access, bookmark),
                Err(err) => warn!(
                    identifier,
                    error = %err,
                    "long-term access unavailable; grant stays ephemeral"
                ),
            }
        }

        let grant = {
            let mut grants = self.lock();
            if let Some(existing) = grants.get(identifier) {
                if existing.is_persisted() && existing.is_live() && !grant.is_persisted() {
                    grant.durability = GrantDurability::Persisted;
                    grant.bookmark = existing.bookmark.clone();
                }
            }
            grants.insert(identifier.to_string(), grant.clone());
            grant
        };
        if grant.is_persisted() {
            self.sync_store();
        }
        debug!(
            identifier,
            persisted = grant.is_persisted(),
            "grant acquired"
        );
        grant
    }

    /// Returns the grant recorded for exactly `identifier`.
    pub fn get(&self, identifier: &str) -> Option<AccessGrant> {
        self.lock().get(identifier).cloned()
    }

    /// Returns the grant covering `uri`: its own grant, or the most specific directory grant
    /// whose tree contains it.
    pub fn resolve_covering(
        &self,
        platform: &dyn PlatformProvider,
        uri: &str,
    ) -> Option<AccessGrant> {
        let grants = self.lock();
        if let Some(grant) = grants.get(uri) {
            return Some(grant.clone());
        }
        grants
            .values()
            .filter(|grant| {
                grant.scope == GrantScope::Directory && platform.contains(&grant.identifier, uri)
            })
            .max_by_key(|grant| grant.identifier.len())
            .cloned()
    }

    /// Records that the platform no longer honors the grant for `identifier`.
    ///
    /// The grant stays registered so a later release still counts it, but it is no longer listed
    /// or stored as persisted.
    pub fn mark_revoked(&self, identifier: &str) {
        let was_persisted = match self.lock().get_mut(identifier) {
            Some(grant) => {
                grant.liveness = GrantLiveness::Revoked;
                grant.is_persisted()
            }
            None => false,
        };
        if was_persisted {
            self.sync_store();
        }
        info!(identifier, "grant revoked out-of-band");
    }

    /// Releases the grants for `identifiers` and returns how many were actually held.
    ///
    /// Unknown identifiers and duplicates are not counted. Persisted grants are handed back to
    /// the platform after they leave the registry; platform failures are ignored.
    pub async fn release(&self, platform: &dyn PlatformProvider, identifiers: &[String]) -> usize {
        let removed: Vec<AccessGrant> = {
            let mut grants = self.lock();
            identifiers
                .iter()
                .filter_map(|identifier| grants.remove(identifier))
                .collect()
        };

        let mut persisted_removed = false;
        for grant in removed.iter().filter(|grant| grant.is_persisted()) {
            persisted_removed = true;
            let returned = platform
                .release_grant(&grant.identifier, grant.bookmark.as_deref())
                .await;
            debug!(identifier = %grant.identifier, returned, "persisted grant released");
        }
        if persisted_removed {
            self.sync_store();
        }
        removed.len()
    }

    /// Live persisted grants, ordered by identifier.
    pub fn persisted(&self) -> Vec<AccessGrant> {
        let mut persisted: Vec<AccessGrant> = self
            .lock()
            .values()
            .filter(|grant| grant.is_persisted() && grant.is_live())
            .cloned()
            .collect();
        persisted.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        persisted
    }

    /// Number of grants currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when no grants are held.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Re-establishes persisted grants from the store and returns how many survived.
    ///
    /// Bookmarks the platform no longer honors are dropped from the store.
    pub async fn restore(&self, platform: &dyn PlatformProvider) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        let stored = match store.load() {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "persisted grants unavailable");
                return 0;
            }
        };

        let mut restored = Vec::new();
        for grant in stored {
            let Some(bookmark) = grant.bookmark.clone() else {
                continue;
            };
            match platform.restore_grant(&bookmark).await {
                Ok(identifier) => restored.push(AccessGrant::persisted(
                    identifier,
                    grant.scope,
                    grant.access,
                    bookmark,
                )),
                Err(err) => warn!(
                    identifier = %grant.identifier,
                    error = %err,
                    "dropping stale persisted grant"
                ),
            }
        }

        let count = restored.len();
        {
            let mut grants = self.lock();
            for grant in restored {
                grants.insert(grant.identifier.clone(), grant);
            }
        }
        self.sync_store();
        info!(count, "persisted grants restored");
        count
    }
}
