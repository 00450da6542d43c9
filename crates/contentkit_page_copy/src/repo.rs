//! Collaborator interfaces consumed by the copy engine.
//!
//! Implementations are session-scoped: every method takes `&self`, and the
//! session owning a lock is the one calling through the trait object.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::spec::{RepositoryError, SpecResource, SpecResourceType, SpecTypeConfig};

/// Read/write access to the shared content repository.
pub trait ContentRepository {
    /// Resource at `path_root`.
    fn read_resource(&self, path_root: &str) -> Result<SpecResource, RepositoryError>;

    /// Resource with structure id `id_structure`.
    fn read_resource_by_id(&self, id_structure: Uuid) -> Result<SpecResource, RepositoryError>;

    /// Whether `path_root` is taken.
    fn exists(&self, path_root: &str) -> bool;

    /// Immediate children of a folder, ordered by path.
    fn read_children(&self, path_folder: &str) -> Result<Vec<SpecResource>, RepositoryError>;

    /// Default (index) file of a folder, if it has one.
    fn read_default_file(&self, path_folder: &str)
    -> Result<Option<SpecResource>, RepositoryError>;

    /// Type registry lookup.
    fn resolve_type(&self, id_type: u32) -> Result<SpecResourceType, RepositoryError>;

    /// Properties set directly on a resource.
    fn read_properties(&self, path_root: &str)
    -> Result<BTreeMap<String, String>, RepositoryError>;

    /// Set one property. Requires the lock.
    fn write_property(&self, path_root: &str, name: &str, value: &str)
    -> Result<(), RepositoryError>;

    /// Remove one property if present. Requires the lock.
    fn remove_property(&self, path_root: &str, name: &str) -> Result<(), RepositoryError>;

    /// Create a folder with initial properties.
    fn create_folder(
        &self,
        path_root: &str,
        id_type: u32,
        properties: &BTreeMap<String, String>,
    ) -> Result<SpecResource, RepositoryError>;

    /// Copy a file resource (content and properties) to a new path and identity.
    fn copy_resource(&self, path_src: &str, path_dst: &str)
    -> Result<SpecResource, RepositoryError>;

    /// Content of a file resource.
    fn read_file(&self, path_root: &str) -> Result<String, RepositoryError>;

    /// Replace the content of a file resource. Requires the lock.
    fn write_file(&self, path_root: &str, content: &str) -> Result<(), RepositoryError>;

    /// Acquire the lock for this session.
    ///
    /// Returns `false` when this session already held it.
    fn lock(&self, path_root: &str) -> Result<bool, RepositoryError>;

    /// Release this session's lock.
    fn unlock(&self, path_root: &str) -> Result<(), RepositoryError>;
}

/// Effective default locale of a resource.
pub trait LocaleResolver {
    /// Locale that applies at `path_root`.
    fn default_locale(&self, path_root: &str) -> Result<String, RepositoryError>;
}

/// Per-location type configuration.
pub trait TypeConfigLookup {
    /// Configuration of `name_type` for pages at `path_target`.
    fn type_config(&self, path_target: &str, name_type: &str) -> Option<SpecTypeConfig>;
}

/// Holds a repository lock for the lifetime of the guard.
///
/// Only a lock taken by [`GuardLock::acquire`] is released; a lock the session
/// already held stays in place. Release failures are logged, not returned:
/// by the time the guard drops the writes it protected have already been
/// committed.
pub struct GuardLock<'a> {
    repo: &'a dyn ContentRepository,
    path_root: String,
    if_owned: bool,
}

impl<'a> GuardLock<'a> {
    /// Lock `path_root` and return the guard releasing it.
    pub fn acquire(
        repo: &'a dyn ContentRepository,
        path_root: &str,
    ) -> Result<Self, RepositoryError> {
        let if_owned = repo.lock(path_root)?;
        Ok(Self {
            repo,
            path_root: path_root.to_string(),
            if_owned,
        })
    }

    /// Locked path.
    pub fn path(&self) -> &str {
        &self.path_root
    }
}

impl Drop for GuardLock<'_> {
    fn drop(&mut self) {
        if !self.if_owned {
            return;
        }
        if let Err(e) = self.repo.unlock(&self.path_root) {
            log::info!("Failed to unlock {}: {e}", self.path_root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentRepository, GuardLock};
    use crate::memory::MemoryRepository;

    #[test]
    fn guard_releases_lock_on_drop() {
        let repo = MemoryRepository::new();
        repo.add_folder("/site/", &[]).expect("folder");
        repo.add_file("/site/a.xml", "plain", "<x/>", &[])
            .expect("file");

        {
            let guard = GuardLock::acquire(&repo, "/site/a.xml").expect("lock");
            assert_eq!(guard.path(), "/site/a.xml");
            assert!(repo.is_locked("/site/a.xml"));
            repo.write_file("/site/a.xml", "<y/>").expect("write under lock");
        }
        assert!(!repo.is_locked("/site/a.xml"));
        assert!(repo.write_file("/site/a.xml", "<z/>").is_err());
    }

    #[test]
    fn guard_releases_lock_on_early_return() {
        fn locked_failure(repo: &MemoryRepository) -> Result<(), String> {
            let _guard = GuardLock::acquire(repo, "/site/a.xml").map_err(|e| e.to_string())?;
            Err("work failed".to_string())
        }

        let repo = MemoryRepository::new();
        repo.add_folder("/site/", &[]).expect("folder");
        repo.add_file("/site/a.xml", "plain", "<x/>", &[])
            .expect("file");

        assert!(locked_failure(&repo).is_err());
        assert!(!repo.is_locked("/site/a.xml"));
    }

    #[test]
    fn guard_unlock_failure_is_swallowed() {
        let repo = MemoryRepository::new();
        repo.add_folder("/site/", &[]).expect("folder");
        repo.add_file("/site/a.xml", "plain", "<x/>", &[])
            .expect("file");

        let guard = GuardLock::acquire(&repo, "/site/a.xml").expect("lock");
        repo.lock_as_other("/site/a.xml").expect("other lock");
        drop(guard);

        assert!(repo.is_locked("/site/a.xml"));
        assert!(repo.session_locks().is_empty());
        assert!(repo.write_file("/site/a.xml", "<y/>").is_err());
        assert_eq!(repo.read_file("/site/a.xml").expect("read"), "<x/>");
    }

    #[test]
    fn guard_keeps_lock_held_before_acquire() {
        let repo = MemoryRepository::new();
        repo.add_folder("/site/", &[]).expect("folder");
        repo.add_file("/site/a.xml", "plain", "<x/>", &[])
            .expect("file");

        assert!(repo.lock("/site/a.xml").expect("outer lock"));
        {
            let _guard = GuardLock::acquire(&repo, "/site/a.xml").expect("inner lock");
        }
        assert_eq!(repo.session_locks(), vec!["/site/a.xml".to_string()]);
        repo.write_file("/site/a.xml", "<y/>").expect("still locked");
        repo.unlock("/site/a.xml").expect("unlock");
    }
}
