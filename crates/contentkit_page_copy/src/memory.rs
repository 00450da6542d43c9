//! In-memory content repository.
//!
//! Backs tests and embedders that stage content before handing it to a real
//! store. Locks are tracked per path for the calling session; a lock held by
//! "another user" can be simulated with [`MemoryRepository::lock_as_other`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::conf::{C_LOCALE_DEFAULT, C_PROPERTY_LOCALE};
use crate::repo::{ContentRepository, LocaleResolver};
use crate::spec::{RepositoryError, SpecResource, SpecResourceType};
use crate::util::derive_parent_path;

/// Property naming a folder's default file.
pub const C_PROPERTY_DEFAULT_FILE: &str = "default-file";
/// Default file name used when a folder sets no `default-file`.
pub const C_NAME_DEFAULT_FILE: &str = "index.html";
/// Type name of plain folders.
pub const C_TYPE_FOLDER: &str = "folder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumLockOwner {
    Session,
    Other,
}

#[derive(Debug, Clone)]
struct EntryResource {
    resource: SpecResource,
    properties: BTreeMap<String, String>,
    content: String,
    owner_lock: Option<EnumLockOwner>,
    n_revision: u64,
}

#[derive(Debug, Default)]
struct StateMemory {
    dict_entries: BTreeMap<String, EntryResource>,
    dict_paths_by_id: HashMap<Uuid, String>,
    dict_types: BTreeMap<u32, SpecResourceType>,
}

impl StateMemory {
    fn entry(&self, path_root: &str) -> Result<&EntryResource, RepositoryError> {
        self.dict_entries
            .get(path_root)
            .ok_or_else(|| RepositoryError::NotFound(path_root.to_string()))
    }

    fn entry_locked_mut(&mut self, path_root: &str) -> Result<&mut EntryResource, RepositoryError> {
        let entry = self
            .dict_entries
            .get_mut(path_root)
            .ok_or_else(|| RepositoryError::NotFound(path_root.to_string()))?;
        match entry.owner_lock {
            Some(EnumLockOwner::Session) => Ok(entry),
            Some(EnumLockOwner::Other) => Err(RepositoryError::LockedByOther(path_root.to_string())),
            None => Err(RepositoryError::NotLocked(path_root.to_string())),
        }
    }

    fn type_id_by_name(&self, name_type: &str) -> Option<u32> {
        self.dict_types
            .values()
            .find(|t| t.name_type == name_type)
            .map(|t| t.id_type)
    }

    fn register_type(&mut self, name_type: &str, if_folder: bool) -> u32 {
        if let Some(id_type) = self.type_id_by_name(name_type) {
            return id_type;
        }
        let id_type = self
            .dict_types
            .keys()
            .next_back()
            .map(|n| n + 1)
            .unwrap_or(0);
        self.dict_types.insert(
            id_type,
            SpecResourceType {
                id_type,
                name_type: name_type.to_string(),
                if_folder,
            },
        );
        id_type
    }

    fn check_parent(&self, path_root: &str) -> Result<(), RepositoryError> {
        let Some(path_parent) = derive_parent_path(path_root) else {
            return Err(RepositoryError::AlreadyExists(path_root.to_string()));
        };
        let parent = self.entry(&path_parent)?;
        if !parent.resource.if_folder {
            return Err(RepositoryError::NotAFolder(path_parent));
        }
        Ok(())
    }

    fn insert(
        &mut self,
        path_root: &str,
        id_type: u32,
        if_folder: bool,
        properties: BTreeMap<String, String>,
        content: String,
    ) -> Result<SpecResource, RepositoryError> {
        if self.dict_entries.contains_key(path_root) {
            return Err(RepositoryError::AlreadyExists(path_root.to_string()));
        }
        self.check_parent(path_root)?;
        let resource = SpecResource {
            id_structure: Uuid::new_v4(),
            path_root: path_root.to_string(),
            id_type,
            if_folder,
        };
        self.dict_paths_by_id
            .insert(resource.id_structure, path_root.to_string());
        self.dict_entries.insert(
            path_root.to_string(),
            EntryResource {
                resource: resource.clone(),
                properties,
                content,
                owner_lock: None,
                n_revision: 0,
            },
        );
        Ok(resource)
    }
}

/// Content repository kept entirely in memory.
#[derive(Debug)]
pub struct MemoryRepository {
    state: Mutex<StateMemory>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    /// Empty repository containing only the root folder `/`.
    pub fn new() -> Self {
        let mut state = StateMemory::default();
        let id_type = state.register_type(C_TYPE_FOLDER, true);
        let resource = SpecResource {
            id_structure: Uuid::new_v4(),
            path_root: "/".to_string(),
            id_type,
            if_folder: true,
        };
        state
            .dict_paths_by_id
            .insert(resource.id_structure, "/".to_string());
        state.dict_entries.insert(
            "/".to_string(),
            EntryResource {
                resource,
                properties: BTreeMap::new(),
                content: String::new(),
                owner_lock: None,
                n_revision: 0,
            },
        );
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, StateMemory> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a resource type by name; returns the existing id if known.
    pub fn register_type(&self, name_type: &str, if_folder: bool) -> u32 {
        self.state().register_type(name_type, if_folder)
    }

    /// Stage a folder (path must end with `/`).
    pub fn add_folder(
        &self,
        path_root: &str,
        properties: &[(&str, &str)],
    ) -> Result<SpecResource, RepositoryError> {
        let mut state = self.state();
        let id_type = state.register_type(C_TYPE_FOLDER, true);
        state.insert(
            path_root,
            id_type,
            true,
            to_property_map(properties),
            String::new(),
        )
    }

    /// Stage a file of type `name_type`.
    pub fn add_file(
        &self,
        path_root: &str,
        name_type: &str,
        content: &str,
        properties: &[(&str, &str)],
    ) -> Result<SpecResource, RepositoryError> {
        let mut state = self.state();
        let id_type = state.register_type(name_type, false);
        state.insert(
            path_root,
            id_type,
            false,
            to_property_map(properties),
            content.to_string(),
        )
    }

    /// Simulate a lock held by another user.
    pub fn lock_as_other(&self, path_root: &str) -> Result<(), RepositoryError> {
        let mut state = self.state();
        let entry = state
            .dict_entries
            .get_mut(path_root)
            .ok_or_else(|| RepositoryError::NotFound(path_root.to_string()))?;
        entry.owner_lock = Some(EnumLockOwner::Other);
        Ok(())
    }

    /// Whether any lock is held on `path_root`.
    pub fn is_locked(&self, path_root: &str) -> bool {
        self.state()
            .dict_entries
            .get(path_root)
            .is_some_and(|e| e.owner_lock.is_some())
    }

    /// Paths locked by this session.
    pub fn session_locks(&self) -> Vec<String> {
        self.state()
            .dict_entries
            .iter()
            .filter(|(_, e)| e.owner_lock == Some(EnumLockOwner::Session))
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Number of content writes applied to `path_root`.
    pub fn revision(&self, path_root: &str) -> Option<u64> {
        self.state()
            .dict_entries
            .get(path_root)
            .map(|e| e.n_revision)
    }

    /// One property value, if set directly on the resource.
    pub fn property(&self, path_root: &str, name: &str) -> Option<String> {
        self.state()
            .dict_entries
            .get(path_root)
            .and_then(|e| e.properties.get(name).cloned())
    }

    /// All resource paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.state().dict_entries.keys().cloned().collect()
    }
}

fn to_property_map(properties: &[(&str, &str)]) -> BTreeMap<String, String> {
    properties
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl ContentRepository for MemoryRepository {
    fn read_resource(&self, path_root: &str) -> Result<SpecResource, RepositoryError> {
        Ok(self.state().entry(path_root)?.resource.clone())
    }

    fn read_resource_by_id(&self, id_structure: Uuid) -> Result<SpecResource, RepositoryError> {
        let state = self.state();
        let path_root = state
            .dict_paths_by_id
            .get(&id_structure)
            .ok_or(RepositoryError::NotFoundId(id_structure))?;
        Ok(state.entry(path_root)?.resource.clone())
    }

    fn exists(&self, path_root: &str) -> bool {
        self.state().dict_entries.contains_key(path_root)
    }

    fn read_children(&self, path_folder: &str) -> Result<Vec<SpecResource>, RepositoryError> {
        let state = self.state();
        if !state.entry(path_folder)?.resource.if_folder {
            return Err(RepositoryError::NotAFolder(path_folder.to_string()));
        }
        Ok(state
            .dict_entries
            .range(path_folder.to_string()..)
            .take_while(|(p, _)| p.starts_with(path_folder))
            .filter(|(p, _)| derive_parent_path(p).as_deref() == Some(path_folder))
            .map(|(_, e)| e.resource.clone())
            .collect())
    }

    fn read_default_file(
        &self,
        path_folder: &str,
    ) -> Result<Option<SpecResource>, RepositoryError> {
        let state = self.state();
        let folder = state.entry(path_folder)?;
        if !folder.resource.if_folder {
            return Err(RepositoryError::NotAFolder(path_folder.to_string()));
        }
        let name_default = folder
            .properties
            .get(C_PROPERTY_DEFAULT_FILE)
            .map(String::as_str)
            .unwrap_or(C_NAME_DEFAULT_FILE);
        let path_default = format!("{path_folder}{name_default}");
        Ok(state
            .dict_entries
            .get(&path_default)
            .map(|e| e.resource.clone()))
    }

    fn resolve_type(&self, id_type: u32) -> Result<SpecResourceType, RepositoryError> {
        self.state()
            .dict_types
            .get(&id_type)
            .cloned()
            .ok_or(RepositoryError::UnknownType(id_type))
    }

    fn read_properties(
        &self,
        path_root: &str,
    ) -> Result<BTreeMap<String, String>, RepositoryError> {
        Ok(self.state().entry(path_root)?.properties.clone())
    }

    fn write_property(
        &self,
        path_root: &str,
        name: &str,
        value: &str,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state();
        let entry = state.entry_locked_mut(path_root)?;
        entry.properties.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_property(&self, path_root: &str, name: &str) -> Result<(), RepositoryError> {
        let mut state = self.state();
        let entry = state.entry_locked_mut(path_root)?;
        entry.properties.remove(name);
        Ok(())
    }

    fn create_folder(
        &self,
        path_root: &str,
        id_type: u32,
        properties: &BTreeMap<String, String>,
    ) -> Result<SpecResource, RepositoryError> {
        let mut state = self.state();
        let cfg_type = state
            .dict_types
            .get(&id_type)
            .ok_or(RepositoryError::UnknownType(id_type))?;
        if !cfg_type.if_folder || !path_root.ends_with('/') {
            return Err(RepositoryError::NotAFolder(path_root.to_string()));
        }
        state.insert(path_root, id_type, true, properties.clone(), String::new())
    }

    fn copy_resource(
        &self,
        path_src: &str,
        path_dst: &str,
    ) -> Result<SpecResource, RepositoryError> {
        let mut state = self.state();
        let entry_src = state.entry(path_src)?.clone();
        state.insert(
            path_dst,
            entry_src.resource.id_type,
            entry_src.resource.if_folder,
            entry_src.properties,
            entry_src.content,
        )
    }

    fn read_file(&self, path_root: &str) -> Result<String, RepositoryError> {
        Ok(self.state().entry(path_root)?.content.clone())
    }

    fn write_file(&self, path_root: &str, content: &str) -> Result<(), RepositoryError> {
        let mut state = self.state();
        let entry = state.entry_locked_mut(path_root)?;
        entry.content = content.to_string();
        entry.n_revision += 1;
        Ok(())
    }

    fn lock(&self, path_root: &str) -> Result<bool, RepositoryError> {
        let mut state = self.state();
        let entry = state
            .dict_entries
            .get_mut(path_root)
            .ok_or_else(|| RepositoryError::NotFound(path_root.to_string()))?;
        match entry.owner_lock {
            Some(EnumLockOwner::Other) => {
                Err(RepositoryError::LockedByOther(path_root.to_string()))
            }
            Some(EnumLockOwner::Session) => Ok(false),
            None => {
                entry.owner_lock = Some(EnumLockOwner::Session);
                Ok(true)
            }
        }
    }

    fn unlock(&self, path_root: &str) -> Result<(), RepositoryError> {
        let mut state = self.state();
        let entry = state
            .dict_entries
            .get_mut(path_root)
            .ok_or_else(|| RepositoryError::NotFound(path_root.to_string()))?;
        match entry.owner_lock {
            Some(EnumLockOwner::Session) => {
                entry.owner_lock = None;
                Ok(())
            }
            Some(EnumLockOwner::Other) => Err(RepositoryError::LockedByOther(path_root.to_string())),
            None => Err(RepositoryError::NotLocked(path_root.to_string())),
        }
    }
}

impl LocaleResolver for MemoryRepository {
    fn default_locale(&self, path_root: &str) -> Result<String, RepositoryError> {
        let state = self.state();
        state.entry(path_root)?;
        let mut path_cursor = Some(path_root.to_string());
        while let Some(path_current) = path_cursor {
            if let Some(c_locale) = state
                .dict_entries
                .get(&path_current)
                .and_then(|e| e.properties.get(C_PROPERTY_LOCALE))
            {
                return Ok(c_locale.clone());
            }
            path_cursor = derive_parent_path(&path_current);
        }
        Ok(C_LOCALE_DEFAULT.to_string())
    }
}
