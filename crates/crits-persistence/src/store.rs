//! ---
//! crits_section: "03-persistence-logging"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Persistence abstractions and storage bindings."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use crits_common::config::{StoreConfig, StoreFormat};
use crits_security::{Role, RoleId};
use tracing::{debug, info, warn};

use crate::document::{load_document, save_document};
use crate::{PersistenceError, Result};

/// Directory of role documents, one file per role named after its id.
#[derive(Debug, Clone)]
pub struct RoleStore {
    directory: PathBuf,
    format: StoreFormat,
}

impl RoleStore {
    /// Open (creating if needed) the store described by configuration.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        Self::new(&config.directory, config.format)
    }

    /// Open (creating if needed) a store rooted at `directory`.
    pub fn new(directory: impl AsRef<Path>, format: StoreFormat) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        debug!(directory = %directory.display(), ?format, "role store opened");
        Ok(Self { directory, format })
    }

    /// Root directory of the store.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, id: RoleId) -> PathBuf {
        self.directory
            .join(format!("{}.{}", id, self.format.extension()))
    }

    /// Every stored role, migrated to the latest schema and sorted by name.
    ///
    /// Documents that cannot be read or fail verification are skipped with a
    /// warning so one damaged file does not hide the rest of the store; see
    /// [`RoleStore::damaged`].
    pub fn list(&self) -> Result<Vec<Role>> {
        let mut roles = Vec::new();
        for path in self.document_paths()? {
            match load_document(&path) {
                Ok(mut role) => {
                    role.migrate();
                    roles.push(role);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable role document");
                }
            }
        }
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    /// Documents in the store that cannot be loaded, with the reason.
    pub fn damaged(&self) -> Result<Vec<(PathBuf, PersistenceError)>> {
        let mut damaged = Vec::new();
        for path in self.document_paths()? {
            if let Err(err) = load_document(&path) {
                damaged.push((path, err));
            }
        }
        Ok(damaged)
    }

    fn document_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let matches_format = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == self.format.extension());
            if path.is_file() && matches_format {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Role with the given name, if stored.
    pub fn find(&self, name: &str) -> Result<Option<Role>> {
        Ok(self.list()?.into_iter().find(|role| role.name == name))
    }

    /// Role with the given name.
    pub fn load(&self, name: &str) -> Result<Role> {
        self.find(name)?
            .ok_or_else(|| PersistenceError::RoleNotFound(name.to_owned()))
    }

    /// Store a new role. Fails when another role already uses the name.
    pub fn insert(&self, role: &mut Role) -> Result<()> {
        if self.find(&role.name)?.is_some() {
            return Err(PersistenceError::RoleExists(role.name.clone()));
        }
        self.write(role)?;
        info!(role = %role.name, id = %role.id, "role created");
        Ok(())
    }

    /// Write a role, replacing the stored copy with the same id.
    ///
    /// Fails when a different role already uses the name. Clears the role's
    /// change set once written.
    pub fn save(&self, role: &mut Role) -> Result<()> {
        if let Some(existing) = self.find(&role.name)? {
            if existing.id != role.id {
                return Err(PersistenceError::RoleExists(role.name.clone()));
            }
        }
        self.write(role)
    }

    fn write(&self, role: &mut Role) -> Result<()> {
        let changed: Vec<_> = role.changed_fields().collect();
        save_document(role, &self.path_for(role.id))?;
        debug!(role = %role.name, ?changed, "role written");
        role.clear_changes();
        Ok(())
    }

    /// Remove a role by name, returning the removed record.
    pub fn delete(&self, name: &str) -> Result<Role> {
        let role = self.load(name)?;
        fs::remove_file(self.path_for(role.id))?;
        info!(role = %role.name, id = %role.id, "role deleted");
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn insert_then_load_by_name() {
        let dir = tempdir().unwrap();
        let store = RoleStore::new(dir.path(), StoreFormat::Json).unwrap();
        let mut role = Role::new("Analyst");
        role.set_permission("recent_activity_read", true).unwrap();

        store.insert(&mut role).unwrap();
        assert!(!role.is_changed());

        let loaded = store.load("Analyst").unwrap();
        assert_eq!(loaded, role);
        assert!(matches!(
            store.load("Missing"),
            Err(PersistenceError::RoleNotFound(_))
        ));
    }

    #[test]
    fn names_stay_unique() {
        let dir = tempdir().unwrap();
        let store = RoleStore::new(dir.path(), StoreFormat::Cbor).unwrap();
        store.insert(&mut Role::new("Analyst")).unwrap();

        assert!(matches!(
            store.insert(&mut Role::new("Analyst")),
            Err(PersistenceError::RoleExists(_))
        ));

        let mut other = Role::new("Other");
        store.insert(&mut other).unwrap();
        other.name = "Analyst".into();
        assert!(matches!(
            store.save(&mut other),
            Err(PersistenceError::RoleExists(_))
        ));
    }

    #[test]
    fn list_sorts_and_delete_removes() {
        let dir = tempdir().unwrap();
        let store = RoleStore::new(dir.path(), StoreFormat::Json).unwrap();
        for name in ["Read Only", "Administrator", "Analyst"] {
            store.insert(&mut Role::new(name)).unwrap();
        }
        let names: Vec<_> = store.list().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Administrator", "Analyst", "Read Only"]);

        store.delete("Analyst").unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn damaged_document_does_not_hide_other_roles() {
        let dir = tempdir().unwrap();
        let store = RoleStore::new(dir.path(), StoreFormat::Json).unwrap();
        store.insert(&mut Role::new("Healthy")).unwrap();
        fs::write(dir.path().join("garbage.json"), "{ not json").unwrap();

        assert_eq!(store.load("Healthy").unwrap().name, "Healthy");
        store.insert(&mut Role::new("Another")).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);

        let damaged = store.damaged().unwrap();
        assert_eq!(damaged.len(), 1);
        assert!(damaged[0].0.ends_with("garbage.json"));
        assert!(matches!(damaged[0].1, PersistenceError::Json(_)));
    }

    #[test]
    fn legacy_documents_are_migrated_on_load() {
        let dir = tempdir().unwrap();
        let store = RoleStore::new(dir.path(), StoreFormat::Json).unwrap();
        let mut role = Role::new("Legacy");
        role.schema_version = 0;
        store.insert(&mut role).unwrap();

        let loaded = store.load("Legacy").unwrap();
        assert_eq!(loaded.schema_version, crits_security::LATEST_SCHEMA_VERSION);
        assert!(loaded.changed_fields().any(|field| field == "schema_version"));
    }
}
