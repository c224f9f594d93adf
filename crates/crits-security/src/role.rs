//! ---
//! crits_section: "06-security-access-control"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Role records, permission bundles, and source ACLs."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crits_logging::{crits_debug, crits_warn, LogContext};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::acl::{SourceAcl, SourceAclField};
use crate::path::{PermissionEntry, PermissionPath};
use crate::permission::{Permission, PermissionSet};
use crate::registry::SourceRegistry;
use crate::tlo::{TloAccess, TloField, TloPermissions, TloType};
use crate::{Result, RoleError};

/// Stable role identifier.
pub type RoleId = Uuid;

/// Schema version written by this build.
pub const LATEST_SCHEMA_VERSION: u32 = 1;

/// Identity and metadata fields that blanket grants and permission paths never touch.
pub const PROTECTED_FIELDS: &[&str] = &[
    "id",
    "name",
    "active",
    "schema_version",
    "unsupported_attrs",
];

const FIELD_SOURCES: &str = "sources";
const FIELD_PERMISSIONS: &str = "permissions";
const FIELD_SCHEMA_VERSION: &str = "schema_version";

fn default_active() -> String {
    "on".to_owned()
}

/// How `add_source` reacts to a name the registry does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddSourcePolicy {
    /// Skip silently, matching bulk-import behaviour.
    #[default]
    Lenient,
    /// Fail with [`RoleError::SourceNotFound`].
    Strict,
}

/// What a call to `add_source` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddSourceOutcome {
    /// A new, fully denied ACL entry was appended.
    Added,
    /// The role already had an entry for the source; nothing changed.
    AlreadyPresent,
    /// The registry does not know the source; nothing changed.
    Skipped,
}

/// Named bundle of permission grants assignable to users.
///
/// Fields other than identity and metadata are reachable through
/// [`Role::permission_entries`] and [`Role::set_permission`], and every
/// mutation records the top-level field it touched in a change set that the
/// persistence layer consults before writing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Stable identifier. Legacy records without one get a fresh id on load.
    #[serde(default = "Uuid::new_v4")]
    pub id: RoleId,
    /// Human readable name, unique across roles by convention.
    pub name: String,
    /// Soft enable flag; only `"on"` counts as active.
    #[serde(default = "default_active")]
    pub active: String,
    #[serde(default)]
    sources: Vec<SourceAcl>,
    #[serde(default)]
    permissions: PermissionSet,
    #[serde(default)]
    tlos: TloPermissions,
    /// Schema version the record was written with. Records predating versioning load as 0.
    #[serde(default)]
    pub schema_version: u32,
    /// Top-level keys this build does not understand, kept so saving does not lose them.
    #[serde(flatten)]
    pub unsupported_attrs: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    changed: BTreeSet<&'static str>,
}

impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.active == other.active
            && self.sources == other.sources
            && self.permissions == other.permissions
            && self.tlos == other.tlos
            && self.schema_version == other.schema_version
            && self.unsupported_attrs == other.unsupported_attrs
    }
}

impl Eq for Role {}

impl Role {
    /// Deny-by-default role at the latest schema version.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            active: default_active(),
            sources: Vec::new(),
            permissions: PermissionSet::default(),
            tlos: TloPermissions::default(),
            schema_version: LATEST_SCHEMA_VERSION,
            unsupported_attrs: BTreeMap::new(),
            changed: BTreeSet::new(),
        }
    }

    /// Role with every registry source attached and every permission granted.
    pub fn administrator<R>(name: impl Into<String>, registry: &R) -> Self
    where
        R: SourceRegistry + ?Sized,
    {
        let mut role = Self::new(name);
        role.add_all_sources(registry);
        role.make_all_true();
        role
    }

    /// Role that can see everything but change nothing: every registry source
    /// with read access, plus every flag and bundle field that only grants
    /// visibility.
    pub fn read_only<R>(name: impl Into<String>, registry: &R) -> Self
    where
        R: SourceRegistry + ?Sized,
    {
        let mut role = Self::new(name);
        role.add_all_sources(registry);
        for acl in &mut role.sources {
            acl.set(SourceAclField::Read, true);
        }
        for permission in Permission::iter().filter(Permission::is_read) {
            role.permissions.set(permission, true);
        }
        for kind in TloType::iter() {
            let mut access = role.tlo(kind);
            access.grant_where(TloField::is_read);
            role.set_tlo(access);
        }
        role
    }

    /// Whether the soft enable flag is on.
    pub fn is_active(&self) -> bool {
        self.active == "on"
    }

    /// Source ACL entries in the order they were added.
    pub fn sources(&self) -> &[SourceAcl] {
        &self.sources
    }

    /// ACL entry for a source, if the role has one.
    pub fn source(&self, name: &str) -> Option<&SourceAcl> {
        self.sources.iter().find(|acl| acl.name == name)
    }

    /// Whether the role has an ACL entry for `name`.
    pub fn has_source(&self, name: &str) -> bool {
        self.source(name).is_some()
    }

    /// Flat permission flags.
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Value of a flat flag.
    pub fn flag(&self, permission: Permission) -> bool {
        self.permissions.get(permission)
    }

    /// Set a flat flag.
    pub fn set_flag(&mut self, permission: Permission, value: bool) {
        self.permissions.set(permission, value);
        self.mark_changed(FIELD_PERMISSIONS);
    }

    /// Copy of the bundle for `kind`. Mutate it and hand it back with [`Role::set_tlo`].
    pub fn tlo(&self, kind: TloType) -> TloAccess {
        self.tlos.get(kind).clone()
    }

    /// Replace the bundle for the access object's TLO type.
    pub fn set_tlo(&mut self, access: TloAccess) {
        let field = access.kind().key();
        self.tlos.replace(access);
        self.mark_changed(field);
    }

    /// Top-level fields modified since the record was built, loaded, or last cleared.
    pub fn changed_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.changed.iter().copied()
    }

    /// Whether any field has been modified.
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Forget recorded modifications, typically after a successful save.
    pub fn clear_changes(&mut self) {
        self.changed.clear();
    }

    fn mark_changed(&mut self, field: &'static str) {
        self.changed.insert(field);
    }

    fn log_context(&self) -> LogContext<'_> {
        LogContext::new().with_role(&self.name)
    }

    /// Bring a loaded record up to [`LATEST_SCHEMA_VERSION`].
    ///
    /// Safe to call on every load. Version 1 is the first versioned schema, so
    /// upgrading only stamps the version; missing flags and bundles already
    /// load denied. Records from a newer schema are left as they are.
    pub fn migrate(&mut self) {
        match self.schema_version.cmp(&LATEST_SCHEMA_VERSION) {
            Ordering::Less => {
                crits_debug!(
                    context = self.log_context().with_operation("migrate"),
                    "upgrading role schema from {} to {}",
                    self.schema_version,
                    LATEST_SCHEMA_VERSION
                );
                self.schema_version = LATEST_SCHEMA_VERSION;
                self.mark_changed(FIELD_SCHEMA_VERSION);
            }
            Ordering::Equal => {}
            Ordering::Greater => {
                crits_warn!(
                    context = self.log_context().with_operation("migrate"),
                    "role schema version {} is newer than supported version {}",
                    self.schema_version,
                    LATEST_SCHEMA_VERSION
                );
            }
        }
    }

    /// Grant every permission-bearing field.
    ///
    /// Walks every TLO bundle, every source ACL, and every flat flag without
    /// naming any of them, so newly declared permissions are covered
    /// automatically. Identity and metadata fields are untouched. Idempotent.
    pub fn make_all_true(&mut self) {
        for kind in TloType::iter() {
            let mut access = self.tlo(kind);
            access.grant_all();
            self.set_tlo(access);
        }

        if !self.sources.is_empty() {
            for acl in &mut self.sources {
                acl.grant_all();
            }
            self.mark_changed(FIELD_SOURCES);
        }

        self.permissions.grant_all();
        self.mark_changed(FIELD_PERMISSIONS);

        crits_debug!(
            context = self.log_context().with_operation("make_all_true"),
            "granted every permission"
        );
    }

    /// Attach a source ACL, skipping names the registry does not know.
    ///
    /// An existing entry is never overwritten. New entries start fully denied.
    pub fn add_source<R>(&mut self, registry: &R, source: &str) -> AddSourceOutcome
    where
        R: SourceRegistry + ?Sized,
    {
        match self.add_source_with(registry, source, AddSourcePolicy::Lenient) {
            Ok(outcome) => outcome,
            // Lenient mode reports unknown sources as `Skipped`.
            Err(_) => AddSourceOutcome::Skipped,
        }
    }

    /// Attach a source ACL, reacting to unknown names according to `policy`.
    pub fn add_source_with<R>(
        &mut self,
        registry: &R,
        source: &str,
        policy: AddSourcePolicy,
    ) -> Result<AddSourceOutcome>
    where
        R: SourceRegistry + ?Sized,
    {
        if self.has_source(source) {
            return Ok(AddSourceOutcome::AlreadyPresent);
        }

        if registry.lookup(source).is_none() {
            let ctx = self
                .log_context()
                .with_source(source)
                .with_operation("add_source");
            return match policy {
                AddSourcePolicy::Lenient => {
                    crits_debug!(context = ctx, "source not in registry; skipping");
                    Ok(AddSourceOutcome::Skipped)
                }
                AddSourcePolicy::Strict => {
                    crits_warn!(context = ctx, "source not in registry");
                    Err(RoleError::SourceNotFound(source.to_owned()))
                }
            };
        }

        self.sources.push(SourceAcl::new(source));
        self.mark_changed(FIELD_SOURCES);
        crits_debug!(
            context = self
                .log_context()
                .with_source(source)
                .with_operation("add_source"),
            "source ACL attached"
        );
        Ok(AddSourceOutcome::Added)
    }

    /// Ensure the role has an ACL entry for every registry source. Returns the number added.
    pub fn add_all_sources<R>(&mut self, registry: &R) -> usize
    where
        R: SourceRegistry + ?Sized,
    {
        let mut added = 0;
        for record in registry.list_all() {
            if self.add_source(registry, &record.name) == AddSourceOutcome::Added {
                added += 1;
            }
        }
        added
    }

    /// Drop the ACL entry for `name`. Returns whether one existed.
    pub fn remove_source(&mut self, name: &str) -> bool {
        let before = self.sources.len();
        self.sources.retain(|acl| acl.name != name);
        let removed = self.sources.len() != before;
        if removed {
            self.mark_changed(FIELD_SOURCES);
        }
        removed
    }

    /// Read a permission by path (see [`PermissionPath`]).
    pub fn permission(&self, path: &str) -> Result<bool> {
        match path.parse::<PermissionPath>()? {
            PermissionPath::Flag(permission) => Ok(self.flag(permission)),
            PermissionPath::Tlo(kind, field) => self.tlos.get(kind).get(field),
            PermissionPath::Source { name, field } => self
                .source(&name)
                .map(|acl| acl.get(field))
                .ok_or(RoleError::UnknownSourceAcl(name)),
        }
    }

    /// Write a permission by path (see [`PermissionPath`]).
    pub fn set_permission(&mut self, path: &str, value: bool) -> Result<()> {
        match path.parse::<PermissionPath>()? {
            PermissionPath::Flag(permission) => self.set_flag(permission, value),
            PermissionPath::Tlo(kind, field) => {
                let mut access = self.tlo(kind);
                access.set(field, value)?;
                self.set_tlo(access);
            }
            PermissionPath::Source { name, field } => {
                let acl = self
                    .sources
                    .iter_mut()
                    .find(|acl| acl.name == name)
                    .ok_or(RoleError::UnknownSourceAcl(name))?;
                acl.set(field, value);
                self.mark_changed(FIELD_SOURCES);
            }
        }
        Ok(())
    }

    /// Every permission-bearing field with its current value, grouped for display.
    pub fn permission_entries(&self) -> Vec<PermissionEntry> {
        let flags = self.permissions.iter().map(|(permission, value)| PermissionEntry {
            path: PermissionPath::Flag(permission).to_string(),
            group: permission.group().to_string(),
            value,
        });
        let bundles = self.tlos.iter().flat_map(|access| {
            let kind = access.kind();
            access.iter().map(move |(field, value)| PermissionEntry {
                path: PermissionPath::Tlo(kind, field).to_string(),
                group: kind.key().to_owned(),
                value,
            })
        });
        let sources = self.sources.iter().flat_map(|acl| {
            SourceAclField::iter().map(move |field| PermissionEntry {
                path: PermissionPath::Source {
                    name: acl.name.clone(),
                    field,
                }
                .to_string(),
                group: "Sources".to_owned(),
                value: acl.get(field),
            })
        });
        bundles.chain(flags).chain(sources).collect()
    }

    /// Whether every permission-bearing field is granted.
    pub fn all_granted(&self) -> bool {
        self.permission_entries().iter().all(|entry| entry.value)
    }
}
