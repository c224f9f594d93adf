//! ---
//! crits_section: "06-security-access-control"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Role records, permission bundles, and source ACLs."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
//! Addressing of individual permission-bearing fields by string path.
//!
//! * `control_panel_read` - a flat [`Permission`] flag
//! * `Actor.comments_add` - a field of a TLO bundle
//! * `sources.feed1.read` - a grant on a source ACL entry
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::acl::SourceAclField;
use crate::permission::Permission;
use crate::role::PROTECTED_FIELDS;
use crate::tlo::{TloField, TloType};
use crate::RoleError;

const SOURCES_PREFIX: &str = "sources.";

/// Parsed permission path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionPath {
    /// Flat role flag.
    Flag(Permission),
    /// Field of a TLO bundle.
    Tlo(TloType, TloField),
    /// Grant on a source ACL entry.
    Source {
        /// Source name.
        name: String,
        /// Grant field.
        field: SourceAclField,
    },
}

impl FromStr for PermissionPath {
    type Err = RoleError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        if PROTECTED_FIELDS.contains(&path) || path == "sources" {
            return Err(RoleError::ProtectedField(path.to_owned()));
        }

        if let Some(rest) = path.strip_prefix(SOURCES_PREFIX) {
            // Source names may contain dots; the grant is always the last segment.
            let (name, field) = rest
                .rsplit_once('.')
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| RoleError::UnknownPermission(path.to_owned()))?;
            if field == "name" {
                return Err(RoleError::ProtectedField(path.to_owned()));
            }
            let field = SourceAclField::from_str(field)
                .map_err(|_| RoleError::UnknownPermission(path.to_owned()))?;
            return Ok(PermissionPath::Source {
                name: name.to_owned(),
                field,
            });
        }

        if let Some((bundle, field)) = path.split_once('.') {
            let kind = TloType::from_str(bundle)
                .map_err(|_| RoleError::UnknownPermission(path.to_owned()))?;
            let field = TloField::from_str(field)
                .map_err(|_| RoleError::UnknownPermission(path.to_owned()))?;
            if !field.applies_to(kind) {
                return Err(RoleError::FieldNotInBundle {
                    bundle: kind.key().to_owned(),
                    field: field.key().to_owned(),
                });
            }
            return Ok(PermissionPath::Tlo(kind, field));
        }

        Permission::from_str(path)
            .map(PermissionPath::Flag)
            .map_err(|_| RoleError::UnknownPermission(path.to_owned()))
    }
}

impl fmt::Display for PermissionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionPath::Flag(permission) => f.write_str(permission.key()),
            PermissionPath::Tlo(kind, field) => write!(f, "{}.{}", kind.key(), field.key()),
            PermissionPath::Source { name, field } => {
                write!(f, "{SOURCES_PREFIX}{name}.{}", field.key())
            }
        }
    }
}

/// One row of a permission-editing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionEntry {
    /// Path accepted by [`crate::Role::set_permission`].
    pub path: String,
    /// Section heading the entry is listed under.
    pub group: String,
    /// Current value.
    pub value: bool,
}
