//! ---
//! crits_section: "06-security-access-control"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Role records, permission bundles, and source ACLs."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
//! Role-based access control records for the CRITs platform.
//!
//! A [`Role`] aggregates a flat set of boolean [`Permission`] flags, one
//! [`TloAccess`] bundle per top-level object type, and an ordered list of
//! per-source [`SourceAcl`] grants. Every permission-bearing field is
//! enumerable, so blanket operations such as [`Role::make_all_true`] never
//! name individual flags.
#![warn(missing_docs)]

pub mod acl;
pub mod metrics;
pub mod path;
pub mod permission;
pub mod registry;
pub mod role;
pub mod tlo;

pub use acl::{SourceAcl, SourceAclField};
pub use metrics::RoleMetrics;
pub use path::{PermissionEntry, PermissionPath};
pub use permission::{Permission, PermissionGroup, PermissionSet};
pub use registry::{InMemorySourceRegistry, SourceRecord, SourceRegistry};
pub use role::{AddSourceOutcome, AddSourcePolicy, Role, RoleId, LATEST_SCHEMA_VERSION};
pub use tlo::{TloAccess, TloField, TloPermissions, TloType};

/// Result alias used throughout the security crate.
pub type Result<T> = std::result::Result<T, RoleError>;

/// Errors raised while reading or mutating a role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleError {
    /// Strict `add_source` was asked for a source the registry does not know.
    #[error("source not found in registry: {0}")]
    SourceNotFound(String),
    /// A permission path does not name any permission-bearing field.
    #[error("unknown permission: {0}")]
    UnknownPermission(String),
    /// Identity and metadata fields cannot be changed through permission paths.
    #[error("field is not a permission and cannot be changed: {0}")]
    ProtectedField(String),
    /// The role carries no ACL entry for the named source.
    #[error("role has no ACL for source: {0}")]
    UnknownSourceAcl(String),
    /// The field exists but is not declared for this top-level object bundle.
    #[error("field {field} is not part of the {bundle} bundle")]
    FieldNotInBundle {
        /// Bundle (top-level object type) name.
        bundle: String,
        /// Offending field name.
        field: String,
    },
}
