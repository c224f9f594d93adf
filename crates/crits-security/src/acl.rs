//! ---
//! crits_section: "06-security-access-control"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Role records, permission bundles, and source ACLs."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Grantable fields of a [`SourceAcl`]. `name` is identity and deliberately absent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum SourceAclField {
    /// See data attributed to the source.
    Read,
    /// Attribute data to the source.
    Write,
}

impl SourceAclField {
    /// Snake-case key of the field.
    pub fn key(&self) -> &'static str {
        self.into()
    }
}

/// Read/write grant for one data source, embedded in a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAcl {
    /// Source name, matched case-sensitively.
    pub name: String,
    /// See data attributed to the source.
    #[serde(default)]
    pub read: bool,
    /// Attribute data to the source.
    #[serde(default)]
    pub write: bool,
}

impl SourceAcl {
    /// New entry with every grant denied.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            read: false,
            write: false,
        }
    }

    /// Current value of a grant.
    pub fn get(&self, field: SourceAclField) -> bool {
        match field {
            SourceAclField::Read => self.read,
            SourceAclField::Write => self.write,
        }
    }

    /// Set a grant.
    pub fn set(&mut self, field: SourceAclField, value: bool) {
        match field {
            SourceAclField::Read => self.read = value,
            SourceAclField::Write => self.write = value,
        }
    }

    /// Grant every field except the name.
    pub fn grant_all(&mut self) {
        for field in SourceAclField::iter() {
            self.set(field, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_is_denied() {
        let acl = SourceAcl::new("feed1");
        assert_eq!(acl.name, "feed1");
        assert!(SourceAclField::iter().all(|field| !acl.get(field)));
    }

    #[test]
    fn grant_all_keeps_name() {
        let mut acl = SourceAcl::new("feed1");
        acl.grant_all();
        assert!(acl.read && acl.write);
        assert_eq!(acl.name, "feed1");
    }

    #[test]
    fn missing_grants_deserialize_denied() {
        let acl: SourceAcl = serde_json::from_str(r#"{"name":"feed2","write":true}"#).unwrap();
        assert!(!acl.read);
        assert!(acl.write);
    }
}
