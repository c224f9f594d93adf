//! ---
//! crits_section: "06-security-access-control"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Role records, permission bundles, and source ACLs."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::warn;

/// Role-wide permission flags.
///
/// Adding a variant is all it takes to introduce a new flag: every role picks
/// it up denied, the permission form lists it, and [`PermissionSet::grant_all`]
/// grants it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    /// Create new actor identifier types.
    AddNewActorIdentifierType,
    /// Create new backdoor names.
    AddNewBackdoor,
    /// Create new exploit names.
    AddNewExploit,
    /// Create new indicator actions.
    AddNewIndicatorAction,
    /// Create new raw data types.
    AddNewRawDataType,
    /// Create new data sources.
    AddNewSource,
    /// Create new user roles.
    AddNewUserRole,
    /// Upload top-level domain lists.
    AddNewTlds,
    /// Open the control panel at all.
    ControlPanelRead,
    /// View the system section.
    ControlPanelSystemRead,
    /// View general settings.
    ControlPanelGeneralRead,
    /// Edit general settings.
    ControlPanelGeneralEdit,
    /// View CRITs settings.
    ControlPanelCritsRead,
    /// Edit CRITs settings.
    ControlPanelCritsEdit,
    /// View LDAP settings.
    ControlPanelLdapRead,
    /// Edit LDAP settings.
    ControlPanelLdapEdit,
    /// View security settings.
    ControlPanelSecurityRead,
    /// Edit security settings.
    ControlPanelSecurityEdit,
    /// View downloading settings.
    ControlPanelDownloadingRead,
    /// Edit downloading settings.
    ControlPanelDownloadingEdit,
    /// View system service settings.
    ControlPanelSystemServicesRead,
    /// Edit system service settings.
    ControlPanelSystemServicesEdit,
    /// View logging settings.
    ControlPanelLoggingRead,
    /// Edit logging settings.
    ControlPanelLoggingEdit,
    /// View managed items.
    ControlPanelItemsRead,
    /// View users.
    ControlPanelUsersRead,
    /// Add users.
    ControlPanelUsersAdd,
    /// Edit users.
    ControlPanelUsersEdit,
    /// Toggle user activation.
    ControlPanelUsersActive,
    /// View services.
    ControlPanelServicesRead,
    /// Edit services.
    ControlPanelServicesEdit,
    /// View the audit log.
    ControlPanelAuditLogRead,
    /// View the recent activity feed.
    RecentActivityRead,
    /// Import STIX documents.
    StixImportAdd,
    /// View the DNS timeline.
    DnsTimelineRead,
    /// View the email timeline.
    EmailsTimelineRead,
    /// View the indicator timeline.
    IndicatorsTimelineRead,
}

/// Functional area a [`Permission`] belongs to, used to group permission forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum PermissionGroup {
    /// "Add new" rights for vocabularies and reference data.
    #[strum(serialize = "Add New")]
    AddNew,
    /// Control panel sub-sections.
    #[strum(serialize = "Control Panel")]
    ControlPanel,
    /// Recent activity feed.
    #[strum(serialize = "Recent Activity")]
    RecentActivity,
    /// Structured exchange format imports.
    #[strum(serialize = "Structured Exchange Formats")]
    StructuredExchange,
    /// Timeline views.
    #[strum(serialize = "Timelines")]
    Timelines,
}

impl Permission {
    /// Snake-case key used in persisted records and permission paths.
    pub fn key(&self) -> &'static str {
        self.into()
    }

    /// Functional area of the flag, derived from its key.
    pub fn group(&self) -> PermissionGroup {
        let key = self.key();
        if key.starts_with("add_new_") {
            PermissionGroup::AddNew
        } else if key.starts_with("control_panel_") {
            PermissionGroup::ControlPanel
        } else if key.starts_with("recent_activity_") {
            PermissionGroup::RecentActivity
        } else if key.ends_with("_timeline_read") {
            PermissionGroup::Timelines
        } else {
            PermissionGroup::StructuredExchange
        }
    }

    /// Whether the flag only grants visibility.
    pub fn is_read(&self) -> bool {
        self.key().ends_with("_read")
    }
}

/// The flat permission flags of a role.
///
/// Always holds an entry for every [`Permission`] variant. Persisted as a map
/// from snake-case key to boolean; keys missing from a stored record load as
/// denied and unrecognised keys are dropped with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct PermissionSet {
    flags: BTreeMap<Permission, bool>,
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self {
            flags: Permission::iter().map(|p| (p, false)).collect(),
        }
    }
}

impl PermissionSet {
    /// Current value of a flag.
    pub fn get(&self, permission: Permission) -> bool {
        self.flags.get(&permission).copied().unwrap_or(false)
    }

    /// Set a flag.
    pub fn set(&mut self, permission: Permission, value: bool) {
        self.flags.insert(permission, value);
    }

    /// Grant every flag.
    pub fn grant_all(&mut self) {
        for value in self.flags.values_mut() {
            *value = true;
        }
    }

    /// Iterate every flag in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Permission, bool)> + '_ {
        self.flags.iter().map(|(p, v)| (*p, *v))
    }

    /// Whether every flag is granted.
    pub fn all_granted(&self) -> bool {
        self.flags.values().all(|v| *v)
    }
}

impl From<BTreeMap<String, bool>> for PermissionSet {
    fn from(stored: BTreeMap<String, bool>) -> Self {
        let mut set = PermissionSet::default();
        for (key, value) in stored {
            match Permission::from_str(&key) {
                Ok(permission) => set.set(permission, value),
                Err(_) => warn!(permission = %key, "dropping unrecognised permission flag"),
            }
        }
        set
    }
}

impl From<PermissionSet> for BTreeMap<String, bool> {
    fn from(set: PermissionSet) -> Self {
        set.flags
            .into_iter()
            .map(|(p, v)| (p.key().to_owned(), v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_denies_every_flag() {
        let set = PermissionSet::default();
        assert_eq!(set.iter().count(), Permission::iter().count());
        assert!(set.iter().all(|(_, granted)| !granted));
    }

    #[test]
    fn keys_parse_back_to_variants() {
        assert_eq!(Permission::ControlPanelAuditLogRead.key(), "control_panel_audit_log_read");
        assert_eq!(
            Permission::from_str("add_new_tlds").unwrap(),
            Permission::AddNewTlds
        );
        assert!(Permission::from_str("control_panel").is_err());
    }

    #[test]
    fn groups_follow_key_prefixes() {
        assert_eq!(Permission::AddNewBackdoor.group(), PermissionGroup::AddNew);
        assert_eq!(Permission::ControlPanelUsersAdd.group(), PermissionGroup::ControlPanel);
        assert_eq!(Permission::RecentActivityRead.group(), PermissionGroup::RecentActivity);
        assert_eq!(Permission::StixImportAdd.group(), PermissionGroup::StructuredExchange);
        assert_eq!(Permission::DnsTimelineRead.group(), PermissionGroup::Timelines);
        assert_eq!(PermissionGroup::ControlPanel.to_string(), "Control Panel");
    }

    #[test]
    fn stored_map_tolerates_missing_and_unknown_keys() {
        let stored = BTreeMap::from([
            ("stix_import_add".to_string(), true),
            ("retired_flag".to_string(), true),
        ]);
        let set = PermissionSet::from(stored);
        assert!(set.get(Permission::StixImportAdd));
        let granted: Vec<_> = set.iter().filter(|(_, v)| *v).map(|(p, _)| p).collect();
        assert_eq!(granted, vec![Permission::StixImportAdd]);
    }

    #[test]
    fn serializes_as_flat_key_map() {
        let mut set = PermissionSet::default();
        set.set(Permission::DnsTimelineRead, true);
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["dns_timeline_read"], serde_json::json!(true));
        assert_eq!(value["add_new_exploit"], serde_json::json!(false));
    }
}
