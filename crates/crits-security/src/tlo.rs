//! ---
//! crits_section: "06-security-access-control"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Role records, permission bundles, and source ACLs."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
//! Permission bundles scoped to Top-Level Object (TLO) types.
use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::warn;

use crate::{Result, RoleError};

/// Top-Level Object types that carry their own permission bundle on a role.
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
pub enum TloType {
    /// Threat actors.
    Actor,
    /// Identifiers (handles, emails, ...) attributed to actors.
    ActorIdentifier,
}

impl TloType {
    /// Name used as the bundle key in records and permission paths.
    pub fn key(&self) -> &'static str {
        self.into()
    }

    /// Fields declared for this bundle, in declaration order.
    pub fn fields(self) -> impl Iterator<Item = TloField> {
        TloField::iter().filter(move |field| field.applies_to(self))
    }
}

/// Fields of a TLO permission bundle.
///
/// Variants without a scope in [`TloField::scope`] are shared by every TLO
/// type; scoped variants only exist on the named type's bundle.
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
#[allow(missing_docs)]
pub enum TloField {
    Read,
    Write,
    Delete,
    Download,
    DescriptionRead,
    DescriptionEdit,
    ActionsRead,
    ActionsAdd,
    ActionsEdit,
    ActionsDelete,
    BucketlistRead,
    BucketlistEdit,
    CampaignsRead,
    CampaignsAdd,
    CampaignsEdit,
    CampaignsDelete,
    CommentsRead,
    CommentsAdd,
    CommentsEdit,
    CommentsDelete,
    LocationsRead,
    LocationsAdd,
    LocationsEdit,
    LocationsDelete,
    ObjectsRead,
    ObjectsAdd,
    ObjectsEdit,
    ObjectsDelete,
    RelationshipsRead,
    RelationshipsAdd,
    RelationshipsEdit,
    RelationshipsDelete,
    ReleasabilityRead,
    ReleasabilityAdd,
    ReleasabilityDelete,
    ScreenshotsRead,
    ScreenshotsAdd,
    ScreenshotsDelete,
    SectorsRead,
    SectorsEdit,
    ServicesRead,
    ServicesExecute,
    SourcesRead,
    SourcesAdd,
    SourcesEdit,
    SourcesDelete,
    StatusRead,
    StatusEdit,
    TicketsRead,
    TicketsAdd,
    TicketsEdit,
    TicketsDelete,
    NameRead,
    NameEdit,
    AliasesRead,
    AliasesEdit,
    IntendedEffectsRead,
    IntendedEffectsEdit,
    MotivationsRead,
    MotivationsEdit,
    SophisticationsRead,
    SophisticationsEdit,
    ThreatTypesRead,
    ThreatTypesEdit,
    ActorIdentifiersRead,
    ActorIdentifiersAdd,
    ActorIdentifiersEdit,
    ActorIdentifiersDelete,
}

impl TloField {
    /// Snake-case key of the field.
    pub fn key(&self) -> &'static str {
        self.into()
    }

    /// The only TLO type carrying this field, or `None` for shared fields.
    pub fn scope(&self) -> Option<TloType> {
        use TloField::*;
        match self {
            NameRead | NameEdit | AliasesRead | AliasesEdit | IntendedEffectsRead
            | IntendedEffectsEdit | MotivationsRead | MotivationsEdit | SophisticationsRead
            | SophisticationsEdit | ThreatTypesRead | ThreatTypesEdit | ActorIdentifiersRead
            | ActorIdentifiersAdd | ActorIdentifiersEdit | ActorIdentifiersDelete => {
                Some(TloType::Actor)
            }
            _ => None,
        }
    }

    /// Whether the field is declared on the bundle of `kind`.
    pub fn applies_to(&self, kind: TloType) -> bool {
        self.scope().map_or(true, |scope| scope == kind)
    }

    /// Whether the field only grants visibility.
    pub fn is_read(&self) -> bool {
        let key = self.key();
        key == "read" || key.ends_with("_read")
    }
}

/// Permission bundle for one TLO type.
///
/// Treated as a value object: read it with [`crate::Role::tlo`], mutate the
/// copy, then hand it back through [`crate::Role::set_tlo`] so the role records
/// the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TloAccess {
    kind: TloType,
    fields: BTreeMap<TloField, bool>,
}

impl TloAccess {
    /// Bundle for `kind` with every declared field denied.
    pub fn new(kind: TloType) -> Self {
        Self {
            kind,
            fields: kind.fields().map(|field| (field, false)).collect(),
        }
    }

    /// TLO type this bundle belongs to.
    pub fn kind(&self) -> TloType {
        self.kind
    }

    /// Current value of a field.
    pub fn get(&self, field: TloField) -> Result<bool> {
        self.fields
            .get(&field)
            .copied()
            .ok_or_else(|| self.not_in_bundle(field))
    }

    /// Set a field declared on this bundle.
    pub fn set(&mut self, field: TloField, value: bool) -> Result<()> {
        match self.fields.get_mut(&field) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.not_in_bundle(field)),
        }
    }

    /// Grant every declared field.
    pub fn grant_all(&mut self) {
        self.grant_where(|_| true);
    }

    /// Grant every declared field matching `predicate`.
    pub fn grant_where(&mut self, predicate: impl Fn(&TloField) -> bool) {
        for (field, value) in self.fields.iter_mut() {
            if predicate(field) {
                *value = true;
            }
        }
    }

    /// Iterate the declared fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (TloField, bool)> + '_ {
        self.fields.iter().map(|(f, v)| (*f, *v))
    }

    /// Whether every declared field is granted.
    pub fn all_granted(&self) -> bool {
        self.fields.values().all(|v| *v)
    }

    fn not_in_bundle(&self, field: TloField) -> RoleError {
        RoleError::FieldNotInBundle {
            bundle: self.kind.key().to_owned(),
            field: field.key().to_owned(),
        }
    }
}

type StoredBundles = BTreeMap<String, BTreeMap<String, bool>>;

/// Every TLO bundle of a role, one per [`TloType`].
///
/// Stored as `{"Actor": {"read": false, ...}, ...}`. Bundles or fields absent
/// from a stored record load denied, so new TLO types and fields appear on
/// existing roles without a migration step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredBundles", into = "StoredBundles")]
pub struct TloPermissions {
    bundles: BTreeMap<TloType, TloAccess>,
}

impl Default for TloPermissions {
    fn default() -> Self {
        Self {
            bundles: TloType::iter()
                .map(|kind| (kind, TloAccess::new(kind)))
                .collect(),
        }
    }
}

impl TloPermissions {
    /// Borrow the bundle for `kind`.
    pub fn get(&self, kind: TloType) -> &TloAccess {
        // Every TloType is seeded by Default and by the stored-map conversion.
        &self.bundles[&kind]
    }

    /// Replace the bundle for its TLO type.
    pub fn replace(&mut self, access: TloAccess) {
        self.bundles.insert(access.kind(), access);
    }

    /// Iterate bundles in TLO type order.
    pub fn iter(&self) -> impl Iterator<Item = &TloAccess> {
        self.bundles.values()
    }
}

impl From<StoredBundles> for TloPermissions {
    fn from(stored: StoredBundles) -> Self {
        let mut permissions = TloPermissions::default();
        for (bundle, fields) in stored {
            let Ok(kind) = TloType::from_str(&bundle) else {
                warn!(bundle = %bundle, "dropping permission bundle for unknown TLO type");
                continue;
            };
            let mut access = TloAccess::new(kind);
            for (key, value) in fields {
                let applied = TloField::from_str(&key)
                    .ok()
                    .map(|field| access.set(field, value).is_ok())
                    .unwrap_or(false);
                if !applied {
                    warn!(bundle = %bundle, field = %key, "dropping unrecognised bundle field");
                }
            }
            permissions.replace(access);
        }
        permissions
    }
}

impl From<TloPermissions> for StoredBundles {
    fn from(permissions: TloPermissions) -> Self {
        permissions
            .bundles
            .into_iter()
            .map(|(kind, access)| {
                let fields = access
                    .fields
                    .into_iter()
                    .map(|(f, v)| (f.key().to_owned(), v))
                    .collect();
                (kind.key().to_owned(), fields)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_bundle_extends_shared_fields() {
        let shared = TloType::ActorIdentifier.fields().count();
        let actor = TloType::Actor.fields().count();
        assert!(actor > shared);
        assert!(TloType::Actor.fields().any(|f| f == TloField::AliasesEdit));
        assert!(!TloType::ActorIdentifier.fields().any(|f| f == TloField::AliasesEdit));
    }

    #[test]
    fn setting_undeclared_field_is_rejected() {
        let mut access = TloAccess::new(TloType::ActorIdentifier);
        let err = access.set(TloField::ThreatTypesRead, true).unwrap_err();
        assert_eq!(
            err,
            RoleError::FieldNotInBundle {
                bundle: "ActorIdentifier".into(),
                field: "threat_types_read".into(),
            }
        );
        assert!(access.get(TloField::ThreatTypesRead).is_err());
    }

    #[test]
    fn grant_all_covers_every_declared_field() {
        let mut access = TloAccess::new(TloType::Actor);
        assert!(!access.get(TloField::Read).unwrap());
        access.grant_all();
        assert!(access.all_granted());
        assert_eq!(access.iter().count(), TloType::Actor.fields().count());
    }

    #[test]
    fn grant_where_touches_matching_fields_only() {
        let mut access = TloAccess::new(TloType::Actor);
        access.grant_where(TloField::is_read);
        assert!(access.get(TloField::Read).unwrap());
        assert!(access.get(TloField::ThreatTypesRead).unwrap());
        assert!(!access.get(TloField::Write).unwrap());
        assert!(!access.get(TloField::CommentsAdd).unwrap());
        assert!(access.iter().all(|(field, value)| value == field.is_read()));
    }

    #[test]
    fn read_fields_are_recognised() {
        assert!(TloField::Read.is_read());
        assert!(TloField::CommentsRead.is_read());
        assert!(!TloField::CommentsAdd.is_read());
        assert!(!TloField::Download.is_read());
    }

    #[test]
    fn stored_bundles_fill_in_missing_types_and_fields() {
        let stored: StoredBundles = BTreeMap::from([(
            "Actor".to_string(),
            BTreeMap::from([
                ("read".to_string(), true),
                ("retired_field".to_string(), true),
            ]),
        )]);
        let permissions = TloPermissions::from(stored);
        assert!(permissions.get(TloType::Actor).get(TloField::Read).unwrap());
        assert!(!permissions.get(TloType::Actor).get(TloField::Write).unwrap());
        assert_eq!(
            permissions.get(TloType::ActorIdentifier),
            &TloAccess::new(TloType::ActorIdentifier)
        );
    }
}
