//! Role and permission resolution.
//!
//! Cognito groups carry two kinds of information: role groups (what a user may
//! do) and region groups (which part of the membership data they may see).
//! Every handler funnels its authorization decision through
//! [`validate_permissions_with_regions`].

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::regions::Region;

pub const ALL_REGIONS_GROUP: &str = "Regio_All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    MembersRead,
    MembersCreate,
    MembersUpdate,
    MembersDelete,
    MembersExport,
    EventsRead,
    EventsManage,
    ProductsRead,
    ProductsManage,
    WebshopUse,
    OrdersRead,
    OrdersManage,
    PaymentsRead,
    PaymentsManage,
    RolesManage,
}

impl Permission {
    pub const ALL: [Permission; 15] = [
        Permission::MembersRead,
        Permission::MembersCreate,
        Permission::MembersUpdate,
        Permission::MembersDelete,
        Permission::MembersExport,
        Permission::EventsRead,
        Permission::EventsManage,
        Permission::ProductsRead,
        Permission::ProductsManage,
        Permission::WebshopUse,
        Permission::OrdersRead,
        Permission::OrdersManage,
        Permission::PaymentsRead,
        Permission::PaymentsManage,
        Permission::RolesManage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::MembersRead => "members_read",
            Permission::MembersCreate => "members_create",
            Permission::MembersUpdate => "members_update",
            Permission::MembersDelete => "members_delete",
            Permission::MembersExport => "members_export",
            Permission::EventsRead => "events_read",
            Permission::EventsManage => "events_manage",
            Permission::ProductsRead => "products_read",
            Permission::ProductsManage => "products_manage",
            Permission::WebshopUse => "webshop_use",
            Permission::OrdersRead => "orders_read",
            Permission::OrdersManage => "orders_manage",
            Permission::PaymentsRead => "payments_read",
            Permission::PaymentsManage => "payments_manage",
            Permission::RolesManage => "roles_manage",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown permission {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SystemAdmin,
    NationalBoard,
    MemberAdministration,
    MemberReader,
    EventManager,
    Treasurer,
    WebshopManager,
    RoleManager,
    Member,
}

const NATIONAL_BOARD: &[Permission] = &[
    Permission::MembersRead,
    Permission::MembersExport,
    Permission::EventsRead,
    Permission::ProductsRead,
    Permission::OrdersRead,
    Permission::PaymentsRead,
    Permission::WebshopUse,
];

const MEMBER_ADMINISTRATION: &[Permission] = &[
    Permission::MembersRead,
    Permission::MembersCreate,
    Permission::MembersUpdate,
    Permission::MembersDelete,
    Permission::MembersExport,
];

const TREASURER: &[Permission] = &[
    Permission::PaymentsRead,
    Permission::PaymentsManage,
    Permission::OrdersRead,
    Permission::MembersRead,
];

const WEBSHOP_MANAGER: &[Permission] = &[
    Permission::ProductsRead,
    Permission::ProductsManage,
    Permission::OrdersRead,
    Permission::OrdersManage,
];

const MEMBER: &[Permission] = &[
    Permission::EventsRead,
    Permission::ProductsRead,
    Permission::WebshopUse,
];

impl Role {
    pub const ALL: [Role; 9] = [
        Role::SystemAdmin,
        Role::NationalBoard,
        Role::MemberAdministration,
        Role::MemberReader,
        Role::EventManager,
        Role::Treasurer,
        Role::WebshopManager,
        Role::RoleManager,
        Role::Member,
    ];

    /// Name of the Cognito group that grants this role.
    pub fn group_name(&self) -> &'static str {
        match self {
            Role::SystemAdmin => "System_User_Management",
            Role::NationalBoard => "National_Board",
            Role::MemberAdministration => "Members_CRUD",
            Role::MemberReader => "Members_Read",
            Role::EventManager => "Events_CRUD",
            Role::Treasurer => "Finance",
            Role::WebshopManager => "Products_CRUD",
            Role::RoleManager => "Roles_Management",
            Role::Member => "Club_Members",
        }
    }

    pub fn from_group(group: &str) -> Option<Role> {
        Role::ALL.iter().copied().find(|r| r.group_name() == group)
    }

    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::SystemAdmin => &Permission::ALL,
            Role::NationalBoard => NATIONAL_BOARD,
            Role::MemberAdministration => MEMBER_ADMINISTRATION,
            Role::MemberReader => &[Permission::MembersRead],
            Role::EventManager => &[Permission::EventsRead, Permission::EventsManage],
            Role::Treasurer => TREASURER,
            Role::WebshopManager => WEBSHOP_MANAGER,
            Role::RoleManager => &[Permission::RolesManage],
            Role::Member => MEMBER,
        }
    }

    /// Regional roles only see data of the regions named by the user's
    /// `Regio_*` groups.
    pub fn is_regional(&self) -> bool {
        matches!(
            self,
            Role::MemberAdministration | Role::MemberReader | Role::EventManager | Role::Treasurer
        )
    }

    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

/// The set of regions a caller may see for a given operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionScope {
    All,
    Only(BTreeSet<Region>),
}

impl RegionScope {
    pub fn allows(&self, region: Region) -> bool {
        match self {
            RegionScope::All => true,
            RegionScope::Only(regions) => regions.contains(&region),
        }
    }

    /// Same as [`RegionScope::allows`] for a stored region name. Unrecognised
    /// names are only visible to callers with every region.
    pub fn allows_name(&self, name: &str) -> bool {
        match self {
            RegionScope::All => true,
            RegionScope::Only(_) => Region::normalize(name).map_or(false, |r| self.allows(r)),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, RegionScope::All)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RegionScope::All => false,
            RegionScope::Only(regions) => regions.is_empty(),
        }
    }

    pub fn intersect(self, other: RegionScope) -> RegionScope {
        match (self, other) {
            (RegionScope::All, other) | (other, RegionScope::All) => other,
            (RegionScope::Only(a), RegionScope::Only(b)) => {
                RegionScope::Only(a.intersection(&b).copied().collect())
            }
        }
    }

    pub fn region_names(&self) -> Vec<&'static str> {
        match self {
            RegionScope::All => Region::ALL.iter().map(|r| r.name()).collect(),
            RegionScope::Only(regions) => regions.iter().map(|r| r.name()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("no recognised role in the caller's groups")]
    NoRoles,
    #[error("missing permission {0}")]
    MissingPermission(Permission),
    #[error("permission {0} requires a region group")]
    MissingRegion(Permission),
    #[error("region {0} is outside the caller's scope")]
    OutOfScope(String),
    #[error("only the owner of this record may do that")]
    NotOwner,
    #[error("group {0} may not be assigned by this caller")]
    GroupNotAssignable(String),
}

pub fn roles<S: AsRef<str>>(groups: &[S]) -> Vec<Role> {
    let mut roles: Vec<Role> = groups
        .iter()
        .filter_map(|g| Role::from_group(g.as_ref()))
        .collect();
    roles.sort();
    roles.dedup();
    roles
}

/// Region scope granted by the `Regio_*` groups alone, `None` when the user has
/// no (recognised) region group at all.
pub fn region_scope_from_groups<S: AsRef<str>>(groups: &[S]) -> Option<RegionScope> {
    if groups.iter().any(|g| g.as_ref() == ALL_REGIONS_GROUP) {
        return Some(RegionScope::All);
    }
    let regions: BTreeSet<Region> = groups
        .iter()
        .filter_map(|g| Region::from_group(g.as_ref()))
        .collect();
    if regions.is_empty() {
        None
    } else {
        Some(RegionScope::Only(regions))
    }
}

pub fn effective_permissions<S: AsRef<str>>(groups: &[S]) -> BTreeSet<Permission> {
    roles(groups)
        .iter()
        .flat_map(|r| r.permissions().iter().copied())
        .collect()
}

pub fn has_permission<S: AsRef<str>>(groups: &[S], permission: Permission) -> bool {
    roles(groups).iter().any(|r| r.grants(permission))
}

pub fn validate_permissions<S: AsRef<str>>(
    groups: &[S],
    required: &[Permission],
) -> Result<(), AccessError> {
    let roles = roles(groups);
    if roles.is_empty() {
        return Err(AccessError::NoRoles);
    }
    match required.iter().find(|p| !roles.iter().any(|r| r.grants(**p))) {
        Some(missing) => Err(AccessError::MissingPermission(*missing)),
        None => Ok(()),
    }
}

/// Checks that `groups` grant every permission in `required` and works out
/// which regions the caller may act on.
///
/// A permission granted by a non-regional role covers every region. A
/// permission that only regional roles grant is limited to the caller's
/// region groups, and is refused when the caller has none. With several
/// required permissions the caller gets the regions allowed for all of them.
pub fn validate_permissions_with_regions<S: AsRef<str>>(
    groups: &[S],
    required: &[Permission],
) -> Result<RegionScope, AccessError> {
    validate_permissions(groups, required)?;
    let roles = roles(groups);
    let region_groups = region_scope_from_groups(groups);

    let mut scope = RegionScope::All;
    for permission in required {
        let granting: Vec<&Role> = roles.iter().filter(|r| r.grants(*permission)).collect();
        let permission_scope = if granting.iter().any(|r| !r.is_regional()) {
            RegionScope::All
        } else {
            region_groups
                .clone()
                .ok_or(AccessError::MissingRegion(*permission))?
        };
        scope = scope.intersect(permission_scope);
        if scope.is_empty() {
            return Err(AccessError::MissingRegion(*permission));
        }
    }
    Ok(scope)
}

/// Decides whether a caller may add or remove `group` for another user.
pub fn can_assign_group<S: AsRef<str>>(caller_groups: &[S], group: &str) -> Result<(), AccessError> {
    validate_permissions(caller_groups, &[Permission::RolesManage])?;
    let is_region_group = group == ALL_REGIONS_GROUP || Region::from_group(group).is_some();
    match Role::from_group(group) {
        Some(Role::SystemAdmin) | Some(Role::RoleManager) => {
            if roles(caller_groups).contains(&Role::SystemAdmin) {
                Ok(())
            } else {
                Err(AccessError::GroupNotAssignable(group.to_string()))
            }
        }
        Some(_) => Ok(()),
        None if is_region_group => Ok(()),
        None => Err(AccessError::GroupNotAssignable(group.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(regions: &[Region]) -> RegionScope {
        RegionScope::Only(regions.iter().copied().collect())
    }

    #[test]
    fn role_groups_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_group(role.group_name()), Some(role));
        }
        assert_eq!(Role::from_group("members_crud"), None);
    }

    #[test]
    fn permission_names_parse() {
        for permission in Permission::ALL {
            assert_eq!(permission.as_str().parse::<Permission>(), Ok(permission));
        }
        assert!("members_write".parse::<Permission>().is_err());
    }

    #[test]
    fn system_admin_sees_everything_without_region_groups() {
        let groups = ["System_User_Management"];
        for permission in Permission::ALL {
            assert_eq!(
                validate_permissions_with_regions(&groups, &[permission]),
                Ok(RegionScope::All)
            );
        }
    }

    #[test]
    fn unknown_groups_have_no_roles() {
        assert_eq!(
            validate_permissions_with_regions(&["Regio_Utrecht", "beta_testers"], &[Permission::EventsRead]),
            Err(AccessError::NoRoles)
        );
        let empty: [&str; 0] = [];
        assert_eq!(validate_permissions(&empty, &[]), Err(AccessError::NoRoles));
    }

    #[test]
    fn regional_role_is_limited_to_region_groups() {
        let groups = ["Members_CRUD", "Regio_Utrecht", "Regio_Limburg"];
        assert_eq!(
            validate_permissions_with_regions(&groups, &[Permission::MembersUpdate]),
            Ok(scope(&[Region::Utrecht, Region::Limburg]))
        );
    }

    #[test]
    fn regional_role_without_region_is_refused() {
        assert_eq!(
            validate_permissions_with_regions(&["Members_Read"], &[Permission::MembersRead]),
            Err(AccessError::MissingRegion(Permission::MembersRead))
        );
    }

    #[test]
    fn all_regions_group_widens_scope() {
        let groups = ["Members_Read", "Regio_All", "Regio_Utrecht"];
        assert_eq!(
            validate_permissions_with_regions(&groups, &[Permission::MembersRead]),
            Ok(RegionScope::All)
        );
    }

    #[test]
    fn missing_permission_is_named() {
        assert_eq!(
            validate_permissions_with_regions(&["Club_Members"], &[Permission::EventsRead, Permission::EventsManage]),
            Err(AccessError::MissingPermission(Permission::EventsManage))
        );
    }

    #[test]
    fn non_regional_grant_wins_over_regional_one() {
        // National board reads members nationally even when also a regional reader.
        let groups = ["Members_Read", "Regio_Oost", "National_Board"];
        assert_eq!(
            validate_permissions_with_regions(&groups, &[Permission::MembersRead]),
            Ok(RegionScope::All)
        );
    }

    #[test]
    fn webshop_permissions_ignore_regions() {
        assert_eq!(
            validate_permissions_with_regions(&["Club_Members"], &[Permission::WebshopUse]),
            Ok(RegionScope::All)
        );
        assert_eq!(
            validate_permissions_with_regions(&["Products_CRUD"], &[Permission::OrdersManage]),
            Ok(RegionScope::All)
        );
    }

    #[test]
    fn combined_permissions_intersect() {
        let groups = ["Members_Read", "Regio_Friesland", "Finance"];
        assert_eq!(
            validate_permissions_with_regions(&groups, &[Permission::MembersRead, Permission::PaymentsManage]),
            Ok(scope(&[Region::Friesland]))
        );
    }

    #[test]
    fn effective_permissions_union_roles() {
        let perms = effective_permissions(&["Events_CRUD", "Club_Members"]);
        assert!(perms.contains(&Permission::EventsManage));
        assert!(perms.contains(&Permission::WebshopUse));
        assert!(!perms.contains(&Permission::MembersRead));
        assert!(has_permission(&["Finance"], Permission::OrdersRead));
        assert!(!has_permission(&["Finance"], Permission::OrdersManage));
    }

    #[test]
    fn scope_helpers() {
        let only = scope(&[Region::Utrecht]);
        assert!(only.allows(Region::Utrecht));
        assert!(!only.allows(Region::Oost));
        assert!(only.allows_name("utrecht"));
        assert!(!only.allows_name("nowhere"));
        assert!(RegionScope::All.allows_name("nowhere"));
        assert!(only.clone().intersect(scope(&[Region::Oost])).is_empty());
        assert_eq!(RegionScope::All.intersect(only.clone()), only);
        assert_eq!(RegionScope::All.region_names().len(), Region::ALL.len());
    }

    #[test]
    fn only_system_admin_hands_out_admin_groups() {
        let manager = ["Roles_Management"];
        assert_eq!(can_assign_group(&manager, "Members_CRUD"), Ok(()));
        assert_eq!(can_assign_group(&manager, "Regio_Utrecht"), Ok(()));
        assert_eq!(can_assign_group(&manager, "Regio_All"), Ok(()));
        assert_eq!(
            can_assign_group(&manager, "System_User_Management"),
            Err(AccessError::GroupNotAssignable("System_User_Management".to_string()))
        );
        assert_eq!(
            can_assign_group(&manager, "Regio_Mars"),
            Err(AccessError::GroupNotAssignable("Regio_Mars".to_string()))
        );
        assert_eq!(can_assign_group(&["System_User_Management"], "Roles_Management"), Ok(()));
        assert_eq!(
            can_assign_group(&["Club_Members"], "Club_Members"),
            Err(AccessError::MissingPermission(Permission::RolesManage))
        );
    }
}
