use club_common::permissions::{self, validate_permissions_with_regions};
use club_common::{AccessError, Permission, Region, RegionScope, Role};

fn only(regions: &[Region]) -> RegionScope {
    RegionScope::Only(regions.iter().copied().collect())
}

#[test]
fn typical_club_accounts() {
    // Regional secretary: member administration for one region.
    let secretary = ["Club_Members", "Members_CRUD", "Regio_Noord-Holland"];
    assert_eq!(
        validate_permissions_with_regions(&secretary, &[Permission::MembersCreate]),
        Ok(only(&[Region::NoordHolland]))
    );
    assert_eq!(
        validate_permissions_with_regions(&secretary, &[Permission::WebshopUse]),
        Ok(RegionScope::All)
    );
    assert_eq!(
        validate_permissions_with_regions(&secretary, &[Permission::PaymentsRead]),
        Err(AccessError::MissingPermission(Permission::PaymentsRead))
    );

    // Webshop volunteer: national shop, no region groups needed.
    let shop = ["Club_Members", "Products_CRUD"];
    assert_eq!(
        validate_permissions_with_regions(&shop, &[Permission::ProductsManage, Permission::OrdersManage]),
        Ok(RegionScope::All)
    );

    // Event organiser for two regions.
    let organiser = ["Events_CRUD", "Regio_Oost", "Regio_Duitsland"];
    assert_eq!(
        validate_permissions_with_regions(&organiser, &[Permission::EventsManage]),
        Ok(only(&[Region::Oost, Region::Duitsland]))
    );
}

#[test]
fn every_role_has_permissions_and_a_unique_group() {
    let mut groups: Vec<&str> = Role::ALL.iter().map(|r| r.group_name()).collect();
    groups.sort();
    groups.dedup();
    assert_eq!(groups.len(), Role::ALL.len());
    for role in Role::ALL {
        assert!(!role.permissions().is_empty(), "{:?} grants nothing", role);
    }
    assert_eq!(Role::SystemAdmin.permissions().len(), Permission::ALL.len());
}

#[test]
fn region_groups_alone_grant_nothing() {
    let groups = ["Regio_All"];
    assert!(permissions::effective_permissions(&groups).is_empty());
    assert_eq!(permissions::region_scope_from_groups(&groups), Some(RegionScope::All));
    let none: [&str; 1] = ["Club_Members"];
    assert_eq!(permissions::region_scope_from_groups(&none), None);
}
