use club_common::permissions::{self, ALL_REGIONS_GROUP};
use club_common::{Permission, Region, RegionScope, Role};

#[derive(Debug, clap::Parser)]
pub struct ShowCommand {
    /// Cognito groups to evaluate, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    pub groups: Vec<String>,
}

/// Human readable evaluation of the role table for `groups`, one line per
/// permission plus a summary of ignored groups.
pub fn describe(groups: &[String]) -> Vec<String> {
    let groups: Vec<String> = groups.iter().map(|g| g.trim().to_string()).filter(|g| !g.is_empty()).collect();
    let roles = permissions::roles(groups.as_slice());
    let mut lines = Vec::new();
    if roles.is_empty() {
        lines.push("no recognised role groups".to_string());
    } else {
        let names: Vec<String> = roles.iter().map(|r| format!("{:?}", r)).collect();
        lines.push(format!("roles: {}", names.join(", ")));
    }

    for permission in Permission::ALL {
        let verdict = match permissions::validate_permissions_with_regions(groups.as_slice(), &[permission]) {
            Ok(RegionScope::All) => "all regions".to_string(),
            Ok(scope) => scope.region_names().join(", "),
            Err(e) => format!("denied ({})", e),
        };
        lines.push(format!("{:<16} {}", permission.as_str(), verdict));
    }

    let ignored: Vec<&str> = groups
        .iter()
        .map(String::as_str)
        .filter(|g| Role::from_group(g).is_none() && Region::from_group(g).is_none() && *g != ALL_REGIONS_GROUP)
        .collect();
    if !ignored.is_empty() {
        lines.push(format!("ignored groups: {}", ignored.join(", ")));
    }
    lines
}
