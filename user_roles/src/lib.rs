use std::collections::BTreeSet;

use aws_sdk_cognitoidentityprovider as cognito;
use club_common::http::{self, Reply};
use club_common::permissions::{self, ALL_REGIONS_GROUP};
use club_common::{ClubError, Permission, Principal, Region, RegionScope, Role};
use lambda_http::http::Method;
use lambda_http::Request;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const USER_POOL_ID: &str = "USER_POOL_ID";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RoleInfo {
    pub role: Role,
    pub group: &'static str,
    pub permissions: Vec<Permission>,
    pub regional: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Catalogue {
    pub roles: Vec<RoleInfo>,
    pub region_groups: Vec<String>,
}

pub fn catalogue() -> Catalogue {
    let roles = Role::ALL
        .iter()
        .map(|role| RoleInfo {
            role: *role,
            group: role.group_name(),
            permissions: role.permissions().to_vec(),
            regional: role.is_regional(),
        })
        .collect();
    let mut region_groups = vec![ALL_REGIONS_GROUP.to_string()];
    region_groups.extend(Region::ALL.iter().map(Region::group_name));
    Catalogue { roles, region_groups }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CallerPermissions {
    pub sub: String,
    pub roles: Vec<Role>,
    pub permissions: BTreeSet<Permission>,
    pub regions: Vec<&'static str>,
}

pub fn caller_permissions(principal: &Principal) -> CallerPermissions {
    let groups = principal.groups.as_slice();
    let regions = permissions::region_scope_from_groups(groups)
        .as_ref()
        .map(RegionScope::region_names)
        .unwrap_or_default();
    CallerPermissions {
        sub: principal.sub.to_owned(),
        roles: permissions::roles(groups),
        permissions: principal.permissions(),
        regions,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleChangeRequest {
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

/// The Cognito calls needed to apply a role change.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RoleChange {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl RoleChange {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    pub fn apply(&self, current: &[String]) -> Vec<String> {
        let mut groups: BTreeSet<String> = current.iter().cloned().collect();
        for group in &self.remove {
            groups.remove(group);
        }
        groups.extend(self.add.iter().cloned());
        groups.into_iter().collect()
    }
}

/// Checks every requested group against the caller's rights and drops the
/// no-op parts of the request.
pub fn plan(caller_groups: &[String], current: &[String], request: RoleChangeRequest) -> Result<RoleChange, ClubError> {
    let add: BTreeSet<String> = request.add.into_iter().map(|g| g.trim().to_string()).collect();
    let remove: BTreeSet<String> = request.remove.into_iter().map(|g| g.trim().to_string()).collect();
    if let Some(group) = add.intersection(&remove).next() {
        return Err(ClubError::bad_request(format!("{} is both added and removed", group)));
    }
    for group in add.iter().chain(remove.iter()) {
        permissions::can_assign_group(caller_groups, group)?;
    }
    Ok(RoleChange {
        add: add.into_iter().filter(|g| !current.contains(g)).collect(),
        remove: remove.into_iter().filter(|g| current.contains(g)).collect(),
    })
}

#[derive(Debug, Serialize)]
struct UserGroups<'a> {
    username: &'a str,
    groups: Vec<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    Catalogue,
    MyPermissions,
    UserGroups(String),
    ChangeGroups(String),
}

impl Route {
    pub fn from_request(event: &Request) -> Result<Route, ClubError> {
        let path = event.uri().path().trim_end_matches('/');
        match (event.method(), http::path_param(event, "username")) {
            (&Method::GET, None) if path.ends_with("/me/permissions") => Ok(Route::MyPermissions),
            (&Method::GET, None) if path.ends_with("/roles") => Ok(Route::Catalogue),
            (&Method::GET, Some(username)) => Ok(Route::UserGroups(username)),
            (&Method::PUT, Some(username)) => Ok(Route::ChangeGroups(username)),
            (method, _) => Err(ClubError::bad_request(format!("unsupported route {} {}", method, path))),
        }
    }
}

pub struct UserRoles {
    client: cognito::Client,
    user_pool_id: String,
}

impl UserRoles {
    pub fn new(client: cognito::Client, user_pool_id: String) -> UserRoles {
        UserRoles { client, user_pool_id }
    }

    pub async fn handle(&self, event: &Request) -> Result<Reply, ClubError> {
        let principal = http::principal(event)?;
        match Route::from_request(event)? {
            Route::Catalogue => Reply::ok(&catalogue()),
            Route::MyPermissions => Reply::ok(&caller_permissions(&principal)),
            Route::UserGroups(username) => {
                principal.require(&[Permission::RolesManage])?;
                let groups = self.groups_for(&username).await?;
                Reply::ok(&UserGroups { username: &username, groups })
            }
            Route::ChangeGroups(username) => {
                principal.require(&[Permission::RolesManage])?;
                self.change(&principal, &username, http::parse_body(event)?).await
            }
        }
    }

    pub async fn groups_for(&self, username: &str) -> Result<Vec<String>, ClubError> {
        let mut groups = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .admin_list_groups_for_user()
                .user_pool_id(self.user_pool_id.to_owned())
                .username(username)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(ClubError::aws)?;
            groups.extend(
                output
                    .groups()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|g| g.group_name().map(str::to_string)),
            );
            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        groups.sort();
        Ok(groups)
    }

    async fn change(&self, principal: &Principal, username: &str, request: RoleChangeRequest) -> Result<Reply, ClubError> {
        let current = self.groups_for(username).await?;
        let change = plan(&principal.groups, &current, request)?;
        for group in &change.add {
            self.client
                .admin_add_user_to_group()
                .user_pool_id(self.user_pool_id.to_owned())
                .username(username)
                .group_name(group)
                .send()
                .await
                .map_err(ClubError::aws)?;
            info!("{} added {} to {}", principal.sub, username, group);
        }
        for group in &change.remove {
            self.client
                .admin_remove_user_from_group()
                .user_pool_id(self.user_pool_id.to_owned())
                .username(username)
                .group_name(group)
                .send()
                .await
                .map_err(ClubError::aws)?;
            info!("{} removed {} from {}", principal.sub, username, group);
        }
        Reply::ok(&UserGroups { username, groups: change.apply(&current) })
    }
}
