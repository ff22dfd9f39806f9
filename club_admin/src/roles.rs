use anyhow::{bail, Context, Result};
use aws_sdk_cognitoidentityprovider as cognito;
use club_common::permissions::ALL_REGIONS_GROUP;
use club_common::store;
use club_common::{ClubError, Region, Role};
use tracing::{debug, info};

/// Move every user of one Cognito group to another.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Move every user of one Cognito group to another.

Used when a role is renamed or split: each member of --from is added to --to
and, unless --keep-source is given, removed from --from.

Environment variables:
  USER_POOL_ID        - Cognito user pool holding the groups
  AWS_REGION          - AWS region (defaults to eu-west-1)")]
pub struct ReassignCommand {
    /// Group to move users out of.
    #[arg(long)]
    pub from: String,

    /// Group to move users into.
    #[arg(long)]
    pub to: String,

    /// Leave users in the source group as well.
    #[arg(long)]
    pub keep_source: bool,

    /// Cognito user pool id.
    #[arg(long, env = "USER_POOL_ID")]
    pub user_pool_id: String,

    /// Report what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

fn is_known_group(group: &str) -> bool {
    Role::from_group(group).is_some() || Region::from_group(group).is_some() || group == ALL_REGIONS_GROUP
}

/// Both groups must be part of the role model, and different.
pub fn check_groups(from: &str, to: &str) -> Result<()> {
    for group in [from, to] {
        if !is_known_group(group) {
            bail!("{} is not a role or region group", group);
        }
    }
    if from == to {
        bail!("source and target group are both {}", from);
    }
    Ok(())
}

async fn users_in_group(client: &cognito::Client, user_pool_id: &str, group: &str) -> Result<Vec<String>> {
    let mut users = Vec::new();
    let mut next_token = None;
    loop {
        let output = client
            .list_users_in_group()
            .user_pool_id(user_pool_id)
            .group_name(group)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(ClubError::aws)
            .with_context(|| format!("listing users of {}", group))?;
        users.extend(
            output
                .users()
                .unwrap_or_default()
                .iter()
                .filter_map(|u| u.username().map(str::to_string)),
        );
        match output.next_token() {
            Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
            _ => break,
        }
    }
    Ok(users)
}

pub async fn run(cmd: ReassignCommand) -> Result<()> {
    check_groups(&cmd.from, &cmd.to)?;
    let config = store::sdk_config().await;
    let client = cognito::Client::new(&config);

    let users = users_in_group(&client, &cmd.user_pool_id, &cmd.from).await?;
    info!("{} users in {}", users.len(), cmd.from);
    if cmd.dry_run {
        for user in &users {
            println!("would move {} from {} to {}", user, cmd.from, cmd.to);
        }
        return Ok(());
    }

    for user in &users {
        client
            .admin_add_user_to_group()
            .user_pool_id(&cmd.user_pool_id)
            .username(user)
            .group_name(&cmd.to)
            .send()
            .await
            .map_err(ClubError::aws)
            .with_context(|| format!("adding {} to {}", user, cmd.to))?;
        if !cmd.keep_source {
            client
                .admin_remove_user_from_group()
                .user_pool_id(&cmd.user_pool_id)
                .username(user)
                .group_name(&cmd.from)
                .send()
                .await
                .map_err(ClubError::aws)
                .with_context(|| format!("removing {} from {}", user, cmd.from))?;
        }
        debug!("moved {}", user);
    }
    info!("moved {} users from {} to {}", users.len(), cmd.from, cmd.to);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_must_be_known_and_distinct() {
        assert!(check_groups("Members_Read", "Members_CRUD").is_ok());
        assert!(check_groups("Regio_Groningen/Drenthe", "Regio_All").is_ok());
        assert!(check_groups("Members_Read", "Members_Read").is_err());
        assert!(check_groups("members", "Members_CRUD").is_err());
        assert!(check_groups("Finance", "Regio_Atlantis").is_err());
    }
}
