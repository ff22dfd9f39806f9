//! Operational tasks for the club backend that do not warrant an API: bulk role
//! changes, member imports, data cleanup and log inspection.

use anyhow::Result;
use clap::Parser;
use tracing::Level;

mod import;
mod logs;
mod permissions;
mod regions;
mod roles;

#[derive(Debug, Parser)]
#[command(name = "club_admin")]
#[command(about = "Operational tasks for the club backend", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: Global,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Move every user of one Cognito group to another
    ReassignRoles(roles::ReassignCommand),

    /// Import members from a CSV export
    ImportMembers(import::ImportCommand),

    /// Normalise the region names stored on members
    CleanRegions(regions::CleanCommand),

    /// Print recent CloudWatch log events of a Lambda function
    InspectLogs(logs::InspectCommand),

    /// Show what a set of Cognito groups is allowed to do
    ShowPermissions(permissions::ShowCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    club_common::logging::init_with_level(if cli.global.verbose { Level::DEBUG } else { Level::INFO });

    match cli.command {
        Commands::ReassignRoles(cmd) => roles::run(cmd).await,
        Commands::ImportMembers(cmd) => import::run(cmd).await,
        Commands::CleanRegions(cmd) => regions::run(cmd).await,
        Commands::InspectLogs(cmd) => logs::run(cmd).await,
        Commands::ShowPermissions(cmd) => {
            for line in permissions::describe(&cmd.groups) {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from([&["club_admin"][..], args].concat())
    }

    #[test]
    fn dry_run_only_on_writing_commands() {
        let cli = parse(&["import-members", "--file", "leden.csv", "--members-table", "members", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Commands::ImportMembers(cmd) if cmd.dry_run));
        let cli = parse(&["clean-regions", "--members-table", "members", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Commands::CleanRegions(cmd) if cmd.dry_run));
        let cli = parse(&["reassign-roles", "--from", "Members_Read", "--to", "Members_CRUD", "--user-pool-id", "pool", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Commands::ReassignRoles(cmd) if cmd.dry_run));

        assert!(parse(&["inspect-logs", "--function", "members", "--dry-run"]).is_err());
        assert!(parse(&["show-permissions", "--groups", "Finance", "--dry-run"]).is_err());
    }

    #[test]
    fn verbose_is_accepted_anywhere() {
        let cli = parse(&["show-permissions", "--groups", "Finance", "--verbose"]).unwrap();
        assert!(cli.global.verbose);
    }
}
