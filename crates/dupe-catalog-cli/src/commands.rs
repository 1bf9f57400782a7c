use clap::{Parser, Subcommand};
use dupe_catalog_core::MediaScope;

#[derive(Debug, Parser)]
#[command(name = "dupe-catalog")]
#[command(about = "Catalog a media library and find its duplicates", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index every media file under the root not yet in the catalog
    FullScan,
    /// Reconcile the catalog with disk: new, modified and removed files
    DeltaSync,
    /// List duplicate groups
    Groups {
        /// images, videos, documents or all
        #[arg(long, default_value = "images", value_parser = parse_scope)]
        scope: MediaScope,
        /// Group by content only, ignoring creation time
        #[arg(long)]
        ignore_creation_time: bool,
        /// Keep entries marked deleted
        #[arg(long)]
        include_deleted: bool,
        /// Keep entries marked ignored
        #[arg(long)]
        include_ignored: bool,
        /// Only groups with a member path matching this glob
        #[arg(long)]
        filter: Option<String>,
    },
    /// List entries whose image data failed to decode
    Corrupted {
        #[arg(long, default_value = "images", value_parser = parse_scope)]
        scope: MediaScope,
    },
    /// Flag a catalogued file as deleted
    MarkDeleted { path: String },
    /// Flip the ignored flag of a catalogued file
    ToggleIgnored { path: String },
    /// Count and size of entries marked deleted
    Stats,
    /// Remove every entry from the catalog
    Reset,
    /// Print configuration values
    PrintConfig,
}

fn parse_scope(raw: &str) -> Result<MediaScope, String> {
    raw.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_defaults() {
        let cli = Cli::try_parse_from(["dupe-catalog", "groups"]).unwrap();
        match cli.command {
            Some(Commands::Groups {
                scope,
                ignore_creation_time,
                include_deleted,
                include_ignored,
                filter,
            }) => {
                assert_eq!(scope, MediaScope::Images);
                assert!(!ignore_creation_time);
                assert!(!include_deleted);
                assert!(!include_ignored);
                assert!(filter.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_scope_is_validated() {
        assert!(Cli::try_parse_from(["dupe-catalog", "corrupted", "--scope", "videos"]).is_ok());
        assert!(Cli::try_parse_from(["dupe-catalog", "corrupted", "--scope", "audio"]).is_err());
    }

    #[test]
    fn test_mark_deleted_takes_a_path() {
        let cli = Cli::try_parse_from(["dupe-catalog", "mark-deleted", "/p/a.jpg"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::MarkDeleted { ref path }) if path == "/p/a.jpg"
        ));
    }
}
