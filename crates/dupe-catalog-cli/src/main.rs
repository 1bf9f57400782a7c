mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process;
use std::sync::atomic::Ordering;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use dupe_catalog_core::storage::CatalogEntry;
use dupe_catalog_core::sync::FileError;
use dupe_catalog_core::{AppConfig, Catalog, DuplicateGroup, GroupQuery, MediaScope, SyncReport};
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match dupe_catalog_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();
    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    if let Err(err) = run(command, &config) {
        error!("Error: {}", err);
        process::exit(1);
    }
}

fn run(command: Commands, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::PrintConfig => {
            println!("Configuration: {:#?}", config);
        }
        Commands::FullScan => {
            let catalog = open_catalog(config)?;
            let report = catalog.run_full_scan(&CliReporter::new())?;
            print_report(&report);
        }
        Commands::DeltaSync => {
            let catalog = open_catalog(config)?;
            let report = catalog.run_delta_sync(&CliReporter::new())?;
            print_report(&report);
        }
        Commands::Groups {
            scope,
            ignore_creation_time,
            include_deleted,
            include_ignored,
            filter,
        } => {
            let catalog = Catalog::open(config)?;
            let mut query = GroupQuery::for_scope(scope)
                .use_creation_time(!ignore_creation_time)
                .include_deleted(include_deleted)
                .include_ignored(include_ignored);
            if let Some(filter) = filter {
                query = query.with_path_filter(filter);
            }
            let groups = catalog.list_groups(&query)?;
            print_groups(&groups);
        }
        Commands::Corrupted { scope } => {
            let catalog = Catalog::open(config)?;
            print_corrupted(scope, &catalog.list_corrupted(scope)?);
        }
        Commands::MarkDeleted { path } => {
            let catalog = Catalog::open(config)?;
            if catalog.mark_deleted(&path)? {
                println!("{} marked deleted", path.yellow());
            } else {
                warn!("{} is not in the catalog", path);
            }
        }
        Commands::ToggleIgnored { path } => {
            let catalog = Catalog::open(config)?;
            match catalog.toggle_ignored(&path)? {
                Some(true) => println!("{} is now ignored", path.yellow()),
                Some(false) => println!("{} is no longer ignored", path.green()),
                None => warn!("{} is not in the catalog", path),
            }
        }
        Commands::Stats => {
            let catalog = Catalog::open(config)?;
            let stats = catalog.stats()?;
            println!(
                "{} entries marked deleted, {} reclaimed",
                format!("{}", stats.deleted_count).red(),
                format!("{:.2} MiB", stats.deleted_mib()).red(),
            );
        }
        Commands::Reset => {
            if !prompt_confirm(
                "Are you SURE you want to COMPLETELY ERASE the catalog?",
                Some(false),
            )? {
                return Ok(());
            }
            let catalog = Catalog::open(config)?;
            let removed = catalog.reset()?;
            println!("{} entries removed", removed);
        }
    }
    Ok(())
}

/// Open the catalog and route Ctrl+C to its cancel token.
fn open_catalog(config: &AppConfig) -> Result<Catalog, Box<dyn std::error::Error>> {
    let catalog = Catalog::open(config)?;
    let token = catalog.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || {
        token.store(true, Ordering::Relaxed);
    }) {
        warn!("Cannot install Ctrl+C handler: {}", e);
    }
    Ok(catalog)
}

fn print_report(report: &SyncReport) {
    println!();
    info!(
        "{} new, {} modified, {} removed, {} unchanged, {} already catalogued",
        format!("{}", report.new).green(),
        format!("{}", report.modified).yellow(),
        format!("{}", report.removed).red(),
        report.unchanged,
        report.skipped_existing,
    );
    if !report.errors.is_empty() {
        warn!(
            "{} files could not be read",
            format!("{}", report.errors.len()).red()
        );
        for line in error_lines(&report.errors) {
            println!("  {} {}", "✗".red(), line);
        }
    }
    if report.was_interrupted() {
        warn!("Sync interrupted after {} of {} files", report.processed, report.total);
    }
}

fn error_lines(errors: &[FileError]) -> Vec<String> {
    errors
        .iter()
        .map(|error| format!("{}: {}", error.path, error.message))
        .collect()
}

fn print_groups(groups: &[DuplicateGroup]) {
    for group in groups {
        let created = group.created_at.as_deref().unwrap_or("-");
        println!(
            "{} {} bytes x{} ({} wasted) {} {}",
            group.content_hash.get(..12).unwrap_or(&group.content_hash).cyan(),
            group.size_bytes,
            group.len(),
            format!("{}", group.wasted_bytes()).red(),
            group.media_class,
            created,
        );
        for entry in &group.entries {
            println!("    {}{}", entry.path, flags(entry));
        }
    }
    let wasted: i64 = groups.iter().map(DuplicateGroup::wasted_bytes).sum();
    info!(
        "{} duplicate groups, {} bytes wasted",
        format!("{}", groups.len()).red(),
        format!("{}", wasted).red(),
    );
}

fn print_corrupted(scope: MediaScope, entries: &[CatalogEntry]) {
    for entry in entries {
        println!("{}{}", entry.path, flags(entry));
    }
    info!(
        "{} corrupted entries in scope {:?}",
        format!("{}", entries.len()).red(),
        scope
    );
}

fn flags(entry: &CatalogEntry) -> String {
    let mut out = String::new();
    if entry.is_deleted {
        out.push_str(&format!(" {}", "[deleted]".red()));
    }
    if entry.is_ignored {
        out.push_str(&format!(" {}", "[ignored]".dimmed()));
    }
    out
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
