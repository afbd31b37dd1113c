use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use photo_import_core::{verify, Config, IngestOptions, PartialConfig};

#[derive(Parser)]
#[command(
    name = "photo-import",
    version,
    about = "Archive staged photos and videos and keep a per-event JSON ledger"
)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Archive everything below the import folder (default)
    Import {
        /// Verify copies but leave source files and event folders in place
        #[arg(long)]
        keep_sources: bool,
    },
    /// Re-hash every archived file listed in the ledgers, deleting nothing
    Verify {
        /// Check a single ledger file instead of the whole event folder
        ledger: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SettingsArgs {
    /// Folder holding settings.json and local_settings.json
    #[arg(long, global = true, default_value = ".")]
    settings_dir: PathBuf,

    /// Import folder to scan (overrides importPath)
    #[arg(long, global = true)]
    import_path: Option<PathBuf>,

    /// Archive root to copy into (overrides archiveDir)
    #[arg(long, global = true)]
    archive_dir: Option<PathBuf>,

    /// Root for the event ledgers (overrides eventDir)
    #[arg(long, global = true)]
    event_dir: Option<PathBuf>,

    /// Target folder template, e.g. "%Y/%m/%Q" (overrides photoArchive.structure)
    #[arg(long, global = true)]
    structure: Option<String>,

    /// Contributor for files not inside a contributor folder
    #[arg(long, global = true)]
    default_contributor: Option<String>,
}

impl SettingsArgs {
    fn overrides(&self) -> PartialConfig {
        PartialConfig {
            import_path: self.import_path.clone(),
            archive_dir: self.archive_dir.clone(),
            event_dir: self.event_dir.clone(),
            archive_structure: self.structure.clone(),
            default_contributor: self.default_contributor.clone(),
            ..Default::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let t_total = std::time::Instant::now();

    let load_config = || -> photo_import_core::Result<Config> {
        PartialConfig::from_dir(&cli.settings.settings_dir)?
            .merge(cli.settings.overrides())
            .finish(&cli.settings.settings_dir)
    };

    match cli.command.as_ref().unwrap_or(&Command::Import { keep_sources: false }) {
        Command::Import { keep_sources } => {
            let config = load_config()?;
            let options = IngestOptions::new().with_delete_sources(!*keep_sources);
            let report = photo_import_core::ingest(&config, &options)?;

            for event in &report.events {
                eprintln!(
                    "{}: {} archived, {} already in ledger, {} verified, {} deleted{}",
                    event.name,
                    event.archived,
                    event.duplicates(),
                    event.verified,
                    event.deleted,
                    if event.folder_removed { ", folder removed" } else { "" }
                );
                if event.verification_failures() > 0 {
                    eprintln!(
                        "  {} file(s) failed verification, sources left in {}",
                        event.verification_failures(),
                        event.folder.display()
                    );
                }
            }
            let failures: Vec<_> = report.failures().collect();
            for failure in &failures {
                eprintln!("  ! {}", failure);
            }

            eprintln!(
                "Done! {} event(s), {} files archived, {} sources deleted ({:.2}s)",
                report.events.len(),
                report.files_archived(),
                report.files_deleted(),
                t_total.elapsed().as_secs_f64()
            );
            if !failures.is_empty() {
                anyhow::bail!("{} problem(s) need manual attention", failures.len());
            }
        }
        Command::Verify { ledger } => {
            let audits = match ledger {
                Some(path) => vec![verify::audit_ledger(path)?],
                None => verify::audit_event_root(&load_config()?.event_dir)?,
            };

            let mut bad = 0;
            for audit in &audits {
                if audit.is_clean() {
                    eprintln!("{}: {} file(s) ok", audit.path.display(), audit.checked);
                    continue;
                }
                bad += audit.failures.len();
                eprintln!("{}: {} problem(s)", audit.path.display(), audit.failures.len());
                for failure in &audit.failures {
                    eprintln!("  ! {}", failure);
                }
            }

            eprintln!(
                "Checked {} ledger(s) ({:.2}s)",
                audits.len(),
                t_total.elapsed().as_secs_f64()
            );
            if bad > 0 {
                anyhow::bail!("{} archived file(s) failed verification", bad);
            }
        }
    }

    Ok(())
}
