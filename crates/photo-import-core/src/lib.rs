pub mod config;
pub mod date;
pub mod error;
pub mod folder_classify;
pub mod hash;
pub mod ledger;
pub mod media;
pub mod record;
pub mod target_path;
pub mod verify;

use std::path::PathBuf;

pub use config::{Config, PartialConfig};
pub use error::{IngestError, Result};
pub use record::{EventRecord, FileRecord};

use folder_classify::EventSource;
use ledger::MergeOutcome;

/// Control options for an import pass.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Delete verified source files and the emptied event folders.
    pub delete_sources: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delete_sources: true,
        }
    }
}

impl IngestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep source files in the import tree after verifying them.
    pub fn with_delete_sources(mut self, delete_sources: bool) -> Self {
        self.delete_sources = delete_sources;
        self
    }
}

/// What happened to one event folder.
#[derive(Debug)]
pub struct EventOutcome {
    pub name: String,
    pub folder: PathBuf,
    pub ledger: Option<MergeOutcome>,
    pub archived: usize,
    pub verified: usize,
    pub deleted: usize,
    pub folder_removed: bool,
    pub failures: Vec<IngestError>,
}

impl EventOutcome {
    fn new(source: &EventSource) -> Self {
        Self {
            name: source.name.clone(),
            folder: source.path.clone(),
            ledger: None,
            archived: 0,
            verified: 0,
            deleted: 0,
            folder_removed: false,
            failures: Vec::new(),
        }
    }

    pub fn duplicates(&self) -> usize {
        match self.ledger {
            Some(MergeOutcome::Merged { duplicates, .. }) => duplicates,
            _ => 0,
        }
    }

    pub fn verification_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|e| e.is_verification_failure())
            .count()
    }
}

/// Result of a whole import pass.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub events: Vec<EventOutcome>,
    /// Folders that could not be walked.
    pub walk_failures: Vec<IngestError>,
}

impl IngestReport {
    pub fn files_archived(&self) -> usize {
        self.events.iter().map(|e| e.archived).sum()
    }

    pub fn files_deleted(&self) -> usize {
        self.events.iter().map(|e| e.deleted).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &IngestError> {
        self.walk_failures
            .iter()
            .chain(self.events.iter().flat_map(|e| e.failures.iter()))
    }

    /// True if anything was left behind for an operator to look at.
    pub fn needs_attention(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Run one import pass over `config.import_path`.
///
/// Only an unreadable import root fails the pass. Everything else is
/// recorded per event in the returned report.
pub fn ingest(config: &Config, options: &IngestOptions) -> Result<IngestReport> {
    let walk = folder_classify::walk(&config.import_path, &config.default_contributor)?;

    let mut report = IngestReport {
        events: Vec::with_capacity(walk.events.len()),
        walk_failures: walk.failures,
    };
    for source in walk.events {
        report.events.push(ingest_event(source, config, options));
    }
    Ok(report)
}

/// Archive, record, verify and clean up one event folder.
pub fn ingest_event(mut source: EventSource, config: &Config, options: &IngestOptions) -> EventOutcome {
    let mut outcome = EventOutcome::new(&source);
    // Unreadable contributor folders keep their files, the rest still goes ahead.
    outcome.failures.append(&mut source.failures);

    let built = record::build_event(&source, config);
    outcome.archived = built.event.files.len();
    outcome.failures.extend(built.failures);

    if !built.event.files.is_empty() {
        match ledger::merge(&built.event, &config.event_dir) {
            Ok(merged) => outcome.ledger = Some(merged),
            Err(e) => {
                // Without a ledger entry nothing may be deleted.
                log::error!("Event {}: {}", source.name, e);
                outcome.failures.push(e);
                return outcome;
            }
        }

        let cleanup = verify::verify_and_cleanup(&built.event.files, options.delete_sources);
        outcome.verified = cleanup.verified;
        outcome.deleted = cleanup.deleted.len();
        outcome.failures.extend(cleanup.failures);
    } else {
        log::info!("Event folder {} has no files", source.path.display());
    }

    if options.delete_sources {
        match verify::remove_event_folder(&source) {
            Ok(()) => outcome.folder_removed = true,
            Err(e) => {
                log::error!("Could not remove event folder {}: {}", source.path.display(), e);
                outcome.failures.push(e);
            }
        }
    }

    outcome
}
