use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::date::{CaptureTime, EventDate};
use crate::error::{IngestError, Result};
use crate::folder_classify::{EventSource, SourceFile};
use crate::hash;
use crate::media::{MediaClassifier, MediaType};
use crate::target_path;

/// One archived file as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub archive_path: PathBuf,
    pub import_path: PathBuf,
    pub contributor: String,
    pub media_type: MediaType,
    pub captured_at: CaptureTime,
    /// Digest of the source bytes at copy time
    pub content_hash: String,
}

/// One event and every file archived for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub name: String,
    pub files: Vec<FileRecord>,
    pub earliest_date: EventDate,
}

impl EventRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
            earliest_date: EventDate::SENTINEL,
        }
    }

    /// Append a record, pulling `earliest_date` back if the file is older.
    pub fn push(&mut self, file: FileRecord) {
        self.note_capture(&file.captured_at);
        self.files.push(file);
    }

    fn note_capture(&mut self, captured: &CaptureTime) {
        let date = captured.date();
        if date.is_earlier_than(&self.earliest_date) {
            self.earliest_date = date;
        }
    }

    /// `<event_root>/<year>/<month>/<name>.json`, keyed on the earliest date.
    pub fn ledger_path(&self, event_root: &Path) -> PathBuf {
        event_root
            .join(self.earliest_date.year.to_string())
            .join(self.earliest_date.month.to_string())
            .join(format!("{}.json", self.name))
    }
}

/// Archive one source file: resolve and create its target folder, hash the
/// source, copy it, and describe the result. The source is left in place.
///
/// An existing file at the target is never overwritten. If it holds the same
/// bytes it is reused, otherwise the copy goes to `stem(N).ext`.
pub fn archive_file(
    source: &SourceFile,
    config: &Config,
    classifier: &MediaClassifier,
) -> Result<FileRecord> {
    let file_name = source
        .path
        .file_name()
        .ok_or_else(|| IngestError::io(&source.path, std::io::ErrorKind::InvalidInput.into()))?;

    let metadata = fs::metadata(&source.path).map_err(|e| IngestError::io(&source.path, e))?;
    let modified = metadata.modified().map_err(|e| IngestError::io(&source.path, e))?;
    let captured_at = CaptureTime::from_system_time(modified);
    let media_type = classifier.classify(&file_name.to_string_lossy());

    let target_dir = target_path::resolve(
        &config.archive_dir,
        &config.archive_structure,
        &captured_at,
        media_type,
        &source.contributor,
    );
    fs::create_dir_all(&target_dir).map_err(|e| IngestError::io(&target_dir, e))?;

    let content_hash = hash::hash_file(&source.path)?;
    let archive_path = match free_archive_path(&target_dir, Path::new(file_name), &content_hash)? {
        Slot::Identical(path) => {
            log::info!(
                "File {} is already archived as {}",
                source.path.display(),
                path.display()
            );
            path
        }
        Slot::Free(path) => {
            fs::copy(&source.path, &path).map_err(|e| IngestError::io(&path, e))?;
            let mtime = filetime::FileTime::from_last_modification_time(&metadata);
            if let Err(e) = filetime::set_file_mtime(&path, mtime) {
                log::warn!("Could not keep modification time on {}: {}", path.display(), e);
            }
            log::info!("Copied file {} to {}", source.path.display(), path.display());
            path
        }
    };

    Ok(FileRecord {
        archive_path,
        import_path: source.path.clone(),
        contributor: source.contributor.clone(),
        media_type,
        captured_at,
        content_hash,
    })
}

/// Where a copy may go inside its target folder.
enum Slot {
    /// Nothing there yet.
    Free(PathBuf),
    /// A file with the same content is already there.
    Identical(PathBuf),
}

/// First of `name`, `stem(1).ext`, `stem(2).ext`, ... that is either unused
/// or already holds a file hashing to `content_hash`.
fn free_archive_path(dir: &Path, name: &Path, content_hash: &str) -> Result<Slot> {
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let ext = name.extension().map(|s| s.to_string_lossy().into_owned());

    let mut candidate = dir.join(name);
    let mut counter = 0u32;
    loop {
        match fs::metadata(&candidate) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Slot::Free(candidate)),
            Err(e) => return Err(IngestError::io(&candidate, e)),
            Ok(meta) if meta.is_file() && hash::hash_file(&candidate)? == content_hash => {
                return Ok(Slot::Identical(candidate));
            }
            Ok(_) => {}
        }
        counter += 1;
        let new_name = match &ext {
            Some(ext) => format!("{}({}).{}", stem, counter, ext),
            None => format!("{}({})", stem, counter),
        };
        candidate = dir.join(new_name);
    }
}

/// An event built from one import pass plus the files that could not be archived.
#[derive(Debug)]
pub struct BuiltEvent {
    pub event: EventRecord,
    pub failures: Vec<IngestError>,
}

/// Archive every file of an event folder. A failing file is recorded and
/// skipped; its source stays in the import tree.
pub fn build_event(source: &EventSource, config: &Config) -> BuiltEvent {
    let classifier = config.classifier();
    let mut event = EventRecord::new(&source.name);
    let mut failures = Vec::new();

    for file in &source.files {
        match archive_file(file, config, &classifier) {
            Ok(record) => event.push(record),
            Err(e) => {
                log::error!("Failed to archive {}: {}", file.path.display(), e);
                failures.push(e);
            }
        }
    }

    BuiltEvent { event, failures }
}
