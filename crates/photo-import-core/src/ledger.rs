use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};
use crate::record::EventRecord;

/// What happened to the ledger of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No ledger existed; the new event was written as is.
    Created { path: PathBuf },
    /// An existing ledger was extended (or left alone when `appended` is 0).
    Merged {
        path: PathBuf,
        appended: usize,
        duplicates: usize,
    },
}

impl MergeOutcome {
    pub fn path(&self) -> &Path {
        match self {
            MergeOutcome::Created { path } | MergeOutcome::Merged { path, .. } => path,
        }
    }
}

/// Counts from folding one event into another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub appended: usize,
    pub duplicates: usize,
}

/// Load a ledger. `Ok(None)` when the file does not exist; a file that exists
/// but does not parse is [`IngestError::MalformedLedger`].
pub fn load(path: &Path) -> Result<Option<EventRecord>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(IngestError::io(path, e)),
    };
    let record = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        IngestError::MalformedLedger {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(Some(record))
}

/// Write a ledger through a temp file in the same folder and rename it into
/// place, so readers see either the old or the new document.
pub fn persist(record: &EventRecord, path: &Path) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| IngestError::io(dir, e))?;

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = dir.join(temp_name);

    let written = write_json(record, &temp_path);
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        IngestError::io(path, e)
    })
}

fn write_json(record: &EventRecord, temp_path: &Path) -> Result<()> {
    let file = File::create(temp_path).map_err(|e| IngestError::io(temp_path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, record)
        .map_err(|e| IngestError::io(temp_path, e.into()))?;
    writer.flush().map_err(|e| IngestError::io(temp_path, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| IngestError::io(temp_path, e.into_error()))?;
    file.sync_all().map_err(|e| IngestError::io(temp_path, e))
}

/// Fold the files of `new` into `existing`.
///
/// A file is a duplicate when a record with the same archive path and the
/// same content hash is already present. Each appended file can only move
/// `earliest_date` earlier; ties keep the current value.
pub fn merge_into(existing: &mut EventRecord, new: &EventRecord) -> MergeStats {
    let mut seen: HashSet<(PathBuf, String)> = existing
        .files
        .iter()
        .map(|f| (f.archive_path.clone(), f.content_hash.clone()))
        .collect();

    let mut stats = MergeStats::default();
    for file in &new.files {
        let key = (file.archive_path.clone(), file.content_hash.clone());
        if seen.contains(&key) {
            log::info!("Already in ledger: {}", file.archive_path.display());
            stats.duplicates += 1;
            continue;
        }
        seen.insert(key);
        existing.push(file.clone());
        stats.appended += 1;
    }
    stats
}

/// Persist `new` under `event_root`, merging with the ledger already stored
/// at its location. The location comes from `new`'s earliest date and is
/// never moved afterwards.
pub fn merge(new: &EventRecord, event_root: &Path) -> Result<MergeOutcome> {
    let path = new.ledger_path(event_root);

    match load(&path)? {
        None => {
            persist(new, &path)?;
            log::info!("Wrote new ledger {}", path.display());
            Ok(MergeOutcome::Created { path })
        }
        Some(mut existing) => {
            let stats = merge_into(&mut existing, new);
            if stats.appended > 0 {
                persist(&existing, &path)?;
                log::info!(
                    "Merged {} file(s) into ledger {} ({} already present)",
                    stats.appended,
                    path.display(),
                    stats.duplicates
                );
            } else {
                log::info!("Ledger {} already up to date", path.display());
            }
            Ok(MergeOutcome::Merged {
                path,
                appended: stats.appended,
                duplicates: stats.duplicates,
            })
        }
    }
}
