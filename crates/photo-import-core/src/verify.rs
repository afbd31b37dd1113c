use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};
use crate::folder_classify::EventSource;
use crate::hash;
use crate::ledger;
use crate::record::FileRecord;

/// Re-hash the archived copy and compare it with the recorded hash.
pub fn verify_record(record: &FileRecord) -> Result<()> {
    match fs::metadata(&record.archive_path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IngestError::ArchiveMissing(record.archive_path.clone()));
        }
        Err(e) => return Err(IngestError::io(&record.archive_path, e)),
    }
    let actual = hash::hash_file(&record.archive_path)?;
    if actual != record.content_hash {
        return Err(IngestError::VerificationMismatch {
            path: record.archive_path.clone(),
            expected: record.content_hash.clone(),
            actual,
        });
    }
    Ok(())
}

/// Outcome of verifying the records of one import pass.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub verified: usize,
    /// Import-side files removed after a successful check.
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<IngestError>,
}

/// Verify every record and, when `delete_sources` is set, delete the import
/// file of each record that passes. A failing record keeps its source and
/// does not stop the others.
pub fn verify_and_cleanup(records: &[FileRecord], delete_sources: bool) -> CleanupReport {
    let mut report = CleanupReport::default();

    for record in records {
        if let Err(e) = verify_record(record) {
            log::warn!("Error while verifying {}: {}", record.import_path.display(), e);
            report.failures.push(e);
            continue;
        }
        report.verified += 1;
        log::info!("File {} successfully verified", record.import_path.display());

        if !delete_sources {
            continue;
        }
        match fs::remove_file(&record.import_path) {
            Ok(()) => {
                log::info!("Deleted {}", record.import_path.display());
                report.deleted.push(record.import_path.clone());
            }
            Err(e) => {
                log::error!("Could not delete {}: {}", record.import_path.display(), e);
                report.failures.push(IngestError::io(&record.import_path, e));
            }
        }
    }

    report
}

/// Remove the contributor folders and then the event folder. Both removals
/// are non-recursive, so anything left behind makes this fail.
pub fn remove_event_folder(source: &EventSource) -> Result<()> {
    for dir in &source.user_dirs {
        match fs::remove_dir(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(IngestError::io(dir, e)),
        }
    }
    fs::remove_dir(&source.path).map_err(|e| IngestError::io(&source.path, e))?;
    log::info!("Removed event folder {}", source.path.display());
    Ok(())
}

/// Result of re-checking one stored ledger without touching any file.
#[derive(Debug)]
pub struct LedgerAudit {
    pub path: PathBuf,
    pub checked: usize,
    pub failures: Vec<IngestError>,
}

impl LedgerAudit {
    fn failed(path: PathBuf, error: IngestError) -> Self {
        Self {
            path,
            checked: 0,
            failures: vec![error],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Re-hash every archived file listed in the ledger at `path`.
pub fn audit_ledger(path: &Path) -> Result<LedgerAudit> {
    let record = ledger::load(path)?.ok_or_else(|| {
        IngestError::io(path, std::io::ErrorKind::NotFound.into())
    })?;

    let mut audit = LedgerAudit {
        path: path.to_path_buf(),
        checked: 0,
        failures: Vec::new(),
    };
    for file in &record.files {
        audit.checked += 1;
        if let Err(e) = verify_record(file) {
            log::warn!("{}: {}", path.display(), e);
            audit.failures.push(e);
        }
    }
    Ok(audit)
}

/// Audit every `<year>/<month>/<event>.json` below `event_root`. A ledger
/// or folder that cannot be read is reported as a failed audit; only an
/// unreadable `event_root` is an error.
pub fn audit_event_root(event_root: &Path) -> Result<Vec<LedgerAudit>> {
    let mut audits = Vec::new();
    for year in sorted_entries(event_root)? {
        if year.is_dir() {
            audit_year(&year, &mut audits);
        }
    }
    Ok(audits)
}

fn audit_year(year: &Path, audits: &mut Vec<LedgerAudit>) {
    let Some(months) = entries_or_report(year, audits) else {
        return;
    };
    for month in months.iter().filter(|m| m.is_dir()) {
        audit_month(month, audits);
    }
}

fn audit_month(month: &Path, audits: &mut Vec<LedgerAudit>) {
    let Some(ledgers) = entries_or_report(month, audits) else {
        return;
    };
    for ledger_path in ledgers {
        if ledger_path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        log::info!("Auditing ledger {}", ledger_path.display());
        match audit_ledger(&ledger_path) {
            Ok(audit) => audits.push(audit),
            Err(e) => audits.push(LedgerAudit::failed(ledger_path, e)),
        }
    }
}

fn entries_or_report(dir: &Path, audits: &mut Vec<LedgerAudit>) -> Option<Vec<PathBuf>> {
    match sorted_entries(dir) {
        Ok(entries) => Some(entries),
        Err(e) => {
            log::error!("Cannot read ledger folder {}: {}", dir.display(), e);
            audits.push(LedgerAudit::failed(dir.to_path_buf(), e));
            None
        }
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| IngestError::io(dir, e))? {
        paths.push(entry.map_err(|e| IngestError::io(dir, e))?.path());
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::CaptureTime;
    use crate::media::MediaType;
    use crate::record::EventRecord;

    /// Source file plus an identical archived copy.
    fn archived(root: &Path, name: &str, bytes: &[u8]) -> FileRecord {
        let import_path = root.join("import").join(name);
        let archive_path = root.join("archive").join(name);
        fs::create_dir_all(import_path.parent().unwrap()).unwrap();
        fs::create_dir_all(archive_path.parent().unwrap()).unwrap();
        fs::write(&import_path, bytes).unwrap();
        fs::write(&archive_path, bytes).unwrap();
        FileRecord {
            content_hash: hash::hash_file(&import_path).unwrap(),
            archive_path,
            import_path,
            contributor: "default".to_string(),
            media_type: MediaType::Image,
            captured_at: CaptureTime {
                year: 2024,
                month: 3,
                day: 1,
                hour: 0,
                minute: 0,
                second: 0,
            },
        }
    }

    #[test]
    fn test_verified_source_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let rec = archived(dir.path(), "a.jpg", b"aaa");

        let report = verify_and_cleanup(std::slice::from_ref(&rec), true);
        assert_eq!(report.verified, 1);
        assert_eq!(report.deleted, vec![rec.import_path.clone()]);
        assert!(!rec.import_path.exists());
        assert!(rec.archive_path.exists());
    }

    #[test]
    fn test_corrupted_copy_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let good = archived(dir.path(), "good.jpg", b"good");
        let bad = archived(dir.path(), "bad.jpg", b"bad");
        fs::write(&bad.archive_path, b"bit rot").unwrap();

        let report = verify_and_cleanup(&[bad.clone(), good.clone()], true);
        assert_eq!(report.verified, 1);
        assert!(bad.import_path.exists());
        assert!(!good.import_path.exists());
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0], IngestError::VerificationMismatch { .. }));
    }

    #[test]
    fn test_missing_copy_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let rec = archived(dir.path(), "a.jpg", b"aaa");
        fs::remove_file(&rec.archive_path).unwrap();

        let report = verify_and_cleanup(std::slice::from_ref(&rec), true);
        assert_eq!(report.verified, 0);
        assert!(rec.import_path.exists());
        assert!(matches!(report.failures[0], IngestError::ArchiveMissing(_)));
        assert!(report.failures[0].is_verification_failure());
    }

    #[test]
    fn test_unreadable_copy_is_not_reported_missing() {
        let dir = tempfile::tempdir().unwrap();
        let rec = archived(dir.path(), "a.jpg", b"aaa");
        fs::remove_file(&rec.archive_path).unwrap();
        fs::create_dir(&rec.archive_path).unwrap();

        let report = verify_and_cleanup(std::slice::from_ref(&rec), true);
        assert_eq!(report.verified, 0);
        assert!(rec.import_path.exists());
        assert!(matches!(report.failures[0], IngestError::Io { .. }));
    }

    #[test]
    fn test_keep_sources() {
        let dir = tempfile::tempdir().unwrap();
        let rec = archived(dir.path(), "a.jpg", b"aaa");

        let report = verify_and_cleanup(std::slice::from_ref(&rec), false);
        assert_eq!(report.verified, 1);
        assert!(report.deleted.is_empty());
        assert!(rec.import_path.exists());
    }

    #[test]
    fn test_remove_event_folder_fails_when_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        let event_dir = dir.path().join("Trip");
        let user_dir = event_dir.join("Alice");
        fs::create_dir_all(&user_dir).unwrap();
        fs::write(event_dir.join("left.jpg"), b"x").unwrap();

        let source = EventSource {
            name: "Trip".to_string(),
            path: event_dir.clone(),
            files: Vec::new(),
            user_dirs: vec![user_dir.clone()],
            failures: Vec::new(),
        };
        assert!(remove_event_folder(&source).is_err());
        assert!(event_dir.exists());

        fs::remove_file(event_dir.join("left.jpg")).unwrap();
        remove_event_folder(&source).unwrap();
        assert!(!event_dir.exists());
    }

    #[test]
    fn test_audit_event_root() {
        let dir = tempfile::tempdir().unwrap();
        let good = archived(dir.path(), "good.jpg", b"good");
        let bad = archived(dir.path(), "bad.jpg", b"bad");
        fs::write(&bad.archive_path, b"changed").unwrap();

        let mut event = EventRecord::new("Trip");
        event.push(good.clone());
        event.push(bad);
        let events = dir.path().join("events");
        ledger::persist(&event, &event.ledger_path(&events)).unwrap();

        let audits = audit_event_root(&events).unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].checked, 2);
        assert_eq!(audits[0].failures.len(), 1);
        assert!(!audits[0].is_clean());
        assert!(good.import_path.exists());
    }

    #[test]
    fn test_unreadable_ledger_folder_does_not_stop_audit() {
        let dir = tempfile::tempdir().unwrap();
        let good = archived(dir.path(), "good.jpg", b"good");
        let mut event = EventRecord::new("Trip");
        event.push(good);
        let events = dir.path().join("events");
        let ledger_path = event.ledger_path(&events);
        ledger::persist(&event, &ledger_path).unwrap();

        let mut audits = Vec::new();
        audit_month(&events.join("2024/13"), &mut audits);
        audit_year(&events.join("2024"), &mut audits);

        assert_eq!(audits.len(), 2);
        assert_eq!(audits[0].path, events.join("2024/13"));
        assert!(matches!(audits[0].failures[0], IngestError::Io { .. }));
        assert_eq!(audits[1].path, ledger_path);
        assert!(audits[1].is_clean());
    }
}
