use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};

/// Position of a directory in the import tree.
///
/// The walk is fixed-depth: `Root -> [Year] -> [Month] -> Event -> User`.
/// Year and month levels are optional and recognised by numeric names;
/// everything below a month is an event, and everything below an event is a
/// contributor folder. Contributor folders are leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderLevel {
    Root,
    Year,
    Month,
    Event,
    User,
}

impl FolderLevel {
    /// Level of a subdirectory called `name` inside a folder at this level.
    /// `None` means the subdirectory is not walked.
    pub fn child(self, name: &str) -> Option<FolderLevel> {
        match self {
            FolderLevel::Root if is_numeric_folder(name) => Some(FolderLevel::Year),
            FolderLevel::Year if is_numeric_folder(name) => Some(FolderLevel::Month),
            FolderLevel::Root | FolderLevel::Year | FolderLevel::Month => Some(FolderLevel::Event),
            FolderLevel::Event => Some(FolderLevel::User),
            FolderLevel::User => None,
        }
    }
}

/// Year and month folders are the ones whose name parses as an integer.
pub fn is_numeric_folder(name: &str) -> bool {
    name.trim().parse::<i64>().is_ok()
}

/// A file waiting in the import tree and who it is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub contributor: String,
}

/// An event folder and everything found in it.
#[derive(Debug)]
pub struct EventSource {
    pub name: String,
    pub path: PathBuf,
    pub files: Vec<SourceFile>,
    /// Contributor sub-folders, removed before the event folder itself.
    pub user_dirs: Vec<PathBuf>,
    /// Contributor folders that could not be read. Their files stay behind.
    pub failures: Vec<IngestError>,
}

/// Result of walking an import root.
#[derive(Debug, Default)]
pub struct ImportWalk {
    pub events: Vec<EventSource>,
    /// Folders below the root that could not be read.
    pub failures: Vec<IngestError>,
}

/// Walk `import_root` and collect every event folder.
///
/// Only an unreadable root is an error; unreadable folders further down are
/// recorded in [`ImportWalk::failures`] and skipped.
pub fn walk(import_root: &Path, default_contributor: &str) -> Result<ImportWalk> {
    let mut walk = ImportWalk::default();
    log::info!("Parsing import folder: {}", import_root.display());
    let (dirs, files) = list_dir(import_root)?;
    for file in files {
        log::debug!("Ignoring file outside any event: {}", file.display());
    }
    for dir in dirs {
        visit(&dir, FolderLevel::Root, default_contributor, &mut walk);
    }
    Ok(walk)
}

fn visit(dir: &Path, parent: FolderLevel, default_contributor: &str, walk: &mut ImportWalk) {
    let Some(level) = parent.child(&folder_name(dir)) else {
        return;
    };

    match level {
        FolderLevel::Event => match scan_event(dir, default_contributor) {
            Ok(event) => walk.events.push(event),
            Err(e) => {
                log::error!("Cannot read event folder {}: {}", dir.display(), e);
                walk.failures.push(e);
            }
        },
        FolderLevel::Year | FolderLevel::Month => {
            log::info!("Parsing {} folder: {}", level_name(level), dir.display());
            match list_dir(dir) {
                Ok((dirs, files)) => {
                    for file in files {
                        log::debug!("Ignoring file outside any event: {}", file.display());
                    }
                    for sub in dirs {
                        visit(&sub, level, default_contributor, walk);
                    }
                }
                Err(e) => {
                    log::error!("Cannot read {} folder {}: {}", level_name(level), dir.display(), e);
                    walk.failures.push(e);
                }
            }
        }
        FolderLevel::Root | FolderLevel::User => {}
    }
}

/// Collect the files of one event folder: loose files go to the default
/// contributor, files in a sub-folder go to the sub-folder's name.
///
/// Only an unreadable event folder is an error. A contributor folder that
/// cannot be read is recorded in [`EventSource::failures`].
pub fn scan_event(event_dir: &Path, default_contributor: &str) -> Result<EventSource> {
    log::info!("Parsing event folder: {}", event_dir.display());
    let (dirs, loose) = list_dir(event_dir)?;
    Ok(collect_event(event_dir, dirs, loose, default_contributor))
}

fn collect_event(
    event_dir: &Path,
    dirs: Vec<PathBuf>,
    loose: Vec<PathBuf>,
    default_contributor: &str,
) -> EventSource {
    let mut event = EventSource {
        name: folder_name(event_dir),
        path: event_dir.to_path_buf(),
        files: Vec::new(),
        user_dirs: Vec::new(),
        failures: Vec::new(),
    };

    for user_dir in dirs {
        let user = folder_name(&user_dir);
        log::info!("Parsing contributor folder: {}", user_dir.display());
        let (nested, user_files) = match list_dir(&user_dir) {
            Ok(listing) => listing,
            Err(e) => {
                log::error!("Cannot read contributor folder {}: {}", user_dir.display(), e);
                event.failures.push(e);
                continue;
            }
        };
        for n in nested {
            log::warn!("Not descending into nested folder {}", n.display());
        }
        event.files.extend(user_files.into_iter().map(|path| SourceFile {
            path,
            contributor: user.clone(),
        }));
        event.user_dirs.push(user_dir);
    }
    event.files.extend(loose.into_iter().map(|path| SourceFile {
        path,
        contributor: default_contributor.to_string(),
    }));

    event
}

/// Immediate sub-directories and files of `dir`, each sorted by name.
fn list_dir(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let entries = fs::read_dir(dir).map_err(|e| IngestError::io(dir, e))?;
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| IngestError::io(dir, e))?.path();
        if path.is_dir() {
            dirs.push(path);
        } else {
            files.push(path);
        }
    }
    dirs.sort();
    files.sort();
    Ok((dirs, files))
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn level_name(level: FolderLevel) -> &'static str {
    match level {
        FolderLevel::Root => "import",
        FolderLevel::Year => "year",
        FolderLevel::Month => "month",
        FolderLevel::Event => "event",
        FolderLevel::User => "contributor",
    }
}
