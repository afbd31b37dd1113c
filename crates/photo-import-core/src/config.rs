use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::media::MediaClassifier;

/// Shared settings file (archive layout).
pub const SETTINGS_FILENAME: &str = "settings.json";
/// Machine-local settings file (directories).
pub const LOCAL_SETTINGS_FILENAME: &str = "local_settings.json";

/// Contributor used for files placed directly in an event folder.
pub const DEFAULT_CONTRIBUTOR: &str = "default";
/// Import folder used when none is configured, relative to the settings directory.
pub const DEFAULT_IMPORT_DIR: &str = "import";

/// Everything one import pass needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub import_path: PathBuf,
    pub archive_dir: PathBuf,
    pub event_dir: PathBuf,
    /// Target folder template, e.g. `%Y/%m/%Q`
    pub archive_structure: String,
    pub default_contributor: String,
    #[serde(default)]
    pub extra_raw_extensions: Vec<String>,
    #[serde(default)]
    pub extra_video_extensions: Vec<String>,
}

impl Config {
    pub fn classifier(&self) -> MediaClassifier {
        MediaClassifier::with_extensions(&self.extra_raw_extensions, &self.extra_video_extensions)
    }

    /// Read `settings.json` and `local_settings.json` from `settings_dir`.
    pub fn load(settings_dir: &Path) -> Result<Self> {
        PartialConfig::from_dir(settings_dir)?.finish(settings_dir)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    photo_archive: Option<PhotoArchiveSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhotoArchiveSettings {
    structure: Option<String>,
    #[serde(default)]
    raw_extensions: Vec<String>,
    #[serde(default)]
    video_extensions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalSettingsFile {
    import_path: Option<PathBuf>,
    archive_dir: Option<PathBuf>,
    event_dir: Option<PathBuf>,
    default_contributor: Option<String>,
}

/// Configuration gathered from several sources before validation.
/// Later sources override earlier ones field by field.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub import_path: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
    pub event_dir: Option<PathBuf>,
    pub archive_structure: Option<String>,
    pub default_contributor: Option<String>,
    pub extra_raw_extensions: Vec<String>,
    pub extra_video_extensions: Vec<String>,
}

impl PartialConfig {
    /// Values from the settings files in `settings_dir`. Missing files are fine.
    pub fn from_dir(settings_dir: &Path) -> Result<Self> {
        let settings: SettingsFile =
            read_json(&settings_dir.join(SETTINGS_FILENAME))?.unwrap_or_default();
        let local: LocalSettingsFile =
            read_json(&settings_dir.join(LOCAL_SETTINGS_FILENAME))?.unwrap_or_default();
        let archive = settings.photo_archive.unwrap_or_default();

        Ok(Self {
            import_path: local.import_path,
            archive_dir: local.archive_dir,
            event_dir: local.event_dir,
            archive_structure: archive.structure,
            default_contributor: local.default_contributor,
            extra_raw_extensions: archive.raw_extensions,
            extra_video_extensions: archive.video_extensions,
        })
    }

    pub fn merge(self, other: PartialConfig) -> Self {
        let mut extra_raw_extensions = self.extra_raw_extensions;
        extra_raw_extensions.extend(other.extra_raw_extensions);
        let mut extra_video_extensions = self.extra_video_extensions;
        extra_video_extensions.extend(other.extra_video_extensions);

        Self {
            import_path: other.import_path.or(self.import_path),
            archive_dir: other.archive_dir.or(self.archive_dir),
            event_dir: other.event_dir.or(self.event_dir),
            archive_structure: other.archive_structure.or(self.archive_structure),
            default_contributor: other.default_contributor.or(self.default_contributor),
            extra_raw_extensions,
            extra_video_extensions,
        }
    }

    /// Validate and apply fallbacks. Relative fallbacks resolve against `settings_dir`.
    pub fn finish(self, settings_dir: &Path) -> Result<Config> {
        let archive_dir = self
            .archive_dir
            .ok_or_else(|| IngestError::ConfigurationMissing("archiveDir".to_string()))?;
        let event_dir = self
            .event_dir
            .ok_or_else(|| IngestError::ConfigurationMissing("eventDir".to_string()))?;
        let archive_structure = self.archive_structure.ok_or_else(|| {
            IngestError::ConfigurationMissing("photoArchive.structure".to_string())
        })?;

        let import_path = self.import_path.unwrap_or_else(|| {
            let fallback = settings_dir.join(DEFAULT_IMPORT_DIR);
            log::warn!("No import path configured, using {}", fallback.display());
            fallback
        });
        let default_contributor = self
            .default_contributor
            .unwrap_or_else(|| DEFAULT_CONTRIBUTOR.to_string());

        Ok(Config {
            import_path,
            archive_dir,
            event_dir,
            archive_structure,
            default_contributor,
            extra_raw_extensions: self.extra_raw_extensions,
            extra_video_extensions: self.extra_video_extensions,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
    let value = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        IngestError::MalformedSettings {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(Some(value))
}
