use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Camera raw formats
const RAW_EXTENSIONS: &[&str] = &[
    "3fr", "ari", "arw", "bay", "crw", "cap", "data", "dcs", "dcr", "dng", "drf", "eip", "erf",
    "fff", "gpr", "iiq", "k25", "kdc", "mdc", "mef", "mos", "mrw", "nef", "nrw", "obm", "orf",
    "pef", "ptx", "pxn", "r3d", "raf", "raw", "rwl", "rw2", "rwz", "sr2", "srf", "srw", "tif",
    "x3f",
];

/// Video containers and codecs (animated gif counts as video)
const VIDEO_EXTENSIONS: &[&str] = &[
    "webm", "mkv", "flv", "vob", "ogv", "ogg", "drc", "gif", "gifv", "mng", "avi", "mov", "qt",
    "wmv", "yuv", "rm", "rmvb", "asf", "amv", "mp4", "m4p", "mpg", "mp2", "mpeg", "mpe", "mpv",
    "m2v", "m4v", "svi", "3gp", "3g2", "mxf", "mts",
];

static DEFAULT_CLASSIFIER: LazyLock<MediaClassifier> = LazyLock::new(MediaClassifier::default);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Raw,
    Video,
    Image,
}

impl MediaType {
    pub fn name(self) -> &'static str {
        match self {
            MediaType::Raw => "raw",
            MediaType::Video => "video",
            MediaType::Image => "image",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extension lookup for raw and video formats. Anything else is an image.
#[derive(Debug, Clone)]
pub struct MediaClassifier {
    raw: Vec<String>,
    video: Vec<String>,
}

impl Default for MediaClassifier {
    fn default() -> Self {
        Self {
            raw: RAW_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            video: VIDEO_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl MediaClassifier {
    /// Default sets extended with extra extensions (with or without a leading dot).
    pub fn with_extensions<S: AsRef<str>>(extra_raw: &[S], extra_video: &[S]) -> Self {
        let mut classifier = Self::default();
        for ext in extra_raw {
            classifier.raw.push(normalize_extension(ext.as_ref()));
        }
        for ext in extra_video {
            classifier.video.push(normalize_extension(ext.as_ref()));
        }
        classifier
    }

    pub fn classify(&self, filename: &str) -> MediaType {
        let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) else {
            return MediaType::Image;
        };
        let ext = ext.to_lowercase();

        if self.raw.iter().any(|r| *r == ext) {
            MediaType::Raw
        } else if self.video.iter().any(|v| *v == ext) {
            MediaType::Video
        } else {
            MediaType::Image
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

/// Classify with the built-in extension sets.
pub fn classify(filename: &str) -> MediaType {
    DEFAULT_CLASSIFIER.classify(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_raw_extension() {
        for ext in RAW_EXTENSIONS {
            assert_eq!(classify(&format!("DSC_0001.{}", ext)), MediaType::Raw, "{}", ext);
            assert_eq!(
                classify(&format!("DSC_0001.{}", ext.to_uppercase())),
                MediaType::Raw,
                "{}",
                ext
            );
        }
    }

    #[test]
    fn test_every_video_extension() {
        for ext in VIDEO_EXTENSIONS {
            assert_eq!(classify(&format!("clip.{}", ext)), MediaType::Video, "{}", ext);
            assert_eq!(
                classify(&format!("clip.{}", ext.to_uppercase())),
                MediaType::Video,
                "{}",
                ext
            );
        }
    }

    #[test]
    fn test_everything_else_is_image() {
        assert_eq!(classify("IMG_1.jpg"), MediaType::Image);
        assert_eq!(classify("IMG_1.PNG"), MediaType::Image);
        assert_eq!(classify("notes.txt"), MediaType::Image);
        assert_eq!(classify("no_extension"), MediaType::Image);
        assert_eq!(classify("nef"), MediaType::Image);
    }

    #[test]
    fn test_mixed_case() {
        assert_eq!(classify("a.NEF"), MediaType::Raw);
        assert_eq!(classify("a.Mp4"), MediaType::Video);
    }

    #[test]
    fn test_extra_extensions() {
        let classifier = MediaClassifier::with_extensions(&[".CR3"], &["insv"]);
        assert_eq!(classifier.classify("x.cr3"), MediaType::Raw);
        assert_eq!(classifier.classify("x.INSV"), MediaType::Video);
        assert_eq!(classify("x.cr3"), MediaType::Image);
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&MediaType::Video).unwrap(), "\"video\"");
        assert_eq!(MediaType::Raw.to_string(), "raw");
    }
}
