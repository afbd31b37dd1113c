use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// Calendar date of an event. Field order gives year, then month, then day ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl EventDate {
    /// Placeholder later than any real capture date.
    pub const SENTINEL: EventDate = EventDate {
        year: 9999,
        month: 99,
        day: 99,
    };

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    pub fn is_earlier_than(&self, other: &EventDate) -> bool {
        self < other
    }
}

/// Capture time of a file, taken from its modification time in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaptureTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CaptureTime {
    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        Self::from_datetime(&DateTime::<Utc>::from(time))
    }

    /// Read the modification time of `path`.
    pub fn of_file(path: &Path) -> Result<Self> {
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| IngestError::io(path, e))?;
        Ok(Self::from_system_time(modified))
    }

    pub fn date(&self) -> EventDate {
        EventDate {
            year: self.year,
            month: self.month,
            day: self.day,
        }
    }

    /// None if the stored fields don't form a valid UTC timestamp.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(self.year, self.month, self.day, self.hour, self.minute, self.second)
            .single()
    }
}
