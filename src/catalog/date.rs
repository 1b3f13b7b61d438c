// src/catalog/date.rs
//!
//! Modification date rendering
//!
//! Listings show "Today 14:05" and "Yesterday 09:12" for recent entries and
//! an absolute date otherwise. The two day boundaries are computed once per
//! request so every entry in one response is judged against the same clock.

use std::time::SystemTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, Time, UtcOffset};

const CLOCK: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");
const ABSOLUTE: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [year] [hour]:[minute]");

#[derive(Debug, Clone, Copy)]
pub struct DateBoundaries {
    today: OffsetDateTime,
    yesterday: OffsetDateTime,
    offset: UtcOffset,
}

impl DateBoundaries {
    /// Boundaries for the current local day.
    ///
    /// Falls back to UTC when the local offset cannot be determined (the
    /// `time` crate refuses to read it in some multi-threaded processes).
    pub fn now() -> Self {
        let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        Self::at(OffsetDateTime::now_utc().to_offset(offset))
    }

    pub fn at(now: OffsetDateTime) -> Self {
        let today = now.replace_time(Time::MIDNIGHT);
        Self {
            today,
            yesterday: today - Duration::days(1),
            offset: now.offset(),
        }
    }

    fn local(&self, mtime: SystemTime) -> OffsetDateTime {
        OffsetDateTime::from(mtime).to_offset(self.offset)
    }

    /// "Today HH:MM", "Yesterday HH:MM" or "DD Mon YYYY HH:MM"
    pub fn render(&self, mtime: SystemTime) -> String {
        let stamp = self.local(mtime);
        if stamp >= self.today {
            format!("Today {}", stamp.format(CLOCK).unwrap_or_default())
        } else if stamp >= self.yesterday {
            format!("Yesterday {}", stamp.format(CLOCK).unwrap_or_default())
        } else {
            stamp.format(ABSOLUTE).unwrap_or_default()
        }
    }

    /// Always the absolute form
    pub fn render_absolute(&self, mtime: SystemTime) -> String {
        self.local(mtime).format(ABSOLUTE).unwrap_or_default()
    }
}
