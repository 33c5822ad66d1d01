//! Ticket issuance: a process-wide, injectable sequence of queue codes.
//!
//! The counter is owned by whoever constructs the [`TicketSequence`] — never
//! a hidden global — so tests can seed it and a restarted process can rebuild
//! it from stored records. Codes run within an *epoch*: one clinic-local
//! operating day. The first issue of a new day resets the counter, and within
//! a day the code simply widens past `A999` (`A1000`, `A1001`, ...) rather
//! than wrapping, keeping every code of the epoch unique.

use crate::environment::clinic_day;
use crate::record::{AttendanceRecord, TicketCode};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Monotonic issuer of [`TicketCode`]s with a daily reset epoch.
///
/// Not internally synchronized: wrap it in a mutex when multiple reception
/// stations share one issuer.
#[derive(Debug, Clone)]
pub struct TicketSequence {
    offset: FixedOffset,
    epoch: Option<NaiveDate>,
    last: u32,
}

impl TicketSequence {
    /// Create a fresh sequence for a clinic at the given UTC offset.
    ///
    /// The epoch starts on the first [`TicketSequence::next`] call.
    #[must_use]
    pub const fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            epoch: None,
            last: 0,
        }
    }

    /// Issue the next ticket code as of `now`.
    ///
    /// Crossing into a new clinic-local day resets the counter first, so the
    /// first patient of each day gets `A001`.
    pub fn next(&mut self, now: DateTime<Utc>) -> TicketCode {
        self.roll_epoch(now);
        self.last += 1;
        TicketCode::from_sequence(self.last)
    }

    /// The highest sequence number issued in the current epoch, 0 if none.
    #[must_use]
    pub const fn last_issued(&self) -> u32 {
        self.last
    }

    /// Fast-forward the counter past `sequence` for the epoch containing
    /// `now`.
    ///
    /// A no-op when the counter is already further along; crossing into a
    /// new day discards the old epoch first.
    pub fn resume_after(&mut self, sequence: u32, now: DateTime<Utc>) {
        self.roll_epoch(now);
        if sequence > self.last {
            self.last = sequence;
        }
    }

    /// Rebuild the sequence from stored records at process start.
    ///
    /// Scans the records created on the clinic-local day of `now` and resumes
    /// after the highest sequence number found, so a restart never re-issues
    /// a code already handed out today. Records from earlier days are
    /// ignored — their epoch is over.
    #[must_use]
    pub fn recover(
        records: &[AttendanceRecord],
        offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> Self {
        let today = clinic_day(now, offset);
        let highest = records
            .iter()
            .filter(|record| clinic_day(record.created_at, offset) == today)
            .filter_map(|record| record.ticket_code.sequence())
            .max()
            .unwrap_or(0);

        let mut sequence = Self::new(offset);
        sequence.resume_after(highest, now);
        sequence
    }

    fn roll_epoch(&mut self, now: DateTime<Utc>) {
        let today = clinic_day(now, self.offset);
        if self.epoch != Some(today) {
            self.epoch = Some(today);
            self.last = 0;
        }
    }
}
