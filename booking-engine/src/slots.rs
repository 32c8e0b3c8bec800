//! Pure slot arithmetic over a weekly schedule.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use schedule_store::WeeklySchedule;
use std::collections::BTreeSet;

/// Every slot start inside the doctor's windows for `date`'s weekday.
///
/// A slot is generated only when it fits entirely in its window, so a
/// 09:00-11:30 window with 30 minute slots ends at 11:00.
pub fn generate_slots(schedule: &WeeklySchedule, date: NaiveDate, slot_minutes: u32) -> Vec<NaiveTime> {
    if slot_minutes == 0 {
        return Vec::new();
    }
    let step = Duration::minutes(i64::from(slot_minutes));

    let mut slots = Vec::new();
    for window in schedule.windows_on(date.weekday()) {
        let mut start = window.start;
        loop {
            let (end, wrapped) = start.overflowing_add_signed(step);
            if wrapped != 0 || end > window.end {
                break;
            }
            slots.push(start);
            start = end;
        }
    }
    slots
}

/// Generated slots minus booked times, minus anything not after `now`
pub fn open_slots(
    schedule: &WeeklySchedule,
    date: NaiveDate,
    slot_minutes: u32,
    booked: &[NaiveTime],
    now: NaiveDateTime,
) -> Vec<NaiveTime> {
    if date < now.date() {
        return Vec::new();
    }
    let booked: BTreeSet<NaiveTime> = booked.iter().copied().collect();
    generate_slots(schedule, date, slot_minutes)
        .into_iter()
        .filter(|t| !booked.contains(t))
        .filter(|t| date > now.date() || *t > now.time())
        .collect()
}

/// Order candidates by distance from `preferred`, earlier first on ties
pub fn nearest_first(mut times: Vec<NaiveTime>, preferred: NaiveTime) -> Vec<NaiveTime> {
    times.sort_by_key(|t| ((*t - preferred).num_minutes().abs(), *t));
    times
}
