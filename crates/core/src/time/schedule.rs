use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

// Longest DST gap we step across when the configured time does not exist locally.
const GAP_STEP_MINUTES: i64 = 15;
const GAP_MAX_STEPS: i64 = 12;

/// Next instant strictly after `now` at which the local clock in `tz` reads `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let mut date = now.with_timezone(&tz).date_naive();
    loop {
        if let Some(candidate) = resolve_local(tz, date, at) {
            if candidate > now {
                return candidate;
            }
        }
        date = date.succ_opt().unwrap_or(date + Duration::days(1));
    }
}

/// Map a wall-clock time to UTC. Ambiguous times take the earlier instant; times
/// inside a DST gap move forward to the first valid local time.
fn resolve_local(tz: Tz, date: NaiveDate, at: NaiveTime) -> Option<DateTime<Utc>> {
    let naive = date.and_time(at);
    (0..=GAP_MAX_STEPS)
        .map(|step| naive + Duration::minutes(step * GAP_STEP_MINUTES))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Calendar date of `at` on the local clock in `tz`.
pub fn local_date(at: DateTime<Utc>, tz: Tz) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// Reporting window ending at `now` and covering `interval_days` days.
pub fn report_window(now: DateTime<Utc>, interval_days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(i64::from(interval_days)), now)
}

/// Window of the same length ending the day before `start`.
///
/// Analytics date ranges are inclusive on both ends, so the two windows must not
/// share a boundary day.
pub fn previous_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let prev_end = start - Duration::days(1);
    (prev_end - (end - start), prev_end)
}
