//! Turns a medicine's dosing frequency into concrete dose slots for a day.

use time::{macros::time, Date, OffsetDateTime, Time};
use tracing::warn;

use super::repo_types::SlotSpec;
use crate::medicines::repo_types::{Frequency, Medicine};

const DAILY: &[Time] = &[time!(09:00)];
const TWICE_DAILY: &[Time] = &[time!(09:00), time!(18:00)];
const THREE_TIMES_DAILY: &[Time] = &[time!(08:00), time!(14:00), time!(20:00)];
const WEEKLY: &[Time] = &[time!(09:00)];

/// Calendar date slots are generated for (UTC).
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Canonical dose times for a frequency.
pub fn canonical_times(frequency: Frequency) -> &'static [Time] {
    match frequency {
        Frequency::Daily => DAILY,
        Frequency::TwiceDaily => TWICE_DAILY,
        Frequency::ThreeTimesDaily => THREE_TIMES_DAILY,
        Frequency::Weekly => WEEKLY,
        Frequency::AsNeeded => &[],
    }
}

/// Slots for `target` given a frequency label and the course start date.
///
/// Weekly medicines get their slot only once `target` has reached
/// `start_date`. Unknown labels yield nothing.
pub fn generate_slots(frequency: &str, start_date: Date, target: Date) -> Vec<SlotSpec> {
    let Some(freq) = Frequency::from_label(frequency) else {
        warn!(frequency, "unknown frequency, no schedule generated");
        return Vec::new();
    };
    if freq == Frequency::Weekly && target < start_date {
        return Vec::new();
    }
    canonical_times(freq)
        .iter()
        .map(|&time| SlotSpec { date: target, time })
        .collect()
}

/// Slots to materialise for an existing medicine on `date`.
///
/// Nothing outside the course (`start_date..=end_date`), and weekly
/// medicines only on whole weeks after their start date.
pub fn slots_due(medicine: &Medicine, date: Date) -> Vec<SlotSpec> {
    if !medicine.covers(date) {
        return Vec::new();
    }
    if Frequency::from_label(&medicine.frequency) == Some(Frequency::Weekly)
        && (date - medicine.start_date).whole_days() % 7 != 0
    {
        return Vec::new();
    }
    generate_slots(&medicine.frequency, medicine.start_date, date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn times(slots: &[SlotSpec]) -> Vec<Time> {
        slots.iter().map(|s| s.time).collect()
    }

    fn medicine(frequency: &str, start: Date, end: Option<Date>) -> Medicine {
        Medicine {
            id: 1,
            user_id: 1,
            name: "Aspirin".into(),
            dosage: "100mg".into(),
            frequency: frequency.into(),
            start_date: start,
            end_date: end,
            notes: None,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn fixed_frequencies_yield_canonical_slots() {
        let start = date!(2025 - 06 - 01);
        let target = date!(2025 - 06 - 10);

        let daily = generate_slots("daily", start, target);
        assert_eq!(times(&daily), vec![time!(09:00)]);

        let twice = generate_slots("twice-daily", start, target);
        assert_eq!(times(&twice), vec![time!(09:00), time!(18:00)]);

        let three = generate_slots("three-times-daily", start, target);
        assert_eq!(times(&three), vec![time!(08:00), time!(14:00), time!(20:00)]);

        assert!(daily.iter().chain(&twice).chain(&three).all(|s| s.date == target));
    }

    #[test]
    fn fixed_frequencies_on_start_date() {
        let d = date!(2025 - 06 - 10);
        assert_eq!(generate_slots("daily", d, d).len(), 1);
        assert_eq!(generate_slots("twice-daily", d, d).len(), 2);
        assert_eq!(generate_slots("three-times-daily", d, d).len(), 3);
    }

    #[test]
    fn weekly_requires_target_on_or_after_start() {
        let start = date!(2025 - 06 - 10);
        assert_eq!(generate_slots("weekly", start, start).len(), 1);
        assert_eq!(generate_slots("weekly", start, date!(2025 - 06 - 11)).len(), 1);
        assert!(generate_slots("weekly", start, date!(2025 - 06 - 09)).is_empty());
    }

    #[test]
    fn as_needed_and_unknown_yield_nothing() {
        let d = date!(2025 - 06 - 10);
        assert!(generate_slots("as-needed", d, d).is_empty());
        assert!(generate_slots("hourly", d, d).is_empty());
        assert!(generate_slots("", d, d).is_empty());
        assert!(generate_slots("Daily", d, d).is_empty());
    }

    #[test]
    fn due_slots_respect_course_bounds() {
        let m = medicine("daily", date!(2025 - 06 - 10), Some(date!(2025 - 06 - 12)));
        assert!(slots_due(&m, date!(2025 - 06 - 09)).is_empty());
        assert_eq!(slots_due(&m, date!(2025 - 06 - 12)).len(), 1);
        assert!(slots_due(&m, date!(2025 - 06 - 13)).is_empty());
    }

    #[test]
    fn weekly_due_only_on_whole_weeks() {
        let m = medicine("weekly", date!(2025 - 06 - 10), None);
        assert_eq!(slots_due(&m, date!(2025 - 06 - 10)).len(), 1);
        assert!(slots_due(&m, date!(2025 - 06 - 13)).is_empty());
        assert_eq!(slots_due(&m, date!(2025 - 06 - 24)).len(), 1);
    }
}
