// seconds-within-day arithmetic and formatting

use chrono::{NaiveTime, Timelike};

/// upper bound (exclusive) of a seconds-within-day value
pub const SECONDS_PER_DAY: i64 = 86_400;

/// raw readout value marking "no time recorded" on the card
pub const NO_TIME: i64 = 0xEEEE;

/// Format a duration as `M:SS`, or `H:MM:SS` from one hour up.
pub fn fmt_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (h, rem) = (seconds / 3600, seconds % 3600);
    let (m, s) = (rem / 60, rem % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// `fmt_duration` for optional values; None renders empty.
pub fn fmt_duration_opt(seconds: Option<i64>) -> String {
    seconds.map(fmt_duration).unwrap_or_default()
}

/// Format a wall-clock seconds-within-day value as `HH:MM:SS` with the hour
/// padded to two columns (receipt header geometry).
pub fn fmt_clock(seconds: i64) -> String {
    let seconds = seconds.rem_euclid(SECONDS_PER_DAY);
    let (h, rem) = (seconds / 3600, seconds % 3600);
    let (m, s) = (rem / 60, rem % 60);
    format!("{h:>2}:{m:02}:{s:02}")
}

/// `fmt_clock` for optional values; None renders empty.
pub fn fmt_clock_opt(seconds: Option<i64>) -> String {
    seconds.map(fmt_clock).unwrap_or_default()
}

/// Division that treats a missing or non-positive divisor as "no value".
pub fn safe_div(numerator: i64, divisor: i64) -> Option<i64> {
    (divisor > 0).then(|| numerator / divisor)
}

/// Seconds per kilometre for a leg of the given length in metres.
pub fn pace_seconds(leg_seconds: i64, leg_length_m: i64) -> Option<i64> {
    safe_div(leg_seconds * 1000, leg_length_m)
}

/// Wall-clock time of a start slot given the time of slot 0. Slots are whole
/// minutes; wraps around midnight like the rest of day-seconds arithmetic.
pub fn slot_to_clock(slot0: NaiveTime, slot: u32) -> NaiveTime {
    let seconds = (slot0.num_seconds_from_midnight() as i64 + slot as i64 * 60)
        .rem_euclid(SECONDS_PER_DAY);
    NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, 0)
        .unwrap_or(slot0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_below_one_hour_drop_the_hour() {
        assert_eq!(fmt_duration(0), "0:00");
        assert_eq!(fmt_duration(33), "0:33");
        assert_eq!(fmt_duration(299), "4:59");
        assert_eq!(fmt_duration(1955), "32:35");
        assert_eq!(fmt_duration(3599), "59:59");
    }

    #[test]
    fn durations_from_one_hour_use_three_fields() {
        assert_eq!(fmt_duration(3600), "1:00:00");
        assert_eq!(fmt_duration(3661), "1:01:01");
        assert_eq!(fmt_duration(7322), "2:02:02");
    }

    #[test]
    fn clock_pads_the_hour() {
        assert_eq!(fmt_clock(60386), "16:46:26");
        assert_eq!(fmt_clock(25200), " 7:00:00");
        assert_eq!(fmt_clock_opt(None), "");
    }

    #[test]
    fn safe_div_rejects_non_positive_divisors() {
        assert_eq!(safe_div(100, 0), None);
        assert_eq!(safe_div(100, -5), None);
        assert_eq!(safe_div(100, 3), Some(33));
    }

    #[test]
    fn pace_is_floored_seconds_per_km() {
        // 33 s over a 16 m leg -> 2062.5 s/km, floored
        assert_eq!(pace_seconds(33, 16), Some(2062));
        assert_eq!(pace_seconds(33, 0), None);
    }

    #[test]
    fn slot_clock_advances_by_minutes() {
        let slot0 = NaiveTime::from_hms_opt(11, 0, 0).unwrap();
        assert_eq!(slot_to_clock(slot0, 0), slot0);
        assert_eq!(
            slot_to_clock(slot0, 75),
            NaiveTime::from_hms_opt(12, 15, 0).unwrap()
        );
    }
}
