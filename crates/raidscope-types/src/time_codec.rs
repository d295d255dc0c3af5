//! Conversions between countdown text and fractional minutes.

use chrono::{DateTime, Duration, Utc};

/// Parses `"H:MM:SS"` or `"MM:SS"` into minutes.
///
/// Any other shape, or a part that is not a non-negative integer, yields `0.0`.
/// Callers treat `0.0` as "no valid duration".
pub fn parse_duration(text: &str) -> f64 {
    let parts: Option<Vec<u64>> = text
        .trim()
        .split(':')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect();

    match parts.as_deref() {
        Some([hours, minutes, seconds]) => {
            (*hours as f64) * 60.0 + *minutes as f64 + *seconds as f64 / 60.0
        }
        Some([minutes, seconds]) => *minutes as f64 + *seconds as f64 / 60.0,
        _ => 0.0,
    }
}

/// Formats minutes as zero-padded `"HH:MM:SS"`.
///
/// Seconds are rounded independently of the minutes field, so `59.999` minutes
/// renders as `"00:59:60"`. Negative or non-finite input formats as zero.
pub fn format_duration(minutes: f64) -> String {
    let minutes = if minutes.is_finite() && minutes > 0.0 {
        minutes
    } else {
        0.0
    };
    let hours = (minutes / 60.0).floor() as u64;
    let mins = (minutes % 60.0).floor() as u64;
    let secs = ((minutes % 1.0) * 60.0).round() as u64;
    format!("{hours:02}:{mins:02}:{secs:02}")
}

/// Minutes as a chrono duration, rounded to the millisecond.
///
/// `None` when the value is not finite or does not fit a `Duration`.
pub fn minutes_to_duration(minutes: f64) -> Option<Duration> {
    let millis = (minutes * 60_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// Signed minutes from `from` to `to`.
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_three_and_two_part_forms() {
        assert_eq!(parse_duration("01:30:00"), 90.0);
        assert_eq!(parse_duration("1:30:00"), 90.0);
        assert_eq!(parse_duration(" 12:30 "), 12.5);
        assert!((parse_duration("0:00:20") - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_input_yields_zero() {
        assert_eq!(parse_duration(""), 0.0);
        assert_eq!(parse_duration("90"), 0.0);
        assert_eq!(parse_duration("1:2:3:4"), 0.0);
        assert_eq!(parse_duration("ab:cd"), 0.0);
        assert_eq!(parse_duration("-1:00"), 0.0);
        assert_eq!(parse_duration("1::00"), 0.0);
    }

    #[test]
    fn format_pads_fields() {
        assert_eq!(format_duration(90.0), "01:30:00");
        assert_eq!(format_duration(0.5), "00:00:30");
        assert_eq!(format_duration(61.25), "01:01:15");
        assert_eq!(format_duration(6000.0), "100:00:00");
    }

    #[test]
    fn format_keeps_sixty_second_rounding_quirk() {
        assert_eq!(format_duration(59.999), "00:59:60");
        assert_eq!(format_duration(0.9999), "00:00:60");
    }

    #[test]
    fn format_clamps_negative_to_zero() {
        assert_eq!(format_duration(-5.0), "00:00:00");
        assert_eq!(format_duration(f64::NAN), "00:00:00");
    }

    #[test]
    fn chrono_helpers_agree() {
        let start = Utc::now();
        let end = start + minutes_to_duration(90.5).expect("in range");
        assert!((minutes_between(start, end) - 90.5).abs() < 1e-9);
    }

    #[test]
    fn oversized_minutes_have_no_duration() {
        assert!(minutes_to_duration(f64::INFINITY).is_none());
        assert!(minutes_to_duration(f64::NAN).is_none());
        assert!(minutes_to_duration(1e300).is_none());
        assert!(minutes_to_duration(parse_duration("2500000000:00:00")).is_some());
    }

    proptest! {
        #[test]
        fn prop_round_trip_integer_seconds(total_secs in 0u64..(100 * 3600)) {
            let minutes = total_secs as f64 / 60.0;
            let parsed = parse_duration(&format_duration(minutes));
            prop_assert!((parsed - minutes).abs() <= 1.0 / 60.0 + 1e-9);
        }

        #[test]
        fn prop_seconds_field_never_exceeds_sixty(minutes in 0.0f64..6000.0) {
            let text = format_duration(minutes);
            let secs: u64 = text.rsplit(':').next().unwrap().parse().unwrap();
            prop_assert!(secs <= 60);
        }
    }
}
