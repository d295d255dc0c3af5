//! Interpretation of raw row text: distances, arrival clocks, identity keys.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use raidscope_types::row::{non_empty, RawRow};

/// Arrival estimates within this many seconds of each other are the same event.
pub const ARRIVAL_SLACK_SECS: i64 = 2;

/// Leading decimal number of a distance field, e.g. `"10.2 fields"` -> `10.2`.
///
/// Accepts a comma decimal separator. Non-positive values are rejected.
pub fn parse_distance(text: &str) -> Option<f64> {
    let number: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    number
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

/// Resolves arrival text against `now` (UTC).
///
/// Understands `today at 14:32:10[:mmm]`, `tomorrow at ...`, `on 17.10. at ...`
/// and a bare clock time. A bare time already past today rolls to tomorrow;
/// an explicit `today` does not.
pub fn parse_arrival(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lowered = text.to_ascii_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    let time = tokens.iter().rev().find_map(|token| parse_clock(token))?;
    let today = now.date_naive();

    let date = if tokens.contains(&"tomorrow") {
        today.checked_add_days(Days::new(1))?
    } else if tokens.contains(&"today") {
        today
    } else if let Some(date) = tokens.iter().find_map(|token| parse_day_month(token, today)) {
        date
    } else {
        let candidate = Utc.from_utc_datetime(&today.and_time(time));
        return Some(if candidate <= now {
            candidate + chrono::Duration::days(1)
        } else {
            candidate
        });
    };

    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

/// `H:MM`, `H:MM:SS` or `H:MM:SS:mmm`.
fn parse_clock(token: &str) -> Option<NaiveTime> {
    let parts: Vec<u32> = token
        .split(':')
        .map(|part| part.parse::<u32>().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [h, m] => NaiveTime::from_hms_opt(*h, *m, 0),
        [h, m, s] => NaiveTime::from_hms_opt(*h, *m, *s),
        [h, m, s, ms] => NaiveTime::from_hms_milli_opt(*h, *m, *s, *ms),
        _ => None,
    }
}

/// `17.10.` or `17.10`, in the current year unless that lies far in the past.
fn parse_day_month(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let mut parts = token.trim_end_matches('.').split('.');
    let day = parts.next()?.parse::<u32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if (today - date).num_days() > 180 {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(date)
    }
}

/// Arrival component of a derived identity.
///
/// `Exact` comes from absolute arrival text and only matches the same
/// millisecond. `Approx` is a countdown-derived second and matches anything
/// within [`ARRIVAL_SLACK_SECS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalKey {
    Exact(i64),
    Approx(i64),
}

impl ArrivalKey {
    pub fn exact(arrival_at: DateTime<Utc>) -> Self {
        Self::Exact(arrival_at.timestamp_millis())
    }

    pub fn approximate(arrival_at: DateTime<Utc>) -> Self {
        Self::Approx((arrival_at.timestamp_millis() as f64 / 1_000.0).round() as i64)
    }

    fn collides(&self, other: &ArrivalKey) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Approx(a), Self::Approx(b)) => (a - b).abs() <= ARRIVAL_SLACK_SECS,
            _ => false,
        }
    }
}

fn event_fields(row: &RawRow) -> Option<String> {
    let source = non_empty(&row.source)?;
    let target = non_empty(&row.target)?;
    let attacker = non_empty(&row.attacker).unwrap_or("");
    Some(format!("{attacker}|{source}|{target}"))
}

/// Identity keys a row may already be stored under, primary key first.
///
/// A page-supplied row id is used as is. Otherwise the key is built from the
/// attacker, source, target and arrival. An approximate arrival also yields
/// the neighbouring seconds within [`ARRIVAL_SLACK_SECS`] so that repeated
/// scans of the same countdown dedupe. A non-zero `occurrence` separates rows
/// of one scan that would otherwise share a key. Returns `None` when source or
/// target is missing.
pub fn identity_keys(row: &RawRow, arrival: ArrivalKey, occurrence: usize) -> Option<Vec<String>> {
    if let Some(id) = non_empty(&row.row_id) {
        return Some(vec![id.to_owned()]);
    }
    let fields = event_fields(row)?;
    let suffix = match occurrence {
        0 => String::new(),
        n => format!("#{n}"),
    };

    match arrival {
        ArrivalKey::Exact(millis) => Some(vec![format!("{fields}|@{millis}{suffix}")]),
        ArrivalKey::Approx(second) => {
            let offsets = std::iter::once(0).chain(
                (1..=ARRIVAL_SLACK_SECS).flat_map(|delta| [-delta, delta]),
            );
            Some(
                offsets
                    .map(|offset| format!("{fields}|{}{suffix}", second + offset))
                    .collect(),
            )
        }
    }
}

/// Numbers rows of one scan that share attacker, source and target and whose
/// arrivals collide, in page order.
///
/// The page lists such rows in a stable order, so the n-th of them gets the
/// same occurrence on every scan.
#[derive(Debug, Default)]
pub struct BatchOccurrences {
    seen: Vec<(String, ArrivalKey, usize)>,
}

impl BatchOccurrences {
    pub fn next(&mut self, row: &RawRow, arrival: ArrivalKey) -> usize {
        let Some(fields) = event_fields(row) else {
            return 0;
        };
        let occurrence = self
            .seen
            .iter()
            .filter(|(seen, key, _)| *seen == fields && key.collides(&arrival))
            .map(|(_, _, occurrence)| occurrence + 1)
            .max()
            .unwrap_or(0);
        self.seen.push((fields, arrival, occurrence));
        occurrence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, m, s).unwrap()
    }

    #[test]
    fn distance_strips_unit_suffix() {
        assert_eq!(parse_distance("10.2 fields"), Some(10.2));
        assert_eq!(parse_distance(" 7 "), Some(7.0));
        assert_eq!(parse_distance("3,5"), Some(3.5));
        assert_eq!(parse_distance("0"), None);
        assert_eq!(parse_distance("fields"), None);
        assert_eq!(parse_distance(""), None);
    }

    #[test]
    fn arrival_today_and_tomorrow() {
        let now = at(12, 0, 0);
        assert_eq!(parse_arrival("today at 14:32:10", now), Some(at(14, 32, 10)));
        assert_eq!(
            parse_arrival("tomorrow at 01:00:00:500", now),
            Some(at(1, 0, 0) + chrono::Duration::days(1) + chrono::Duration::milliseconds(500))
        );
        // Explicit today stays in the past.
        assert_eq!(parse_arrival("today at 11:00:00", now), Some(at(11, 0, 0)));
    }

    #[test]
    fn bare_clock_rolls_forward() {
        let now = at(12, 0, 0);
        assert_eq!(parse_arrival("13:00:00", now), Some(at(13, 0, 0)));
        assert_eq!(
            parse_arrival("11:00", now),
            Some(at(11, 0, 0) + chrono::Duration::days(1))
        );
    }

    #[test]
    fn arrival_with_day_month() {
        let now = at(12, 0, 0);
        assert_eq!(
            parse_arrival("on 18.10. at 08:15:00", now),
            Some(Utc.with_ymd_and_hms(2026, 10, 18, 8, 15, 0).unwrap())
        );
        assert_eq!(parse_arrival("soon", now), None);
        assert_eq!(parse_arrival("today at 25:00:00", now), None);
    }

    #[test]
    fn row_id_wins_over_derived_key() {
        let mut row = RawRow::with_countdown("500|500", "501|501", "1:00:00");
        row.row_id = Some("command_77".into());
        assert_eq!(
            identity_keys(&row, ArrivalKey::approximate(at(12, 0, 0)), 3),
            Some(vec!["command_77".to_string()])
        );
    }

    #[test]
    fn derived_keys_cover_arrival_slack() {
        let row = RawRow::with_countdown("500|500", "501|501", "1:00:00");
        let keys = identity_keys(&row, ArrivalKey::approximate(at(12, 0, 0)), 0).expect("keys");
        let second = at(12, 0, 0).timestamp();
        assert_eq!(keys.len(), 1 + 2 * ARRIVAL_SLACK_SECS as usize);
        assert_eq!(keys[0], format!("|500|500|501|501|{second}"));
        assert!(keys.contains(&format!("|500|500|501|501|{}", second - 2)));
        assert!(keys.contains(&format!("|500|500|501|501|{}", second + 2)));
    }

    #[test]
    fn exact_arrival_keys_keep_milliseconds() {
        let row = RawRow::with_countdown("500|500", "501|501", "2:55:00");
        let arrival = at(14, 32, 10) + chrono::Duration::milliseconds(150);
        let keys = identity_keys(&row, ArrivalKey::exact(arrival), 0).expect("keys");
        assert_eq!(
            keys,
            vec![format!("|500|500|501|501|@{}", arrival.timestamp_millis())]
        );
        let second = identity_keys(&row, ArrivalKey::exact(arrival), 2).expect("keys");
        assert_eq!(second, vec![format!("{}#2", keys[0])]);
    }

    #[test]
    fn batch_occurrences_number_colliding_rows() {
        let row = RawRow::with_countdown("500|500", "501|501", "1:00:00");
        let other_target = RawRow::with_countdown("500|500", "502|502", "1:00:00");
        let mut batch = BatchOccurrences::default();
        let approx = |s| ArrivalKey::approximate(at(12, 0, s));

        assert_eq!(batch.next(&row, approx(10)), 0);
        assert_eq!(batch.next(&row, approx(11)), 1);
        assert_eq!(batch.next(&row, approx(12)), 2);
        // Collides with 11 and 12 only, still ranks after them.
        assert_eq!(batch.next(&row, approx(13)), 3);
        assert_eq!(batch.next(&other_target, approx(10)), 0);
        assert_eq!(batch.next(&row, approx(30)), 0);

        let exact = ArrivalKey::exact(at(12, 0, 10));
        assert_eq!(batch.next(&row, exact), 0);
        assert_eq!(batch.next(&row, exact), 1);
        assert_eq!(
            batch.next(&row, ArrivalKey::Exact(at(12, 0, 10).timestamp_millis() + 50)),
            0
        );
    }

    #[test]
    fn missing_coordinates_have_no_identity() {
        let mut row = RawRow::with_countdown("", "501|501", "1:00:00");
        let arrival = ArrivalKey::approximate(at(12, 0, 0));
        assert_eq!(identity_keys(&row, arrival, 0), None);
        row.source = None;
        assert_eq!(identity_keys(&row, arrival, 0), None);
    }
}
