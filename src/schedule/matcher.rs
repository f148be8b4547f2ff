use crate::prayer::PrayerTimes;
use crate::schedule::{EventDefinition, EventRule};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::collections::BTreeMap;

/// Truncate an instant to minute resolution.
///
/// All matching runs on minute-truncated instants; the tick interval is
/// at most 60 seconds, so exact-minute equality cannot skip an event.
pub fn truncate_to_minute(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// Select the definitions newly due at `now` for one entity.
///
/// Pure function of `(now, times, fired)`: a definition is due iff its
/// minute-resolution target instant equals `now` and its key has not
/// already fired today. Anchors unavailable for the day (polar
/// degeneracy) never match. Result preserves definition-list order.
pub fn due_events<'a>(
    now: NaiveDateTime,
    definitions: &'a [EventDefinition],
    times: &PrayerTimes,
    fired: Option<&BTreeMap<String, NaiveDate>>,
) -> Vec<&'a EventDefinition> {
    let now = truncate_to_minute(now);
    let today = now.date();

    definitions
        .iter()
        .filter(|def| {
            let target = match def.rule {
                EventRule::Anchor {
                    anchor,
                    offset_minutes,
                } => times
                    .get(anchor)
                    .map(|t| today.and_time(t) + Duration::minutes(offset_minutes)),
                EventRule::FixedDaily { hour, minute } => {
                    NaiveTime::from_hms_opt(hour, minute, 0).map(|t| today.and_time(t))
                }
                EventRule::Weekly {
                    weekday,
                    hour,
                    minute,
                } => {
                    // Weekday precondition before the date-equality check
                    if now.weekday() != weekday {
                        return false;
                    }
                    NaiveTime::from_hms_opt(hour, minute, 0).map(|t| today.and_time(t))
                }
            };

            match target {
                Some(target) if target == now => {
                    fired.and_then(|m| m.get(&def.key)) != Some(&today)
                }
                _ => false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prayer::Anchor;
    use chrono::Weekday;

    fn times() -> PrayerTimes {
        PrayerTimes {
            fajr: NaiveTime::from_hms_opt(5, 14, 0),
            dhuhr: NaiveTime::from_hms_opt(12, 20, 0),
            asr: NaiveTime::from_hms_opt(15, 35, 0),
            maghrib: NaiveTime::from_hms_opt(18, 4, 0),
            isha: NaiveTime::from_hms_opt(19, 21, 0),
        }
    }

    fn defs() -> Vec<EventDefinition> {
        vec![
            EventDefinition::exact(Anchor::Fajr),
            EventDefinition::pre_reminder(Anchor::Fajr, 15),
            EventDefinition::exact(Anchor::Maghrib),
            EventDefinition::fixed_daily("daily_verse", 9, 0),
            EventDefinition::weekly("weekly_jumua", Weekday::Fri, 9, 30),
        ]
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        // 2024-03-01 is a Friday
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn exact_minute_matches() {
        let defs = defs();
        let due = due_events(at(18, 4), &defs, &times(), None);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].key, "maghrib");
    }

    #[test]
    fn adjacent_minutes_do_not_match() {
        assert!(due_events(at(18, 3), &defs(), &times(), None).is_empty());
        assert!(due_events(at(18, 5), &defs(), &times(), None).is_empty());
    }

    #[test]
    fn seconds_are_ignored() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(18, 4, 59)
            .unwrap();
        let defs = defs();
        let due = due_events(now, &defs, &times(), None);
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn fired_today_suppresses() {
        let mut fired = BTreeMap::new();
        fired.insert(
            "maghrib".to_string(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        assert!(due_events(at(18, 4), &defs(), &times(), Some(&fired)).is_empty());
    }

    #[test]
    fn fired_yesterday_does_not_suppress() {
        let mut fired = BTreeMap::new();
        fired.insert(
            "maghrib".to_string(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        );
        let defs = defs();
        let due = due_events(at(18, 4), &defs, &times(), Some(&fired));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].key, "maghrib");
    }

    #[test]
    fn pre_reminder_fires_at_offset_instant() {
        // fajr 05:14, offset -15 => 04:59
        let defs = defs();
        let due = due_events(at(4, 59), &defs, &times(), None);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].key, "fajr_pre");

        // fajr itself still fires at its own instant
        let due = due_events(at(5, 14), &defs, &times(), None);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].key, "fajr");
    }

    #[test]
    fn pre_reminder_dedup_is_independent() {
        let mut fired = BTreeMap::new();
        fired.insert(
            "fajr_pre".to_string(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        // fajr_pre already fired; fajr still due at its instant
        let defs = defs();
        let due = due_events(at(5, 14), &defs, &times(), Some(&fired));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].key, "fajr");
    }

    #[test]
    fn unavailable_anchor_is_skipped() {
        let degenerate = PrayerTimes {
            fajr: None,
            ..times()
        };
        assert!(due_events(at(5, 14), &defs(), &degenerate, None).is_empty());
        // pre-reminder of an unavailable anchor also skipped
        assert!(due_events(at(4, 59), &defs(), &degenerate, None).is_empty());
    }

    #[test]
    fn fixed_daily_matches_clock_time() {
        let defs = defs();
        let due = due_events(at(9, 0), &defs, &times(), None);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].key, "daily_verse");
    }

    #[test]
    fn weekly_gated_to_weekday() {
        // 2024-03-01 is a Friday: due
        let defs = defs();
        let due = due_events(at(9, 30), &defs, &times(), None);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].key, "weekly_jumua");

        // 2024-03-02 is a Saturday: not due at the same clock time
        let saturday = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert!(due_events(saturday, &defs, &times(), None).is_empty());
    }

    #[test]
    fn multiple_keys_due_in_one_minute() {
        let clash = PrayerTimes {
            maghrib: NaiveTime::from_hms_opt(9, 0, 0),
            ..times()
        };
        let defs = defs();
        let due = due_events(at(9, 0), &defs, &clash, None);
        let keys: Vec<_> = due.iter().map(|d| d.key.as_str()).collect();
        // Definition-list order preserved
        assert_eq!(keys, vec!["maghrib", "daily_verse"]);
    }

    #[test]
    fn offset_crossing_midnight_does_not_match_today() {
        // Anchor at 00:05 with a 15 minute pre-reminder lands on the
        // previous date; it must not fire at 23:50 today
        let early = PrayerTimes {
            fajr: NaiveTime::from_hms_opt(0, 5, 0),
            ..times()
        };
        let defs = vec![EventDefinition::pre_reminder(Anchor::Fajr, 15)];
        assert!(due_events(at(23, 50), &defs, &early, None).is_empty());
    }
}
