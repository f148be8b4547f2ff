//! Solar position math for the prayer time calculator.
//!
//! Implements the standard hour-angle formulation: sun declination and
//! equation of time from the Julian date, then event instants as offsets
//! from solar noon. All angles are in degrees, all times in fractional
//! hours of the local solar day.

use chrono::{Datelike, NaiveDate};

/// Sun position quantities for one instant.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SolarPosition {
    /// Declination of the sun (degrees).
    pub declination: f64,
    /// Equation of time (hours).
    pub equation_of_time: f64,
}

/// Direction of the hour-angle offset from solar noon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Before noon (fajr, sunrise).
    Ccw,
    /// After noon (sunset, maghrib, isha, asr).
    Cw,
}

/// Julian day number for midnight UTC of the given calendar date.
pub(crate) fn julian_day(date: NaiveDate) -> f64 {
    let (mut year, mut month) = (date.year() as f64, date.month() as f64);
    let day = date.day() as f64;

    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }

    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();

    (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + day + b - 1524.5
}

/// Compute sun declination and equation of time for a Julian date.
pub(crate) fn solar_position(jd: f64) -> SolarPosition {
    let d = jd - 2451545.0;

    let g = fix_angle(357.529 + 0.98560028 * d);
    let q = fix_angle(280.459 + 0.98564736 * d);
    let l = fix_angle(q + 1.915 * sin_deg(g) + 0.020 * sin_deg(2.0 * g));

    let e = 23.439 - 0.00000036 * d;

    let ra = atan2_deg(cos_deg(e) * sin_deg(l), cos_deg(l)) / 15.0;
    let declination = asin_deg(sin_deg(e) * sin_deg(l));
    // Normalize into [-12, 12): mean longitude and right ascension wrap
    // around the day boundary on different dates near the equinox
    let equation_of_time = (q / 15.0 - fix_hour(ra) + 12.0).rem_euclid(24.0) - 12.0;

    SolarPosition {
        declination,
        equation_of_time,
    }
}

/// Solar noon in local solar hours, for the day-fraction `t`.
pub(crate) fn mid_day(jdate: f64, t: f64) -> f64 {
    let eqt = solar_position(jdate + t).equation_of_time;
    fix_hour(12.0 - eqt)
}

/// Time at which the sun reaches `angle` degrees below the horizon.
///
/// Returns `None` when the sun never reaches the angle on this date at
/// this latitude (polar day/night and high-latitude twilight degeneracy).
pub(crate) fn sun_angle_time(
    jdate: f64,
    latitude: f64,
    angle: f64,
    t: f64,
    direction: Direction,
) -> Option<f64> {
    let decl = solar_position(jdate + t).declination;
    let noon = mid_day(jdate, t);

    let cos_hour_angle = (-sin_deg(angle) - sin_deg(decl) * sin_deg(latitude))
        / (cos_deg(decl) * cos_deg(latitude));

    if !(-1.0..=1.0).contains(&cos_hour_angle) {
        return None;
    }

    let offset = acos_deg(cos_hour_angle) / 15.0;
    Some(match direction {
        Direction::Ccw => noon - offset,
        Direction::Cw => noon + offset,
    })
}

/// Asr time for the given shadow factor (1 = standard, 2 = Hanafi).
pub(crate) fn asr_time(jdate: f64, latitude: f64, shadow_factor: f64, t: f64) -> Option<f64> {
    let decl = solar_position(jdate + t).declination;
    let angle = -acot_deg(shadow_factor + tan_deg((latitude - decl).abs()));
    sun_angle_time(jdate, latitude, angle, t, Direction::Cw)
}

fn fix_angle(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

fn fix_hour(hour: f64) -> f64 {
    hour.rem_euclid(24.0)
}

fn sin_deg(d: f64) -> f64 {
    d.to_radians().sin()
}

fn cos_deg(d: f64) -> f64 {
    d.to_radians().cos()
}

fn tan_deg(d: f64) -> f64 {
    d.to_radians().tan()
}

fn asin_deg(x: f64) -> f64 {
    x.asin().to_degrees()
}

fn acos_deg(x: f64) -> f64 {
    x.acos().to_degrees()
}

fn atan2_deg(y: f64, x: f64) -> f64 {
    y.atan2(x).to_degrees()
}

fn acot_deg(x: f64) -> f64 {
    (1.0 / x).atan().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn julian_day_known_dates() {
        // 2000-01-01 is JD 2451544.5 at midnight UTC
        let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert!((julian_day(date) - 2451544.5).abs() < 1e-9);

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!((julian_day(date) - 2460370.5).abs() < 1e-9);
    }

    #[test]
    fn declination_bounded_by_obliquity() {
        for day in [0, 80, 172, 265, 355] {
            let jd = 2460310.5 + day as f64;
            let pos = solar_position(jd);
            assert!(pos.declination.abs() < 23.5, "decl {} on day {}", pos.declination, day);
        }
    }

    #[test]
    fn equation_of_time_stays_small() {
        // Equation of time never exceeds about 17 minutes
        for day in 0..365 {
            let eqt = solar_position(2460310.5 + day as f64).equation_of_time;
            assert!(eqt.abs() < 0.3, "eqt {} hours on day {}", eqt, day);
        }
    }

    #[test]
    fn sun_angle_symmetry_around_noon() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let jdate = julian_day(date);
        let noon = mid_day(jdate, 0.5);

        let before = sun_angle_time(jdate, 33.0, 0.833, 0.25, Direction::Ccw).unwrap();
        let after = sun_angle_time(jdate, 33.0, 0.833, 0.75, Direction::Cw).unwrap();
        assert!(before < noon && noon < after);
    }

    #[test]
    fn polar_twilight_degenerates_to_none() {
        // Midsummer above the arctic circle: the sun never reaches 18 degrees
        // below the horizon, and never sets at all
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let jdate = julian_day(date);
        assert!(sun_angle_time(jdate, 78.0, 18.0, 0.2, Direction::Ccw).is_none());
        assert!(sun_angle_time(jdate, 78.0, 0.833, 0.75, Direction::Cw).is_none());
    }
}
