use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

mod solar;


/// Geographic coordinates of an entity.
///
/// Validated at registration/configuration time; the calculator assumes
/// values are already in range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Build validated coordinates.
    ///
    /// Latitude must lie in [-90, 90] and longitude in [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }
}

/// Coordinate validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateError {
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
    NotFinite,
}

impl fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateError::LatitudeOutOfRange(lat) => {
                write!(f, "latitude {} outside [-90, 90]", lat)
            }
            CoordinateError::LongitudeOutOfRange(lon) => {
                write!(f, "longitude {} outside [-180, 180]", lon)
            }
            CoordinateError::NotFinite => write!(f, "coordinates must be finite numbers"),
        }
    }
}

impl std::error::Error for CoordinateError {}

/// The five daily astronomical anchors, in chronological order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Anchor {
    /// All anchors in chronological order.
    pub const ALL: [Anchor; 5] = [
        Anchor::Fajr,
        Anchor::Dhuhr,
        Anchor::Asr,
        Anchor::Maghrib,
        Anchor::Isha,
    ];

    /// Stable key used in event definitions and fire records.
    pub fn key(self) -> &'static str {
        match self {
            Anchor::Fajr => "fajr",
            Anchor::Dhuhr => "dhuhr",
            Anchor::Asr => "asr",
            Anchor::Maghrib => "maghrib",
            Anchor::Isha => "isha",
        }
    }

    /// Human-readable name for rendered messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Anchor::Fajr => "Fajr",
            Anchor::Dhuhr => "Dhuhr",
            Anchor::Asr => "Asr",
            Anchor::Maghrib => "Maghrib",
            Anchor::Isha => "Isha",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Named calculation conventions (twilight angle per anchor).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalculationMethod {
    MuslimWorldLeague,
    Karachi,
    Egyptian,
    NorthAmerica,
    UmmAlQura,
}

impl CalculationMethod {
    /// Twilight parameters for this method. Asr shadow factor defaults to 1
    /// and is overridable via configuration.
    pub fn params(self) -> CalculationParams {
        let (fajr_angle, isha) = match self {
            CalculationMethod::MuslimWorldLeague => (18.0, IshaRule::TwilightAngle(17.0)),
            CalculationMethod::Karachi => (18.0, IshaRule::TwilightAngle(18.0)),
            CalculationMethod::Egyptian => (19.5, IshaRule::TwilightAngle(17.5)),
            CalculationMethod::NorthAmerica => (15.0, IshaRule::TwilightAngle(15.0)),
            CalculationMethod::UmmAlQura => (18.5, IshaRule::MinutesAfterMaghrib(90)),
        };
        CalculationParams {
            fajr_angle,
            isha,
            asr_shadow_factor: 1.0,
        }
    }
}

/// How isha is derived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IshaRule {
    /// Sun this many degrees below the horizon.
    TwilightAngle(f64),
    /// Fixed interval after maghrib.
    MinutesAfterMaghrib(u32),
}

/// Resolved calculation parameters fed to [`compute`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalculationParams {
    pub fajr_angle: f64,
    pub isha: IshaRule,
    pub asr_shadow_factor: f64,
}

/// Sun altitude accounting for atmospheric refraction at the horizon.
const HORIZON_ANGLE: f64 = 0.833;

/// The five anchor instants for one entity and calendar date.
///
/// `None` marks an anchor that does not occur on this date at this
/// latitude (polar degeneracy); the matcher skips it for the day.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrayerTimes {
    pub fajr: Option<NaiveTime>,
    pub dhuhr: Option<NaiveTime>,
    pub asr: Option<NaiveTime>,
    pub maghrib: Option<NaiveTime>,
    pub isha: Option<NaiveTime>,
}

impl PrayerTimes {
    /// Instant for one anchor.
    pub fn get(&self, anchor: Anchor) -> Option<NaiveTime> {
        match anchor {
            Anchor::Fajr => self.fajr,
            Anchor::Dhuhr => self.dhuhr,
            Anchor::Asr => self.asr,
            Anchor::Maghrib => self.maghrib,
            Anchor::Isha => self.isha,
        }
    }

    /// Anchors in chronological order with their instants.
    pub fn iter(&self) -> impl Iterator<Item = (Anchor, Option<NaiveTime>)> + '_ {
        Anchor::ALL.into_iter().map(|a| (a, self.get(a)))
    }
}

/// Compute the prayer schedule for one entity and calendar date.
///
/// Deterministic and pure: for a fixed (coordinates, date, params,
/// zone offset) the same instants are produced on every call, at minute
/// resolution, monotonically ordered through the day wherever defined.
///
/// `utc_offset_minutes` is the entity's configured zone; the returned
/// instants are civil local times in that zone.
pub fn compute(
    coords: Coordinates,
    date: NaiveDate,
    params: &CalculationParams,
    utc_offset_minutes: i32,
) -> PrayerTimes {
    // Longitude-corrected Julian date: computations run in local solar time
    let jdate = solar::julian_day(date) - coords.lon / (15.0 * 24.0);

    let fajr = solar::sun_angle_time(
        jdate,
        coords.lat,
        params.fajr_angle,
        5.0 / 24.0,
        solar::Direction::Ccw,
    );
    let dhuhr = Some(solar::mid_day(jdate, 12.0 / 24.0));
    let asr = solar::asr_time(jdate, coords.lat, params.asr_shadow_factor, 13.0 / 24.0);
    let maghrib = solar::sun_angle_time(
        jdate,
        coords.lat,
        HORIZON_ANGLE,
        18.0 / 24.0,
        solar::Direction::Cw,
    );
    let isha = match params.isha {
        IshaRule::TwilightAngle(angle) => solar::sun_angle_time(
            jdate,
            coords.lat,
            angle,
            18.0 / 24.0,
            solar::Direction::Cw,
        ),
        IshaRule::MinutesAfterMaghrib(minutes) => {
            maghrib.map(|t| t + f64::from(minutes) / 60.0)
        }
    };

    // Shift from local solar time to civil time in the configured zone
    let shift = f64::from(utc_offset_minutes) / 60.0 - coords.lon / 15.0;

    PrayerTimes {
        fajr: fajr.and_then(|t| to_time(t + shift)),
        dhuhr: dhuhr.and_then(|t| to_time(t + shift)),
        asr: asr.and_then(|t| to_time(t + shift)),
        maghrib: maghrib.and_then(|t| to_time(t + shift)),
        isha: isha.and_then(|t| to_time(t + shift)),
    }
}

/// Convert fractional hours to a minute-resolution local time.
fn to_time(hours: f64) -> Option<NaiveTime> {
    if !hours.is_finite() {
        return None;
    }
    let minutes = (hours.rem_euclid(24.0) * 60.0).round() as u32 % (24 * 60);
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}
