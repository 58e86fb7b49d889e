// ABOUTME: Defines the recorded point types: trackpoints, waypoints, and raw location fixes.
// ABOUTME: Fixes are validated and converted into trackpoints before they reach the store.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when turning a raw fix into a storable point.
#[derive(Debug, Error, PartialEq)]
pub enum FixError {
    #[error("fix has no elevation")]
    MissingElevation,

    #[error("latitude out of range: {0}")]
    LatitudeOutOfRange(f64),

    #[error("longitude out of range: {0}")]
    LongitudeOutOfRange(f64),

    #[error("timestamp year {0} is outside 0000-9999")]
    TimeOutOfRange(i32),
}

/// A timestamped geographic sample recorded continuously during tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trackpoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub time: Option<DateTime<Utc>>,
}

impl Trackpoint {
    pub fn new(latitude: f64, longitude: f64, elevation: f64, time: Option<DateTime<Utc>>) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
            time,
        }
    }
}

/// A marked point of interest with an optional name and description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub time: Option<DateTime<Utc>>,
}

impl Waypoint {
    /// Create an unnamed waypoint at the given position, stamped with the current time.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            name: None,
            description: None,
            time: Some(Utc::now()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check that the waypoint lies on the globe and its time can be written out.
    pub fn validate(&self) -> Result<(), FixError> {
        check_coordinates(self.latitude, self.longitude)?;
        check_time(self.time.as_ref())
    }
}

/// One raw location update as delivered by the positioning source.
/// Elevation is not always available; fixes without it never become trackpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

impl TryFrom<LocationFix> for Trackpoint {
    type Error = FixError;

    fn try_from(fix: LocationFix) -> Result<Self, Self::Error> {
        check_coordinates(fix.latitude, fix.longitude)?;
        check_time(fix.time.as_ref())?;
        let elevation = fix.elevation.ok_or(FixError::MissingElevation)?;
        Ok(Trackpoint::new(fix.latitude, fix.longitude, elevation, fix.time))
    }
}

/// A stored record together with the insertion tag that orders it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    pub tag: u64,
    pub value: T,
}

fn check_coordinates(latitude: f64, longitude: f64) -> Result<(), FixError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(FixError::LatitudeOutOfRange(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(FixError::LongitudeOutOfRange(longitude));
    }
    Ok(())
}

/// RFC 3339 only covers four-digit years, so anything else could be stored
/// but never read back or exported.
fn check_time(time: Option<&DateTime<Utc>>) -> Result<(), FixError> {
    match time.map(|t| t.year()) {
        Some(year) if !(0..=9999).contains(&year) => Err(FixError::TimeOutOfRange(year)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fix_with_elevation_becomes_trackpoint() {
        let time = Utc::now();
        let fix = LocationFix {
            latitude: 51.5,
            longitude: -0.12,
            elevation: Some(11.0),
            time: Some(time),
        };

        let pt = Trackpoint::try_from(fix).unwrap();
        assert_eq!(pt, Trackpoint::new(51.5, -0.12, 11.0, Some(time)));
    }

    #[test]
    fn fix_without_elevation_is_rejected() {
        let fix = LocationFix {
            latitude: 51.5,
            longitude: -0.12,
            elevation: None,
            time: None,
        };

        assert_eq!(Trackpoint::try_from(fix), Err(FixError::MissingElevation));
    }

    #[test]
    fn fix_out_of_range_is_rejected() {
        let fix = LocationFix {
            latitude: 91.0,
            longitude: 0.0,
            elevation: Some(0.0),
            time: None,
        };
        assert_eq!(Trackpoint::try_from(fix), Err(FixError::LatitudeOutOfRange(91.0)));

        let fix = LocationFix {
            latitude: 0.0,
            longitude: -180.5,
            elevation: Some(0.0),
            time: None,
        };
        assert_eq!(
            Trackpoint::try_from(fix),
            Err(FixError::LongitudeOutOfRange(-180.5))
        );
    }

    #[test]
    fn fix_with_unwritable_year_is_rejected() {
        let fix = LocationFix {
            latitude: 1.0,
            longitude: 2.0,
            elevation: Some(3.0),
            time: Some(Utc.with_ymd_and_hms(12000, 1, 1, 0, 0, 0).unwrap()),
        };
        assert_eq!(Trackpoint::try_from(fix), Err(FixError::TimeOutOfRange(12000)));

        let mut wpt = Waypoint::new(1.0, 2.0);
        wpt.time = Some(Utc.with_ymd_and_hms(-1, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(wpt.validate(), Err(FixError::TimeOutOfRange(-1)));

        wpt.time = Some(Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap());
        assert!(wpt.validate().is_ok());
    }

    #[test]
    fn fix_deserializes_without_optional_fields() {
        let fix: LocationFix = serde_json::from_str(r#"{"latitude":1.5,"longitude":2.5}"#).unwrap();
        assert_eq!(fix.elevation, None);
        assert_eq!(fix.time, None);
    }

    #[test]
    fn waypoint_builder_sets_fields() {
        let wpt = Waypoint::new(10.0, 20.0)
            .with_name("Summit")
            .with_description("Top of the climb");

        assert_eq!(wpt.name.as_deref(), Some("Summit"));
        assert_eq!(wpt.description.as_deref(), Some("Top of the climb"));
        assert!(wpt.time.is_some());
        assert!(wpt.validate().is_ok());
        assert!(Waypoint::new(0.0, 200.0).validate().is_err());
    }
}
