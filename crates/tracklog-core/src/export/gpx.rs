// ABOUTME: Builds a GPX 1.1 document from a session buffer and serializes it to text.
// ABOUTME: All trackpoints go into a single track with a single segment; waypoints stand alone.

use chrono::{DateTime, Utc};
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Metadata, Track, TrackSegment};
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{Trackpoint, Waypoint};
use crate::session::SessionBuffer;

/// Creator string written into documents when none is configured.
pub const DEFAULT_CREATOR: &str = "tracklog";

/// Errors that can occur while producing GPX output.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("gpx error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("timestamp not representable in gpx: {0}")]
    Time(#[from] time::error::ComponentRange),

    #[error("gpx output is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Assemble the GPX document for a session.
///
/// `created_at` becomes the document's metadata time, which for a recovered
/// session is the moment of recovery rather than the time of the last point.
pub fn build_gpx(
    session: &SessionBuffer,
    creator: &str,
    created_at: DateTime<Utc>,
) -> Result<Gpx, ExportError> {
    let mut segment = TrackSegment::new();
    for point in session.trackpoints() {
        segment.points.push(trackpoint_to_gpx(point)?);
    }

    let mut track = Track::new();
    track.segments.push(segment);

    let waypoints = session
        .waypoints()
        .iter()
        .map(waypoint_to_gpx)
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        "built gpx document with {} trackpoints and {} waypoints",
        session.trackpoints().len(),
        waypoints.len()
    );

    Ok(Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(creator.to_string()),
        metadata: Some(Metadata {
            time: Some(to_gpx_time(created_at)?),
            ..Default::default()
        }),
        waypoints,
        tracks: vec![track],
        ..Default::default()
    })
}

/// Render a session as GPX text.
pub fn export_gpx(
    session: &SessionBuffer,
    creator: &str,
    created_at: DateTime<Utc>,
) -> Result<String, ExportError> {
    let doc = build_gpx(session, creator, created_at)?;
    let mut buf = Vec::new();
    gpx::write(&doc, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

fn trackpoint_to_gpx(point: &Trackpoint) -> Result<gpx::Waypoint, ExportError> {
    let mut pt = gpx::Waypoint::new(Point::new(point.longitude, point.latitude));
    pt.elevation = Some(point.elevation);
    pt.time = point.time.map(to_gpx_time).transpose()?;
    Ok(pt)
}

fn waypoint_to_gpx(waypoint: &Waypoint) -> Result<gpx::Waypoint, ExportError> {
    let mut pt = gpx::Waypoint::new(Point::new(waypoint.longitude, waypoint.latitude));
    pt.name = waypoint.name.clone();
    pt.description = waypoint.description.clone();
    pt.time = waypoint.time.map(to_gpx_time).transpose()?;
    Ok(pt)
}

fn to_gpx_time(at: DateTime<Utc>) -> Result<gpx::Time, ExportError> {
    let nanos =
        i128::from(at.timestamp()) * 1_000_000_000 + i128::from(at.timestamp_subsec_nanos());
    Ok(OffsetDateTime::from_unix_timestamp_nanos(nanos)?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_session(trackpoints: usize, waypoints: usize) -> SessionBuffer {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut session = SessionBuffer::new();
        for i in 0..trackpoints {
            session.push_trackpoint(Trackpoint::new(
                45.0 + i as f64 * 0.001,
                7.0,
                300.0 + i as f64,
                Some(start + chrono::Duration::seconds(i as i64)),
            ));
        }
        for i in 0..waypoints {
            let mut wpt = Waypoint::new(46.0, 7.0 + i as f64 * 0.01).with_name(format!("WP {}", i));
            wpt.time = Some(start);
            session.push_waypoint(wpt);
        }
        session
    }

    #[test]
    fn build_puts_all_trackpoints_in_one_segment() {
        let session = make_session(4, 2);
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap();
        let doc = build_gpx(&session, DEFAULT_CREATOR, at).unwrap();

        assert!(matches!(doc.version, GpxVersion::Gpx11));
        assert_eq!(doc.creator.as_deref(), Some("tracklog"));
        assert_eq!(doc.tracks.len(), 1);
        assert_eq!(doc.tracks[0].segments.len(), 1);

        let points = &doc.tracks[0].segments[0].points;
        assert_eq!(points.len(), 4);
        assert!((points[2].point().y() - 45.002).abs() < 1e-9);
        assert!((points[2].point().x() - 7.0).abs() < 1e-9);
        assert_eq!(points[2].elevation, Some(302.0));

        assert_eq!(doc.waypoints.len(), 2);
        assert_eq!(doc.waypoints[1].name.as_deref(), Some("WP 1"));
    }

    #[test]
    fn metadata_time_is_the_creation_time() {
        let session = make_session(1, 0);
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let doc = build_gpx(&session, DEFAULT_CREATOR, at).unwrap();

        let time = doc.metadata.and_then(|m| m.time).unwrap();
        let odt: OffsetDateTime = time.into();
        assert_eq!(odt.unix_timestamp(), at.timestamp());
    }

    #[test]
    fn export_produces_parseable_gpx() {
        let session = make_session(3, 1);
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap();
        let text = export_gpx(&session, "unit-test", at).unwrap();

        assert!(text.contains("<gpx"));
        assert!(text.contains("unit-test"));

        let parsed = gpx::read(text.as_bytes()).unwrap();
        assert_eq!(parsed.tracks[0].segments[0].points.len(), 3);
        assert_eq!(parsed.waypoints.len(), 1);
        assert_eq!(parsed.waypoints[0].name.as_deref(), Some("WP 0"));
    }

    #[test]
    fn waypoints_only_session_still_has_an_empty_track() {
        let session = make_session(0, 3);
        let doc = build_gpx(&session, DEFAULT_CREATOR, Utc::now()).unwrap();

        assert_eq!(doc.tracks.len(), 1);
        assert!(doc.tracks[0].segments[0].points.is_empty());
        assert_eq!(doc.waypoints.len(), 3);
    }
}
