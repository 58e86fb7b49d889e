// ABOUTME: JSON-lines input format for location events fed to `tracklog record`.
// ABOUTME: Each line is one tagged event: a fix, a waypoint, or a waypoint deletion.

use serde::Deserialize;
use tracklog_core::{LocationFix, Waypoint};

/// One line of recorder input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationEvent {
    Fix(LocationFix),
    Waypoint(Waypoint),
    DeleteWaypoint { index: usize },
}

/// Parse a single input line. Blank lines yield None.
pub fn parse_line(line: &str) -> Result<Option<LocationEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fix() {
        let event = parse_line(
            r#"{"type":"fix","latitude":59.33,"longitude":18.06,"elevation":28.0,"time":"2024-06-01T12:00:00Z"}"#,
        )
        .unwrap()
        .unwrap();

        match event {
            LocationEvent::Fix(fix) => {
                assert_eq!(fix.latitude, 59.33);
                assert_eq!(fix.elevation, Some(28.0));
                assert!(fix.time.is_some());
            }
            other => panic!("expected fix, got {:?}", other),
        }
    }

    #[test]
    fn parses_waypoint_with_missing_optionals() {
        let event =
            parse_line(r#"{"type":"waypoint","latitude":1.0,"longitude":2.0,"name":"Camp"}"#)
                .unwrap()
                .unwrap();

        match event {
            LocationEvent::Waypoint(wpt) => {
                assert_eq!(wpt.name.as_deref(), Some("Camp"));
                assert_eq!(wpt.description, None);
                assert_eq!(wpt.time, None);
            }
            other => panic!("expected waypoint, got {:?}", other),
        }
    }

    #[test]
    fn parses_delete_and_skips_blank_lines() {
        assert_eq!(
            parse_line(r#"{"type":"delete_waypoint","index":2}"#).unwrap(),
            Some(LocationEvent::DeleteWaypoint { index: 2 })
        );
        assert_eq!(parse_line("   ").unwrap(), None);
        assert!(parse_line(r#"{"type":"teleport"}"#).is_err());
    }
}
