// ABOUTME: In-memory buffer of the points that make up one recording session.
// ABOUTME: Recovery fills it from the store in tag order and clears it once the GPX file is written.

use crate::model::{Trackpoint, Waypoint};

/// Trackpoints and waypoints of a single session, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionBuffer {
    trackpoints: Vec<Trackpoint>,
    waypoints: Vec<Waypoint>,
}

impl SessionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_trackpoint(&mut self, point: Trackpoint) {
        self.trackpoints.push(point);
    }

    pub fn push_waypoint(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    pub fn extend_trackpoints(&mut self, points: impl IntoIterator<Item = Trackpoint>) {
        self.trackpoints.extend(points);
    }

    pub fn extend_waypoints(&mut self, waypoints: impl IntoIterator<Item = Waypoint>) {
        self.waypoints.extend(waypoints);
    }

    pub fn trackpoints(&self) -> &[Trackpoint] {
        &self.trackpoints
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// True when there is nothing to recover.
    pub fn is_empty(&self) -> bool {
        self.trackpoints.is_empty() && self.waypoints.is_empty()
    }

    pub fn clear(&mut self) {
        self.trackpoints.clear();
        self.waypoints.clear();
    }
}
