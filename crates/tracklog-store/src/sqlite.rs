// ABOUTME: SQLite-backed buffer for the trackpoints and waypoints of the current recording session.
// ABOUTME: Points are appended with a monotonic tag, read back in tag order, and wiped all at once.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use thiserror::Error;
use tracklog_core::{Tagged, Trackpoint, Waypoint};

/// Errors that can occur during point store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Number of records currently buffered in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub trackpoints: usize,
    pub waypoints: usize,
}

/// A SQLite store holding the points of the session in progress.
///
/// SQLite makes no promise about the physical order of rows, so each point
/// carries a per-kind tag assigned at insertion and every read sorts by it.
/// Tags start at 0, resume after the highest stored tag when an existing
/// database is opened, and reset when the store is wiped.
pub struct PointStore {
    conn: Connection,
    next_trackpoint_tag: u64,
    next_waypoint_tag: u64,
}

impl PointStore {
    /// Open or create a point store database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA synchronous=FULL;")?;
        Self::init(conn)
    }

    /// Open a store that lives only as long as the returned value.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trackpoints (
                tag INTEGER PRIMARY KEY,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                elevation REAL NOT NULL,
                time TEXT
            );

            CREATE TABLE IF NOT EXISTS waypoints (
                tag INTEGER PRIMARY KEY,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                name TEXT,
                description TEXT,
                time TEXT
            );",
        )?;

        let next_trackpoint_tag = next_tag(&conn, "trackpoints")?;
        let next_waypoint_tag = next_tag(&conn, "waypoints")?;

        if next_trackpoint_tag > 0 || next_waypoint_tag > 0 {
            tracing::debug!(
                "resuming tags at trackpoint {} and waypoint {}",
                next_trackpoint_tag,
                next_waypoint_tag
            );
        }

        Ok(Self {
            conn,
            next_trackpoint_tag,
            next_waypoint_tag,
        })
    }

    /// Persist a trackpoint and return the tag it was stored under.
    pub fn append_trackpoint(&mut self, point: &Trackpoint) -> Result<u64, StoreError> {
        let tag = self.next_trackpoint_tag;
        self.conn.execute(
            "INSERT INTO trackpoints (tag, latitude, longitude, elevation, time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tag as i64,
                point.latitude,
                point.longitude,
                point.elevation,
                point.time.map(|t| t.to_rfc3339()),
            ],
        )?;
        self.next_trackpoint_tag += 1;
        Ok(tag)
    }

    /// Persist a waypoint and return the tag it was stored under.
    pub fn append_waypoint(&mut self, waypoint: &Waypoint) -> Result<u64, StoreError> {
        let tag = self.next_waypoint_tag;
        self.conn.execute(
            "INSERT INTO waypoints (tag, latitude, longitude, name, description, time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tag as i64,
                waypoint.latitude,
                waypoint.longitude,
                waypoint.name,
                waypoint.description,
                waypoint.time.map(|t| t.to_rfc3339()),
            ],
        )?;
        self.next_waypoint_tag += 1;
        Ok(tag)
    }

    /// Load every buffered trackpoint, ordered by tag.
    pub fn load_trackpoints(&self) -> Result<Vec<Tagged<Trackpoint>>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT tag, latitude, longitude, elevation, time
             FROM trackpoints ORDER BY tag ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            let tag: i64 = row.get(0)?;
            Ok(Tagged {
                tag: tag as u64,
                value: Trackpoint {
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                    elevation: row.get(3)?,
                    time: parse_time(4, row.get(4)?)?,
                },
            })
        })?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row?);
        }
        Ok(points)
    }

    /// Load every buffered waypoint, ordered by tag.
    pub fn load_waypoints(&self) -> Result<Vec<Tagged<Waypoint>>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT tag, latitude, longitude, name, description, time
             FROM waypoints ORDER BY tag ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            let tag: i64 = row.get(0)?;
            Ok(Tagged {
                tag: tag as u64,
                value: Waypoint {
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                    name: row.get(3)?,
                    description: row.get(4)?,
                    time: parse_time(5, row.get(5)?)?,
                },
            })
        })?;

        let mut waypoints = Vec::new();
        for row in rows {
            waypoints.push(row?);
        }
        Ok(waypoints)
    }

    /// Delete the waypoint at `index` in tag order.
    /// Returns false when there is no waypoint at that position.
    pub fn delete_waypoint_at(&mut self, index: usize) -> Result<bool, StoreError> {
        // SQLite reads a negative OFFSET as 0
        let Ok(offset) = i64::try_from(index) else {
            return Ok(false);
        };
        let deleted = self.conn.execute(
            "DELETE FROM waypoints WHERE tag =
                (SELECT tag FROM waypoints ORDER BY tag ASC LIMIT 1 OFFSET ?1)",
            params![offset],
        )?;
        Ok(deleted > 0)
    }

    /// Remove every buffered point in one transaction and reset both tag counters.
    pub fn delete_all(&mut self) -> Result<StoreCounts, StoreError> {
        let tx = self.conn.transaction()?;
        let trackpoints = tx.execute("DELETE FROM trackpoints", [])?;
        let waypoints = tx.execute("DELETE FROM waypoints", [])?;
        tx.commit()?;

        self.reset_tags();

        Ok(StoreCounts {
            trackpoints,
            waypoints,
        })
    }

    /// Count buffered trackpoints and waypoints.
    pub fn counts(&self) -> Result<StoreCounts, StoreError> {
        let trackpoints: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM trackpoints", [], |row| row.get(0))?;
        let waypoints: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM waypoints", [], |row| row.get(0))?;

        Ok(StoreCounts {
            trackpoints: trackpoints as usize,
            waypoints: waypoints as usize,
        })
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        let counts = self.counts()?;
        Ok(counts.trackpoints == 0 && counts.waypoints == 0)
    }

    /// The tags the next appended trackpoint and waypoint will receive.
    pub fn next_tags(&self) -> (u64, u64) {
        (self.next_trackpoint_tag, self.next_waypoint_tag)
    }

    fn reset_tags(&mut self) {
        self.next_trackpoint_tag = 0;
        self.next_waypoint_tag = 0;
    }
}

fn next_tag(conn: &Connection, table: &str) -> Result<u64, StoreError> {
    let next: i64 = conn.query_row(
        &format!("SELECT COALESCE(MAX(tag) + 1, 0) FROM {}", table),
        [],
        |row| row.get(0),
    )?;
    Ok(next as u64)
}

fn parse_time(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
