// one competition day with its controls

use crate::utils::normalize::normalize_opt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// map sheet parameters of a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapInfo {
    /// denominator of the map scale (e.g. 10000)
    pub scale: i32,
    pub top_left_x: f64,
    pub top_left_y: f64,
    pub bottom_right_x: f64,
    pub bottom_right_y: f64,
}

/// geographic position of a control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

/// position of a control on the map sheet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

/// A physical punching device placed in the terrain. Codes are short strings
/// ("31", "S", "F"); only numeric codes take part in punch analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    /// store id; 0 until persisted
    pub id: i64,
    /// id of owning stage
    pub stage_id: i64,
    pub code: String,
    /// device kind as delivered by the course-setting export
    pub kind: Option<String>,
    pub position: Option<GeoPoint>,
    pub map_position: Option<MapPoint>,
}

/// one competition day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// store id; 0 until persisted
    pub id: i64,
    /// 1-based day number, unique within the event
    pub day: u32,
    /// optional display name (e.g. "Sprint")
    pub name: Option<String>,
    /// wall-clock date and time of the mass start
    pub date: Option<DateTime<Utc>>,
    pub map: Option<MapInfo>,
}

impl Stage {
    pub fn new(day: u32, name: Option<impl Into<String>>) -> Self {
        Stage {
            id: 0,
            day,
            name: normalize_opt(name),
            date: None,
            map: None,
        }
    }
}
