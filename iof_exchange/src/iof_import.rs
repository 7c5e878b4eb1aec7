//! IOF 3.0 course-data import: one XML file per stage.

use crate::{ExchangeError, ExchangeResult};
use app_core::{
    Control, ControlKind, Core, Course, CourseControl, DbpCourse, DbpStage, GeoPoint, MapInfo,
    MapPoint, Stage,
};
use serde::Deserialize;
use tracing::{info, instrument};

// ------------------- document shape -------------------

#[derive(Debug, Deserialize)]
struct CourseDataFile {
    #[serde(rename = "RaceCourseData")]
    race_course_data: RaceCourseData,
}

#[derive(Debug, Deserialize)]
struct RaceCourseData {
    #[serde(rename = "Map")]
    map: Option<XmlMap>,
    #[serde(rename = "Control", default)]
    controls: Vec<XmlControl>,
    #[serde(rename = "Course", default)]
    courses: Vec<XmlCourse>,
}

#[derive(Debug, Deserialize)]
struct XmlMap {
    #[serde(rename = "Scale")]
    scale: i32,
    #[serde(rename = "MapPositionTopLeft")]
    top_left: Option<XmlMapPosition>,
    #[serde(rename = "MapPositionBottomRight")]
    bottom_right: Option<XmlMapPosition>,
}

#[derive(Debug, Deserialize)]
struct XmlMapPosition {
    #[serde(rename = "@x")]
    x: f64,
    #[serde(rename = "@y")]
    y: f64,
}

#[derive(Debug, Deserialize)]
struct XmlControl {
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Position")]
    position: Option<XmlPosition>,
    #[serde(rename = "MapPosition")]
    map_position: Option<XmlMapPosition>,
}

#[derive(Debug, Deserialize)]
struct XmlPosition {
    #[serde(rename = "@lng")]
    lng: f64,
    #[serde(rename = "@lat")]
    lat: f64,
}

#[derive(Debug, Deserialize)]
struct XmlCourse {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Length")]
    length: i64,
    #[serde(rename = "Climb")]
    climb: Option<i64>,
    #[serde(rename = "CourseControl", default)]
    controls: Vec<XmlCourseControl>,
}

#[derive(Debug, Deserialize)]
struct XmlCourseControl {
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "Control")]
    control: String,
    #[serde(rename = "LegLength")]
    leg_length: Option<i64>,
}

// ------------------- import -------------------

/// Import one stage from an IOF 3.0 course-data document: the stage row, its
/// map frame, every control with coordinates, and every course with its
/// ordered control sequence. Course names are group names and lose stray
/// whitespace on the way in.
#[instrument(name = "iof.import_stage", skip(core, xml))]
pub async fn import_stage(
    core: &Core,
    xml: &str,
    day: u32,
    stage_name: Option<&str>,
) -> ExchangeResult<Stage> {
    let document: CourseDataFile = quick_xml::de::from_str(xml)?;
    let data = document.race_course_data;

    let mut stage = Stage::new(day, stage_name);
    stage.map = data.map.map(|m| {
        let top_left = m.top_left.as_ref();
        let bottom_right = m.bottom_right.as_ref();
        MapInfo {
            scale: m.scale,
            top_left_x: top_left.map(|p| p.x).unwrap_or_default(),
            top_left_y: top_left.map(|p| p.y).unwrap_or_default(),
            bottom_right_x: bottom_right.map(|p| p.x).unwrap_or_default(),
            bottom_right_y: bottom_right.map(|p| p.y).unwrap_or_default(),
        }
    });
    let stage = core.database.save_stage(&stage).await?;

    for control in data.controls {
        let code = control.id.trim();
        if code.is_empty() {
            return Err(ExchangeError::Invalid("control without an Id".into()));
        }
        core.database
            .save_control(&Control {
                id: 0,
                stage_id: stage.id,
                code: code.to_string(),
                kind: control.kind,
                position: control.position.map(|p| GeoPoint {
                    lng: p.lng,
                    lat: p.lat,
                }),
                map_position: control.map_position.map(|p| MapPoint { x: p.x, y: p.y }),
            })
            .await?;
    }

    let mut course_count = 0;
    for course in data.courses {
        let mut row = Course::new(
            stage.id,
            course.name,
            course.length,
            course.climb.unwrap_or(0),
        );
        row.controls = course
            .controls
            .into_iter()
            .enumerate()
            .map(|(seq, cc)| CourseControl {
                seq: seq as u32,
                kind: ControlKind::from_export(cc.kind.as_deref()),
                code: cc.control.trim().to_string(),
                leg_length: cc.leg_length,
            })
            .collect();
        row.validate().map_err(app_core::CoreError::from)?;
        core.database.save_course(&row).await?;
        course_count += 1;
    }

    info!(day, courses = course_count, "stage_imported");
    Ok(stage)
}
