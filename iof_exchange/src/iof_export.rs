//! IOF 3.0 ResultList export.

use crate::{ExchangeError, ExchangeResult};
use app_core::{Core, DbpCompetitor, DbpCourse, DbpRun, DbpStage, FINISH_CODE, RunStatus, rank};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::instrument;

const IOF_NAMESPACE: &str = "http://www.orienteering.org/datastandard/3.0";
const CREATOR: &str = "o-race-center";

// ------------------- document shape -------------------

#[derive(Debug, Serialize)]
#[serde(rename = "ResultList")]
struct ResultList {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "@createTime")]
    create_time: String,
    #[serde(rename = "@creator")]
    creator: &'static str,
    #[serde(rename = "@iofVersion")]
    iof_version: &'static str,
    #[serde(rename = "@status")]
    status: &'static str,
    #[serde(rename = "Event")]
    event: XmlEvent,
    #[serde(rename = "ClassResult")]
    class_results: Vec<XmlClassResult>,
}

#[derive(Debug, Serialize)]
struct XmlEvent {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "StartTime", skip_serializing_if = "Option::is_none")]
    start_time: Option<XmlDateAndTime>,
    #[serde(rename = "Official")]
    officials: Vec<XmlOfficial>,
}

#[derive(Debug, Serialize)]
struct XmlDateAndTime {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Time", skip_serializing_if = "Option::is_none")]
    time: Option<String>,
}

#[derive(Debug, Serialize)]
struct XmlOfficial {
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "Person")]
    person: XmlPersonBlock,
}

#[derive(Debug, Serialize)]
struct XmlPersonBlock {
    #[serde(rename = "Name")]
    name: XmlName,
}

#[derive(Debug, Serialize)]
struct XmlName {
    #[serde(rename = "Family")]
    family: String,
    #[serde(rename = "Given")]
    given: String,
}

#[derive(Debug, Serialize)]
struct XmlClassResult {
    #[serde(rename = "Class")]
    class: XmlClass,
    #[serde(rename = "Course")]
    course: XmlCourse,
    #[serde(rename = "PersonResult")]
    persons: Vec<XmlPersonResult>,
}

#[derive(Debug, Serialize)]
struct XmlClass {
    #[serde(rename = "Id")]
    id: i64,
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug, Serialize)]
struct XmlCourse {
    #[serde(rename = "Length")]
    length: i64,
    #[serde(rename = "Climb")]
    climb: i64,
}

#[derive(Debug, Serialize)]
struct XmlPersonResult {
    #[serde(rename = "Person")]
    person: XmlPerson,
    #[serde(rename = "Organisation")]
    organisation: XmlOrganisation,
    #[serde(rename = "Result")]
    result: XmlResult,
}

#[derive(Debug, Serialize)]
struct XmlPerson {
    #[serde(rename = "Id")]
    id: XmlTypedId,
    #[serde(rename = "Name")]
    name: XmlName,
}

#[derive(Debug, Serialize)]
struct XmlTypedId {
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Debug, Serialize)]
struct XmlOrganisation {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "ShortName")]
    short_name: String,
}

#[derive(Debug, Serialize)]
struct XmlResult {
    #[serde(rename = "StartTime", skip_serializing_if = "Option::is_none")]
    start_time: Option<String>,
    #[serde(rename = "FinishTime", skip_serializing_if = "Option::is_none")]
    finish_time: Option<String>,
    #[serde(rename = "Time", skip_serializing_if = "Option::is_none")]
    time: Option<i64>,
    #[serde(rename = "TimeBehind", skip_serializing_if = "Option::is_none")]
    time_behind: Option<i64>,
    #[serde(rename = "Position", skip_serializing_if = "Option::is_none")]
    position: Option<usize>,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "SplitTime")]
    split_times: Vec<XmlSplitTime>,
    #[serde(rename = "ControlCard", skip_serializing_if = "Option::is_none")]
    control_card: Option<i64>,
}

#[derive(Debug, Serialize)]
struct XmlSplitTime {
    #[serde(rename = "@status", skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
    #[serde(rename = "ControlCode")]
    control_code: String,
    #[serde(rename = "Time", skip_serializing_if = "Option::is_none")]
    time: Option<i64>,
}

// ------------------- export -------------------

fn status_name(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Ok => "OK",
        RunStatus::Mp => "MissingPunch",
        RunStatus::Dns => "DidNotStart",
        RunStatus::Ovt => "OverTime",
    }
}

fn iso_time(seconds: i64) -> String {
    let seconds = seconds.rem_euclid(86_400);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

fn split_officials(label: Option<String>, kind: &'static str) -> Option<XmlOfficial> {
    let label = label?;
    let mut words = label.split_whitespace();
    let given = words.next().unwrap_or_default().to_string();
    let family = words.collect::<Vec<_>>().join(" ");
    Some(XmlOfficial {
        kind,
        person: XmlPersonBlock {
            name: XmlName { family, given },
        },
    })
}

/// Export the ResultList of one day. Every course of the stage becomes a
/// class, whether or not anyone has finished yet; non-OK results omit
/// Position and TimeBehind, unpunched controls carry `status="Missing"`.
#[instrument(name = "iof.export_results", skip(core))]
pub async fn export_result_list(
    core: &Core,
    day: u32,
    created: DateTime<Utc>,
) -> ExchangeResult<String> {
    let stage = core
        .database
        .get_stage_by_day(day)
        .await?
        .ok_or_else(|| ExchangeError::Invalid(format!("no stage for day {day}")))?;
    let courses = core.database.list_courses(stage.id).await?;

    let competitors = core.database.list_competitors().await?;
    let by_id: HashMap<i64, &app_core::Competitor> =
        competitors.iter().map(|c| (c.id, c)).collect();
    let runs = core.database.list_runs_by_day(day).await?;

    let event = XmlEvent {
        name: core
            .get_config_str(app_core::config_keys::NAME)
            .await?
            .unwrap_or_default(),
        start_time: stage.date.map(|d| XmlDateAndTime {
            date: d.format("%Y-%m-%d").to_string(),
            time: Some(d.format("%H:%M:%S").to_string()),
        }),
        officials: [
            split_officials(
                core.get_config_str(app_core::config_keys::JUDGE).await?,
                "Director",
            ),
            split_officials(
                core.get_config_str(app_core::config_keys::SECRETARY).await?,
                "MainReferee",
            ),
        ]
        .into_iter()
        .flatten()
        .collect(),
    };

    let mut class_results = Vec::with_capacity(courses.len());
    for course in &courses {
        let group_runs: Vec<app_core::Run> = runs
            .iter()
            .filter(|r| {
                r.result.is_some()
                    && by_id
                        .get(&r.competitor_id)
                        .is_some_and(|c| c.group == course.name)
            })
            .cloned()
            .collect();

        let mut persons = Vec::with_capacity(group_runs.len());
        for ranked in rank(&group_runs) {
            let Some(competitor) = by_id.get(&ranked.run.competitor_id) else {
                continue;
            };
            let club_name = core
                .database
                .get_club(&competitor.reg)
                .await?
                .map(|c| c.name)
                .unwrap_or_default();

            let splits = core.database.list_run_splits(ranked.run.id).await?;
            let split_times = splits
                .iter()
                .filter(|s| s.control_code != FINISH_CODE)
                .map(|s| XmlSplitTime {
                    status: s.cum_time.is_none().then_some("Missing"),
                    control_code: s.control_code.clone(),
                    time: s.cum_time,
                })
                .collect();

            let ok = ranked.run.status == RunStatus::Ok;
            persons.push(XmlPersonResult {
                person: XmlPerson {
                    id: XmlTypedId {
                        kind: CREATOR,
                        value: competitor.id.to_string(),
                    },
                    name: XmlName {
                        family: competitor.last_name.clone(),
                        given: competitor.first_name.clone(),
                    },
                },
                organisation: XmlOrganisation {
                    name: club_name,
                    short_name: competitor.reg.clone(),
                },
                result: XmlResult {
                    start_time: ranked.run.start.map(iso_time),
                    finish_time: ranked.run.finish.map(iso_time),
                    time: ranked.run.result,
                    time_behind: ok.then_some(ranked.time_behind).flatten(),
                    position: ok.then_some(ranked.position).flatten(),
                    status: status_name(ranked.run.status),
                    split_times,
                    control_card: Some(competitor.sid),
                },
            });
        }

        class_results.push(XmlClassResult {
            class: XmlClass {
                id: course.id,
                name: course.name.clone(),
            },
            course: XmlCourse {
                length: course.length,
                climb: course.climb,
            },
            persons,
        });
    }

    let document = ResultList {
        xmlns: IOF_NAMESPACE,
        create_time: created.to_rfc3339(),
        creator: CREATOR,
        iof_version: "3.0",
        status: "Complete",
        event,
        class_results,
    };

    let mut body = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut body);
    serializer.indent(' ', 2);
    document.serialize(serializer)?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_time_is_zero_padded() {
        assert_eq!(iso_time(60386), "16:46:26");
        assert_eq!(iso_time(61), "00:01:01");
    }

    #[test]
    fn officials_split_given_and_family_names() {
        let official = split_officials(Some("Jane Smith".into()), "Director").unwrap();
        assert_eq!(official.person.name.given, "Jane");
        assert_eq!(official.person.name.family, "Smith");
        assert!(split_officials(None, "Director").is_none());
    }

    #[test]
    fn status_names_follow_the_standard() {
        assert_eq!(status_name(RunStatus::Ok), "OK");
        assert_eq!(status_name(RunStatus::Mp), "MissingPunch");
        assert_eq!(status_name(RunStatus::Dns), "DidNotStart");
        assert_eq!(status_name(RunStatus::Ovt), "OverTime");
    }
}
