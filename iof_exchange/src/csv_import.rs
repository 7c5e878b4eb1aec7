//! CSV competitor and club lists.

use crate::{ExchangeError, ExchangeResult};
use app_core::{Club, Competitor, Core, DbpCompetitor, DbpCourse, DbpRun, DbpStage, Run};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use tracing::{info, instrument, warn};

/// row of the competitor list
#[derive(Debug, Deserialize)]
struct CompetitorRow {
    #[serde(rename = "Reg")]
    reg: String,
    #[serde(rename = "Group")]
    group: String,
    #[serde(rename = "SID")]
    sid: i64,
    #[serde(rename = "First name")]
    first_name: String,
    #[serde(rename = "Last name")]
    last_name: String,
    #[serde(rename = "Notes")]
    notes: String,
    /// comma-separated day numbers, may be empty
    #[serde(rename = "Days")]
    days: String,
    #[serde(rename = "Money")]
    money: i64,
}

/// row of the club list
#[derive(Debug, Deserialize)]
struct ClubRow {
    #[serde(rename = "Reg")]
    reg: String,
    #[serde(rename = "Club")]
    club: String,
}

/// what an import did and what looked fishy
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub warnings: Vec<String>,
}

fn parse_days(raw: &str) -> ExchangeResult<Vec<u32>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|d| {
            d.trim()
                .parse()
                .map_err(|_| ExchangeError::Invalid(format!("bad day number: {d}")))
        })
        .collect()
}

/// Import the competitor list. Every competitor gets one DNS run per
/// declared day; groups without a course on some declared day are reported
/// but imported anyway.
#[instrument(name = "csv.import_competitors", skip(core, reader))]
pub async fn import_competitors(
    core: &Core,
    reader: impl Read,
) -> ExchangeResult<ImportReport> {
    // group -> days with a course of that name
    let mut course_days: HashSet<(String, u32)> = HashSet::new();
    for stage in core.database.list_stages().await? {
        for course in core.database.list_courses(stage.id).await? {
            course_days.insert((course.name.clone(), stage.day));
        }
    }

    let mut report = ImportReport::default();
    let mut csv_reader = csv::Reader::from_reader(reader);
    for row in csv_reader.deserialize() {
        let row: CompetitorRow = row?;

        let mut competitor = Competitor {
            sid: row.sid,
            fee_due: row.money,
            declared_days: parse_days(&row.days)?,
            ..Competitor::default()
        };
        competitor
            .set_reg(row.reg)
            .set_group(row.group)
            .set_names(row.first_name, row.last_name)
            .set_notes((!row.notes.trim().is_empty()).then_some(row.notes.clone()));
        competitor.validate().map_err(app_core::CoreError::from)?;

        for day in &competitor.declared_days {
            if !course_days.contains(&(competitor.group.clone(), *day)) {
                let warning = format!(
                    "{} {}: group {} has no course on day {day}",
                    competitor.sid,
                    competitor.full_name(),
                    competitor.group
                );
                warn!("{warning}");
                report.warnings.push(warning);
            }
        }

        let competitor = core.database.save_competitor(&competitor).await?;
        for day in &competitor.declared_days {
            core.database
                .save_run(&Run::declared(competitor.id, *day))
                .await?;
        }
        report.imported += 1;
    }

    info!(imported = report.imported, "competitors_imported");
    Ok(report)
}

/// Import the club lookup table.
#[instrument(name = "csv.import_clubs", skip(core, reader))]
pub async fn import_clubs(core: &Core, reader: impl Read) -> ExchangeResult<ImportReport> {
    let mut report = ImportReport::default();
    let mut csv_reader = csv::Reader::from_reader(reader);
    for row in csv_reader.deserialize() {
        let row: ClubRow = row?;
        core.database
            .save_club(&Club {
                reg: row.reg.trim().to_string(),
                name: row.club.trim().to_string(),
            })
            .await?;
        report.imported += 1;
    }
    info!(imported = report.imported, "clubs_imported");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_lists_parse_with_spaces_and_empty() {
        assert_eq!(parse_days("1,2").unwrap(), vec![1, 2]);
        assert_eq!(parse_days(" 2 , 3 ").unwrap(), vec![2, 3]);
        assert!(parse_days("").unwrap().is_empty());
        assert!(parse_days("one").is_err());
    }
}
