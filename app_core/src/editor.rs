//! Record-based editing of competitors.
//!
//! The CLI hands competitors to an external editor as a JSON document and
//! applies whatever comes back. The writer walks the document against the
//! declared field list: unknown fields are ignored, primary keys are
//! protected, enumerations are validated against the stored value set.

use crate::{
    Competitor, Core, CoreError, CoreResult, DbpCompetitor, DbpRun, Run, RunStatus,
    utils::validation::{FieldCode, FieldError, ValidationErrors, ValidationResult},
};
use serde_json::{Value, json};

/// Editable document of one competitor with the nested runs.
pub fn competitor_record(competitor: &Competitor, runs: &[Run]) -> Value {
    json!({
        "id": record_id(competitor.id),
        "reg": competitor.reg,
        "group": competitor.group,
        "sid": competitor.sid,
        "first_name": competitor.first_name,
        "last_name": competitor.last_name,
        "notes": competitor.notes,
        "declared_days": competitor.declared_days,
        "fee_due": competitor.fee_due,
        "fee_paid": competitor.fee_paid,
        "runs": runs.iter().map(|run| json!({
            "id": run.id,
            "day": run.day,
            "start_slot": run.start_slot,
            "start": run.start,
            "finish": run.finish,
            "result": run.result,
            "status": run.status.to_string(),
        })).collect::<Vec<_>>(),
    })
}

fn record_id(id: i64) -> Value {
    if id == 0 { Value::Null } else { json!(id) }
}

/// outcome of applying a record
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitorEdit {
    pub competitor: Competitor,
    /// updated and newly declared runs
    pub runs: Vec<Run>,
    /// runs dropped from the document
    pub removed_run_ids: Vec<i64>,
}

/// Apply an edited record to a competitor and its runs.
pub fn apply_competitor_record(
    base: &Competitor,
    existing_runs: &[Run],
    record: &Value,
) -> ValidationResult<CompetitorEdit> {
    let mut errs = ValidationErrors::new();
    let Some(fields) = record.as_object() else {
        errs.add(FieldError::with_message(
            "record",
            FieldCode::InvalidFormat,
            "competitor record must be an object",
        ));
        return Err(errs);
    };

    let mut competitor = base.clone();

    if let Some(id) = fields.get("id")
        && !id.is_null()
        && id.as_i64() != Some(base.id)
    {
        errs.add(FieldError::with_message(
            "id",
            FieldCode::Protected,
            "the competitor id cannot be changed",
        ));
    }

    for (key, value) in fields {
        match key.as_str() {
            "reg" => {
                competitor.set_reg(value.as_str().unwrap_or_default());
            }
            "group" => {
                competitor.set_group(value.as_str().unwrap_or_default());
            }
            "sid" => match value.as_i64() {
                Some(sid) => competitor.sid = sid,
                None => errs.push("sid", FieldCode::InvalidFormat),
            },
            "first_name" => {
                competitor.first_name =
                    crate::utils::normalize::normalize_ws(value.as_str().unwrap_or_default());
            }
            "last_name" => {
                competitor.last_name =
                    crate::utils::normalize::normalize_ws(value.as_str().unwrap_or_default());
            }
            "notes" => {
                competitor.set_notes(value.as_str());
            }
            "declared_days" => match serde_json::from_value::<Vec<u32>>(value.clone()) {
                Ok(days) => competitor.declared_days = days,
                Err(_) => errs.push("declared_days", FieldCode::InvalidFormat),
            },
            "fee_due" => match value.as_i64() {
                Some(fee) => competitor.fee_due = fee,
                None => errs.push("fee_due", FieldCode::InvalidFormat),
            },
            "fee_paid" => {
                competitor.fee_paid = value.as_i64();
            }
            // id is handled above; anything else is not a declared field
            _ => {}
        }
    }

    let (runs, removed_run_ids) = apply_run_records(
        &mut errs,
        competitor.id,
        existing_runs,
        fields.get("runs"),
    );

    errs.into_result()?;
    Ok(CompetitorEdit {
        competitor,
        runs,
        removed_run_ids,
    })
}

fn apply_run_records(
    errs: &mut ValidationErrors,
    competitor_id: i64,
    existing: &[Run],
    records: Option<&Value>,
) -> (Vec<Run>, Vec<i64>) {
    let Some(records) = records.and_then(Value::as_array) else {
        // no runs key: leave the runs untouched
        return (existing.to_vec(), Vec::new());
    };

    let mut runs = Vec::with_capacity(records.len());
    let mut seen = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let Some(fields) = record.as_object() else {
            errs.push(format!("runs[{i}]"), FieldCode::InvalidFormat);
            continue;
        };

        let id = fields.get("id").and_then(Value::as_i64);
        let mut run = match id.and_then(|id| existing.iter().find(|r| r.id == id)) {
            Some(existing) => {
                seen.push(existing.id);
                existing.clone()
            }
            None => Run::declared(competitor_id, 0),
        };

        for (key, value) in fields {
            match key.as_str() {
                "day" => match serde_json::from_value::<u32>(value.clone()) {
                    Ok(day) => run.day = day,
                    Err(_) => errs.push(format!("runs[{i}].day"), FieldCode::InvalidFormat),
                },
                "start_slot" => {
                    run.start_slot = value.as_u64().map(|s| s as u32);
                }
                "start" => run.start = value.as_i64(),
                "finish" => run.finish = value.as_i64(),
                "result" => run.result = value.as_i64(),
                "status" => {
                    let parsed = value.as_str().and_then(RunStatus::parse);
                    match parsed {
                        Some(status) => run.status = status,
                        None => errs.add(FieldError::with_message(
                            format!("runs[{i}].status"),
                            FieldCode::InvalidEnum,
                            format!("status must be one of {:?}", RunStatus::VALUES),
                        )),
                    }
                }
                _ => {}
            }
        }
        runs.push(run);
    }

    let removed = existing
        .iter()
        .filter(|r| r.id != 0 && !seen.contains(&r.id))
        .map(|r| r.id)
        .collect();
    (runs, removed)
}

/// API of the competitor editor
impl Core {
    /// Apply an edited record: resolve the competitor (null id means a new
    /// one), write it and its runs, drop runs removed from the document.
    pub async fn edit_competitor(&self, record: &Value) -> CoreResult<Competitor> {
        let id = record.get("id").and_then(Value::as_i64);
        let (base, existing_runs) = match id {
            Some(id) if id > 0 => {
                let competitor = self
                    .database
                    .get_competitor(id)
                    .await?
                    .ok_or_else(|| CoreError::MissingResource(format!("competitor {id}")))?;
                let runs = self.database.list_runs_of_competitor(id).await?;
                (competitor, runs)
            }
            _ => (Competitor::default(), Vec::new()),
        };

        let edit = apply_competitor_record(&base, &existing_runs, record)?;
        edit.competitor.validate()?;

        let competitor = self.database.save_competitor(&edit.competitor).await?;
        for mut run in edit.runs {
            run.competitor_id = competitor.id;
            self.database.save_run(&run).await?;
        }
        for run_id in edit.removed_run_ids {
            self.database.delete_run(run_id).await?;
        }
        Ok(competitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> (Competitor, Vec<Run>) {
        let mut competitor = Competitor {
            id: 5,
            sid: 16,
            fee_due: 300,
            ..Competitor::default()
        };
        competitor
            .set_group("M21")
            .set_names("Viktor", "Lysenko")
            .set_reg("CPK");
        competitor.declared_days = vec![1, 2];
        let runs = vec![Run::declared(5, 1), {
            let mut r = Run::declared(5, 2);
            r.id = 9;
            r
        }];
        (competitor, runs)
    }

    #[test]
    fn record_round_trips_through_apply() {
        let (competitor, runs) = base();
        let record = competitor_record(&competitor, &runs);
        let edit = apply_competitor_record(&competitor, &runs, &record).unwrap();
        assert_eq!(edit.competitor, competitor);
        assert_eq!(edit.runs, runs);
        assert!(edit.removed_run_ids.is_empty());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let (competitor, runs) = base();
        let mut record = competitor_record(&competitor, &runs);
        record["shoe_size"] = json!(44);
        record["notes"] = json!("late entry");
        let edit = apply_competitor_record(&competitor, &runs, &record).unwrap();
        assert_eq!(edit.competitor.notes.as_deref(), Some("late entry"));
    }

    #[test]
    fn primary_key_overwrite_is_rejected() {
        let (competitor, runs) = base();
        let mut record = competitor_record(&competitor, &runs);
        record["id"] = json!(99);
        let errs = apply_competitor_record(&competitor, &runs, &record).unwrap_err();
        assert_eq!(errs.errors[0].get_field(), "id");
        assert_eq!(errs.errors[0].get_code(), FieldCode::Protected);
    }

    #[test]
    fn status_outside_the_value_set_is_rejected() {
        let (competitor, runs) = base();
        let mut record = competitor_record(&competitor, &runs);
        record["runs"][1]["status"] = json!("WINNER");
        let errs = apply_competitor_record(&competitor, &runs, &record).unwrap_err();
        assert_eq!(errs.errors[0].get_field(), "runs[1].status");
    }

    #[test]
    fn dropped_runs_are_reported_for_deletion() {
        let (competitor, runs) = base();
        let mut record = competitor_record(&competitor, &runs);
        record["runs"].as_array_mut().unwrap().remove(1);
        let edit = apply_competitor_record(&competitor, &runs, &record).unwrap();
        assert_eq!(edit.removed_run_ids, vec![9]);
        assert_eq!(edit.runs.len(), 1);
    }

    #[test]
    fn new_runs_join_with_the_competitor() {
        let (competitor, runs) = base();
        let mut record = competitor_record(&competitor, &runs);
        record["runs"]
            .as_array_mut()
            .unwrap()
            .push(json!({"day": 3, "status": "DNS"}));
        let edit = apply_competitor_record(&competitor, &runs, &record).unwrap();
        assert_eq!(edit.runs.len(), 3);
        assert_eq!(edit.runs[2].day, 3);
        assert_eq!(edit.runs[2].id, 0);
    }
}
