// the relational image kept behind the lock

use app_core::{
    Card, Club, Competitor, ConfigValue, Control, Course, DbError, DbResult, Run, RunSplit,
    Stage,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// one row of the config table, stored as (value, type)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRow {
    pub value: String,
    #[serde(rename = "type")]
    pub type_tag: String,
}

/// Snapshot document. BTreeMaps keep the serialized form stable, so two
/// snapshots of the same state are byte-identical.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Store {
    pub config: BTreeMap<String, ConfigRow>,
    pub stages: BTreeMap<i64, Stage>,
    pub controls: BTreeMap<i64, Control>,
    pub courses: BTreeMap<i64, Course>,
    pub competitors: BTreeMap<i64, Competitor>,
    pub clubs: BTreeMap<String, Club>,
    pub runs: BTreeMap<i64, Run>,
    pub run_splits: Vec<RunSplit>,
    pub cards: BTreeMap<i64, Card>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn get_config(&self, key: &str) -> DbResult<Option<ConfigValue>> {
        match self.config.get(key) {
            None => Ok(None),
            Some(row) => ConfigValue::from_stored(&row.value, &row.type_tag)
                .map(Some)
                .map_err(|e| DbError::Other(anyhow::anyhow!("config row {key}: {e}"))),
        }
    }

    pub fn set_config(&mut self, key: &str, value: &ConfigValue) {
        self.config.insert(
            key.to_string(),
            ConfigRow {
                value: value.to_stored(),
                type_tag: value.type_tag().to_string(),
            },
        );
    }

    pub fn save_stage(&mut self, stage: &Stage) -> DbResult<Stage> {
        if self
            .stages
            .values()
            .any(|s| s.day == stage.day && s.id != stage.id)
        {
            return Err(DbError::UniqueViolation(Some("stages.day".into())));
        }
        let mut stage = stage.clone();
        if stage.id == 0 {
            stage.id = self.next_id();
        } else if !self.stages.contains_key(&stage.id) {
            return Err(DbError::NotFound);
        }
        self.stages.insert(stage.id, stage.clone());
        Ok(stage)
    }

    pub fn save_control(&mut self, control: &Control) -> DbResult<Control> {
        if !self.stages.contains_key(&control.stage_id) {
            return Err(DbError::ForeignKeyViolation(Some(
                "controls.stage_id".into(),
            )));
        }
        let mut control = control.clone();
        if control.id == 0 {
            control.id = self.next_id();
        } else if !self.controls.contains_key(&control.id) {
            return Err(DbError::NotFound);
        }
        self.controls.insert(control.id, control.clone());
        Ok(control)
    }

    pub fn save_course(&mut self, course: &Course) -> DbResult<Course> {
        if !self.stages.contains_key(&course.stage_id) {
            return Err(DbError::ForeignKeyViolation(Some("courses.stage_id".into())));
        }
        if self
            .courses
            .values()
            .any(|c| c.stage_id == course.stage_id && c.name == course.name && c.id != course.id)
        {
            return Err(DbError::UniqueViolation(Some(
                "courses.stage_id_name".into(),
            )));
        }
        let mut course = course.clone();
        if course.id == 0 {
            course.id = self.next_id();
        } else if !self.courses.contains_key(&course.id) {
            return Err(DbError::NotFound);
        }
        self.courses.insert(course.id, course.clone());
        Ok(course)
    }

    pub fn save_competitor(&mut self, competitor: &Competitor) -> DbResult<Competitor> {
        if self
            .competitors
            .values()
            .any(|c| c.sid == competitor.sid && c.id != competitor.id)
        {
            return Err(DbError::UniqueViolation(Some("competitors.sid".into())));
        }
        let mut competitor = competitor.clone();
        if competitor.id == 0 {
            competitor.id = self.next_id();
        } else if !self.competitors.contains_key(&competitor.id) {
            return Err(DbError::NotFound);
        }
        self.competitors.insert(competitor.id, competitor.clone());
        Ok(competitor)
    }

    pub fn save_run(&mut self, run: &Run) -> DbResult<Run> {
        if !self.competitors.contains_key(&run.competitor_id) {
            return Err(DbError::ForeignKeyViolation(Some(
                "runs.competitor_id".into(),
            )));
        }
        if self
            .runs
            .values()
            .any(|r| r.competitor_id == run.competitor_id && r.day == run.day && r.id != run.id)
        {
            return Err(DbError::UniqueViolation(Some(
                "runs.competitor_id_day".into(),
            )));
        }
        let mut run = run.clone();
        if run.id == 0 {
            run.id = self.next_id();
        } else if !self.runs.contains_key(&run.id) {
            return Err(DbError::NotFound);
        }
        self.runs.insert(run.id, run.clone());
        Ok(run)
    }

    pub fn save_card(&mut self, card: &Card) -> DbResult<Card> {
        if let Some(run_id) = card.run_id
            && !self.runs.contains_key(&run_id)
        {
            return Err(DbError::ForeignKeyViolation(Some("cards.run_id".into())));
        }
        let mut card = card.clone();
        if card.id == 0 {
            card.id = self.next_id();
        } else if !self.cards.contains_key(&card.id) {
            return Err(DbError::NotFound);
        }
        self.cards.insert(card.id, card.clone());
        Ok(card)
    }
}
