//! JSON-snapshot implementation of the database port.
//!
//! The whole relational image lives in memory behind one lock; every write
//! validates first, mutates second and finally snapshots the image to disk
//! when a path is configured. The race office data of a multi-day event is
//! a few thousand rows, which keeps the single-document snapshot cheap.

mod store;

pub use store::Store;

use anyhow::{Context, Result};
use app_core::{
    Card, Club, Competitor, ConfigValue, Control, Course, DatabasePort, DbError, DbResult,
    DbpCard, DbpCompetitor, DbpConfig, DbpCourse, DbpRun, DbpStage, Run, RunSplit, Stage,
};
use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};
use tracing::{debug, info, instrument};

pub struct JsonDb {
    inner: Mutex<Store>,
    snapshot_path: Option<PathBuf>,
}

impl JsonDb {
    /// Volatile store without a snapshot file.
    pub fn in_memory() -> Self {
        JsonDb {
            inner: Mutex::new(Store::default()),
            snapshot_path: None,
        }
    }

    /// Store backed by a JSON snapshot; an existing file is loaded, a
    /// missing one starts empty and appears on the first write.
    #[instrument(name = "db.open", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let store = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing snapshot {}", path.display()))?
        } else {
            Store::default()
        };
        info!("snapshot_loaded");
        Ok(JsonDb {
            inner: Mutex::new(store),
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn flush(&self, store: &Store) -> DbResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(store)
            .context("serializing snapshot")
            .map_err(DbError::Other)?;
        std::fs::write(path, raw)
            .with_context(|| format!("writing snapshot {}", path.display()))
            .map_err(DbError::Other)?;
        Ok(())
    }
}

#[async_trait]
impl DbpConfig for JsonDb {
    async fn get_config(&self, key: &str) -> DbResult<Option<ConfigValue>> {
        let store = self.lock();
        store.get_config(key)
    }

    #[instrument(name = "db.config.set", skip(self, value))]
    async fn set_config(&self, key: &str, value: ConfigValue) -> DbResult<()> {
        let mut store = self.lock();
        store.set_config(key, &value);
        self.flush(&store)
    }
}

#[async_trait]
impl DbpStage for JsonDb {
    #[instrument(name = "db.stage.save", skip(self, stage), fields(day = stage.day))]
    async fn save_stage(&self, stage: &Stage) -> DbResult<Stage> {
        let mut store = self.lock();
        let saved = store.save_stage(stage)?;
        self.flush(&store)?;
        debug!(id = saved.id, "stage_saved");
        Ok(saved)
    }

    async fn get_stage_by_day(&self, day: u32) -> DbResult<Option<Stage>> {
        Ok(self.lock().stages.values().find(|s| s.day == day).cloned())
    }

    async fn list_stages(&self) -> DbResult<Vec<Stage>> {
        let store = self.lock();
        let mut stages: Vec<Stage> = store.stages.values().cloned().collect();
        stages.sort_by_key(|s| s.day);
        Ok(stages)
    }

    #[instrument(name = "db.control.save", skip(self, control))]
    async fn save_control(&self, control: &Control) -> DbResult<Control> {
        let mut store = self.lock();
        let saved = store.save_control(control)?;
        self.flush(&store)?;
        Ok(saved)
    }

    async fn list_controls(&self, stage_id: i64) -> DbResult<Vec<Control>> {
        let store = self.lock();
        let mut controls: Vec<Control> = store
            .controls
            .values()
            .filter(|c| c.stage_id == stage_id)
            .cloned()
            .collect();
        controls.sort_by_key(|c| c.id);
        Ok(controls)
    }
}

#[async_trait]
impl DbpCourse for JsonDb {
    #[instrument(name = "db.course.save", skip(self, course), fields(name = %course.name))]
    async fn save_course(&self, course: &Course) -> DbResult<Course> {
        let mut store = self.lock();
        let saved = store.save_course(course)?;
        self.flush(&store)?;
        debug!(id = saved.id, "course_saved");
        Ok(saved)
    }

    async fn get_course(&self, stage_id: i64, name: &str) -> DbResult<Option<Course>> {
        Ok(self
            .lock()
            .courses
            .values()
            .find(|c| c.stage_id == stage_id && c.name == name)
            .cloned())
    }

    async fn get_course_by_id(&self, course_id: i64) -> DbResult<Option<Course>> {
        Ok(self.lock().courses.get(&course_id).cloned())
    }

    async fn list_courses(&self, stage_id: i64) -> DbResult<Vec<Course>> {
        let store = self.lock();
        let mut courses: Vec<Course> = store
            .courses
            .values()
            .filter(|c| c.stage_id == stage_id)
            .cloned()
            .collect();
        courses.sort_by_key(|c| c.id);
        Ok(courses)
    }
}

#[async_trait]
impl DbpCompetitor for JsonDb {
    #[instrument(name = "db.competitor.save", skip(self, competitor), fields(sid = competitor.sid))]
    async fn save_competitor(&self, competitor: &Competitor) -> DbResult<Competitor> {
        let mut store = self.lock();
        let saved = store.save_competitor(competitor)?;
        self.flush(&store)?;
        debug!(id = saved.id, "competitor_saved");
        Ok(saved)
    }

    async fn get_competitor(&self, competitor_id: i64) -> DbResult<Option<Competitor>> {
        Ok(self.lock().competitors.get(&competitor_id).cloned())
    }

    async fn get_competitor_by_sid(&self, sid: i64) -> DbResult<Option<Competitor>> {
        Ok(self
            .lock()
            .competitors
            .values()
            .find(|c| c.sid == sid)
            .cloned())
    }

    async fn list_competitors(&self) -> DbResult<Vec<Competitor>> {
        let store = self.lock();
        let mut competitors: Vec<Competitor> = store.competitors.values().cloned().collect();
        competitors.sort_by_key(|c| c.id);
        Ok(competitors)
    }

    #[instrument(name = "db.run.delete", skip(self))]
    async fn delete_run(&self, run_id: i64) -> DbResult<()> {
        let mut store = self.lock();
        store.runs.remove(&run_id).ok_or(DbError::NotFound)?;
        store.run_splits.retain(|s| s.run_id != run_id);
        self.flush(&store)
    }

    async fn save_club(&self, club: &Club) -> DbResult<Club> {
        let mut store = self.lock();
        store.clubs.insert(club.reg.clone(), club.clone());
        self.flush(&store)?;
        Ok(club.clone())
    }

    async fn get_club(&self, reg: &str) -> DbResult<Option<Club>> {
        Ok(self.lock().clubs.get(reg).cloned())
    }
}

#[async_trait]
impl DbpRun for JsonDb {
    #[instrument(name = "db.run.save", skip(self, run), fields(day = run.day))]
    async fn save_run(&self, run: &Run) -> DbResult<Run> {
        let mut store = self.lock();
        let saved = store.save_run(run)?;
        self.flush(&store)?;
        Ok(saved)
    }

    async fn get_run(&self, day: u32, competitor_id: i64) -> DbResult<Option<Run>> {
        Ok(self
            .lock()
            .runs
            .values()
            .find(|r| r.day == day && r.competitor_id == competitor_id)
            .cloned())
    }

    async fn get_run_by_id(&self, run_id: i64) -> DbResult<Option<Run>> {
        Ok(self.lock().runs.get(&run_id).cloned())
    }

    async fn list_runs_by_day(&self, day: u32) -> DbResult<Vec<Run>> {
        let store = self.lock();
        let mut runs: Vec<Run> = store
            .runs
            .values()
            .filter(|r| r.day == day)
            .cloned()
            .collect();
        runs.sort_by_key(|r| r.id);
        Ok(runs)
    }

    async fn list_runs_of_competitor(&self, competitor_id: i64) -> DbResult<Vec<Run>> {
        let store = self.lock();
        let mut runs: Vec<Run> = store
            .runs
            .values()
            .filter(|r| r.competitor_id == competitor_id)
            .cloned()
            .collect();
        runs.sort_by_key(|r| (r.day, r.id));
        Ok(runs)
    }

    async fn list_run_splits(&self, run_id: i64) -> DbResult<Vec<RunSplit>> {
        let store = self.lock();
        let mut splits: Vec<RunSplit> = store
            .run_splits
            .iter()
            .filter(|s| s.run_id == run_id)
            .cloned()
            .collect();
        splits.sort_by_key(|s| s.seq);
        Ok(splits)
    }

    async fn list_course_splits(&self, course_id: i64) -> DbResult<Vec<RunSplit>> {
        let store = self.lock();
        let mut splits: Vec<RunSplit> = store
            .run_splits
            .iter()
            .filter(|s| s.course_id == course_id)
            .cloned()
            .collect();
        splits.sort_by_key(|s| (s.run_id, s.seq));
        Ok(splits)
    }
}

#[async_trait]
impl DbpCard for JsonDb {
    #[instrument(name = "db.card.save", skip(self, card), fields(card_number = card.card_number))]
    async fn save_card(&self, card: &Card) -> DbResult<Card> {
        let mut store = self.lock();
        let saved = store.save_card(card)?;
        self.flush(&store)?;
        debug!(id = saved.id, "card_saved");
        Ok(saved)
    }

    async fn get_card(&self, card_id: i64) -> DbResult<Option<Card>> {
        Ok(self.lock().cards.get(&card_id).cloned())
    }

    async fn list_cards(&self) -> DbResult<Vec<Card>> {
        let store = self.lock();
        let mut cards: Vec<Card> = store.cards.values().cloned().collect();
        cards.sort_by_key(|c| (c.readout_at, c.id));
        Ok(cards)
    }

    async fn list_cards_for_run(&self, run_id: i64) -> DbResult<Vec<Card>> {
        let store = self.lock();
        let mut cards: Vec<Card> = store
            .cards
            .values()
            .filter(|c| c.run_id == Some(run_id))
            .cloned()
            .collect();
        cards.sort_by_key(|c| (c.readout_at, c.id));
        Ok(cards)
    }

    #[instrument(
        name = "db.readout.commit",
        skip(self, card, run, splits),
        fields(card_id = card.id, run_id = run.id, splits = splits.len())
    )]
    async fn commit_readout_outcome(
        &self,
        card: &Card,
        run: &Run,
        splits: &[RunSplit],
    ) -> DbResult<()> {
        let mut store = self.lock();
        // validate before the first mutation so the commit stays all-or-nothing
        if !store.cards.contains_key(&card.id) || !store.runs.contains_key(&run.id) {
            return Err(DbError::NotFound);
        }
        // two readouts may race past the processor's duplicate check; the
        // committed payload stays authoritative
        if store.cards.values().any(|other| {
            other.run_id == Some(run.id) && other.id != card.id && other.raw != card.raw
        }) {
            return Err(DbError::UniqueViolation(Some("cards.run_id".into())));
        }
        store.cards.insert(card.id, card.clone());
        store.runs.insert(run.id, run.clone());
        store.run_splits.retain(|s| s.run_id != run.id);
        store.run_splits.extend_from_slice(splits);
        self.flush(&store)?;
        info!("readout_committed");
        Ok(())
    }
}

#[async_trait]
impl DatabasePort for JsonDb {
    async fn ping_db(&self) -> DbResult<()> {
        Ok(())
    }
}
