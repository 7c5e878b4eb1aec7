// database port

use crate::{
    Card, Club, Competitor, ConfigValue, Control, Course, Run, RunSplit, Stage,
};
use async_trait::async_trait;
use thiserror::Error;

/// database port trait
#[async_trait]
pub trait DatabasePort:
    DbpConfig + DbpStage + DbpCourse + DbpCompetitor + DbpRun + DbpCard
{
    async fn ping_db(&self) -> DbResult<()>;
}

/// database port trait for the event configuration table
#[async_trait]
pub trait DbpConfig: Send + Sync {
    async fn get_config(&self, key: &str) -> DbResult<Option<ConfigValue>>;
    async fn set_config(&self, key: &str, value: ConfigValue) -> DbResult<()>;
}

/// database port trait for stages and their controls
#[async_trait]
pub trait DbpStage: Send + Sync {
    /// Insert (id == 0) or update a stage; returns the stored row.
    async fn save_stage(&self, stage: &Stage) -> DbResult<Stage>;
    async fn get_stage_by_day(&self, day: u32) -> DbResult<Option<Stage>>;
    async fn list_stages(&self) -> DbResult<Vec<Stage>>;
    async fn save_control(&self, control: &Control) -> DbResult<Control>;
    async fn list_controls(&self, stage_id: i64) -> DbResult<Vec<Control>>;
}

/// database port trait for courses (course controls travel with the course)
#[async_trait]
pub trait DbpCourse: Send + Sync {
    async fn save_course(&self, course: &Course) -> DbResult<Course>;
    async fn get_course(&self, stage_id: i64, name: &str) -> DbResult<Option<Course>>;
    async fn get_course_by_id(&self, course_id: i64) -> DbResult<Option<Course>>;
    async fn list_courses(&self, stage_id: i64) -> DbResult<Vec<Course>>;
}

/// database port trait for competitors and clubs
#[async_trait]
pub trait DbpCompetitor: Send + Sync {
    async fn save_competitor(&self, competitor: &Competitor) -> DbResult<Competitor>;
    async fn get_competitor(&self, competitor_id: i64) -> DbResult<Option<Competitor>>;
    async fn get_competitor_by_sid(&self, sid: i64) -> DbResult<Option<Competitor>>;
    /// Deterministic order: by id.
    async fn list_competitors(&self) -> DbResult<Vec<Competitor>>;
    async fn delete_run(&self, run_id: i64) -> DbResult<()>;
    async fn save_club(&self, club: &Club) -> DbResult<Club>;
    async fn get_club(&self, reg: &str) -> DbResult<Option<Club>>;
}

/// database port trait for runs and their splits
#[async_trait]
pub trait DbpRun: Send + Sync {
    async fn save_run(&self, run: &Run) -> DbResult<Run>;
    async fn get_run(&self, day: u32, competitor_id: i64) -> DbResult<Option<Run>>;
    async fn get_run_by_id(&self, run_id: i64) -> DbResult<Option<Run>>;
    async fn list_runs_by_day(&self, day: u32) -> DbResult<Vec<Run>>;
    async fn list_runs_of_competitor(&self, competitor_id: i64) -> DbResult<Vec<Run>>;
    /// Splits of one run, ordered by seq.
    async fn list_run_splits(&self, run_id: i64) -> DbResult<Vec<RunSplit>>;
    /// Splits of every run recorded on a course (field-best statistics).
    async fn list_course_splits(&self, course_id: i64) -> DbResult<Vec<RunSplit>>;
}

/// database port trait for card readouts
#[async_trait]
pub trait DbpCard: Send + Sync {
    async fn save_card(&self, card: &Card) -> DbResult<Card>;
    async fn get_card(&self, card_id: i64) -> DbResult<Option<Card>>;
    /// Deterministic order: by readout time, then id.
    async fn list_cards(&self) -> DbResult<Vec<Card>>;
    async fn list_cards_for_run(&self, run_id: i64) -> DbResult<Vec<Card>>;
    /// One transaction: update the card, update the run and replace all of
    /// the run's splits. Either everything is applied or nothing.
    async fn commit_readout_outcome(
        &self,
        card: &Card,
        run: &Run,
        splits: &[RunSplit],
    ) -> DbResult<()>;
}

#[derive(Debug, Error)]
pub enum DbError {
    /// ID does not exist
    #[error("entity not found")]
    NotFound,

    /// constraint name if it is known
    #[error("unique violation{0:?}")]
    UniqueViolation(Option<String>),

    /// constraint name if it is known
    #[error("foreign key violation{0:?}")]
    ForeignKeyViolation(Option<String>),

    /// constraint name if it is known
    #[error("check violation{0:?}")]
    CheckViolation(Option<String>),

    // connection, snapshot i/o, or other store errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DbResult<T> = Result<T, DbError>;
