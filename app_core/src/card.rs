// punch-card readouts as delivered by the reading station

use crate::timing::NO_TIME;
use chrono::{DateTime, Utc};
use displaydoc::Display;
use serde::{Deserialize, Serialize};

/// outcome of processing one readout; an ordinary value, never an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadoutStatus {
    /// OK
    Ok,
    /// MP
    Mp,
    /// DUP
    Dup,
    /// UNK
    Unk,
    /// UNK_COURSE
    UnkCourse,
    /// NO_START
    NoStart,
    /// NO_FINISH
    NoFinish,
}

/// one punch as recorded on the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchRecord {
    #[serde(rename = "cardNumber")]
    pub card_number: i64,
    pub code: i32,
    /// seconds within day
    pub time: i64,
}

/// wire shape of one card readout (ingestion boundary)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchReadout {
    #[serde(rename = "stationNumber")]
    pub station_number: i64,
    #[serde(rename = "cardNumber")]
    pub card_number: i64,
    /// seconds within day; 0xEEEE when the start station was not punched
    #[serde(rename = "startTime")]
    pub start_time: i64,
    /// seconds within day; 0xEEEE when the finish station was not punched
    #[serde(rename = "finishTime")]
    pub finish_time: i64,
    #[serde(rename = "checkTime")]
    pub check_time: Option<i64>,
    pub punches: Vec<PunchRecord>,
}

impl PunchReadout {
    pub fn has_start(&self) -> bool {
        self.start_time != NO_TIME
    }
    pub fn has_finish(&self) -> bool {
        self.finish_time != NO_TIME
    }
}

/// response of the ingestion boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadoutOutcome {
    pub status: ReadoutStatus,
    /// card number, echoed back when the card could be attributed
    pub sid: Option<i64>,
}

impl ReadoutOutcome {
    pub fn new(status: ReadoutStatus, sid: i64) -> Self {
        ReadoutOutcome {
            status,
            sid: Some(sid),
        }
    }
    pub fn unknown() -> Self {
        ReadoutOutcome {
            status: ReadoutStatus::Unk,
            sid: None,
        }
    }
}

/// One stored readout event. Distinct readouts for the same run are allowed;
/// a second readout with a different raw payload is a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// store id; 0 until persisted
    pub id: i64,
    pub card_number: i64,
    /// set once the readout is attributed to a run
    pub run_id: Option<i64>,
    /// raw seconds as read from the card; may carry the 0xEEEE sentinel
    pub start_time: i64,
    pub finish_time: i64,
    pub check_time: Option<i64>,
    /// wall clock of the readout event
    pub readout_at: DateTime<Utc>,
    pub status: Option<ReadoutStatus>,
    /// the payload exactly as it arrived
    pub raw: serde_json::Value,
}

impl Card {
    pub fn from_readout(
        readout: &PunchReadout,
        raw: serde_json::Value,
        readout_at: DateTime<Utc>,
    ) -> Self {
        Card {
            id: 0,
            card_number: readout.card_number,
            run_id: None,
            start_time: readout.start_time,
            finish_time: readout.finish_time,
            check_time: readout.check_time,
            readout_at,
            status: None,
            raw,
        }
    }

    /// Rebuild the wire shape from the stored payload (manual re-assignment
    /// works on stored cards).
    pub fn to_readout(&self) -> Result<PunchReadout, serde_json::Error> {
        serde_json::from_value(self.raw.clone())
    }
}
