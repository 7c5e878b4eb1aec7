// one competitor's participation in one stage

use displaydoc::Display;
use serde::{Deserialize, Serialize};

/// outcome class of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    /// DNS
    #[default]
    Dns,
    /// OK
    Ok,
    /// MP
    Mp,
    /// OVT
    Ovt,
}

impl RunStatus {
    /// Strict parse of the stored value set; used by the record editor.
    pub fn parse(s: &str) -> Option<RunStatus> {
        match s {
            "DNS" => Some(RunStatus::Dns),
            "OK" => Some(RunStatus::Ok),
            "MP" => Some(RunStatus::Mp),
            "OVT" => Some(RunStatus::Ovt),
            _ => None,
        }
    }

    /// every value the editor accepts
    pub const VALUES: [&'static str; 4] = ["DNS", "OK", "MP", "OVT"];
}

/// intent and eventual outcome of one competitor on one day;
/// (competitor_id, day) is unique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// store id; 0 until persisted
    pub id: i64,
    pub competitor_id: i64,
    pub day: u32,
    /// scheduler output; minute slot counted from the mass start
    pub start_slot: Option<u32>,
    /// seconds within day
    pub start: Option<i64>,
    /// seconds within day
    pub finish: Option<i64>,
    /// finish - start, in seconds
    pub result: Option<i64>,
    pub status: RunStatus,
}

impl Run {
    /// A fresh DNS run for a declared day.
    pub fn declared(competitor_id: i64, day: u32) -> Self {
        Run {
            id: 0,
            competitor_id,
            day,
            start_slot: None,
            start: None,
            finish: None,
            result: None,
            status: RunStatus::Dns,
        }
    }

    /// A run counts as completed once a result is recorded, whatever the
    /// status (MP runs carry their time too).
    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }
}

/// the seq-th split of a run; the final split carries the literal code "F"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSplit {
    pub run_id: i64,
    pub course_id: i64,
    pub seq: u32,
    pub control_code: String,
    /// seconds since the previous required control; None if unpunched
    pub leg_time: Option<i64>,
    /// seconds since the start; None if unpunched
    pub cum_time: Option<i64>,
}

/// code of the synthetic finish split
pub const FINISH_CODE: &str = "F";
