// course: the ordered control sequence of one group

use crate::utils::{
    normalize::normalize_group,
    validation::{FieldCode, FieldError, ValidationErrors, ValidationResult},
};
use displaydoc::Display;
use serde::{Deserialize, Serialize};

/// role of a course control within the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum ControlKind {
    /// Start
    Start,
    /// Control
    #[default]
    Normal,
    /// Finish
    Finish,
}

impl ControlKind {
    /// Parse the kind attribute of a course export; anything unknown is a
    /// normal control.
    pub fn from_export(kind: Option<&str>) -> Self {
        match kind {
            Some(k) if k.eq_ignore_ascii_case("start") => ControlKind::Start,
            Some(k) if k.eq_ignore_ascii_case("finish") => ControlKind::Finish,
            _ => ControlKind::Normal,
        }
    }
}

/// the seq-th required control of a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseControl {
    /// position in the course, 0..N-1
    pub seq: u32,
    pub kind: ControlKind,
    pub code: String,
    /// metres from the previous control, when the course setter provides it
    pub leg_length: Option<i64>,
}

impl CourseControl {
    /// Numeric control code, if this control takes part in punch analysis.
    pub fn numeric_code(&self) -> Option<i32> {
        self.code.parse().ok()
    }
}

/// The ordered sequence of controls a group runs. The course name equals the
/// group name of its runners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// store id; 0 until persisted
    pub id: i64,
    /// id of owning stage
    pub stage_id: i64,
    pub name: String,
    /// length in metres
    pub length: i64,
    /// climb in metres
    pub climb: i64,
    /// required controls ordered by seq
    pub controls: Vec<CourseControl>,
}

impl Course {
    pub fn new(stage_id: i64, name: impl Into<String>, length: i64, climb: i64) -> Self {
        Course {
            id: 0,
            stage_id,
            name: normalize_group(name.into()),
            length,
            climb,
            controls: Vec::new(),
        }
    }

    /// Required numeric codes in course order, minus the ignore set.
    pub fn required_codes(&self, ignored: &std::collections::HashSet<i32>) -> Vec<i32> {
        self.controls
            .iter()
            .filter_map(CourseControl::numeric_code)
            .filter(|code| !ignored.contains(code))
            .collect()
    }

    /// First real control of the course (seq 1, right after the start).
    /// Start conflicts within a slot are decided on this code.
    pub fn first_control(&self) -> Option<&str> {
        self.controls.get(1).map(|cc| cc.code.as_str())
    }

    pub fn validate(&self) -> ValidationResult<()> {
        let mut errs = ValidationErrors::new();

        if self.name.is_empty() {
            errs.push("name", FieldCode::Required);
        }
        if self.length <= 0 {
            errs.add(FieldError::with_message(
                "length",
                FieldCode::OutOfRange,
                "course length must be positive",
            ));
        }
        for (i, cc) in self.controls.iter().enumerate() {
            if cc.seq as usize != i {
                errs.add(FieldError::with_message(
                    "controls.seq",
                    FieldCode::InvalidFormat,
                    format!("control sequence broken at index {i}"),
                ));
                break;
            }
        }

        errs.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn course_with(codes: &[&str]) -> Course {
        let mut course = Course::new(1, "M21", 4200, 120);
        course.controls = codes
            .iter()
            .enumerate()
            .map(|(i, code)| CourseControl {
                seq: i as u32,
                kind: if i == 0 {
                    ControlKind::Start
                } else if i + 1 == codes.len() {
                    ControlKind::Finish
                } else {
                    ControlKind::Normal
                },
                code: (*code).to_string(),
                leg_length: None,
            })
            .collect();
        course
    }

    #[test]
    fn required_codes_keep_numeric_controls_only() {
        let course = course_with(&["S1", "31", "45", "72", "F1"]);
        assert_eq!(course.required_codes(&HashSet::new()), vec![31, 45, 72]);
    }

    #[test]
    fn required_codes_drop_ignored() {
        let course = course_with(&["S1", "31", "45", "72", "F1"]);
        let ignored = HashSet::from([45]);
        assert_eq!(course.required_codes(&ignored), vec![31, 72]);
    }

    #[test]
    fn first_control_is_seq_one() {
        let course = course_with(&["S1", "31", "45", "F1"]);
        assert_eq!(course.first_control(), Some("31"));
        assert_eq!(Course::new(1, "W16", 2000, 0).first_control(), None);
    }

    #[test]
    fn validation_rejects_zero_length_and_broken_seq() {
        let mut course = course_with(&["S1", "31", "F1"]);
        course.length = 0;
        course.controls[2].seq = 7;
        let errs = course.validate().unwrap_err();
        assert_eq!(errs.errors.len(), 2);
    }
}
