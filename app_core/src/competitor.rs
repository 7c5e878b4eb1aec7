// registered competitors and their clubs

use crate::utils::{
    normalize::{normalize_group, normalize_opt, normalize_ws},
    validation::{FieldCode, FieldError, ValidationErrors, ValidationResult},
};
use serde::{Deserialize, Serialize};

/// lookup from registration short code to full club name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub reg: String,
    pub name: String,
}

/// a registered person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Competitor {
    /// store id; 0 until persisted
    pub id: i64,
    /// club short code; may be empty for unattached runners
    pub reg: String,
    /// group name; equals the course name on each declared day
    pub group: String,
    /// card number assigned to this competitor, unique within the event
    pub sid: i64,
    pub first_name: String,
    pub last_name: String,
    pub notes: Option<String>,
    /// day numbers the competitor declared to run
    pub declared_days: Vec<u32>,
    /// declared fee
    pub fee_due: i64,
    /// fee actually collected at registration
    pub fee_paid: Option<i64>,
}

impl Competitor {
    /// Display name, family name first.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    pub fn set_reg(&mut self, reg: impl Into<String>) -> &mut Self {
        self.reg = normalize_ws(reg.into());
        self
    }

    pub fn set_group(&mut self, group: impl Into<String>) -> &mut Self {
        self.group = normalize_group(group.into());
        self
    }

    pub fn set_names(
        &mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> &mut Self {
        self.first_name = normalize_ws(first_name.into());
        self.last_name = normalize_ws(last_name.into());
        self
    }

    pub fn set_notes(&mut self, notes: Option<impl Into<String>>) -> &mut Self {
        self.notes = normalize_opt(notes);
        self
    }

    pub fn validate(&self) -> ValidationResult<()> {
        let mut errs = ValidationErrors::new();

        if self.sid <= 0 {
            errs.add(FieldError::with_message(
                "sid",
                FieldCode::OutOfRange,
                "card number must be positive",
            ));
        }
        if self.group.is_empty() {
            errs.push("group", FieldCode::Required);
        }
        if self.last_name.is_empty() {
            errs.push("last_name", FieldCode::Required);
        }
        if self.declared_days.iter().any(|d| *d == 0) {
            errs.add(FieldError::with_message(
                "declared_days",
                FieldCode::OutOfRange,
                "day numbers are 1-based",
            ));
        }

        errs.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_normalize_text_fields() {
        let mut c = Competitor::default();
        c.set_group("Ч21 Е")
            .set_names("  Віктор ", " Лисенко ")
            .set_notes(Some("  "));
        assert_eq!(c.group, "Ч21Е");
        assert_eq!(c.full_name(), "Лисенко Віктор");
        assert_eq!(c.notes, None);
    }

    #[test]
    fn validation_collects_every_broken_field() {
        let mut c = Competitor::default();
        c.declared_days = vec![0, 1];
        let errs = c.validate().unwrap_err();
        let fields: Vec<_> = errs.errors.iter().map(|e| e.get_field()).collect();
        assert_eq!(fields, vec!["sid", "group", "last_name", "declared_days"]);
    }
}
