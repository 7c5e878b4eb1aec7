//! Receipt rendering.
//!
//! Everything on the strip is computed before rendering; `Receipt::render`
//! is pure over its input and only talks to the sink capability, so tests
//! compare the captured lines byte for byte.

use crate::{
    PrinterResult, ReceiptSink, RunSplit, Underline,
    timing::{fmt_clock_opt, fmt_duration, fmt_duration_opt},
};
use chrono::NaiveDate;

/// printable columns of the thermal strip
pub const DEFAULT_WIDTH: usize = 48;

/// one split line: cumulative time, leg time, loss against the field best,
/// pace over the leg length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptRow {
    pub code: String,
    pub cum: Option<i64>,
    pub leg: Option<i64>,
    pub loss: Option<i64>,
    pub pace: Option<i64>,
}

/// fully computed receipt of one run
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub width: usize,
    pub day: u32,
    pub event_name: String,
    pub event_date: Option<NaiveDate>,
    pub place: String,
    /// competitor display name, family name first
    pub competitor: String,
    /// club short code; empty for unattached runners
    pub club: String,
    pub group: String,
    pub length_m: i64,
    pub climb_m: i64,
    pub check: Option<i64>,
    pub start: Option<i64>,
    pub finish: Option<i64>,
    pub sid: i64,
    /// false renders the DSQ total row and the extra/missed block
    pub ok: bool,
    pub total: Option<i64>,
    pub rows: Vec<ReceiptRow>,
    /// last leg, from the final required control to the finish punch
    pub finish_leg: Option<i64>,
    pub finish_loss: Option<i64>,
    /// unmatched punches as (code, seconds since start)
    pub extras: Vec<(i32, i64)>,
    /// required codes without a punch
    pub missing: Vec<i32>,
    /// sum of all leg losses
    pub total_loss: i64,
    /// (place, field size); only carried for OK runs
    pub standing: Option<(usize, usize)>,
}

fn opt_or_dashes(value: Option<i64>) -> String {
    value.map(fmt_duration).unwrap_or_else(|| "-----".to_string())
}

fn loss_column(loss: Option<i64>) -> String {
    match loss {
        Some(l) if l > 0 => format!("+{}", fmt_duration(l)),
        _ => String::new(),
    }
}

impl Receipt {
    /// Smallest leg time per seq over every stored split of the course,
    /// indexed 0..=n (the final entry is the finish leg).
    pub fn best_leg_times(split_count: usize, course_splits: &[RunSplit]) -> Vec<Option<i64>> {
        let mut best = vec![None; split_count];
        for split in course_splits {
            let seq = split.seq as usize;
            if seq >= split_count {
                continue;
            }
            if let Some(leg) = split.leg_time {
                best[seq] = Some(best[seq].map_or(leg, |b: i64| b.min(leg)));
            }
        }
        best
    }

    pub fn render(&self, sink: &mut dyn ReceiptSink) -> PrinterResult<()> {
        let w = self.width;
        let divider = "=".repeat(w);

        sink.logo()?;
        sink.bold_on()?;
        sink.text(&format!("{divider}\n"))?;
        sink.text(&format!("E{} - {}\n", self.day, self.event_name))?;
        sink.bold_off()?;

        let date = self
            .event_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        sink.text(&format!("{} {}\n", date, self.place))?;
        sink.text(&format!("{}\n", "-".repeat(w)))?;

        sink.bold_on()?;
        let name_width = w.saturating_sub(self.club.chars().count());
        sink.text(&format!("{:<name_width$}{}\n", self.competitor, self.club))?;
        sink.bold_off()?;

        let distance = format!("{:.2}km {}m", self.length_m as f64 / 1000.0, self.climb_m);
        let group_width = w.saturating_sub(distance.chars().count());
        sink.underline(Underline::Double)?;
        sink.text(&format!("{:<group_width$}{}\n", self.group, distance))?;
        sink.underline(Underline::Off)?;

        sink.text(&format!(
            "Check: {:<25}Finish: {}\n",
            fmt_clock_opt(self.check),
            fmt_clock_opt(self.finish)
        ))?;
        sink.text(&format!(
            "Start: {:<25}{:>16}\n",
            fmt_clock_opt(self.start),
            format!("SI:{}", self.sid)
        ))?;

        sink.text(&format!("{divider}\n"))?;

        for (i, row) in self.rows.iter().enumerate() {
            let pace = row
                .pace
                .map(|p| format!("~{}", fmt_duration(p)))
                .unwrap_or_default();
            if i + 1 == self.rows.len() {
                sink.underline(Underline::Double)?;
            }
            sink.text(&format!(
                "{:>2}. {:>3}{:>10}{:>10}{:>10}{:>11}\n",
                i + 1,
                row.code,
                opt_or_dashes(row.cum),
                opt_or_dashes(row.leg),
                loss_column(row.loss),
                pace
            ))?;
            if i + 1 == self.rows.len() {
                sink.underline(Underline::Off)?;
            }
        }

        sink.underline(Underline::Double)?;
        sink.bold_on()?;
        sink.text(&format!(
            "{:>4}{:>3}{:>10}{:>10}{:>10}{:>11}\n",
            "",
            if self.ok { "OK" } else { "DSQ" },
            fmt_duration_opt(self.total),
            opt_or_dashes(self.finish_leg),
            loss_column(self.finish_loss),
            ""
        ))?;
        sink.bold_off()?;
        sink.underline(Underline::Off)?;

        sink.text(&format!("{divider}\n"))?;

        if !self.ok {
            if !self.extras.is_empty() {
                let extras: Vec<String> = self
                    .extras
                    .iter()
                    .map(|(code, time)| format!("{code}/{}", fmt_duration(*time)))
                    .collect();
                sink.text(&format!("extra: {}\n", extras.join(", ")))?;
            }
            if !self.missing.is_empty() {
                let missing: Vec<String> =
                    self.missing.iter().map(|code| code.to_string()).collect();
                sink.text(&format!("missed: {}\n", missing.join(", ")))?;
            }
        }

        let loss_width = w.saturating_sub("total loss:".chars().count() + 10);
        sink.text(&format!(
            "total loss:{:>loss_width$}{:>10}\n",
            format!("+{}", fmt_duration(self.total_loss)),
            "min/km"
        ))?;

        let standing = self
            .standing
            .map(|(place, field)| format!("standing: {place}/{field}"))
            .unwrap_or_default();
        let standing_width = w.saturating_sub(10);
        let overall_pace = self
            .total
            .and_then(|t| crate::timing::safe_div(t * 1000, self.length_m));
        sink.text(&format!(
            "{:<standing_width$}{:>10}\n",
            standing,
            fmt_duration_opt(overall_pace)
        ))?;

        sink.feed(3)?;
        sink.cut()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CaptureSink;

    fn receipt() -> Receipt {
        Receipt {
            width: DEFAULT_WIDTH,
            day: 1,
            event_name: "O-Halloween".into(),
            event_date: NaiveDate::from_ymd_opt(2025, 11, 15),
            place: "Kyiv".into(),
            competitor: "Лисенко Віктор".into(),
            club: "".into(),
            group: "Ч21Е".into(),
            length_m: 1250,
            climb_m: 0,
            check: Some(60386),
            start: Some(60386),
            finish: Some(62341),
            sid: 16,
            ok: true,
            total: Some(1955),
            rows: vec![
                ReceiptRow {
                    code: "70".into(),
                    cum: Some(33),
                    leg: Some(33),
                    loss: Some(0),
                    pace: Some(2062),
                },
                ReceiptRow {
                    code: "100".into(),
                    cum: Some(1951),
                    leg: Some(1918),
                    loss: Some(12),
                    pace: None,
                },
            ],
            finish_leg: Some(4),
            finish_loss: Some(0),
            extras: vec![],
            missing: vec![],
            total_loss: 12,
            standing: Some((1, 1)),
        }
    }

    #[test]
    fn rendering_is_pure() {
        let receipt = receipt();
        let mut first = CaptureSink::new();
        let mut second = CaptureSink::new();
        receipt.render(&mut first).unwrap();
        receipt.render(&mut second).unwrap();
        assert_eq!(first.lines(), second.lines());
    }

    #[test]
    fn header_and_rows_fill_the_strip_width() {
        let mut sink = CaptureSink::new();
        receipt().render(&mut sink).unwrap();
        let lines = sink.lines();

        assert_eq!(lines[0], "=".repeat(48));
        assert_eq!(lines[1], "E1 - O-Halloween");
        assert_eq!(lines[2], "2025-11-15 Kyiv");
        assert_eq!(lines[4], format!("{:<48}", "Лисенко Віктор"));
        assert_eq!(lines[5], "Ч21Е                                   1.25km 0m");
        assert_eq!(lines[6], "Check: 16:46:26                 Finish: 17:19:01");
        assert_eq!(lines[7], "Start: 16:46:26                            SI:16");
        assert_eq!(lines[9], " 1.  70      0:33      0:33               ~34:22");
        assert_eq!(lines[10], " 2. 100     32:31     31:58     +0:12           ");
        assert_eq!(lines[11], "     OK     32:35      0:04                     ");
        assert_eq!(lines[13], "total loss:                      +0:12    min/km");
        assert_eq!(lines[14], "standing: 1/1                              26:04");
    }

    #[test]
    fn missing_punch_renders_dashes_and_dsq() {
        let mut r = receipt();
        r.ok = false;
        r.standing = None;
        r.rows[1].cum = None;
        r.rows[1].leg = None;
        r.rows[1].loss = None;
        r.missing = vec![100];
        r.extras = vec![(49, 539)];

        let mut sink = CaptureSink::new();
        r.render(&mut sink).unwrap();
        let lines = sink.lines();

        assert_eq!(lines[10], " 2. 100     -----     -----                     ");
        assert_eq!(lines[11], "    DSQ     32:35      0:04                     ");
        assert_eq!(lines[13], "extra: 49/8:59");
        assert_eq!(lines[14], "missed: 100");
        assert_eq!(lines[16], format!("{:<38}{:>10}", "", "26:04"));
    }
}
