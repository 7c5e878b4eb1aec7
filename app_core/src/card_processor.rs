//! Card processing: from a raw readout to a validated run with splits and a
//! printed receipt.

use crate::{
    Card, Competitor, Core, CoreError, CoreResult, Course, DbError, DbpCard, DbpCompetitor,
    DbpCourse, DbpRun, DbpStage, PunchReadout, ReadoutOutcome, ReadoutStatus, Receipt,
    ReceiptRow, ReceiptSink, Run, RunSplit, RunStatus,
    analysis::{ControlTime, PunchAnalysis, analyse_order},
    retime::{DEFAULT_MAX_LEG, retime_local_anchors},
    run::FINISH_CODE,
    timing::pace_seconds,
};
use chrono::Utc;

/// a required control with the leg length leading to it
type RequiredControl = (i32, Option<i64>);

impl Core {
    /// Handle one readout from the reading station. Every card is persisted,
    /// even unknown ones; domain statuses come back as values, only broken
    /// store state is an error.
    pub async fn process_readout(
        &self,
        readout: &PunchReadout,
        sink: &mut dyn ReceiptSink,
    ) -> CoreResult<ReadoutOutcome> {
        let raw = serde_json::to_value(readout)
            .map_err(|e| CoreError::Parsing(format!("readout payload: {e}")))?;
        let card = Card::from_readout(readout, raw, Utc::now());
        let card = self.database.save_card(&card).await?;

        let Some(competitor) = self
            .database
            .get_competitor_by_sid(readout.card_number)
            .await?
        else {
            return Ok(ReadoutOutcome::unknown());
        };

        let day = self.current_day().await?;
        let Some(run) = self.database.get_run(day, competitor.id).await? else {
            return Err(CoreError::Integrity(format!(
                "no run configured for day {day} and competitor {}",
                competitor.id
            )));
        };

        // The first committed payload stays authoritative: a second readout
        // is only accepted when it carries the identical payload.
        for existing in self.database.list_cards_for_run(run.id).await? {
            if existing.id != card.id && existing.raw != card.raw {
                return Ok(ReadoutOutcome::new(ReadoutStatus::Dup, competitor.sid));
            }
        }

        self.evaluate_readout(card, readout, day, competitor, run, sink)
            .await
    }

    /// Manual fix-up: bind a stored card to a chosen run and re-evaluate it,
    /// bypassing card-number resolution and duplicate detection.
    pub async fn assign_card(
        &self,
        card_id: i64,
        run_id: i64,
        sink: &mut dyn ReceiptSink,
    ) -> CoreResult<ReadoutOutcome> {
        let card = self
            .database
            .get_card(card_id)
            .await?
            .ok_or_else(|| CoreError::MissingResource(format!("card {card_id}")))?;
        let run = self
            .database
            .get_run_by_id(run_id)
            .await?
            .ok_or_else(|| CoreError::MissingResource(format!("run {run_id}")))?;
        let competitor = self
            .database
            .get_competitor(run.competitor_id)
            .await?
            .ok_or_else(|| {
                CoreError::Integrity(format!("run {run_id} references a missing competitor"))
            })?;
        let readout = card
            .to_readout()
            .map_err(|e| CoreError::Parsing(format!("stored payload of card {card_id}: {e}")))?;

        // re-association: the chosen card becomes the run's card
        for mut other in self.database.list_cards_for_run(run.id).await? {
            if other.id != card.id {
                other.run_id = None;
                self.database.save_card(&other).await?;
            }
        }

        self.evaluate_readout(card, &readout, run.day, competitor, run, sink)
            .await
    }

    async fn evaluate_readout(
        &self,
        mut card: Card,
        readout: &PunchReadout,
        day: u32,
        competitor: Competitor,
        mut run: Run,
        sink: &mut dyn ReceiptSink,
    ) -> CoreResult<ReadoutOutcome> {
        if !readout.has_start() {
            card.status = Some(ReadoutStatus::NoStart);
            self.database.save_card(&card).await?;
            return Ok(ReadoutOutcome::new(ReadoutStatus::NoStart, competitor.sid));
        }
        if !readout.has_finish() {
            card.status = Some(ReadoutStatus::NoFinish);
            self.database.save_card(&card).await?;
            return Ok(ReadoutOutcome::new(ReadoutStatus::NoFinish, competitor.sid));
        }

        let Some(course) = self.course_for(day, &competitor).await? else {
            card.status = Some(ReadoutStatus::UnkCourse);
            self.database.save_card(&card).await?;
            return Ok(ReadoutOutcome::new(ReadoutStatus::UnkCourse, competitor.sid));
        };

        let ignored = self.ignore_controls().await?;
        let required: Vec<RequiredControl> = course
            .controls
            .iter()
            .filter_map(|cc| cc.numeric_code().map(|code| (code, cc.leg_length)))
            .filter(|(code, _)| !ignored.contains(code))
            .collect();
        let required_codes: Vec<i32> = required.iter().map(|(code, _)| *code).collect();

        let punches = retime_local_anchors(&readout.punches, DEFAULT_MAX_LEG);
        let relative: Vec<ControlTime> = punches
            .iter()
            .map(|p| (p.code, p.time - readout.start_time))
            .collect();

        let analysis = analyse_order(&required_codes, &relative);
        let result = readout.finish_time - readout.start_time;
        let status = if analysis.all_visited && analysis.order_correct {
            ReadoutStatus::Ok
        } else {
            ReadoutStatus::Mp
        };

        // the readout is valid for this run: link the card
        card.run_id = Some(run.id);
        run.start = Some(readout.start_time);
        run.finish = Some(readout.finish_time);
        run.result = Some(result);
        run.status = match status {
            ReadoutStatus::Ok => RunStatus::Ok,
            _ => RunStatus::Mp,
        };
        card.status = Some(status);

        let splits = build_splits(run.id, course.id, &analysis, result);
        if let Err(e) = self
            .database
            .commit_readout_outcome(&card, &run, &splits)
            .await
        {
            // a concurrent readout won the race for this run
            if matches!(e, DbError::UniqueViolation(_)) {
                return Ok(ReadoutOutcome::new(ReadoutStatus::Dup, competitor.sid));
            }
            return Err(e.into());
        }

        let receipt = self
            .build_receipt(day, &competitor, &course, &card, &run, &required, &analysis, &splits)
            .await?;
        receipt.render(sink)?;

        Ok(ReadoutOutcome::new(status, competitor.sid))
    }

    /// The course the competitor runs on the given day: declared for the
    /// day, stage exists, and the stage carries a course named after the
    /// competitor's group.
    pub async fn course_for(
        &self,
        day: u32,
        competitor: &Competitor,
    ) -> CoreResult<Option<Course>> {
        if !competitor.declared_days.contains(&day) {
            return Ok(None);
        }
        let Some(stage) = self.database.get_stage_by_day(day).await? else {
            return Ok(None);
        };
        Ok(self.database.get_course(stage.id, &competitor.group).await?)
    }

    #[allow(clippy::too_many_arguments)]
    async fn build_receipt(
        &self,
        day: u32,
        competitor: &Competitor,
        course: &Course,
        card: &Card,
        run: &Run,
        required: &[RequiredControl],
        analysis: &PunchAnalysis,
        splits: &[RunSplit],
    ) -> CoreResult<Receipt> {
        let n = required.len();
        let course_splits = self.database.list_course_splits(course.id).await?;
        let best = Receipt::best_leg_times(n + 1, &course_splits);

        let mut total_loss = 0;
        let mut rows = Vec::with_capacity(n);
        for (i, (code, leg_length)) in required.iter().enumerate() {
            let split = &splits[i];
            let loss = match (split.leg_time, best[i]) {
                (Some(leg), Some(best_leg)) => Some((leg - best_leg).max(0)),
                _ => None,
            };
            total_loss += loss.unwrap_or(0);
            rows.push(ReceiptRow {
                code: code.to_string(),
                cum: split.cum_time,
                leg: split.leg_time,
                loss,
                pace: split
                    .leg_time
                    .zip(*leg_length)
                    .and_then(|(leg, length)| pace_seconds(leg, length)),
            });
        }

        let finish_split = &splits[n];
        let finish_loss = match (finish_split.leg_time, best[n]) {
            (Some(leg), Some(best_leg)) => Some((leg - best_leg).max(0)),
            _ => None,
        };
        total_loss += finish_loss.unwrap_or(0);

        let standing = if run.status == RunStatus::Ok {
            Some(self.standing_of(day, competitor, run).await?)
        } else {
            None
        };

        Ok(Receipt {
            width: crate::receipt::DEFAULT_WIDTH,
            day,
            event_name: self
                .get_config_str(crate::event::config_keys::NAME)
                .await?
                .unwrap_or_default(),
            event_date: self
                .get_config_date(crate::event::config_keys::DATE)
                .await?,
            place: self
                .get_config_str(crate::event::config_keys::PLACE)
                .await?
                .unwrap_or_default(),
            competitor: competitor.full_name(),
            club: competitor.reg.clone(),
            group: competitor.group.clone(),
            length_m: course.length,
            climb_m: course.climb,
            check: card.check_time,
            start: run.start,
            finish: run.finish,
            sid: competitor.sid,
            ok: run.status == RunStatus::Ok,
            total: run.result,
            rows,
            finish_leg: finish_split.leg_time,
            finish_loss,
            extras: analysis.extra.clone(),
            missing: analysis.missing.clone(),
            total_loss,
            standing,
        })
    }

    /// Live standing within the group: place among completed runs of the day
    /// and the current field size.
    async fn standing_of(
        &self,
        day: u32,
        competitor: &Competitor,
        run: &Run,
    ) -> CoreResult<(usize, usize)> {
        let runs = self.database.list_runs_by_day(day).await?;
        let competitors = self.database.list_competitors().await?;
        let group_of: std::collections::HashMap<i64, &str> = competitors
            .iter()
            .map(|c| (c.id, c.group.as_str()))
            .collect();

        let my_result = run.result.unwrap_or(i64::MAX);
        let mut field = 0;
        let mut place = 1;
        for other in &runs {
            if group_of.get(&other.competitor_id).copied() != Some(competitor.group.as_str()) {
                continue;
            }
            let Some(other_result) = other.result else {
                continue;
            };
            field += 1;
            if other_result < my_result {
                place += 1;
            }
        }
        Ok((place, field))
    }
}

/// Rebuild the split rows of a run from an analysis: one row per required
/// control plus the synthetic finish row. Leg times need both the own and
/// the previous cumulative time; the start counts as time zero.
pub fn build_splits(
    run_id: i64,
    course_id: i64,
    analysis: &PunchAnalysis,
    result: i64,
) -> Vec<RunSplit> {
    let n = analysis.visited.len();
    let mut splits = Vec::with_capacity(n + 1);
    let mut prev = Some(0);
    for (i, (code, cum)) in analysis.visited.iter().enumerate() {
        let leg = match (cum, prev) {
            (Some(cum), Some(prev)) => Some(cum - prev),
            _ => None,
        };
        splits.push(RunSplit {
            run_id,
            course_id,
            seq: i as u32,
            control_code: code.to_string(),
            leg_time: leg,
            cum_time: *cum,
        });
        prev = *cum;
    }
    splits.push(RunSplit {
        run_id,
        course_id,
        seq: n as u32,
        control_code: FINISH_CODE.to_string(),
        leg_time: prev.map(|p| result - p),
        cum_time: Some(result),
    });
    splits
}
