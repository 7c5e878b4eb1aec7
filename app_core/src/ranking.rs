//! Ranking: single-day standings and the multi-day best-of-three scoring.

use crate::{Competitor, Core, CoreResult, DbpCompetitor, DbpRun, Run, RunStatus};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// one line of a single-day ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRun {
    /// 1-based place; None for runs out of competition
    pub position: Option<usize>,
    /// seconds behind the winner; None for runs out of competition
    pub time_behind: Option<i64>,
    pub run: Run,
}

/// Rank the runs of one group and day. OK runs first, ascending by result;
/// identical results share the earlier place, the next distinct result jumps
/// to its 1-based index. Everything else follows, ordered by result with
/// unknown results last.
pub fn rank(runs: &[Run]) -> Vec<RankedRun> {
    let mut ok_runs: Vec<&Run> = runs.iter().filter(|r| r.status == RunStatus::Ok).collect();
    ok_runs.sort_by_key(|r| (r.result.is_none(), r.result));
    let mut out_runs: Vec<&Run> = runs.iter().filter(|r| r.status != RunStatus::Ok).collect();
    out_runs.sort_by_key(|r| (r.result.is_none(), r.result));

    let winner = ok_runs.first().and_then(|r| r.result);

    let mut ranked = Vec::with_capacity(runs.len());
    let mut position = 1;
    let mut prev_behind = Some(0);
    for (i, run) in ok_runs.iter().enumerate() {
        let behind = match (run.result, winner) {
            (Some(result), Some(winner)) => Some(result - winner),
            _ => None,
        };
        if behind != prev_behind {
            position = i + 1;
            prev_behind = behind;
        }
        ranked.push(RankedRun {
            position: Some(position),
            time_behind: behind,
            run: (*run).clone(),
        });
    }
    for run in out_runs {
        ranked.push(RankedRun {
            position: None,
            time_behind: None,
            run: run.clone(),
        });
    }
    ranked
}

/// aggregated multi-day performance of one competitor
#[derive(Debug, Clone, PartialEq)]
pub struct MultiDayResult {
    pub competitor: Competitor,
    /// score per day, index 0 = day 1; 0 for missed or unfinished days
    pub scores: Vec<i64>,
    /// how many of the counting runs were OK (at most 3)
    pub best_count: usize,
    /// sum of the counting scores
    pub total_score: i64,
    /// sum of the counting times; None without any counting run
    pub total_time: Option<i64>,
    /// shared on full-key ties; None when nothing counted
    pub place: Option<usize>,
}

/// Day score of one OK run: `100 * (2 - behind / winner_time)`, truncated,
/// never negative. Non-OK runs and days without an OK winner score zero.
fn score_for(result: i64, winner_time: i64) -> i64 {
    if winner_time <= 0 {
        return 0;
    }
    let behind = result - winner_time;
    (200 * winner_time - 100 * behind).div_euclid(winner_time).max(0)
}

/// Multi-day ranking of one group. Every competitor keeps the three best OK
/// runs across the first `days_to_calculate` days (score descending, time
/// ascending); competitors are ordered by (best_count desc, total_score
/// desc, total_time asc).
pub fn rank_multiday(
    days_to_calculate: u32,
    entries: &[(Competitor, Vec<Run>)],
) -> Vec<MultiDayResult> {
    // fastest OK time per day decides the scores
    let mut winner_by_day: HashMap<u32, i64> = HashMap::new();
    for (_, runs) in entries {
        for run in runs {
            if run.day >= 1 && run.day <= days_to_calculate && run.status == RunStatus::Ok {
                if let Some(result) = run.result {
                    winner_by_day
                        .entry(run.day)
                        .and_modify(|w| *w = (*w).min(result))
                        .or_insert(result);
                }
            }
        }
    }

    let run_score = |run: &Run| -> i64 {
        if run.status != RunStatus::Ok {
            return 0;
        }
        match (run.result, winner_by_day.get(&run.day)) {
            (Some(result), Some(winner)) => score_for(result, *winner),
            _ => 0,
        }
    };

    let mut aggregated: Vec<MultiDayResult> = entries
        .iter()
        .map(|(competitor, runs)| {
            let by_day: HashMap<u32, &Run> = runs
                .iter()
                .filter(|r| r.day >= 1 && r.day <= days_to_calculate)
                .map(|r| (r.day, r))
                .collect();

            let scores: Vec<i64> = (1..=days_to_calculate)
                .map(|day| by_day.get(&day).map(|r| run_score(r)).unwrap_or(0))
                .collect();

            let mut counting: Vec<&Run> = by_day
                .values()
                .copied()
                .filter(|r| r.status == RunStatus::Ok && r.result.is_some())
                .collect();
            counting.sort_by_key(|r| (-run_score(r), r.result));
            counting.truncate(3);

            let total_score = counting.iter().map(|r| run_score(r)).sum();
            let total_time = if counting.is_empty() {
                None
            } else {
                Some(counting.iter().filter_map(|r| r.result).sum())
            };

            MultiDayResult {
                competitor: competitor.clone(),
                scores,
                best_count: counting.len(),
                total_score,
                total_time,
                place: None,
            }
        })
        .collect();

    aggregated.sort_by_key(|a| {
        (
            std::cmp::Reverse(a.best_count),
            std::cmp::Reverse(a.total_score),
            a.total_time.is_none(),
            a.total_time,
        )
    });

    let mut place = 1;
    let mut prev_key = None;
    for (i, entry) in aggregated.iter_mut().enumerate() {
        let key = (entry.best_count, entry.total_score, entry.total_time);
        if prev_key.is_some_and(|prev| prev != key) {
            place = i + 1;
        }
        prev_key = Some(key);
        entry.place = (entry.best_count > 0).then_some(place);
    }

    aggregated
}

/// one row of the kiosk results table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupResultRow {
    pub position: Option<usize>,
    pub name: String,
    pub club: String,
    pub result: Option<i64>,
    pub behind: Option<i64>,
    pub status: RunStatus,
}

/// API of the ranking engine
impl Core {
    /// Ranked results of every group on the given day, covering all non-DNS
    /// runs; the kiosk endpoint serves this verbatim.
    pub async fn results_for_day(
        &self,
        day: u32,
    ) -> CoreResult<BTreeMap<String, Vec<GroupResultRow>>> {
        let runs = self.database.list_runs_by_day(day).await?;
        let competitors = self.database.list_competitors().await?;
        let by_id: HashMap<i64, &Competitor> =
            competitors.iter().map(|c| (c.id, c)).collect();

        let mut groups: BTreeMap<String, Vec<Run>> = BTreeMap::new();
        for run in runs {
            if run.status == RunStatus::Dns {
                continue;
            }
            let Some(competitor) = by_id.get(&run.competitor_id) else {
                continue;
            };
            groups.entry(competitor.group.clone()).or_default().push(run);
        }

        let mut results = BTreeMap::new();
        for (group, runs) in groups {
            let mut rows = Vec::with_capacity(runs.len());
            for ranked in rank(&runs) {
                let Some(competitor) = by_id.get(&ranked.run.competitor_id) else {
                    continue;
                };
                let club = self
                    .database
                    .get_club(&competitor.reg)
                    .await?
                    .map(|c| c.name)
                    .unwrap_or_default();
                rows.push(GroupResultRow {
                    position: ranked.position,
                    name: competitor.full_name(),
                    club,
                    result: ranked.run.result,
                    behind: ranked.time_behind,
                    status: ranked.run.status,
                });
            }
            if !rows.is_empty() {
                results.insert(group, rows);
            }
        }
        Ok(results)
    }

    /// Multi-day summary per group over the first `days_to_calculate` days.
    pub async fn summary(
        &self,
        days_to_calculate: u32,
    ) -> CoreResult<Vec<(String, Vec<MultiDayResult>)>> {
        let competitors = self.database.list_competitors().await?;

        let mut groups: BTreeMap<String, Vec<(Competitor, Vec<Run>)>> = BTreeMap::new();
        for competitor in competitors {
            let runs = self
                .database
                .list_runs_of_competitor(competitor.id)
                .await?;
            groups
                .entry(competitor.group.clone())
                .or_default()
                .push((competitor, runs));
        }

        Ok(groups
            .into_iter()
            .map(|(group, entries)| (group, rank_multiday(days_to_calculate, &entries)))
            .collect())
    }
}
