//! Start-slot assignment.
//!
//! Every run of a day gets a minute slot such that groups never share a
//! slot, slot occupancy stays within the parallel-start capacity, first
//! controls do not collide inside a slot where avoidable, and clubmates are
//! spread apart within their group. The whole pass is driven by one seeded
//! RNG, so a stored seed replays the identical start list.

use crate::{Core, CoreError, CoreResult, DbpCompetitor, DbpCourse, DbpRun, DbpStage};
use rand::{SeedableRng, rngs::SmallRng, seq::SliceRandom};
use std::collections::{BTreeMap, HashMap, HashSet};

/// run-of-the-mill pace for groups without a configured one, min/km
pub const DEFAULT_PACE: f64 = 10.0;

/// parameters of one scheduling pass
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// how many runners may start in the same minute
    pub parallel_starts: usize,
    pub seed: u64,
    /// registration code whose groups start first
    pub boost_reg: String,
    /// expected pace per group, min/km
    pub pace: HashMap<String, f64>,
    pub default_pace: f64,
}

impl SchedulerOptions {
    pub fn new(parallel_starts: usize, seed: u64) -> Self {
        SchedulerOptions {
            parallel_starts: parallel_starts.max(1),
            seed,
            boost_reg: "OCO".to_string(),
            pace: HashMap::new(),
            default_pace: DEFAULT_PACE,
        }
    }
}

/// one run waiting for a slot
#[derive(Debug, Clone)]
pub struct SlotRequest {
    pub run_id: i64,
    pub group: String,
    /// club short code; adjacency of equal codes is minimized
    pub reg: String,
    /// code of the course's first control, if the course declares one
    pub first_control: Option<String>,
    /// expected winning time, used as group priority
    pub expected_time: f64,
    /// group starts at the head of the field
    pub boost: bool,
}

/// a slot under construction
#[derive(Debug, Default)]
struct SlotState {
    groups: HashSet<String>,
    first_controls: HashSet<String>,
    count: usize,
}

impl SlotState {
    fn admits(&self, request: &SlotRequest, parallel_starts: usize, check_first: bool) -> bool {
        if self.count >= parallel_starts || self.groups.contains(&request.group) {
            return false;
        }
        if check_first
            && let Some(fc) = &request.first_control
            && self.first_controls.contains(fc)
        {
            return false;
        }
        true
    }

    fn take(&mut self, request: &SlotRequest) {
        self.groups.insert(request.group.clone());
        if let Some(fc) = &request.first_control {
            self.first_controls.insert(fc.clone());
        }
        self.count += 1;
    }
}

/// Compute the slot of every request. Pure and deterministic: the only
/// source of randomness is the caller-seeded RNG.
pub fn plan_start_slots(
    requests: Vec<SlotRequest>,
    parallel_starts: usize,
    rng: &mut SmallRng,
) -> Vec<(i64, u32)> {
    let parallel_starts = parallel_starts.max(1);
    let total = requests.len();
    if total == 0 {
        return Vec::new();
    }

    // group priority: boosted groups first, then the long courses
    let mut by_group: BTreeMap<String, Vec<SlotRequest>> = BTreeMap::new();
    for request in requests {
        by_group.entry(request.group.clone()).or_default().push(request);
    }
    let mut group_order: Vec<(&String, &Vec<SlotRequest>)> = by_group.iter().collect();
    group_order.sort_by(|(a_name, a), (b_name, b)| {
        let a_boost = a.iter().any(|r| r.boost);
        let b_boost = b.iter().any(|r| r.boost);
        let a_time = a.first().map(|r| r.expected_time).unwrap_or(0.0);
        let b_time = b.first().map(|r| r.expected_time).unwrap_or(0.0);
        b_boost
            .cmp(&a_boost)
            .then(b_time.total_cmp(&a_time))
            .then(a_name.cmp(b_name))
    });

    let mut remaining: Vec<SlotRequest> = Vec::with_capacity(total);
    for (_, members) in group_order {
        let mut members = members.clone();
        members.shuffle(rng);
        remaining.extend(members);
    }

    let num_slots = total.div_ceil(parallel_starts);
    let mut slots: Vec<SlotState> = (0..num_slots).map(|_| SlotState::default()).collect();
    let mut last_reg: HashMap<String, String> = HashMap::new();
    let mut cursor = 0usize;
    let mut assignments = Vec::with_capacity(total);

    let find_slot = |slots: &[SlotState], cursor: usize, request: &SlotRequest, check_first: bool| {
        (0..slots.len())
            .map(|off| (cursor + off) % slots.len())
            .find(|slot| slots[*slot].admits(request, parallel_starts, check_first))
    };

    while !remaining.is_empty() {
        // preferred: break the club chain and keep first controls distinct
        let pick = remaining
            .iter()
            .position(|r| {
                last_reg.get(&r.group) != Some(&r.reg)
                    && find_slot(&slots, cursor, r, true).is_some()
            })
            .or_else(|| {
                remaining
                    .iter()
                    .position(|r| find_slot(&slots, cursor, r, true).is_some())
            })
            .or_else(|| {
                remaining
                    .iter()
                    .position(|r| find_slot(&slots, cursor, r, false).is_some())
            })
            .unwrap_or(0);

        let request = remaining.remove(pick);
        let slot = match find_slot(&slots, cursor, &request, true)
            .or_else(|| find_slot(&slots, cursor, &request, false))
        {
            Some(slot) => slot,
            None => {
                // the schedule is full for this group: append minutes until
                // a legal slot appears
                loop {
                    slots.push(SlotState::default());
                    let slot = slots.len() - 1;
                    if slots[slot].admits(&request, parallel_starts, false) {
                        break slot;
                    }
                }
            }
        };

        slots[slot].take(&request);
        last_reg.insert(request.group.clone(), request.reg.clone());
        assignments.push((request.run_id, slot as u32));
        cursor = (cursor + 1) % slots.len();
    }

    assignments
}

/// summary of one scheduling pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartListSummary {
    pub assigned: usize,
    pub slots_used: u32,
    pub seed: u64,
}

/// API of the start-slot scheduler
impl Core {
    /// Assign a slot to every run of the day and log the seed so the pass
    /// can be replayed.
    pub async fn assign_start_slots(
        &self,
        day: u32,
        opts: &SchedulerOptions,
    ) -> CoreResult<StartListSummary> {
        let stage = self
            .database
            .get_stage_by_day(day)
            .await?
            .ok_or_else(|| CoreError::MissingResource(format!("stage for day {day}")))?;
        let courses = self.database.list_courses(stage.id).await?;
        let course_info: HashMap<&str, (i64, Option<String>)> = courses
            .iter()
            .map(|c| {
                (
                    c.name.as_str(),
                    (c.length, c.first_control().map(str::to_string)),
                )
            })
            .collect();

        let competitors = self.database.list_competitors().await?;
        let by_id: HashMap<i64, &crate::Competitor> =
            competitors.iter().map(|c| (c.id, c)).collect();

        let runs = self.database.list_runs_by_day(day).await?;
        let mut requests = Vec::with_capacity(runs.len());
        for run in &runs {
            let Some(competitor) = by_id.get(&run.competitor_id) else {
                return Err(CoreError::Integrity(format!(
                    "run {} references a missing competitor",
                    run.id
                )));
            };
            let (length, first_control) = course_info
                .get(competitor.group.as_str())
                .cloned()
                .unwrap_or((0, None));
            let pace = opts
                .pace
                .get(&competitor.group)
                .copied()
                .unwrap_or(opts.default_pace);
            requests.push(SlotRequest {
                run_id: run.id,
                group: competitor.group.clone(),
                reg: competitor.reg.clone(),
                first_control,
                expected_time: length as f64 * pace,
                boost: competitor.reg == opts.boost_reg,
            });
        }

        let mut rng = SmallRng::seed_from_u64(opts.seed);
        let assignments = plan_start_slots(requests, opts.parallel_starts, &mut rng);

        let mut slots_used = 0;
        let assigned = assignments.len();
        let by_run: HashMap<i64, u32> = assignments.into_iter().collect();
        for mut run in runs {
            if let Some(slot) = by_run.get(&run.id) {
                run.start_slot = Some(*slot);
                slots_used = slots_used.max(*slot + 1);
                self.database.save_run(&run).await?;
            }
        }

        self.log_start_seed(day, opts.seed).await?;

        Ok(StartListSummary {
            assigned,
            slots_used,
            seed: opts.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(run_id: i64, group: &str, reg: &str, fc: &str, expected: f64) -> SlotRequest {
        SlotRequest {
            run_id,
            group: group.to_string(),
            reg: reg.to_string(),
            first_control: Some(fc.to_string()),
            expected_time: expected,
            boost: false,
        }
    }

    fn field() -> Vec<SlotRequest> {
        let mut requests = Vec::new();
        for i in 0..8 {
            requests.push(request(i, "M21", ["CPK", "ZLS"][i as usize % 2], "70", 9000.0));
        }
        for i in 8..14 {
            requests.push(request(i, "W21", "CPK", "70", 8500.0));
        }
        for i in 14..20 {
            requests.push(request(i, "M16", "ZLS", "31", 5000.0));
        }
        requests
    }

    fn check_invariants(
        assignments: &[(i64, u32)],
        requests: &[SlotRequest],
        parallel_starts: usize,
    ) {
        let by_run: HashMap<i64, &SlotRequest> =
            requests.iter().map(|r| (r.run_id, r)).collect();
        let mut per_slot_groups: HashMap<u32, HashSet<&str>> = HashMap::new();
        let mut per_slot_count: HashMap<u32, usize> = HashMap::new();
        for (run_id, slot) in assignments {
            let request = by_run[run_id];
            assert!(
                per_slot_groups
                    .entry(*slot)
                    .or_default()
                    .insert(&request.group),
                "two {} runners share slot {slot}",
                request.group
            );
            *per_slot_count.entry(*slot).or_default() += 1;
        }
        for (slot, count) in per_slot_count {
            assert!(count <= parallel_starts, "slot {slot} over capacity");
        }
    }

    #[test]
    fn every_run_gets_a_slot_and_invariants_hold() {
        let requests = field();
        let mut rng = SmallRng::seed_from_u64(7);
        let assignments = plan_start_slots(requests.clone(), 3, &mut rng);
        assert_eq!(assignments.len(), requests.len());
        check_invariants(&assignments, &requests, 3);
    }

    #[test]
    fn same_seed_replays_the_same_start_list() {
        let requests = field();
        let mut first_rng = SmallRng::seed_from_u64(42);
        let mut second_rng = SmallRng::seed_from_u64(42);
        let first = plan_start_slots(requests.clone(), 2, &mut first_rng);
        let second = plan_start_slots(requests, 2, &mut second_rng);
        assert_eq!(first, second);
    }

    #[test]
    fn first_controls_stay_distinct_when_capacity_allows() {
        // two groups on distinct first controls, one shared slot each minute
        let mut requests = Vec::new();
        for i in 0..4 {
            requests.push(request(i, "M21", "CPK", "70", 9000.0));
        }
        for i in 4..8 {
            requests.push(request(i, "W21", "ZLS", "31", 8000.0));
        }
        let mut rng = SmallRng::seed_from_u64(1);
        let assignments = plan_start_slots(requests.clone(), 2, &mut rng);
        check_invariants(&assignments, &requests, 2);

        let by_run: HashMap<i64, &SlotRequest> =
            requests.iter().map(|r| (r.run_id, r)).collect();
        let mut per_slot_fc: HashMap<u32, Vec<&str>> = HashMap::new();
        for (run_id, slot) in &assignments {
            per_slot_fc
                .entry(*slot)
                .or_default()
                .push(by_run[run_id].first_control.as_deref().unwrap());
        }
        for (slot, fcs) in per_slot_fc {
            let unique: HashSet<&&str> = fcs.iter().collect();
            assert_eq!(unique.len(), fcs.len(), "first-control clash in slot {slot}");
        }
    }

    #[test]
    fn boosted_groups_start_before_longer_courses() {
        let mut requests = vec![
            request(1, "M21", "CPK", "70", 9000.0),
            request(2, "W10", "OCO", "31", 2000.0),
        ];
        requests[1].boost = true;
        let mut rng = SmallRng::seed_from_u64(3);
        let assignments = plan_start_slots(requests, 1, &mut rng);
        let slot_of: HashMap<i64, u32> = assignments.into_iter().collect();
        assert!(slot_of[&2] < slot_of[&1], "boosted group must start first");
    }

    #[test]
    fn clubmates_are_not_adjacent_when_avoidable() {
        let requests = vec![
            request(1, "M21", "CPK", "70", 9000.0),
            request(2, "M21", "CPK", "70", 9000.0),
            request(3, "M21", "ZLS", "70", 9000.0),
            request(4, "M21", "ZLS", "70", 9000.0),
        ];
        let mut rng = SmallRng::seed_from_u64(11);
        let assignments = plan_start_slots(requests.clone(), 1, &mut rng);
        let by_run: HashMap<i64, &SlotRequest> =
            requests.iter().map(|r| (r.run_id, r)).collect();
        let mut ordered: Vec<(u32, &str)> = assignments
            .iter()
            .map(|(run_id, slot)| (*slot, by_run[run_id].reg.as_str()))
            .collect();
        ordered.sort();
        for pair in ordered.windows(2) {
            assert_ne!(pair[0].1, pair[1].1, "clubmates in adjacent slots");
        }
    }

    #[test]
    fn overful_schedule_grows_instead_of_breaking_capacity() {
        // five runners of one group cannot share slots at all
        let requests: Vec<SlotRequest> = (0..5)
            .map(|i| request(i, "M21", "CPK", "70", 9000.0))
            .collect();
        let mut rng = SmallRng::seed_from_u64(5);
        let assignments = plan_start_slots(requests.clone(), 4, &mut rng);
        check_invariants(&assignments, &requests, 4);
        let slots: HashSet<u32> = assignments.iter().map(|(_, s)| *s).collect();
        assert_eq!(slots.len(), 5);
    }
}
