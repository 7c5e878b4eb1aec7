//! Outlier retiming.
//!
//! Some cards come back with out-of-order or corrupted timestamps. Before
//! analysis the punch sequence is monotonized: timestamps that advance by a
//! plausible leg duration are anchors and stay untouched, everything between
//! two anchors is linearly interpolated.

use crate::card::PunchRecord;

/// longest plausible leg duration in seconds
pub const DEFAULT_MAX_LEG: i64 = 1800;

/// Replace punch times so the sequence is non-decreasing. Index `i` becomes
/// an anchor iff `0 < time[i] - time[last_anchor] <= max_leg`; the last index
/// is always forced to be an anchor so interpolation has a right boundary.
pub fn retime_local_anchors(punches: &[PunchRecord], max_leg: i64) -> Vec<PunchRecord> {
    let mut out = punches.to_vec();
    if out.len() < 2 {
        return out;
    }

    let mut anchors = vec![0usize];
    for i in 1..out.len() {
        let delta = out[i].time - out[*anchors.last().unwrap_or(&0)].time;
        if 0 < delta && delta <= max_leg {
            anchors.push(i);
        }
    }
    if *anchors.last().unwrap_or(&0) != out.len() - 1 {
        anchors.push(out.len() - 1);
    }

    for pair in anchors.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let outliers = (b - a).saturating_sub(1) as i64;
        for j in 1..=outliers {
            out[a + j as usize].time =
                out[a].time + j * (out[b].time - out[a].time) / (outliers + 1);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn punches(times: &[i64]) -> Vec<PunchRecord> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| PunchRecord {
                card_number: 1,
                code: i as i32 + 1,
                time: *t,
            })
            .collect()
    }

    #[test]
    fn outliers_are_interpolated_between_anchors() {
        // index 2 jumps backwards, index 3 is a day-scale glitch
        let input = punches(&[1000, 1020, 1010, 70000, 1045, 1060]);
        let retimed = retime_local_anchors(&input, 1800);
        let times: Vec<i64> = retimed.iter().map(|p| p.time).collect();

        for w in times.windows(2) {
            assert!(w[1] > w[0], "not strictly increasing: {times:?}");
        }
        assert_eq!(times[0], 1000);
        assert_eq!(times[1], 1020);
        assert_eq!(times[4], 1045);
        assert_eq!(times[5], 1060);
        assert!(1020 < times[2] && times[2] < 1045);
        assert!(1020 < times[3] && times[3] < 1045);
    }

    #[test]
    fn clean_sequences_pass_through_unchanged() {
        let input = punches(&[100, 160, 230, 290]);
        let retimed = retime_local_anchors(&input, 1800);
        assert_eq!(retimed, input);
    }

    #[test]
    fn codes_and_order_survive_retiming() {
        let input = punches(&[500, 480, 530]);
        let retimed = retime_local_anchors(&input, 1800);
        let codes: Vec<i32> = retimed.iter().map(|p| p.code).collect();
        assert_eq!(codes, vec![1, 2, 3]);
        assert_eq!(retimed[0].time, 500);
        assert_eq!(retimed[2].time, 530);
        assert!(500 < retimed[1].time && retimed[1].time < 530);
    }

    #[test]
    fn short_inputs_are_returned_as_is() {
        assert!(retime_local_anchors(&[], 1800).is_empty());
        let one = punches(&[42]);
        assert_eq!(retime_local_anchors(&one, 1800), one);
    }

    #[test]
    fn a_leg_longer_than_max_leg_is_an_outlier() {
        let input = punches(&[1000, 3200, 1100]);
        let retimed = retime_local_anchors(&input, 1800);
        // index 1 exceeded max_leg and the forced final anchor pulls it back
        assert_eq!(retimed[0].time, 1000);
        assert_eq!(retimed[2].time, 1100);
        assert_eq!(retimed[1].time, 1050);
    }
}
