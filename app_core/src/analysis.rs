//! Punch-sequence analysis.
//!
//! A card delivers punches in readout order; the course prescribes an ordered
//! list of required controls. The analyzer aligns the two with a longest
//! common subsequence so that re-punches, detours and missing controls all
//! fall out of one pass: matched required controls get a time, unmatched
//! required controls are missing, unmatched punches are extra.

/// a punch reduced to (code, time)
pub type ControlTime = (i32, i64);

/// alignment of one punch stream against one required control list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchAnalysis {
    /// one entry per required control: the code and the matched time, if any
    pub visited: Vec<(i32, Option<i64>)>,
    /// required codes with no matching punch
    pub missing: Vec<i32>,
    /// punches that matched no required control
    pub extra: Vec<ControlTime>,
    /// every required control was punched
    pub all_visited: bool,
    /// matched punch indices are strictly increasing; with a complete match
    /// set this follows from the subsequence property
    pub order_correct: bool,
    /// (required index, punch index) pairs of the match set
    pub matches: Vec<(usize, usize)>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Step {
    SkipPunch,
    SkipRequired,
    Match,
}

/// Align `punches` (sorted by time) against `required`.
pub fn analyse_order(required: &[i32], punches: &[ControlTime]) -> PunchAnalysis {
    let n = required.len();
    let m = punches.len();

    // dp[i][j] = best match count for required[..i] and punches[..j].
    // On equal counts the parent stays "skip punch", which makes the
    // backtrack attribute the earliest punch to each required control.
    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    let mut parent = vec![vec![Step::SkipPunch; m + 1]; n + 1];

    for i in 1..=n {
        let r = required[i - 1];
        for j in 1..=m {
            let (c, _) = punches[j - 1];

            let mut best = dp[i][j - 1];
            let mut step = Step::SkipPunch;

            if dp[i - 1][j] > best {
                best = dp[i - 1][j];
                step = Step::SkipRequired;
            }

            if r == c && dp[i - 1][j - 1] + 1 > best {
                best = dp[i - 1][j - 1] + 1;
                step = Step::Match;
            }

            dp[i][j] = best;
            parent[i][j] = step;
        }
    }

    let mut matches = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        match parent[i][j] {
            Step::Match => {
                matches.push((i - 1, j - 1));
                i -= 1;
                j -= 1;
            }
            Step::SkipRequired => i -= 1,
            Step::SkipPunch => j -= 1,
        }
    }
    matches.reverse();

    let visited = {
        let mut visited: Vec<(i32, Option<i64>)> =
            required.iter().map(|r| (*r, None)).collect();
        for (ri, pj) in &matches {
            visited[*ri].1 = Some(punches[*pj].1);
        }
        visited
    };

    let missing = visited
        .iter()
        .filter(|(_, time)| time.is_none())
        .map(|(code, _)| *code)
        .collect();

    let matched_punches: std::collections::HashSet<usize> =
        matches.iter().map(|(_, pj)| *pj).collect();
    let extra = punches
        .iter()
        .enumerate()
        .filter(|(j, _)| !matched_punches.contains(j))
        .map(|(_, p)| *p)
        .collect();

    let all_visited = matches.len() == n;

    PunchAnalysis {
        visited,
        missing,
        extra,
        all_visited,
        order_correct: all_visited,
        matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_run_matches_everything() {
        let required = [31, 45, 72, 100];
        let punches = [(31, 120), (45, 240), (72, 300), (100, 450)];

        let res = analyse_order(&required, &punches);
        assert!(res.all_visited);
        assert!(res.order_correct);
        assert!(res.missing.is_empty());
        assert!(res.extra.is_empty());
        assert_eq!(
            res.visited,
            vec![
                (31, Some(120)),
                (45, Some(240)),
                (72, Some(300)),
                (100, Some(450))
            ]
        );
    }

    #[test]
    fn duplicate_and_stray_punches_become_extra() {
        let required = [31, 45, 72, 100];
        let punches = [
            (31, 110),
            (31, 115),
            (45, 200),
            (60, 220),
            (45, 230),
            (72, 300),
            (100, 400),
            (100, 410),
        ];
        let res = analyse_order(&required, &punches);
        assert!(res.all_visited);
        assert!(res.order_correct);
        assert!(res.missing.is_empty());
        assert_eq!(res.extra, vec![(31, 115), (60, 220), (45, 230), (100, 410)]);
        assert_eq!(
            res.visited,
            vec![
                (31, Some(110)),
                (45, Some(200)),
                (72, Some(300)),
                (100, Some(400))
            ]
        );
    }

    #[test]
    fn unpunched_control_goes_missing() {
        let required = [31, 45, 72, 100];
        let punches = [(31, 100), (72, 200), (100, 300)];
        let res = analyse_order(&required, &punches);
        assert!(!res.all_visited);
        assert!(!res.order_correct);
        assert_eq!(res.missing, vec![45]);
        assert!(res.extra.is_empty());
        assert_eq!(
            res.visited,
            vec![(31, Some(100)), (45, None), (72, Some(200)), (100, Some(300))]
        );
    }

    #[test]
    fn scrambled_punches_keep_the_longest_ordered_chain() {
        let required = [31, 45, 72, 100];
        let punches = [
            (45, 12),
            (31, 15),
            (31, 20),
            (72, 40),
            (31, 50),
            (100, 60),
            (45, 70),
        ];
        let res = analyse_order(&required, &punches);
        assert!(!res.all_visited);
        assert!(!res.order_correct);
        assert_eq!(res.missing, vec![31]);
        assert_eq!(res.extra, vec![(31, 15), (31, 20), (31, 50), (45, 70)]);
        assert_eq!(
            res.visited,
            vec![(31, None), (45, Some(12)), (72, Some(40)), (100, Some(60))]
        );
    }

    #[test]
    fn empty_required_marks_all_punches_extra() {
        let res = analyse_order(&[], &[(31, 10), (45, 20)]);
        assert!(res.all_visited);
        assert!(res.order_correct);
        assert!(res.visited.is_empty());
        assert_eq!(res.extra, vec![(31, 10), (45, 20)]);
    }

    #[test]
    fn empty_punches_mark_everything_missing() {
        let res = analyse_order(&[31, 45], &[]);
        assert!(!res.all_visited);
        assert_eq!(res.missing, vec![31, 45]);
        assert_eq!(res.visited, vec![(31, None), (45, None)]);
    }

    #[test]
    fn analysis_is_idempotent() {
        let required = [31, 45, 72, 100];
        let punches = [(31, 110), (31, 115), (45, 200), (100, 400)];
        let first = analyse_order(&required, &punches);
        let second = analyse_order(&required, &punches);
        assert_eq!(first, second);
    }

    #[test]
    fn match_count_is_bounded_and_indices_increase() {
        let required = [31, 45, 31, 45];
        let punches = [(45, 1), (31, 2), (45, 3), (31, 4), (45, 5)];
        let res = analyse_order(&required, &punches);
        assert_eq!(res.visited.len(), required.len());
        assert!(res.matches.len() <= required.len().min(punches.len()));
        for pair in res.matches.windows(2) {
            assert!(pair[0].0 < pair[1].0);
            assert!(pair[0].1 < pair[1].1);
        }
    }
}
