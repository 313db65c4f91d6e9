//! Per-environment, strictly in-order waypoint progression.
//!
//! Each environment owns one `u64` word with bit `i` set once waypoint `i`
//! has been accepted. Acceptance requires `i == popcount(word)`, so the set
//! bits always form a prefix and the next expected index is the popcount.
//! The per-waypoint "visited" flags are read from the same words, which
//! keeps the two views consistent by construction.

use crate::waypoint::MAX_WAYPOINTS;

// ---------------------------------------------------------------------------
// Arrival
// ---------------------------------------------------------------------------

/// Environments that accepted one waypoint during a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    /// Waypoint index.
    pub waypoint: usize,
    /// `true` for every environment that accepted it this step.
    pub accepted: Vec<bool>,
}

impl Arrival {
    /// Indices of the accepting environments.
    pub fn envs(&self) -> impl Iterator<Item = usize> + '_ {
        self.accepted
            .iter()
            .enumerate()
            .filter_map(|(env, &a)| a.then_some(env))
    }
}

// ---------------------------------------------------------------------------
// ProgressionTracker
// ---------------------------------------------------------------------------

/// Visited-waypoint bitsets for every environment slot.
///
/// # Example
///
/// ```
/// use quadnav_nav::progression::ProgressionTracker;
///
/// let mut tracker = ProgressionTracker::new(1, 3);
/// assert!(!tracker.try_accept(0, 1)); // out of order
/// assert!(tracker.try_accept(0, 0));
/// assert_eq!(tracker.next_expected(0), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressionTracker {
    visited: Vec<u64>,
    num_waypoints: usize,
}

impl ProgressionTracker {
    /// # Panics
    ///
    /// Panics if `num_waypoints` exceeds [`MAX_WAYPOINTS`]; the registry
    /// rejects such courses before a tracker is built.
    pub fn new(num_envs: usize, num_waypoints: usize) -> Self {
        assert!(num_waypoints <= MAX_WAYPOINTS, "too many waypoints");
        Self {
            visited: vec![0; num_envs],
            num_waypoints,
        }
    }

    pub fn num_envs(&self) -> usize {
        self.visited.len()
    }

    pub const fn num_waypoints(&self) -> usize {
        self.num_waypoints
    }

    /// Raw visited word of `env`.
    pub fn bits(&self, env: usize) -> u64 {
        self.visited[env]
    }

    pub fn visited_count(&self, env: usize) -> usize {
        self.visited[env].count_ones() as usize
    }

    /// Index the environment must reach next, or `None` once complete.
    pub fn next_expected(&self, env: usize) -> Option<usize> {
        let count = self.visited_count(env);
        (count < self.num_waypoints).then_some(count)
    }

    pub fn is_visited(&self, env: usize, waypoint: usize) -> bool {
        self.visited[env] & (1 << waypoint) != 0
    }

    /// Whether every environment has visited `waypoint`.
    pub fn visited_by_all(&self, waypoint: usize) -> bool {
        (0..self.num_envs()).all(|env| self.is_visited(env, waypoint))
    }

    /// All waypoints visited. Vacuously true for an empty course.
    pub fn completed(&self, env: usize) -> bool {
        self.visited_count(env) >= self.num_waypoints
    }

    /// Per-environment visited flags of one waypoint.
    pub fn waypoint_flags(&self, waypoint: usize) -> Vec<bool> {
        (0..self.num_envs())
            .map(|env| self.is_visited(env, waypoint))
            .collect()
    }

    /// Mark `waypoint` visited for `env` if it is the next one in order.
    ///
    /// Returns `true` if accepted. Repeats and out-of-order arrivals are
    /// ignored.
    pub fn try_accept(&mut self, env: usize, waypoint: usize) -> bool {
        if waypoint >= self.num_waypoints || self.is_visited(env, waypoint) {
            return false;
        }
        if waypoint != self.visited_count(env) {
            return false;
        }
        self.visited[env] |= 1 << waypoint;
        true
    }

    /// Run one detection pass over all waypoints in order.
    ///
    /// `detect(waypoint, already_visited)` returns the raw per-environment
    /// reached mask. Waypoints visited by every environment are skipped.
    /// Acceptance mutates state immediately, so an environment touching
    /// waypoints 0 and 1 in the same step accepts both.
    pub fn check_arrivals<F>(&mut self, mut detect: F) -> Vec<Arrival>
    where
        F: FnMut(usize, &[bool]) -> Vec<bool>,
    {
        let mut arrivals = Vec::new();
        for waypoint in 0..self.num_waypoints {
            if self.visited_by_all(waypoint) {
                continue;
            }
            let already = self.waypoint_flags(waypoint);
            let reached = detect(waypoint, &already);

            let mut accepted = vec![false; self.num_envs()];
            let mut any = false;
            for (env, slot) in accepted.iter_mut().enumerate() {
                let newly = reached.get(env).copied().unwrap_or(false) && !already[env];
                if newly && self.try_accept(env, waypoint) {
                    *slot = true;
                    any = true;
                }
            }
            if any {
                arrivals.push(Arrival { waypoint, accepted });
            }
        }
        arrivals
    }

    /// Clear the progression of every environment whose `mask` entry is set.
    pub fn reset(&mut self, mask: &[bool]) {
        for (word, &done) in self.visited.iter_mut().zip(mask) {
            if done {
                *word = 0;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn reach_only(
        waypoint: usize,
        envs: &[usize],
        n: usize,
    ) -> impl FnMut(usize, &[bool]) -> Vec<bool> + '_ {
        move |wp: usize, _: &[bool]| {
            let mut mask = vec![false; n];
            if wp == waypoint {
                for &e in envs {
                    mask[e] = true;
                }
            }
            mask
        }
    }

    #[test]
    fn out_of_order_is_ignored() {
        let mut t = ProgressionTracker::new(1, 3);
        let arrivals = t.check_arrivals(reach_only(1, &[0], 1));
        assert!(arrivals.is_empty());
        assert_eq!(t.visited_count(0), 0);
        assert!(!t.is_visited(0, 1));
    }

    #[test]
    fn in_order_sequence_advances() {
        let mut t = ProgressionTracker::new(1, 3);
        let arrivals = t.check_arrivals(reach_only(0, &[0], 1));
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].waypoint, 0);
        assert_eq!(t.next_expected(0), Some(1));

        t.check_arrivals(reach_only(1, &[0], 1));
        t.check_arrivals(reach_only(2, &[0], 1));
        assert!(t.completed(0));
        assert_eq!(t.next_expected(0), None);
        assert_eq!(t.bits(0), 0b111);
    }

    #[test]
    fn simultaneous_contacts_accept_in_sequence() {
        let mut t = ProgressionTracker::new(1, 3);
        let arrivals = t.check_arrivals(|_, _| vec![true]);
        let accepted: Vec<usize> = arrivals.iter().map(|a| a.waypoint).collect();
        assert_eq!(accepted, vec![0, 1, 2]);
    }

    #[test]
    fn skipped_middle_blocks_later() {
        let mut t = ProgressionTracker::new(1, 3);
        // wp0 and wp2 touched, wp1 not.
        t.check_arrivals(|wp, _| vec![wp != 1]);
        assert_eq!(t.bits(0), 0b001);
    }

    #[test]
    fn environments_are_independent() {
        let mut t = ProgressionTracker::new(3, 2);
        let arrivals = t.check_arrivals(reach_only(0, &[0, 2], 3));
        assert_eq!(arrivals[0].envs().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(t.waypoint_flags(0), vec![true, false, true]);
        assert_eq!(t.visited_count(1), 0);
    }

    #[test]
    fn repeated_contact_is_not_reaccepted() {
        let mut t = ProgressionTracker::new(1, 2);
        t.check_arrivals(reach_only(0, &[0], 1));
        let again = t.check_arrivals(reach_only(0, &[0], 1));
        assert!(again.is_empty());
    }

    #[test]
    fn fully_visited_waypoint_is_skipped() {
        let mut t = ProgressionTracker::new(2, 2);
        assert!(t.try_accept(0, 0));
        assert!(t.try_accept(1, 0));
        let mut checked = Vec::new();
        t.check_arrivals(|wp, _| {
            checked.push(wp);
            vec![false, false]
        });
        assert_eq!(checked, vec![1]);
    }

    #[test]
    fn detector_sees_already_visited_flags() {
        let mut t = ProgressionTracker::new(2, 1);
        assert!(t.try_accept(1, 0));
        t.check_arrivals(|_, already| {
            assert_eq!(already, &[false, true]);
            vec![false, false]
        });
    }

    #[test]
    fn reset_masks_only_selected() {
        let mut t = ProgressionTracker::new(3, 2);
        for env in 0..3 {
            assert!(t.try_accept(env, 0));
        }
        t.reset(&[false, true, false]);
        assert_eq!(t.bits(0), 1);
        assert_eq!(t.bits(1), 0);
        assert_eq!(t.bits(2), 1);
    }

    #[test]
    fn empty_course_is_complete() {
        let mut t = ProgressionTracker::new(2, 0);
        assert!(t.completed(0));
        assert!(t.check_arrivals(|_, _| vec![true, true]).is_empty());
        assert!(!t.try_accept(0, 0));
    }

    #[test]
    fn visited_set_is_always_a_prefix() {
        // Random-ish reach patterns across many steps never leave a gap.
        let mut t = ProgressionTracker::new(4, 6);
        for step in 0..40_usize {
            t.check_arrivals(|wp, _| {
                (0..4)
                    .map(|env| (step * 7 + wp * 3 + env) % 5 == 0)
                    .collect()
            });
            for env in 0..4 {
                let bits = t.bits(env);
                assert_eq!(bits & (bits + 1), 0, "gap in {bits:b}");
            }
        }
    }
}
