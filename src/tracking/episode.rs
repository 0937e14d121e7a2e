use crate::{
    environment::AgentState,
    params::{Outcome, RewardParams},
    util::avg_tracker::AvgTracker,
};

/// Cumulative outcome counters over a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationStats {
    pub success: u64,
    pub collision: u64,
    /// Terminal events whose reward matched neither sentinel
    pub other: u64,
}

impl NavigationStats {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::Collision => self.collision += 1,
            Outcome::Other => self.other += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.collision + self.other
    }
}

/// Per-agent bookkeeping for one episode
///
/// An agent is *terminated* from the tick its terminal flag is first seen until the end
/// of the step. Its *reset cold-time* latches at the same moment and stays set until the
/// next action is chosen for it, so a terminal flag that lingers while the reset is in
/// flight is never counted twice.
#[derive(Debug, Clone)]
pub struct EpisodeTracker {
    terminated: Vec<bool>,
    reset_cold: Vec<bool>,
    survive_ticks: Vec<u64>,
    /// Outcomes seen this episode only
    episode: NavigationStats,
}

impl EpisodeTracker {
    pub fn new(num_agents: usize) -> Self {
        Self {
            terminated: vec![false; num_agents],
            reset_cold: vec![false; num_agents],
            survive_ticks: vec![0; num_agents],
            episode: NavigationStats::default(),
        }
    }

    /// Clears every flag and counter, call at episode boundaries
    pub fn reset(&mut self) {
        self.terminated.fill(false);
        self.reset_cold.fill(false);
        self.survive_ticks.fill(0);
        self.episode = NavigationStats::default();
    }

    pub fn is_terminated(&self, agent: usize) -> bool {
        self.terminated[agent]
    }

    /// A fresh action was chosen for `agent`, so its next terminal flag counts again
    pub fn release(&mut self, agent: usize) {
        self.reset_cold[agent] = false;
    }

    /// Feeds one observed state through the terminal check
    ///
    /// Returns the outcome the first time a terminal flag is seen since the last release,
    /// the caller must then request a reset for this agent.
    pub fn observe(
        &mut self,
        agent: usize,
        state: &AgentState,
        params: &RewardParams,
    ) -> Option<Outcome> {
        if !self.terminated[agent] {
            self.survive_ticks[agent] += 1;
        }

        if !state.terminal || self.reset_cold[agent] {
            return None;
        }

        self.reset_cold[agent] = true;
        self.terminated[agent] = true;

        let outcome = params.classify(state.reward);
        self.episode.record(outcome);
        Some(outcome)
    }

    /// Un-terminates every agent, ready for the next step
    pub fn end_step(&mut self) {
        self.terminated.fill(false);
    }

    pub fn avg_survive_ticks(&self) -> AvgTracker {
        AvgTracker::new(
            self.survive_ticks.iter().sum::<u64>() as f64,
            self.survive_ticks.len() as u64,
        )
    }

    pub fn episode_stats(&self) -> &NavigationStats {
        &self.episode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal(reward: f32) -> AgentState {
        AgentState {
            reward,
            terminal: true,
            ..Default::default()
        }
    }

    #[test]
    fn counts_terminal_once_until_released() {
        let params = RewardParams::default();
        let mut tracker = EpisodeTracker::new(2);

        assert_eq!(
            tracker.observe(0, &terminal(params.terminal_reward), &params),
            Some(Outcome::Success)
        );
        assert!(tracker.is_terminated(0));

        // terminal flag still set while the reset is in flight
        assert_eq!(tracker.observe(0, &terminal(params.terminal_reward), &params), None);

        tracker.end_step();
        assert!(!tracker.is_terminated(0));
        assert_eq!(tracker.observe(0, &terminal(params.terminal_reward), &params), None);

        tracker.release(0);
        assert_eq!(
            tracker.observe(0, &terminal(params.collision_reward), &params),
            Some(Outcome::Collision)
        );

        assert_eq!(
            *tracker.episode_stats(),
            NavigationStats {
                success: 1,
                collision: 1,
                other: 0
            }
        );
    }

    #[test]
    fn agents_are_independent() {
        let params = RewardParams::default();
        let mut tracker = EpisodeTracker::new(3);

        tracker.observe(1, &terminal(params.collision_reward), &params);

        assert!(!tracker.is_terminated(0));
        assert!(tracker.is_terminated(1));
        assert!(!tracker.is_terminated(2));
    }

    #[test]
    fn survive_ticks_stop_while_terminated() {
        let params = RewardParams::default();
        let mut tracker = EpisodeTracker::new(2);
        let alive = AgentState::default();

        tracker.observe(0, &alive, &params);
        tracker.observe(1, &terminal(params.terminal_reward), &params);
        tracker.observe(0, &alive, &params);
        tracker.observe(1, &terminal(params.terminal_reward), &params);

        // agent 0 alive for 2 ticks, agent 1 for 1
        assert_eq!(tracker.avg_survive_ticks(), AvgTracker::new(3.0, 2));
    }

    #[test]
    fn reset_clears_everything() {
        let params = RewardParams::default();
        let mut tracker = EpisodeTracker::new(1);
        tracker.observe(0, &terminal(3.0), &params);
        assert_eq!(tracker.episode_stats().other, 1);

        tracker.reset();
        assert!(!tracker.is_terminated(0));
        assert_eq!(tracker.avg_survive_ticks().mean(), 0.0);
        assert_eq!(tracker.episode_stats().total(), 0);

        // cold-time was cleared too, so the next terminal counts
        assert!(tracker.observe(0, &terminal(3.0), &params).is_some());
    }

    #[test]
    fn stats_record_each_outcome() {
        let mut stats = NavigationStats::default();
        stats.record(Outcome::Success);
        stats.record(Outcome::Success);
        stats.record(Outcome::Collision);
        stats.record(Outcome::Other);

        assert_eq!(stats.success, 2);
        assert_eq!(stats.collision, 1);
        assert_eq!(stats.total(), 4);
    }
}
