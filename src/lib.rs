pub mod environment;
pub mod error;
pub mod params;
pub mod policy;
pub mod tracking;
pub mod util;

pub use error::EvalError;
pub use params::{Outcome, RewardParams};
#[cfg(feature = "torch")]
pub use tch;

use environment::{AgentState, ControlCommand, EnvService, check_batch};
use policy::{ActionScale, NavigationPolicy, NoiseConfig};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    thread::sleep,
    time::{Duration, Instant},
};
use tracking::{EpisodeTracker, NavigationStats, ResultsFile, TrajectoryLog};
use util::{AvgTracker, Report};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// TorchScript actor to load, set empty to fall back to the differential-drive controller
    pub model_path: PathBuf,
    /// Use your CUDA GPU if available
    pub use_cuda: bool,
    pub scale: ActionScale,
    /// Add Ornstein-Uhlenbeck noise to every action
    /// Evaluation normally runs without it
    pub exploration_noise: bool,
    pub noise: NoiseConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/actor.pt"),
            use_cuda: true,
            scale: ActionScale::default(),
            exploration_noise: false,
            noise: NoiseConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub num_agents: usize,
    pub max_episodes: u64,
    pub max_steps: u64,
    /// Ticks each chosen action is held for before the policy is asked again
    pub time_delay: u64,
    /// Wall-clock pause after every tick, so the simulator can keep up
    pub tick_interval_ms: u64,
    /// Pause after the reset handshake at the start of an episode
    pub reset_settle_ms: u64,
    pub state_dim: usize,
    pub sensor_dim: usize,
    pub action_dim: usize,
    /// Distance at which a controller considers the target reached
    pub target_threshold: f32,
    /// Range readings are clipped to this before reaching the policy
    pub max_laser_range: f32,
    /// Reward constants used to tell success from collision
    ///
    /// This file has to mirror the simulator's own reward parameters, otherwise every
    /// terminal event lands in the "other" counter.
    pub reward_params_path: PathBuf,
    /// Cumulative `success collision` counts are appended here after every episode
    pub results_path: PathBuf,
    /// Per-tick positions from the first episode
    /// Set empty to disable
    pub trajectory_path: PathBuf,
    /// Positions at every decision point of the first episode
    /// Set empty to disable
    pub keypoint_path: PathBuf,
    pub service_address: String,
    /// How long to wait for the environment service to come up
    pub service_wait_secs: u64,
    pub policy: PolicyConfig,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            num_agents: 4,
            max_episodes: 100,
            max_steps: 30,
            time_delay: 5,
            tick_interval_ms: 100,
            reset_settle_ms: 200,
            state_dim: 2,
            sensor_dim: 360,
            action_dim: 2,
            target_threshold: 0.01,
            max_laser_range: 3.5,
            reward_params_path: PathBuf::from("param/env.toml"),
            results_path: PathBuf::from("navigation_result.txt"),
            trajectory_path: PathBuf::from("figures_utils/trajectory"),
            keypoint_path: PathBuf::from("figures_utils/keypoint"),
            service_address: "http://127.0.0.1:50051".to_string(),
            service_wait_secs: 60,
            policy: PolicyConfig::default(),
        }
    }
}

impl EvaluatorConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, EvalError> {
        let toml_str = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EvalError> {
        let checks = [
            (self.num_agents == 0, "num_agents must be greater than 0"),
            (self.max_steps == 0, "max_steps must be greater than 0"),
            (self.time_delay == 0, "time_delay must be greater than 0"),
            (self.state_dim == 0, "state_dim must be greater than 0"),
            (self.action_dim < 2, "action_dim must be at least 2"),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, msg)) => Err(EvalError::InvalidConfig(msg.to_string())),
            None => Ok(()),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn reset_settle(&self) -> Duration {
        Duration::from_millis(self.reset_settle_ms)
    }

    pub fn service_wait(&self) -> Duration {
        Duration::from_secs(self.service_wait_secs)
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration);
    }
}

/// Runs a pretrained policy against a batched multi-agent environment and records how it does
pub struct Evaluator<E, P>
where
    E: EnvService,
    P: NavigationPolicy,
{
    config: EvaluatorConfig,
    params: RewardParams,
    env: E,
    policy: P,
    controls: Vec<ControlCommand>,
    tracker: EpisodeTracker,
    stats: NavigationStats,
    keypoints: TrajectoryLog,
    trajectory: TrajectoryLog,
    results: ResultsFile,
    recording: bool,
    total_episodes: u64,
    report: Report,
}

impl<E, P> Evaluator<E, P>
where
    E: EnvService,
    P: NavigationPolicy,
{
    pub fn new(
        config: EvaluatorConfig,
        params: RewardParams,
        env: E,
        policy: P,
    ) -> Result<Self, EvalError> {
        config.validate()?;

        tracing::info!("State  Dimensions : {}", config.state_dim);
        tracing::info!("Sensor Dimensions : {}", config.sensor_dim);
        tracing::info!("Action Dimensions : {}", config.action_dim);
        tracing::info!("Agent  Number : {}", config.num_agents);

        let n = config.num_agents;
        Ok(Self {
            params,
            env,
            policy,
            controls: vec![ControlCommand::default(); n],
            tracker: EpisodeTracker::new(n),
            stats: NavigationStats::default(),
            keypoints: TrajectoryLog::new(n),
            trajectory: TrajectoryLog::new(n),
            results: ResultsFile::new(&config.results_path),
            recording: true,
            total_episodes: 0,
            report: Report::default(),
            config,
        })
    }

    fn call_env(&mut self) -> Result<Vec<AgentState>, EvalError> {
        let states = self.env.call(&self.controls)?;
        check_batch(self.config.num_agents, states)
    }

    /// Reset handshake: every agent gets a reset pulse, then a plain command to resume
    ///
    /// Returns the first observation of the new episode.
    pub fn reset_env(&mut self) -> Result<Vec<AgentState>, EvalError> {
        self.controls.fill(ControlCommand::reset());
        self.call_env()?;

        for control in &mut self.controls {
            control.reset = false;
        }
        let states = self.call_env()?;

        pause(self.config.reset_settle());
        Ok(states)
    }

    /// Chooses an action per agent and holds it for `time_delay` ticks
    ///
    /// Returns the observation to act on in the next step.
    fn run_step(&mut self, current: Vec<AgentState>) -> Result<Vec<AgentState>, EvalError> {
        let infer_start = Instant::now();
        for (agent, state) in current.iter().enumerate() {
            if self.tracker.is_terminated(agent) {
                continue;
            }

            let cmd = self.policy.navigate(state)?;
            self.controls[agent] = ControlCommand {
                linear_x: cmd.linear,
                angular_z: cmd.angular,
                reset: false,
            };
            self.tracker.release(agent);

            if self.recording {
                self.keypoints.push(agent, state.position());
            }
        }
        self.report["Policy infer time"] +=
            AvgTracker::sample(infer_start.elapsed().as_secs_f64()).into();

        let mut next = current;
        for _ in 0..self.config.time_delay {
            let states = self.call_env()?;

            // reset is a one-tick pulse
            for control in &mut self.controls {
                control.reset = false;
            }

            for (agent, state) in states.into_iter().enumerate() {
                if !self.tracker.is_terminated(agent) {
                    next[agent] = state;
                }

                if let Some(outcome) = self.tracker.observe(agent, &next[agent], &self.params) {
                    self.controls[agent].reset = true;
                    self.stats.record(outcome);
                    tracing::debug!(
                        "Agent {agent} finished with {outcome:?} at ({:.2}, {:.2})",
                        next[agent].current_x,
                        next[agent].current_y
                    );
                }

                if self.recording {
                    self.trajectory.push(agent, next[agent].position());
                }
            }

            pause(self.config.tick_interval());
        }

        // delivers any reset requested on the last tick
        let settled = self.call_env()?;
        self.tracker.end_step();

        Ok(settled)
    }

    pub fn run_episode(&mut self) -> Result<(), EvalError> {
        let episode_start = Instant::now();

        self.tracker.reset();

        let mut states = self.reset_env()?;
        for _ in 0..self.config.max_steps {
            let step_start = Instant::now();
            states = self.run_step(states)?;
            self.report["Step time"] += AvgTracker::sample(step_start.elapsed().as_secs_f64()).into();
        }

        if self.recording {
            self.save_first_episode()?;
            self.recording = false;
        }

        self.total_episodes += 1;
        tracing::info!(
            "Successfully arriving target times: {} | Crash times: {}",
            self.stats.success,
            self.stats.collision
        );
        self.results.append(&self.stats)?;

        let episode = self.tracker.episode_stats();
        tracing::debug!(
            "Episode {} finished in {:.2}s: {} success, {} collision, {} other",
            self.total_episodes,
            episode_start.elapsed().as_secs_f64(),
            episode.success,
            episode.collision,
            episode.other
        );

        self.report["Avg. survive ticks"] += self.tracker.avg_survive_ticks().into();
        Ok(())
    }

    fn save_first_episode(&self) -> Result<(), EvalError> {
        if !self.config.trajectory_path.as_os_str().is_empty() {
            self.trajectory.save(&self.config.trajectory_path)?;
        }

        if !self.config.keypoint_path.as_os_str().is_empty() {
            self.keypoints.save(&self.config.keypoint_path)?;
        }

        Ok(())
    }

    /// Runs `max_episodes` episodes and returns the cumulative outcome counts
    pub fn run(&mut self) -> Result<NavigationStats, EvalError> {
        tracing::info!("Start Navigation");
        self.policy.reset();

        for _ in 0..self.config.max_episodes {
            self.run_episode()?;
        }

        self.fill_report();
        tracing::info!("\n{}", self.report);

        Ok(self.stats)
    }

    fn fill_report(&mut self) {
        let terminal_events = self.stats.total();
        self.report["Episodes"] = self.total_episodes.into();
        self.report["Success"] = self.stats.success.into();
        self.report["Collision"] = self.stats.collision.into();
        self.report["Other terminal"] = self.stats.other.into();

        if terminal_events > 0 {
            self.report["Success rate"] =
                (self.stats.success as f64 / terminal_events as f64).into();
            self.report["Collision rate"] =
                (self.stats.collision as f64 / terminal_events as f64).into();
        }
    }

    pub fn stats(&self) -> &NavigationStats {
        &self.stats
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn trajectory(&self) -> &TrajectoryLog {
        &self.trajectory
    }

    pub fn keypoints(&self) -> &TrajectoryLog {
        &self.keypoints
    }

    pub fn total_episodes(&self) -> u64 {
        self.total_episodes
    }

    pub fn into_parts(self) -> (E, P) {
        (self.env, self.policy)
    }
}
