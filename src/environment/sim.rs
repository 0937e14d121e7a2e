use super::{AgentState, ControlCommand, EnvService, wrap_angle};
use crate::{
    error::EvalError,
    params::{Outcome, RewardParams},
};
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub yaw: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Where an agent starts and where it is trying to go
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spawn {
    pub start: Pose,
    pub target: [f32; 2],
}

#[derive(Debug, Clone)]
pub struct LocalSimConfig {
    /// The arena is the square [-half_size, half_size]^2
    pub arena_half_size: f32,
    pub robot_radius: f32,
    pub goal_radius: f32,
    /// Simulated seconds per call
    pub dt: f32,
    pub laser_beams: usize,
    pub max_range: f32,
    /// Uniform noise added to start positions on reset, set 0 to disable
    pub start_jitter: f32,
    pub seed: u64,
}

impl Default for LocalSimConfig {
    fn default() -> Self {
        Self {
            arena_half_size: 5.0,
            robot_radius: 0.2,
            goal_radius: 0.3,
            dt: 0.1,
            laser_beams: 360,
            max_range: 3.5,
            start_jitter: 0.0,
            seed: 123,
        }
    }
}

struct SimAgent {
    spawn: Spawn,
    pose: Pose,
    finished: Option<Outcome>,
}

/// Small kinematic stand-in for the simulator
///
/// Agents are unicycles integrated once per call. An agent that reaches its goal or
/// hits something freezes and keeps reporting its terminal state until it is reset.
pub struct LocalSim {
    config: LocalSimConfig,
    params: RewardParams,
    agents: Vec<SimAgent>,
    obstacles: Vec<Obstacle>,
    rng: fastrand::Rng,
}

impl LocalSim {
    pub fn new(config: LocalSimConfig, params: RewardParams, spawns: Vec<Spawn>) -> Self {
        let rng = fastrand::Rng::with_seed(config.seed);
        let agents = spawns
            .into_iter()
            .map(|spawn| SimAgent {
                spawn,
                pose: spawn.start,
                finished: None,
            })
            .collect();

        Self {
            config,
            params,
            agents,
            obstacles: Vec::new(),
            rng,
        }
    }

    /// Agents in parallel horizontal lanes, each driving `length` along +x to its target
    pub fn lanes(num_agents: usize, length: f32, config: LocalSimConfig, params: RewardParams) -> Self {
        let spacing = 1.0;
        let offset = (num_agents.saturating_sub(1)) as f32 * spacing / 2.0;

        let spawns = (0..num_agents)
            .map(|i| {
                let y = i as f32 * spacing - offset;
                Spawn {
                    start: Pose {
                        x: -length / 2.0,
                        y,
                        yaw: 0.0,
                    },
                    target: [length / 2.0, y],
                }
            })
            .collect();

        Self::new(config, params, spawns)
    }

    pub fn with_obstacles(mut self, obstacles: Vec<Obstacle>) -> Self {
        self.obstacles = obstacles;
        self
    }

    fn respawn(&mut self, idx: usize) {
        let jitter = self.config.start_jitter;
        let mut pose = self.agents[idx].spawn.start;
        if jitter > 0.0 {
            pose.x += (self.rng.f32() * 2.0 - 1.0) * jitter;
            pose.y += (self.rng.f32() * 2.0 - 1.0) * jitter;
        }

        let agent = &mut self.agents[idx];
        agent.pose = pose;
        agent.finished = None;
    }

    fn judge(&self, idx: usize) -> Option<Outcome> {
        let pose = self.agents[idx].pose;
        let [tx, ty] = self.agents[idx].spawn.target;
        let r = self.config.robot_radius;

        if (tx - pose.x).hypot(ty - pose.y) <= self.config.goal_radius {
            return Some(Outcome::Success);
        }

        let limit = self.config.arena_half_size - r;
        if pose.x.abs() > limit || pose.y.abs() > limit {
            return Some(Outcome::Collision);
        }

        let hits_obstacle = self
            .obstacles
            .iter()
            .any(|o| (o.x - pose.x).hypot(o.y - pose.y) < o.radius + r);

        let hits_agent = self.agents.iter().enumerate().any(|(j, other)| {
            j != idx && (other.pose.x - pose.x).hypot(other.pose.y - pose.y) < 2.0 * r
        });

        (hits_obstacle || hits_agent).then_some(Outcome::Collision)
    }

    fn cast_ray(&self, idx: usize, angle: f32) -> f32 {
        let origin = self.agents[idx].pose;
        let (dy, dx) = angle.sin_cos();
        let h = self.config.arena_half_size;

        let mut nearest = self.config.max_range;

        for (o, d) in [(origin.x, dx), (origin.y, dy)] {
            let t = if d > 0.0 {
                (h - o) / d
            } else if d < 0.0 {
                (-h - o) / d
            } else {
                f32::INFINITY
            };
            nearest = nearest.min(t.max(0.0));
        }

        let others = self
            .agents
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != idx)
            .map(|(_, a)| (a.pose.x, a.pose.y, self.config.robot_radius));
        let circles = self.obstacles.iter().map(|o| (o.x, o.y, o.radius)).chain(others);

        for (cx, cy, radius) in circles {
            let fx = origin.x - cx;
            let fy = origin.y - cy;
            let b = fx * dx + fy * dy;
            let c = fx * fx + fy * fy - radius * radius;
            let disc = b * b - c;
            if disc < 0.0 {
                continue;
            }

            let root = disc.sqrt();
            let t = if -b - root >= 0.0 { -b - root } else { -b + root };
            if t >= 0.0 {
                nearest = nearest.min(t);
            }
        }

        nearest
    }

    fn observe(&self, idx: usize) -> AgentState {
        let agent = &self.agents[idx];
        let beams = self.config.laser_beams;

        let laser = (0..beams)
            .map(|k| self.cast_ray(idx, agent.pose.yaw + k as f32 * TAU / beams as f32))
            .collect();

        let reward = match agent.finished {
            Some(Outcome::Success) => self.params.terminal_reward,
            Some(Outcome::Collision) => self.params.collision_reward,
            Some(Outcome::Other) | None => self.params.survive_reward,
        };

        AgentState {
            current_x: agent.pose.x,
            current_y: agent.pose.y,
            yaw: agent.pose.yaw,
            target_x: agent.spawn.target[0],
            target_y: agent.spawn.target[1],
            reward,
            terminal: agent.finished.is_some(),
            laser,
        }
    }
}

impl EnvService for LocalSim {
    fn call(&mut self, controls: &[ControlCommand]) -> Result<Vec<AgentState>, EvalError> {
        if controls.len() != self.agents.len() {
            return Err(EvalError::AgentCountMismatch {
                expected: self.agents.len(),
                actual: controls.len(),
            });
        }

        let dt = self.config.dt;
        let mut moved = Vec::with_capacity(controls.len());

        for (idx, cmd) in controls.iter().enumerate() {
            if cmd.reset {
                self.respawn(idx);
                continue;
            }

            let agent = &mut self.agents[idx];
            if agent.finished.is_some() {
                continue;
            }

            let pose = &mut agent.pose;
            pose.yaw = wrap_angle(pose.yaw + cmd.angular_z * dt);
            pose.x += cmd.linear_x * pose.yaw.cos() * dt;
            pose.y += cmd.linear_x * pose.yaw.sin() * dt;
            moved.push(idx);
        }

        for idx in moved {
            if let Some(outcome) = self.judge(idx) {
                self.agents[idx].finished = Some(outcome);
            }
        }

        Ok((0..self.agents.len()).map(|idx| self.observe(idx)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward(speed: f32) -> ControlCommand {
        ControlCommand {
            linear_x: speed,
            angular_z: 0.0,
            reset: false,
        }
    }

    fn single_lane(length: f32) -> LocalSim {
        LocalSim::lanes(1, length, LocalSimConfig::default(), RewardParams::default())
    }

    #[test]
    fn reaches_target_and_freezes() {
        let mut sim = single_lane(1.0);
        let params = RewardParams::default();

        let mut last = Vec::new();
        for _ in 0..20 {
            last = sim.call(&[forward(1.0)]).unwrap();
            if last[0].terminal {
                break;
            }
        }

        assert!(last[0].terminal);
        assert_eq!(last[0].reward, params.terminal_reward);

        let frozen = sim.call(&[forward(1.0)]).unwrap();
        assert_eq!(frozen[0].position(), last[0].position());
        assert!(frozen[0].terminal);

        let reset = sim
            .call(&[ControlCommand::reset()])
            .unwrap();
        assert!(!reset[0].terminal);
        assert_eq!(reset[0].position(), [-0.5, 0.0]);
        assert_eq!(reset[0].reward, params.survive_reward);
    }

    #[test]
    fn driving_into_wall_is_collision() {
        let mut sim = single_lane(2.0);
        let params = RewardParams::default();

        let backwards = ControlCommand {
            linear_x: -2.0,
            angular_z: 0.0,
            reset: false,
        };

        let mut last = Vec::new();
        for _ in 0..100 {
            last = sim.call(&[backwards]).unwrap();
            if last[0].terminal {
                break;
            }
        }

        assert!(last[0].terminal);
        assert_eq!(last[0].reward, params.collision_reward);
    }

    #[test]
    fn obstacle_blocks_lane() {
        let mut sim = single_lane(2.0).with_obstacles(vec![Obstacle {
            x: 0.0,
            y: 0.0,
            radius: 0.3,
        }]);

        let first = sim.call(&[forward(0.0)]).unwrap();
        // straight ahead: obstacle surface at x = -0.3, agent at x = -1.0
        assert!((first[0].laser[0] - 0.7).abs() < 1e-4);

        let mut last = first;
        for _ in 0..50 {
            last = sim.call(&[forward(1.0)]).unwrap();
            if last[0].terminal {
                break;
            }
        }
        assert_eq!(last[0].reward, RewardParams::default().collision_reward);
    }

    #[test]
    fn laser_sees_walls_within_range() {
        let mut sim = single_lane(2.0);
        let states = sim.call(&[forward(0.0)]).unwrap();
        let laser = &states[0].laser;

        assert_eq!(laser.len(), 360);
        // behind: wall at x = -5, agent at x = -1
        assert!((laser[180] - 3.5).abs() < 1e-4);
        assert!(laser.iter().all(|r| *r <= 3.5 && *r >= 0.0));
    }

    #[test]
    fn lanes_do_not_overlap() {
        let mut sim = LocalSim::lanes(4, 2.0, LocalSimConfig::default(), RewardParams::default());
        let states = sim.call(&[forward(0.0); 4]).unwrap();

        assert_eq!(states.len(), 4);
        assert!(states.iter().all(|s| !s.terminal));
        assert_eq!(states[0].current_y, -1.5);
        assert_eq!(states[3].current_y, 1.5);
    }

    #[test]
    fn wrong_batch_size_is_rejected() {
        let mut sim = LocalSim::lanes(2, 2.0, LocalSimConfig::default(), RewardParams::default());
        let err = sim.call(&[forward(0.0)]).unwrap_err();
        assert!(matches!(err, EvalError::AgentCountMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn jittered_reset_is_seeded() {
        let config = LocalSimConfig {
            start_jitter: 0.1,
            ..Default::default()
        };

        let mut a = LocalSim::lanes(1, 2.0, config.clone(), RewardParams::default());
        let mut b = LocalSim::lanes(1, 2.0, config, RewardParams::default());

        let sa = a.call(&[ControlCommand::reset()]).unwrap();
        let sb = b.call(&[ControlCommand::reset()]).unwrap();
        assert_eq!(sa[0].position(), sb[0].position());
        assert!((sa[0].current_x + 1.0).abs() <= 0.1);
    }
}
