mod differential;
mod noise;
#[cfg(feature = "torch")]
mod torch;

pub use differential::DifferentialDrive;
pub use noise::{Noisy, NoiseConfig, OrnsteinUhlenbeck};
#[cfg(feature = "torch")]
pub use torch::TorchPolicy;

use crate::{environment::AgentState, error::EvalError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VelocityCommand {
    pub linear: f32,
    pub angular: f32,
}

/// Maps raw actions in [-1, 1] to robot velocities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionScale {
    pub max_linear: f32,
    pub max_angular: f32,
}

impl Default for ActionScale {
    fn default() -> Self {
        Self {
            max_linear: 0.5,
            max_angular: 1.0,
        }
    }
}

impl ActionScale {
    /// Linear velocity is forward-only, so its raw range is shifted onto [0, max_linear]
    pub fn apply(&self, raw: [f32; 2]) -> VelocityCommand {
        let linear = (raw[0].clamp(-1.0, 1.0) + 1.0) * 0.5 * self.max_linear;
        let angular = raw[1].clamp(-1.0, 1.0) * self.max_angular;
        VelocityCommand { linear, angular }
    }

    pub fn unapply(&self, cmd: VelocityCommand) -> [f32; 2] {
        let linear = if self.max_linear > 0.0 {
            cmd.linear / self.max_linear * 2.0 - 1.0
        } else {
            -1.0
        };
        let angular = if self.max_angular > 0.0 {
            cmd.angular / self.max_angular
        } else {
            0.0
        };
        [linear.clamp(-1.0, 1.0), angular.clamp(-1.0, 1.0)]
    }
}

/// Anything that can steer one agent from its latest observation
pub trait NavigationPolicy {
    fn navigate(&mut self, state: &AgentState) -> Result<VelocityCommand, EvalError>;

    /// Called once before the first episode, noise carries over between episodes
    fn reset(&mut self) {}
}

impl<T: NavigationPolicy + ?Sized> NavigationPolicy for Box<T> {
    fn navigate(&mut self, state: &AgentState) -> Result<VelocityCommand, EvalError> {
        (**self).navigate(state)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}
