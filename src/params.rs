use crate::error::EvalError;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// How an agent's run ended, judged from the reward reported with the terminal flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Collision,
    /// Terminal with a reward that matches neither sentinel
    Other,
}

/// Reward constants shared with the simulator
///
/// The simulator reports one of these exact values together with the terminal flag,
/// so they double as sentinels for classifying how an agent finished.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardParams {
    pub terminal_reward: f32,
    pub collision_reward: f32,
    pub survive_reward: f32,
}

impl Default for RewardParams {
    fn default() -> Self {
        Self {
            terminal_reward: 10.0,
            collision_reward: -10.0,
            survive_reward: -0.01,
        }
    }
}

impl RewardParams {
    /// Reads the reward constants, which must match the ones the simulator was started with
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EvalError> {
        let toml_str = fs::read_to_string(path)?;
        Ok(toml::from_str(&toml_str)?)
    }

    #[allow(clippy::float_cmp)]
    pub fn classify(&self, reward: f32) -> Outcome {
        if reward == self.terminal_reward {
            Outcome::Success
        } else if reward == self.collision_reward {
            Outcome::Collision
        } else {
            Outcome::Other
        }
    }
}
