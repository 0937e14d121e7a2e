use super::{ActionScale, NavigationPolicy, VelocityCommand};
use crate::{environment::AgentState, error::EvalError};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub mu: f32,
    pub theta: f32,
    pub sigma: f32,
    pub dt: f32,
    pub seed: u64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            mu: 0.0,
            theta: 2.0,
            sigma: 0.2,
            dt: 0.01,
            seed: 123,
        }
    }
}

/// Temporally correlated exploration noise, one process per action dimension
pub struct OrnsteinUhlenbeck {
    config: NoiseConfig,
    state: Vec<f32>,
    rng: StdRng,
}

impl OrnsteinUhlenbeck {
    pub fn new(dim: usize, config: NoiseConfig) -> Self {
        Self {
            state: vec![config.mu; dim],
            rng: StdRng::seed_from_u64(config.seed),
            config,
        }
    }

    pub fn reset(&mut self) {
        self.state.fill(self.config.mu);
    }

    pub fn sample(&mut self) -> &[f32] {
        let NoiseConfig {
            mu,
            theta,
            sigma,
            dt,
            ..
        } = self.config;

        for i in 0..self.state.len() {
            let n: f32 = StandardNormal.sample(&mut self.rng);
            let x = self.state[i];
            self.state[i] = x + theta * (mu - x) * dt + sigma * dt.sqrt() * n;
        }

        &self.state
    }
}

/// Adds OU noise to another policy's actions, in raw action space
pub struct Noisy<P> {
    inner: P,
    noise: OrnsteinUhlenbeck,
    scale: ActionScale,
}

impl<P: NavigationPolicy> Noisy<P> {
    pub fn new(inner: P, scale: ActionScale, config: NoiseConfig) -> Self {
        Self {
            inner,
            noise: OrnsteinUhlenbeck::new(2, config),
            scale,
        }
    }
}

impl<P: NavigationPolicy> NavigationPolicy for Noisy<P> {
    fn navigate(&mut self, state: &AgentState) -> Result<VelocityCommand, EvalError> {
        let raw = self.scale.unapply(self.inner.navigate(state)?);
        let noise = self.noise.sample();
        Ok(self.scale.apply([raw[0] + noise[0], raw[1] + noise[1]]))
    }

    fn reset(&mut self) {
        self.noise.reset();
        self.inner.reset();
    }
}
