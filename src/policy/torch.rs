use super::{ActionScale, NavigationPolicy, VelocityCommand};
use crate::{environment::AgentState, error::EvalError};
use std::path::Path;
use tch::{CModule, Device, Kind, Tensor, no_grad_guard};

/// Pretrained actor exported with TorchScript
///
/// The module takes the target features `[1, state_dim]` and the range scan
/// `[1, sensor_dim]` and returns `[1, action_dim]` raw actions in [-1, 1].
pub struct TorchPolicy {
    module: CModule,
    device: Device,
    state_dim: usize,
    sensor_dim: usize,
    action_dim: usize,
    max_range: f32,
    scale: ActionScale,
}

impl TorchPolicy {
    pub const MIN_ACTION_DIM: usize = 2;

    pub fn load<P: AsRef<Path>>(
        path: P,
        device: Device,
        state_dim: usize,
        sensor_dim: usize,
        action_dim: usize,
        max_range: f32,
        scale: ActionScale,
    ) -> Result<Self, EvalError> {
        if action_dim < Self::MIN_ACTION_DIM {
            return Err(EvalError::InvalidConfig(format!(
                "action_dim must be at least {}, got {action_dim}",
                Self::MIN_ACTION_DIM
            )));
        }

        let path = path.as_ref();
        let mut module = CModule::load_on_device(path, device)?;
        module.set_eval();

        tracing::info!("Loaded policy from: {path:?} on {device:?}");

        Ok(Self {
            module,
            device,
            state_dim,
            sensor_dim,
            action_dim,
            max_range,
            scale,
        })
    }

    fn state_tensor(&self, state: &AgentState) -> Tensor {
        let mut features = state.target_features().to_vec();
        features.resize(self.state_dim, 0.0);
        Tensor::from_slice(&features)
            .view([1, self.state_dim as i64])
            .to_device(self.device)
    }

    fn sensor_tensor(&self, state: &AgentState) -> Tensor {
        let features = state.sensor_features(self.sensor_dim, self.max_range);
        Tensor::from_slice(&features)
            .view([1, self.sensor_dim as i64])
            .to_device(self.device)
    }
}

impl NavigationPolicy for TorchPolicy {
    fn navigate(&mut self, state: &AgentState) -> Result<VelocityCommand, EvalError> {
        let _no_grad = no_grad_guard();

        let output = self
            .module
            .forward_ts(&[self.state_tensor(state), self.sensor_tensor(state)])?;
        let action = output.to(Device::Cpu).flatten(0, -1).to_kind(Kind::Float);
        let action = Vec::<f32>::try_from(action)?;

        if action.len() != self.action_dim {
            return Err(EvalError::PolicyOutput {
                expected: self.action_dim,
                actual: action.len(),
            });
        }

        Ok(self.scale.apply([action[0], action[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(path: &str, action_dim: usize) -> Result<TorchPolicy, EvalError> {
        TorchPolicy::load(
            path,
            Device::Cpu,
            2,
            360,
            action_dim,
            3.5,
            ActionScale::default(),
        )
    }

    #[test]
    fn missing_model_is_torch_error() {
        let err = load("no/such/actor.pt", 2).err().unwrap();
        assert!(matches!(err, EvalError::Torch(_)));
    }

    #[test]
    fn rejects_small_action_dim() {
        let err = load("no/such/actor.pt", 1).err().unwrap();
        assert!(matches!(err, EvalError::InvalidConfig(_)));
    }
}
