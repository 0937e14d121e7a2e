#[cfg(feature = "rpc")]
pub mod remote;
pub mod sim;
#[cfg(feature = "rpc")]
pub mod wire;

use crate::error::EvalError;
use std::f32::consts::PI;

/// Velocity command for one agent, plus a one-tick reset pulse
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlCommand {
    pub linear_x: f32,
    pub angular_z: f32,
    pub reset: bool,
}

impl ControlCommand {
    pub fn reset() -> Self {
        Self {
            linear_x: 0.0,
            angular_z: 0.0,
            reset: true,
        }
    }
}

/// Snapshot of one agent as reported by the environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentState {
    pub current_x: f32,
    pub current_y: f32,
    pub yaw: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub reward: f32,
    pub terminal: bool,
    /// Range scan, one beam per degree starting straight ahead, counter-clockwise
    pub laser: Vec<f32>,
}

impl AgentState {
    pub fn position(&self) -> [f32; 2] {
        [self.current_x, self.current_y]
    }

    pub fn distance_to_target(&self) -> f32 {
        (self.target_x - self.current_x).hypot(self.target_y - self.current_y)
    }

    /// Distance to the target and the target's bearing relative to the heading
    pub fn target_features(&self) -> [f32; 2] {
        let bearing = (self.target_y - self.current_y).atan2(self.target_x - self.current_x);
        [self.distance_to_target(), wrap_angle(bearing - self.yaw)]
    }

    /// The range scan resized to `dim` beams, missing beams read as `max_range`
    pub fn sensor_features(&self, dim: usize, max_range: f32) -> Vec<f32> {
        let mut features = Vec::with_capacity(dim);
        features.extend(
            self.laser
                .iter()
                .take(dim)
                .map(|range| range.min(max_range)),
        );
        features.resize(dim, max_range);
        features
    }
}

/// Wraps an angle into (-pi, pi]
pub fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped += 2.0 * PI;
    }
    wrapped
}

/// A batched, synchronous environment: one command per agent in, one state per agent out
pub trait EnvService {
    fn call(&mut self, controls: &[ControlCommand]) -> Result<Vec<AgentState>, EvalError>;
}

impl<T: EnvService + ?Sized> EnvService for &mut T {
    fn call(&mut self, controls: &[ControlCommand]) -> Result<Vec<AgentState>, EvalError> {
        (**self).call(controls)
    }
}

impl<T: EnvService + ?Sized> EnvService for Box<T> {
    fn call(&mut self, controls: &[ControlCommand]) -> Result<Vec<AgentState>, EvalError> {
        (**self).call(controls)
    }
}

pub fn check_batch(expected: usize, states: Vec<AgentState>) -> Result<Vec<AgentState>, EvalError> {
    if states.len() == expected {
        Ok(states)
    } else {
        Err(EvalError::AgentCountMismatch {
            expected,
            actual: states.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(x: f32, y: f32, yaw: f32, tx: f32, ty: f32) -> AgentState {
        AgentState {
            current_x: x,
            current_y: y,
            yaw,
            target_x: tx,
            target_y: ty,
            ..Default::default()
        }
    }

    #[test]
    fn target_features_relative_to_heading() {
        let state = state_at(0.0, 0.0, 0.0, 0.0, 2.0);
        let [dist, bearing] = state.target_features();
        assert!((dist - 2.0).abs() < 1e-6);
        assert!((bearing - PI / 2.0).abs() < 1e-6);

        let facing = state_at(1.0, 1.0, PI / 2.0, 1.0, 3.0);
        let [_, bearing] = facing.target_features();
        assert!(bearing.abs() < 1e-6);
    }

    #[test]
    fn wrap_angle_stays_in_range() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-5);
        assert!((wrap_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-6);
        assert!((wrap_angle(2.0 * PI + 0.25) - 0.25).abs() < 1e-5);
        assert!(wrap_angle(-PI) > 0.0);
    }

    #[test]
    fn sensor_features_pad_and_clip() {
        let state = AgentState {
            laser: vec![1.0, 50.0, 2.0],
            ..Default::default()
        };

        assert_eq!(state.sensor_features(5, 10.0), vec![1.0, 10.0, 2.0, 10.0, 10.0]);
        assert_eq!(state.sensor_features(2, 10.0), vec![1.0, 10.0]);
    }

    #[test]
    fn reset_command_has_no_velocity() {
        let cmd = ControlCommand::reset();
        assert!(cmd.reset);
        assert_eq!(cmd.linear_x, 0.0);
        assert_eq!(cmd.angular_z, 0.0);
        assert!(!ControlCommand::default().reset);
    }

    #[test]
    fn check_batch_rejects_wrong_length() {
        let states = vec![AgentState::default(); 3];
        let err = check_batch(4, states).unwrap_err();
        assert!(matches!(
            err,
            EvalError::AgentCountMismatch {
                expected: 4,
                actual: 3
            }
        ));
        assert_eq!(check_batch(2, vec![AgentState::default(); 2]).unwrap().len(), 2);
    }
}
