use super::{NavigationPolicy, VelocityCommand};
use crate::{environment::AgentState, error::EvalError};
use std::f32::consts::FRAC_PI_2;

/// Proportional go-to-goal controller for a differential-drive robot
///
/// Turns toward the target and slows down as the heading error grows.
/// Needs no model, so it doubles as a baseline and a smoke test for the loop.
#[derive(Debug, Clone)]
pub struct DifferentialDrive {
    pub max_linear: f32,
    pub max_angular: f32,
    pub heading_gain: f32,
    /// Within this distance of the target the robot stops
    pub target_threshold: f32,
}

impl Default for DifferentialDrive {
    fn default() -> Self {
        Self {
            max_linear: 0.5,
            max_angular: 1.0,
            heading_gain: 2.0,
            target_threshold: 0.01,
        }
    }
}

impl NavigationPolicy for DifferentialDrive {
    fn navigate(&mut self, state: &AgentState) -> Result<VelocityCommand, EvalError> {
        let [distance, bearing] = state.target_features();

        if distance <= self.target_threshold {
            return Ok(VelocityCommand::default());
        }

        let angular = (self.heading_gain * bearing).clamp(-self.max_angular, self.max_angular);
        let alignment = (1.0 - bearing.abs() / FRAC_PI_2).max(0.0);
        let linear = (self.max_linear * alignment).min(distance);

        Ok(VelocityCommand { linear, angular })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(x: f32, y: f32, yaw: f32, tx: f32, ty: f32) -> AgentState {
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
    fn drives_straight_when_aligned() {
        let mut policy = DifferentialDrive::default();
        let cmd = policy.navigate(&state(0.0, 0.0, 0.0, 3.0, 0.0)).unwrap();

        assert_eq!(cmd.linear, 0.5);
        assert_eq!(cmd.angular, 0.0);
    }

    #[test]
    fn turns_in_place_when_target_behind() {
        let mut policy = DifferentialDrive::default();
        let cmd = policy.navigate(&state(0.0, 0.0, 0.0, -3.0, 0.1)).unwrap();

        assert_eq!(cmd.linear, 0.0);
        assert_eq!(cmd.angular, 1.0);
    }

    #[test]
    fn stops_at_target() {
        let mut policy = DifferentialDrive::default();
        let cmd = policy.navigate(&state(1.0, 1.0, 0.3, 1.0, 1.005)).unwrap();
        assert_eq!(cmd, VelocityCommand::default());
    }

    #[test]
    fn slows_near_target() {
        let mut policy = DifferentialDrive::default();
        let cmd = policy.navigate(&state(0.0, 0.0, 0.0, 0.2, 0.0)).unwrap();
        assert!((cmd.linear - 0.2).abs() < 1e-6);
    }
}
