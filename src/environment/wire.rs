//! Protobuf messages exchanged with the simulator bridge.
//!
//! Hand-written prost structs so the crate builds without `protoc`. The field
//! tags match `gazebo_drl_env.proto` on the simulator side.

use super::{AgentState, ControlCommand};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Control {
    #[prost(float, tag = "1")]
    pub linear_x: f32,
    #[prost(float, tag = "2")]
    pub angular_z: f32,
    #[prost(bool, tag = "3")]
    pub reset: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControlGroup {
    #[prost(message, repeated, tag = "1")]
    pub group_control: Vec<Control>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct State {
    #[prost(float, tag = "1")]
    pub current_x: f32,
    #[prost(float, tag = "2")]
    pub current_y: f32,
    #[prost(float, tag = "3")]
    pub yaw: f32,
    #[prost(float, tag = "4")]
    pub desired_x: f32,
    #[prost(float, tag = "5")]
    pub desired_y: f32,
    #[prost(float, tag = "6")]
    pub reward: f32,
    #[prost(bool, tag = "7")]
    pub terminal: bool,
    #[prost(float, repeated, tag = "8")]
    pub laser: Vec<f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateGroup {
    #[prost(message, repeated, tag = "1")]
    pub group_state: Vec<State>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SimpleCtrlResponse {
    #[prost(message, optional, tag = "1")]
    pub all_group_states: Option<StateGroup>,
}

impl From<&ControlCommand> for Control {
    fn from(cmd: &ControlCommand) -> Self {
        Self {
            linear_x: cmd.linear_x,
            angular_z: cmd.angular_z,
            reset: cmd.reset,
        }
    }
}

impl From<State> for AgentState {
    fn from(state: State) -> Self {
        Self {
            current_x: state.current_x,
            current_y: state.current_y,
            yaw: state.yaw,
            target_x: state.desired_x,
            target_y: state.desired_y,
            reward: state.reward,
            terminal: state.terminal,
            laser: state.laser,
        }
    }
}

impl ControlGroup {
    pub fn from_commands(controls: &[ControlCommand]) -> Self {
        Self {
            group_control: controls.iter().map(Control::from).collect(),
        }
    }
}
