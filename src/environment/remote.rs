use super::{
    AgentState, ControlCommand, EnvService, check_batch,
    wire::{ControlGroup, SimpleCtrlResponse},
};
use crate::error::EvalError;
use std::{
    thread::sleep,
    time::{Duration, Instant},
};
use tonic::{
    client::Grpc,
    codec::ProstCodec,
    codegen::http::uri::PathAndQuery,
    transport::{Channel, Endpoint},
};

const SIMPLE_CTRL_PATH: &str = "/gazebo_drl_env.PytorchIo/SimpleCtrl";

/// The simulator bridge, reached over gRPC
///
/// Every call blocks on a private current-thread runtime, so the control loop stays synchronous.
pub struct RemoteEnv {
    client: Grpc<Channel>,
    rt: tokio::runtime::Runtime,
    num_agents: usize,
}

impl RemoteEnv {
    /// Connects to the service, retrying until it answers or `wait` runs out
    pub fn connect(address: &str, num_agents: usize, wait: Duration) -> Result<Self, EvalError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let endpoint = Endpoint::from_shared(address.to_string())
            .map_err(|_| EvalError::InvalidAddress(address.to_string()))?;

        let start = Instant::now();
        let channel = loop {
            match rt.block_on(endpoint.connect()) {
                Ok(channel) => break channel,
                Err(e) if start.elapsed() < wait => {
                    tracing::debug!("Waiting for service at {address}: {e}");
                    sleep(Duration::from_millis(250));
                }
                Err(e) => {
                    tracing::error!("Giving up on service at {address}: {e}");
                    return Err(EvalError::ServiceUnavailable {
                        address: address.to_string(),
                        waited: wait,
                        source: e,
                    });
                }
            }
        };

        tracing::info!("Connected to environment service at {address}");

        Ok(Self {
            client: Grpc::new(channel),
            rt,
            num_agents,
        })
    }
}

impl EnvService for RemoteEnv {
    fn call(&mut self, controls: &[ControlCommand]) -> Result<Vec<AgentState>, EvalError> {
        let request = ControlGroup::from_commands(controls);
        let client = &mut self.client;

        let response = self.rt.block_on(async {
            client
                .ready()
                .await
                .map_err(|e| tonic::Status::unknown(format!("Service was not ready: {e}")))?;

            let codec: ProstCodec<ControlGroup, SimpleCtrlResponse> = ProstCodec::default();
            client
                .unary(
                    tonic::Request::new(request),
                    PathAndQuery::from_static(SIMPLE_CTRL_PATH),
                    codec,
                )
                .await
        })?;

        let group = response
            .into_inner()
            .all_group_states
            .ok_or(EvalError::MissingStates)?;

        check_batch(
            self.num_agents,
            group.group_state.into_iter().map(AgentState::from).collect(),
        )
    }
}
