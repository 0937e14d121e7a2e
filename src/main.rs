use anyhow::{Context, Result};
use clap::Parser;
use hnrn_eval::{
    Evaluator, EvaluatorConfig, RewardParams,
    environment::{
        EnvService,
        sim::{LocalSim, LocalSimConfig},
    },
    policy::{DifferentialDrive, NavigationPolicy, Noisy},
};
use std::path::PathBuf;

/// Evaluates a pretrained navigation policy on a multi-agent simulator
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML file overriding the default evaluator settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run against the built-in kinematic simulator instead of the remote service
    #[arg(long)]
    local: bool,

    /// Override the number of episodes
    #[arg(long)]
    episodes: Option<u64>,
}

fn load_policy(config: &EvaluatorConfig) -> Result<Box<dyn NavigationPolicy>> {
    let fallback = DifferentialDrive {
        max_linear: config.policy.scale.max_linear,
        max_angular: config.policy.scale.max_angular,
        target_threshold: config.target_threshold,
        ..Default::default()
    };

    let policy: Box<dyn NavigationPolicy> = if config.policy.model_path.as_os_str().is_empty() {
        tracing::info!("No model configured, using the differential-drive controller");
        Box::new(fallback)
    } else {
        load_model(config, fallback)?
    };

    if config.policy.exploration_noise {
        tracing::info!("Exploration noise enabled: {:?}", config.policy.noise);
        Ok(Box::new(Noisy::new(
            policy,
            config.policy.scale,
            config.policy.noise.clone(),
        )))
    } else {
        Ok(policy)
    }
}

#[cfg(feature = "torch")]
fn load_model(
    config: &EvaluatorConfig,
    _fallback: DifferentialDrive,
) -> Result<Box<dyn NavigationPolicy>> {
    use hnrn_eval::{policy::TorchPolicy, tch::Device};

    let device = if config.policy.use_cuda {
        Device::cuda_if_available()
    } else {
        Device::Cpu
    };

    let policy = TorchPolicy::load(
        &config.policy.model_path,
        device,
        config.state_dim,
        config.sensor_dim,
        config.action_dim,
        config.max_laser_range,
        config.policy.scale,
    )
    .with_context(|| format!("loading policy from {:?}", config.policy.model_path))?;

    Ok(Box::new(policy))
}

#[cfg(not(feature = "torch"))]
fn load_model(
    config: &EvaluatorConfig,
    fallback: DifferentialDrive,
) -> Result<Box<dyn NavigationPolicy>> {
    tracing::warn!(
        "Built without the torch feature, ignoring model {:?}",
        config.policy.model_path
    );
    Ok(Box::new(fallback))
}

fn connect_env(
    config: &EvaluatorConfig,
    params: RewardParams,
    local: bool,
) -> Result<Box<dyn EnvService>> {
    if local {
        tracing::info!("Using the local simulator");
        let sim_config = LocalSimConfig {
            laser_beams: config.sensor_dim,
            max_range: config.max_laser_range,
            ..Default::default()
        };
        return Ok(Box::new(LocalSim::lanes(
            config.num_agents,
            4.0,
            sim_config,
            params,
        )));
    }

    remote_env(config)
}

#[cfg(feature = "rpc")]
fn remote_env(config: &EvaluatorConfig) -> Result<Box<dyn EnvService>> {
    use hnrn_eval::environment::remote::RemoteEnv;

    tracing::info!("Waiting for environment service at {}", config.service_address);
    let env = RemoteEnv::connect(
        &config.service_address,
        config.num_agents,
        config.service_wait(),
    )
    .context("connecting to the environment service")?;

    Ok(Box::new(env))
}

#[cfg(not(feature = "rpc"))]
fn remote_env(_config: &EvaluatorConfig) -> Result<Box<dyn EnvService>> {
    anyhow::bail!("built without the rpc feature, run with --local")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EvaluatorConfig::from_toml_file(path)
            .with_context(|| format!("reading config {path:?}"))?,
        None => EvaluatorConfig::default(),
    };

    if let Some(episodes) = args.episodes {
        config.max_episodes = episodes;
    }

    let params = RewardParams::from_file(&config.reward_params_path)
        .with_context(|| format!("reading reward params {:?}", config.reward_params_path))?;
    tracing::info!("Reward params: {params:?}");

    let policy = load_policy(&config)?;
    let env = connect_env(&config, params, args.local)?;

    let mut evaluator = Evaluator::new(config, params, env, policy)?;
    let stats = evaluator.run()?;

    tracing::info!(
        "Finished {} episodes: {} successes, {} collisions",
        evaluator.total_episodes(),
        stats.success,
        stats.collision
    );

    Ok(())
}
