use anyhow::Context;
use clap::Parser;
use metric_store_agent::{
    actors::{agent::AgentHandle, broker::BrokerHandle},
    bus::Network,
    config::{Config, read_config_file},
    logging,
};
use tracing::{debug, info, level_filters::LevelFilter, trace};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: Option<String>,

    /// Log at debug level regardless of the config file
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };
    config.apply_env_overrides();

    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        config.logging.level.into()
    };
    logging::init(level);
    trace!("started with args: {args:?}");

    let network = Network::new();

    let broker = if config.bus.serve {
        let broker = BrokerHandle::spawn_bound("broker", &network, &config.bus.endpoint)
            .with_context(|| format!("failed to bind broker at '{}'", config.bus.endpoint))?;
        info!("serving in-process bus at '{}'", config.bus.endpoint);
        Some(broker)
    } else {
        None
    };

    let (agent, task) = AgentHandle::spawn(config.bus.identity.clone(), network);

    for command in config.startup_commands() {
        agent.send(command).await?;
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    debug!("ctrl-c received, stopping agent");

    agent.terminate().await?;
    let report = task.await.context("agent task panicked")?;

    info!(
        "agent stopped after {} commands and {} bus messages ({} failed, {} malformed, {} missing arguments)",
        report.stats.commands_processed,
        report.stats.messages_handled,
        report.interpreter.failed,
        report.interpreter.malformed,
        report.interpreter.missing_argument,
    );

    if let Some(broker) = broker {
        broker.shutdown().await?;
    }

    Ok(())
}
