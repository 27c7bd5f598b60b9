use std::net::IpAddr;
use std::sync::Arc;

use clap::Parser;

use plcsim_gateway::config::{GatewayConfig, DEFAULT_PORT};
use plcsim_gateway::gateway::RuntimeGateway;
use plcsim_gateway::runtime::memory::InMemoryRuntime;
use plcsim_gateway::server;
use plcsim_gateway::server::service::GatewayService;

#[derive(Parser, Debug)]
#[command(name = "plcsim-gateway", version, about = "PLC simulation runtime gateway")]
struct Cli {
    /// TCP port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    let config = GatewayConfig {
        bind: cli.bind,
        port: cli.port,
    };

    // No vendor binding is linked into this build; instances are simulated.
    log::warn!("serving simulated instance data from the in-memory runtime");
    let gateway = RuntimeGateway::new(Arc::new(InMemoryRuntime::new()));
    let service = Arc::new(GatewayService::new(gateway));

    server::serve(&config, service).await
}
