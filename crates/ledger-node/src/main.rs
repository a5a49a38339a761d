use clap::Parser;
use ledger_node::{constants::DEFAULT_LISTEN, serve, AppState, NodeConfig};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Leading hex zeros required of every block hash
    #[arg(long, default_value_t = ledger_core::constants::DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Threads used for the nonce search (0 = one per core)
    #[arg(long, default_value_t = 0)]
    mining_threads: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let config = NodeConfig {
        difficulty: args.difficulty,
        mining_threads: args.mining_threads,
    };

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            on_signal.cancel();
        }
    });

    // Genesis sealing is a blocking search; keep it off the runtime threads.
    let state =
        tokio::task::spawn_blocking(move || AppState::new(&config, shutdown)).await??;

    let addr: SocketAddr = args.listen.parse()?;
    serve(tokio::net::TcpListener::bind(addr).await?, state).await
}
