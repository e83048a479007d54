#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use clap::{Parser, Subcommand};
use replayq::ReplayConfig;
use replayq_http::{open_worker, serve};

#[derive(Parser)]
#[command(name = "replayq")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[arg(long, env = "REPLAYQ_DATA_DIR", default_value = "./data")]
    data_dir: String,
    #[arg(long, env = "REPLAYQ_BIND_ADDR", default_value = "127.0.0.1:7800")]
    bind_addr: String,
    /// Store backend: "file" or "memory"
    #[arg(long, env = "REPLAYQ_STORE", default_value = "file")]
    store: String,
}

#[derive(Subcommand)]
enum Command {
    /// Replay staged requests once and exit
    Replay {
        /// Only replay this queue (default: all queues)
        #[arg(long)]
        queue: Option<String>,
    },
    /// Print the requests currently staged in each queue
    Status,
}

async fn run_replay(config: ReplayConfig, queue: Option<String>) -> replayq::Result<()> {
    let worker = open_worker(&config).await?;
    let reports = match queue {
        Some(name) => vec![worker.replay(&name).await?],
        None => worker.replay_all().await,
    };
    for report in reports {
        println!("{}", report);
    }
    Ok(())
}

async fn run_status(config: ReplayConfig) -> replayq::Result<()> {
    let worker = open_worker(&config).await?;
    for queue in worker.queues() {
        let mut pending = queue.pending().await?;
        pending.sort();
        println!("{}: {} pending", queue.name(), pending.len());
        for (url, value) in pending {
            println!("  {} {}", value, url);
        }
    }
    Ok(())
}

async fn run(command: Command) -> replayq::Result<()> {
    let config = ReplayConfig::from_env()?;
    match command {
        Command::Replay { queue } => run_replay(config, queue).await,
        Command::Status => run_status(config).await,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    std::env::set_var("REPLAYQ_DATA_DIR", &cli.data_dir);
    std::env::set_var("REPLAYQ_BIND_ADDR", &cli.bind_addr);
    std::env::set_var("REPLAYQ_STORE", &cli.store);

    let command = match cli.command {
        None => return serve().await,
        Some(command) => command,
    };

    replayq_http::server::init_tracing();
    if let Err(e) = run(command).await {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
